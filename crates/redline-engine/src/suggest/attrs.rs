//! Attribute changes recorded as modifications.

use serde_json::Value;

use redline_model::{ChangeType, Mark, ModelError, ModificationAttrs, Node, Transform};

use super::SuggestContext;
use crate::error::{EngineError, Result};
use crate::query;

/// How a node-level change is to be recorded.
pub(super) enum Treatment {
    /// The node is itself inserted; change it directly.
    Direct,
    /// The node is deleted; leave it alone.
    Skip,
    Tracked,
}

/// The non-text node at `pos` and how changes to it are recorded.
pub(super) fn target(doc: &Node, pos: usize) -> Result<(Node, Treatment)> {
    let node = doc
        .node_at(pos)
        .ok_or(EngineError::InvalidOperation(ModelError::NoNodeAt(pos)))?;
    if node.is_text() {
        return Err(EngineError::InvalidOperation(ModelError::StepFailed(format!(
            "position {pos} points into text, not at a node"
        ))));
    }
    let marks = node.marks();
    let treatment = if query::insertion_id(marks).is_some() {
        Treatment::Direct
    } else if query::deletion_id(marks).is_some() {
        Treatment::Skip
    } else if query::has_structure(marks) {
        return Err(EngineError::InvalidOperation(ModelError::StepFailed(format!(
            "node at {pos} anchors a structural suggestion"
        ))));
    } else {
        Treatment::Tracked
    };
    Ok((node.clone(), treatment))
}

/// The modification already recorded on `node` for this change, if any.
pub(super) fn existing_modification(
    node: &Node,
    change_type: ChangeType,
    attr_name: &str,
) -> Option<ModificationAttrs> {
    node.marks().iter().find_map(|m| match m {
        Mark::Modification(attrs) if attrs.change_type == change_type && attrs.attr_name == attr_name => {
            Some(attrs.clone())
        }
        _ => None,
    })
}

/// Replace any earlier modification for the same change by `change`, or
/// by nothing when the change is back at its original value. An earlier
/// modification's id wins over the id in `change`.
pub(super) fn record_modification(
    tr: &mut Transform,
    pos: usize,
    existing: Option<ModificationAttrs>,
    mut change: ModificationAttrs,
) -> Result<()> {
    if let Some(old) = existing {
        change.id = old.id;
        tr.remove_node_mark(pos, Mark::Modification(old))?;
    }
    if change.new_value == change.previous_value {
        log::debug!("{} at {pos} is back to its original value", change.attr_name);
        return Ok(());
    }
    tr.add_node_mark(pos, Mark::Modification(change))?;
    Ok(())
}

pub(super) fn track_attribute(
    tr: &mut Transform,
    pos: usize,
    attr: &str,
    value: Value,
    ctx: &SuggestContext<'_>,
) -> Result<()> {
    let (node, treatment) = target(tr.doc(), pos)?;
    match treatment {
        Treatment::Direct => {
            tr.set_node_attribute(pos, attr, value)?;
            return Ok(());
        }
        Treatment::Skip => {
            log::debug!("not changing {attr} of deleted node at {pos}");
            return Ok(());
        }
        Treatment::Tracked => {}
    }
    let existing = existing_modification(&node, ChangeType::Attr, attr);
    let baseline = match &existing {
        Some(m) => m.previous_value.clone(),
        None => node.attr(attr).cloned().unwrap_or(Value::Null),
    };
    tr.set_node_attribute(pos, attr, value.clone())?;
    let change = ModificationAttrs {
        id: ctx.id,
        change_type: ChangeType::Attr,
        attr_name: attr.to_string(),
        previous_value: baseline,
        new_value: value,
    };
    record_modification(tr, pos, existing, change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;
    use pretty_assertions::assert_eq;
    use redline_model::SuggestionId;
    use redline_model::builders::*;
    use serde_json::json;

    fn level_change(id: u64, from: u64, to: u64) -> Mark {
        Mark::Modification(ModificationAttrs {
            id: SuggestionId(id),
            change_type: ChangeType::Attr,
            attr_name: "level".into(),
            previous_value: json!(from),
            new_value: json!(to),
        })
    }

    #[test]
    fn records_the_previous_value() {
        let mut tr = Transform::new(doc(vec![heading(1, vec![txt("T")])]));
        track_attribute(&mut tr, 0, "level", json!(2), &context(1)).unwrap();
        assert_eq!(
            tr.doc(),
            &doc(vec![marked(heading(2, vec![txt("T")]), vec![level_change(1, 1, 2)])])
        );
    }

    #[test]
    fn later_changes_keep_the_first_baseline_and_id() {
        let d = doc(vec![marked(heading(2, vec![txt("T")]), vec![level_change(4, 1, 2)])]);
        let mut tr = Transform::new(d);
        track_attribute(&mut tr, 0, "level", json!(3), &context(9)).unwrap();
        assert_eq!(
            tr.doc(),
            &doc(vec![marked(heading(3, vec![txt("T")]), vec![level_change(4, 1, 3)])])
        );
    }

    #[test]
    fn changing_back_collapses_the_modification() {
        let d = doc(vec![marked(heading(2, vec![txt("T")]), vec![level_change(4, 1, 2)])]);
        let mut tr = Transform::new(d);
        track_attribute(&mut tr, 0, "level", json!(1), &context(9)).unwrap();
        assert_eq!(tr.doc(), &doc(vec![heading(1, vec![txt("T")])]));
    }

    #[test]
    fn text_positions_are_invalid() {
        let mut tr = Transform::new(doc(vec![p(vec![txt("abc")])]));
        let err = track_attribute(&mut tr, 2, "level", json!(1), &context(1)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidOperation(_)));
    }
}
