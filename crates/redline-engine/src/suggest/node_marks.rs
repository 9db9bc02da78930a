//! Node mark changes, recorded as modifications holding the JSON of the
//! mark before and after.

use serde_json::Value;

use redline_model::{ChangeType, Mark, ModificationAttrs, Node, Transform};

use super::SuggestContext;
use super::attrs::{Treatment, existing_modification, record_modification, target};
use crate::error::Result;

fn current_mark(node: &Node, name: &str) -> Option<Mark> {
    node.marks().iter().find(|m| m.type_name() == name).cloned()
}

fn baseline(node: &Node, existing: &Option<ModificationAttrs>, name: &str) -> Result<Value> {
    Ok(match existing {
        Some(m) => m.previous_value.clone(),
        None => match current_mark(node, name) {
            Some(mark) => mark.to_json()?,
            None => Value::Null,
        },
    })
}

pub(super) fn track_add_node_mark(
    tr: &mut Transform,
    pos: usize,
    mark: &Mark,
    ctx: &SuggestContext<'_>,
) -> Result<()> {
    if mark.is_suggestion() {
        tr.add_node_mark(pos, mark.clone())?;
        return Ok(());
    }
    let (node, treatment) = target(tr.doc(), pos)?;
    match treatment {
        Treatment::Direct => {
            tr.add_node_mark(pos, mark.clone())?;
            return Ok(());
        }
        Treatment::Skip => return Ok(()),
        Treatment::Tracked => {}
    }
    let name = mark.type_name();
    let existing = existing_modification(&node, ChangeType::Mark, name);
    let previous_value = baseline(&node, &existing, name)?;
    tr.add_node_mark(pos, mark.clone())?;
    let change = ModificationAttrs {
        id: ctx.id,
        change_type: ChangeType::Mark,
        attr_name: name.to_string(),
        previous_value,
        new_value: mark.to_json()?,
    };
    record_modification(tr, pos, existing, change)
}

pub(super) fn track_remove_node_mark(
    tr: &mut Transform,
    pos: usize,
    mark: &Mark,
    ctx: &SuggestContext<'_>,
) -> Result<()> {
    if mark.is_suggestion() {
        tr.remove_node_mark(pos, mark.clone())?;
        return Ok(());
    }
    let (node, treatment) = target(tr.doc(), pos)?;
    match treatment {
        Treatment::Direct => {
            tr.remove_node_mark(pos, mark.clone())?;
            return Ok(());
        }
        Treatment::Skip => return Ok(()),
        Treatment::Tracked => {}
    }
    if !mark.is_in_set(node.marks()) {
        return Ok(());
    }
    let name = mark.type_name();
    let existing = existing_modification(&node, ChangeType::Mark, name);
    let previous_value = baseline(&node, &existing, name)?;
    tr.remove_node_mark(pos, mark.clone())?;
    let change = ModificationAttrs {
        id: ctx.id,
        change_type: ChangeType::Mark,
        attr_name: name.to_string(),
        previous_value,
        new_value: Value::Null,
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

    fn highlight() -> Mark {
        Mark::format("highlight")
    }

    #[test]
    fn adding_a_node_mark_records_its_absence() {
        let mut tr = Transform::new(doc(vec![p(vec![txt("x")])]));
        track_add_node_mark(&mut tr, 0, &highlight(), &context(2)).unwrap();
        let change = Mark::Modification(ModificationAttrs {
            id: SuggestionId(2),
            change_type: ChangeType::Mark,
            attr_name: "highlight".into(),
            previous_value: Value::Null,
            new_value: highlight().to_json().unwrap(),
        });
        assert_eq!(
            tr.doc(),
            &doc(vec![marked(p(vec![txt("x")]), vec![change, highlight()])])
        );
    }

    #[test]
    fn add_then_remove_leaves_no_trace() {
        let original = doc(vec![p(vec![txt("x")])]);
        let mut tr = Transform::new(original.clone());
        track_add_node_mark(&mut tr, 0, &highlight(), &context(2)).unwrap();
        track_remove_node_mark(&mut tr, 0, &highlight(), &context(2)).unwrap();
        assert_eq!(tr.doc(), &original);
    }

    #[test]
    fn inserted_nodes_take_marks_directly() {
        let d = doc(vec![marked(p(vec![txt("x")]), vec![ins(1)])]);
        let mut tr = Transform::new(d);
        track_add_node_mark(&mut tr, 0, &highlight(), &context(2)).unwrap();
        assert_eq!(
            tr.doc(),
            &doc(vec![marked(p(vec![txt("x")]), vec![ins(1), highlight()])])
        );
    }
}
