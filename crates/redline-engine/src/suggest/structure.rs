//! Structural changes (wrap, lift, block type changes) recorded as
//! boundary annotations that carry their own inverse.
//!
//! A `ReplaceAround` that only moves block tokens is applied as is, and the
//! nodes at its outer boundaries (and, when wrapper tokens were added on
//! both sides, its gap boundaries) receive structure marks. A step that
//! would also change inline content is recorded as a flat replace instead.

use redline_model::{
    Mark, ModelError, Node, Step, StructureAttrs, StructureRole, SuggestionId, Transform,
};

use super::{SuggestContext, track_replace};
use crate::error::{EngineError, Result};
use crate::{ids, query};

/// Stand-in for leaf nodes when comparing inline content.
const LEAF_TEXT: &str = "\u{FFFC}";

pub(super) fn track_replace_around(
    tr: &mut Transform,
    step: Step,
    ctx: &SuggestContext<'_>,
) -> Result<()> {
    let Step::ReplaceAround {
        from,
        to,
        gap_from,
        gap_to,
        ref slice,
        insert,
        ..
    } = step
    else {
        return Err(EngineError::InvalidOperation(ModelError::StepFailed(format!(
            "expected a replaceAround step, got {}",
            step.kind()
        ))));
    };
    let before = tr.doc().clone();
    let after = step.apply(&before)?;

    let gap_len = gap_to - gap_from;
    let tail = slice.size().saturating_sub(insert);
    let new_gap_from = from + insert;
    let new_gap_to = new_gap_from + gap_len;
    let new_to = new_gap_to + tail;

    let (a, b) = flatten(&before, &after, from, to, new_to)?;
    let b_after = b - to + new_to;
    let same_text = before.content().text_between(a, b, "", LEAF_TEXT)
        == after.content().text_between(a, b_after, "", LEAF_TEXT);
    let wraps_both = insert > 0 && tail > 0;
    let anchors = same_text
        .then(|| anchors(&after, from, new_to, new_gap_from, new_gap_to, wraps_both))
        .flatten();

    let Some(anchors) = anchors else {
        log::debug!("recording structural step {from}..{to} as a replace of {a}..{b}");
        let flat = after.slice(a, b_after)?;
        return track_replace(tr, a, b, &flat, false, ctx);
    };

    let inverse = before
        .slice(from, to)?
        .remove_between(gap_from - from, gap_to - from)?;
    let id = structure_id(&before, ctx.id);
    let record = StructureAttrs {
        id,
        role: StructureRole::From,
        range: (from, to),
        gap: (gap_from, gap_to),
        gap_from_offset: insert,
        gap_to_offset: tail,
        insert: gap_from - from,
        slice: inverse.to_json()?,
    };
    tr.step(step.clone())?;
    for (pos, role) in anchors {
        let mark = Mark::Structure(StructureAttrs {
            role,
            ..record.clone()
        });
        tr.add_node_mark(pos, mark)?;
    }
    log::debug!("structural step {from}..{to} recorded as suggestion {id}");
    Ok(())
}

/// Widen `from..to` (and its image `from..new_to` in `after`) until both
/// cover whole sibling nodes.
fn flatten(before: &Node, after: &Node, from: usize, to: usize, new_to: usize) -> Result<(usize, usize)> {
    let (mut a, mut b) = (from, to);
    loop {
        let old = before.slice(a, b)?;
        let new = after.slice(a, b - to + new_to)?;
        let open_start = old.open_start > 0 || new.open_start > 0;
        let open_end = old.open_end > 0 || new.open_end > 0;
        if !open_start && !open_end {
            return Ok((a, b));
        }
        // ancestors outside the changed range are the same in both versions
        if open_start {
            let rpos = before.resolve(a)?;
            if rpos.depth() == 0 {
                return Ok((a, b));
            }
            a = rpos.before(rpos.depth())?;
        }
        if open_end {
            let rpos = before.resolve(b)?;
            if rpos.depth() == 0 {
                return Ok((a, b));
            }
            b = rpos.after(rpos.depth())?;
        }
    }
}

fn usable_anchor(node: &Node) -> bool {
    !node.is_text()
        && !node.has_mark(|m| matches!(m, Mark::Insertion(_) | Mark::Deletion(_) | Mark::Modification(_)))
}

/// Nodes to annotate in the changed document, or `None` when the outer
/// boundaries have no usable node.
fn anchors(
    doc: &Node,
    from: usize,
    to: usize,
    gap_from: usize,
    gap_to: usize,
    wraps_both: bool,
) -> Option<Vec<(usize, StructureRole)>> {
    let first = doc.resolve(from).ok()?.node_after()?;
    let last = doc.resolve(to).ok()?.node_before()?;
    if !usable_anchor(&first) || !usable_anchor(&last) {
        return None;
    }
    let mut found = vec![
        (from, StructureRole::From),
        (to - last.node_size(), StructureRole::To),
    ];
    if wraps_both && gap_from < gap_to {
        let gap_first = doc.resolve(gap_from).ok().and_then(|r| r.node_after());
        let gap_last = doc.resolve(gap_to).ok().and_then(|r| r.node_before());
        if let (Some(gap_first), Some(gap_last)) = (gap_first, gap_last)
            && usable_anchor(&gap_first)
            && usable_anchor(&gap_last)
        {
            found.push((gap_from, StructureRole::GapFrom));
            found.push((gap_to - gap_last.node_size(), StructureRole::GapTo));
        }
    }
    Some(found)
}

/// The transaction's id, unless an earlier step of it already used that
/// id for a structural change.
fn structure_id(doc: &Node, candidate: SuggestionId) -> SuggestionId {
    let taken = query::find_suggestion(doc, candidate)
        .nodes
        .iter()
        .any(|n| matches!(n.mark, Mark::Structure(_)));
    if taken {
        ids::next_suggestion_id(doc)
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;
    use pretty_assertions::assert_eq;
    use redline_model::builders::*;
    use redline_model::{Fragment, Slice};

    fn roles(doc: &Node) -> Vec<StructureRole> {
        let mut roles = Vec::new();
        doc.descendants(|node, _, _, _| {
            for mark in node.marks() {
                if let Mark::Structure(attrs) = mark {
                    roles.push(attrs.role);
                }
            }
            true
        });
        roles
    }

    fn wrap_step() -> Step {
        Step::ReplaceAround {
            from: 0,
            to: 3,
            gap_from: 0,
            gap_to: 3,
            slice: Slice::new(Fragment::from_node(blockquote(vec![])), 0, 0),
            insert: 1,
            structure: true,
        }
    }

    #[test]
    fn wrapping_adds_four_boundaries() {
        let mut tr = Transform::new(doc(vec![p(vec![txt("a")])]));
        track_replace_around(&mut tr, wrap_step(), &context(1)).unwrap();
        assert_eq!(tr.doc().child(0).type_name(), "blockquote");
        let mut found = roles(tr.doc());
        found.sort_by_key(|r| *r as u8);
        assert_eq!(
            found,
            vec![
                StructureRole::From,
                StructureRole::GapFrom,
                StructureRole::GapTo,
                StructureRole::To
            ]
        );
    }

    #[test]
    fn unwrapping_adds_two_boundaries() {
        let d = doc(vec![blockquote(vec![p(vec![txt("a")])])]);
        let mut tr = Transform::new(d);
        let lift = Step::ReplaceAround {
            from: 0,
            to: 5,
            gap_from: 1,
            gap_to: 4,
            slice: Slice::empty(),
            insert: 0,
            structure: true,
        };
        track_replace_around(&mut tr, lift, &context(1)).unwrap();
        assert_eq!(roles(tr.doc()).len(), 2);
        assert_eq!(tr.doc().child(0).type_name(), "paragraph");
    }

    #[test]
    fn a_second_structural_step_gets_its_own_id() {
        let mut tr = Transform::new(doc(vec![p(vec![txt("a")]), p(vec![txt("b")])]));
        track_replace_around(&mut tr, wrap_step(), &context(1)).unwrap();
        let second = Step::ReplaceAround {
            from: 5,
            to: 8,
            gap_from: 5,
            gap_to: 8,
            slice: Slice::new(Fragment::from_node(blockquote(vec![])), 0, 0),
            insert: 1,
            structure: true,
        };
        track_replace_around(&mut tr, second, &context(1)).unwrap();
        assert_eq!(
            query::suggestion_ids(tr.doc()),
            vec![SuggestionId(1), SuggestionId(2)]
        );
    }
}
