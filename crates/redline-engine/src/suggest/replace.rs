//! Replace steps recorded as insertions and deletions.
//!
//! Old content stays in the document under a deletion mark and new content
//! is inserted after it under an insertion mark. Content that is itself an
//! unaccepted insertion is removed for real. Block boundaries created by
//! the new content get insertion markers, boundaries the edit removes get
//! deletion markers, so both can be undone or carried out later.

use serde_json::json;

use redline_model::{
    Assoc, DeletionAttrs, DeletionKind, Fragment, Mark, ModelError, ModificationAttrs, Node, Slice,
    Step, SuggestionId, Transform,
};

use super::SuggestContext;
use crate::error::{EngineError, Result};
use crate::join::{self, JoinCandidate, MarkerSide, Polarity};
use crate::query;
use crate::revert;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tracked {
    Inserted(SuggestionId),
    Deleted(SuggestionId),
}

impl Tracked {
    fn of(marks: &[Mark]) -> Option<Tracked> {
        query::insertion_id(marks)
            .map(Tracked::Inserted)
            .or_else(|| query::deletion_id(marks).map(Tracked::Deleted))
    }

    fn id(self) -> SuggestionId {
        match self {
            Tracked::Inserted(id) | Tracked::Deleted(id) => id,
        }
    }
}

/// Replace `from..to` with `slice` as a suggestion.
pub(crate) fn track_replace(
    tr: &mut Transform,
    from: usize,
    to: usize,
    slice: &Slice,
    structure: bool,
    ctx: &SuggestContext<'_>,
) -> Result<()> {
    Step::Replace {
        from,
        to,
        slice: slice.clone(),
        structure,
    }
    .apply(tr.doc())?;
    if slice.open_start != slice.open_end {
        return Err(EngineError::InvalidOperation(ModelError::Replace(format!(
            "cannot track a slice opened {} at the start and {} at the end",
            slice.open_start, slice.open_end
        ))));
    }
    if from == to && slice.size() == 0 {
        return Ok(());
    }

    let id = resolve_id(tr.doc(), from, to, ctx.id);
    log::debug!("replace {from}..{to} as suggestion {id}");

    let (mut from, mut to) = (from, to);
    if from < to && needs_join_pass(tr.doc(), from, to, ctx)? {
        let start = tr.mapping().len();
        let candidates = insertion_candidates(tr.doc(), from, to);
        join::join_blocks(tr, &candidates, Polarity::Insertion, Some((from, to)), ctx.options);
        let joined = tr.mapping().slice(start, usize::MAX);
        from = joined.map(from, Assoc::Before);
        to = joined.map(to, Assoc::After).max(from);
    }
    if from < to {
        (from, to) = unwrap_deleted_structure(tr, from, to, ctx)?;
    }

    let boundary = textblock_boundary(tr.doc(), from, to);
    let start = tr.mapping().len();
    mark_deleted(tr, from, to, id)?;

    if slice.size() > 0 {
        let at = tr.mapping().slice(start, usize::MAX).map(to, Assoc::After);
        tr.replace(at, at, slice.clone())?;
        mark_inserted(tr, at, at + slice.size(), id, ctx)?;
    }

    if let Some((left, right)) = boundary {
        let moved = tr.mapping().slice(start, usize::MAX);
        let left = moved.map(left, Assoc::Before);
        let right = moved.map(right, Assoc::Before);
        mark_removed_boundary(tr, left, right, id, ctx)?;
    }
    Ok(())
}

/// The id the edit belongs to: the insertion the whole range lies in, or
/// the transaction's own id.
fn resolve_id(doc: &Node, from: usize, to: usize, fresh: SuggestionId) -> SuggestionId {
    match enclosing(doc, from, to) {
        Some(Tracked::Inserted(id)) => id,
        _ => fresh,
    }
}

/// The one suggestion every piece of content in (or, for an empty range,
/// on both sides of) the range belongs to.
fn enclosing(doc: &Node, from: usize, to: usize) -> Option<Tracked> {
    if from == to {
        let rpos = doc.resolve(from).ok()?;
        let before = rpos
            .node_before()
            .filter(Node::is_inline)
            .and_then(|n| Tracked::of(n.marks()))?;
        let after = rpos
            .node_after()
            .filter(Node::is_inline)
            .and_then(|n| Tracked::of(n.marks()))?;
        return (before == after).then_some(before);
    }
    let mut found: Option<Tracked> = None;
    let mut uniform = true;
    doc.nodes_between(from, to, |node, pos, _, _| {
        if !uniform {
            return false;
        }
        let whole = pos >= from && pos + node.node_size() <= to;
        if node.is_inline() || whole {
            match Tracked::of(node.marks()) {
                Some(t) if found.is_none_or(|f| f == t) => found = Some(t),
                _ => uniform = false,
            }
        }
        !node.is_inline()
    });
    if uniform { found } else { None }
}

/// Undo the structural suggestions anchored on nodes lying wholly inside
/// `from..to`, so the nodes can be marked deleted. Returns the mapped range.
fn unwrap_deleted_structure(
    tr: &mut Transform,
    from: usize,
    to: usize,
    ctx: &SuggestContext<'_>,
) -> Result<(usize, usize)> {
    let mut ids: Vec<SuggestionId> = Vec::new();
    tr.doc().nodes_between(from, to, |node, pos, _, _| {
        if node.is_inline() {
            return false;
        }
        if pos >= from && pos + node.node_size() <= to {
            ids.extend(node.marks().iter().filter_map(|m| match m {
                Mark::Structure(a) => Some(a.id),
                _ => None,
            }));
        }
        true
    });
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok((from, to));
    }
    let start = tr.mapping().len();
    for id in ids {
        log::debug!("deleting content wrapped by suggestion {id}; undoing its structure first");
        revert::revert_structure(tr, id, ctx.schema)?;
    }
    let undone = tr.mapping().slice(start, usize::MAX);
    let from = undone.map(from, Assoc::Before);
    Ok((from, undone.map(to, Assoc::After).max(from)))
}

fn needs_join_pass(doc: &Node, from: usize, to: usize, ctx: &SuggestContext<'_>) -> Result<bool> {
    let rfrom = doc.resolve(from)?;
    let rto = doc.resolve(to)?;
    if !rfrom.same_parent(&rto) || !rfrom.parent().is_textblock() {
        return Ok(true);
    }
    let markers = join::find_markers(
        doc,
        from,
        to,
        Some(Polarity::Insertion),
        ctx.options.boundary_marker,
    );
    Ok(!markers.is_empty())
}

/// Inserted content inside `from..to`: clipped inline runs and whole nodes.
fn insertion_candidates(doc: &Node, from: usize, to: usize) -> Vec<JoinCandidate> {
    let mut candidates = Vec::new();
    doc.nodes_between(from, to, |node, pos, _, _| {
        let end = pos + node.node_size();
        if node.is_inline() {
            let (a, b) = (pos.max(from), end.min(to));
            if let Some(id) = query::insertion_id(node.marks())
                && a < b
            {
                candidates.push(JoinCandidate {
                    from: a,
                    to: b,
                    id,
                    whole_node: false,
                });
            }
            return false;
        }
        if pos >= from
            && end <= to
            && let Some(id) = query::insertion_id(node.marks())
        {
            candidates.push(JoinCandidate {
                from: pos,
                to: end,
                id,
                whole_node: true,
            });
            return false;
        }
        true
    });
    candidates
}

/// Content end of the textblock around `from` and content start of the
/// textblock around `to`, when those are different blocks.
fn textblock_boundary(doc: &Node, from: usize, to: usize) -> Option<(usize, usize)> {
    if from >= to {
        return None;
    }
    let rfrom = doc.resolve(from).ok()?;
    let rto = doc.resolve(to).ok()?;
    let left = rfrom.textblock_depth()?;
    let right = rto.textblock_depth()?;
    let (left_end, right_start) = (rfrom.end(left), rto.start(right));
    (rfrom.start(left) != right_start).then_some((left_end, right_start))
}

/// Put `from..to` under deletion: mark untracked content, drop inserted
/// content, leave already deleted content alone.
fn mark_deleted(tr: &mut Transform, from: usize, to: usize, id: SuggestionId) -> Result<()> {
    if from >= to {
        return Ok(());
    }
    let mut inline: Vec<(usize, usize)> = Vec::new();
    let mut nodes: Vec<(usize, Vec<ModificationAttrs>)> = Vec::new();
    let mut removals: Vec<(usize, usize, SuggestionId)> = Vec::new();
    tr.doc().nodes_between(from, to, |node, pos, _, _| {
        let end = pos + node.node_size();
        let marks = node.marks();
        if node.is_inline() {
            let (a, b) = (pos.max(from), end.min(to));
            if a >= b || query::deletion_id(marks).is_some() {
                return false;
            }
            match query::insertion_id(marks) {
                Some(owner) => removals.push((a, b, owner)),
                None => match inline.last_mut() {
                    Some(last) if last.1 == a => last.1 = b,
                    _ => inline.push((a, b)),
                },
            }
            return false;
        }
        if pos >= from && end <= to {
            if let Some(owner) = query::insertion_id(marks) {
                removals.push((pos, end, owner));
                return false;
            }
            if query::deletion_id(marks).is_none() {
                let changes = marks
                    .iter()
                    .filter_map(|m| match m {
                        Mark::Modification(change) => Some(change.clone()),
                        _ => None,
                    })
                    .collect();
                nodes.push((pos, changes));
            }
        }
        true
    });

    let deletion = Mark::deletion(id);
    for (a, b) in inline {
        tr.add_mark(a, b, &deletion)?;
    }
    // a deletion mark replaces pending modifications, so restore their baselines first
    for (pos, changes) in nodes {
        for change in &changes {
            revert::revert_modification(tr, pos, change)?;
        }
        tr.add_node_mark(pos, deletion.clone())?;
    }
    for (a, b, _) in query::outermost_ranges(removals).into_iter().rev() {
        tr.delete(a, b)?;
    }
    Ok(())
}

/// Put freshly inserted `from..to` under insertion and give every block
/// boundary it creates a pair of markers.
fn mark_inserted(
    tr: &mut Transform,
    from: usize,
    to: usize,
    id: SuggestionId,
    ctx: &SuggestContext<'_>,
) -> Result<()> {
    let insertion = Mark::insertion(id);
    tr.add_mark(from, to, &insertion)?;

    let mut whole: Vec<usize> = Vec::new();
    let mut edges: Vec<usize> = Vec::new();
    tr.doc().nodes_between(from, to, |node, pos, _, _| {
        if node.is_inline() {
            return false;
        }
        let end = pos + node.node_size();
        let opens = pos >= from;
        let closes = end <= to;
        if opens && closes {
            whole.push(pos);
            return false;
        }
        if node.is_textblock() {
            if closes {
                edges.push(end - 1);
            }
            if opens {
                edges.push(pos + 1);
            }
            return false;
        }
        true
    });
    for pos in whole {
        tr.add_node_mark(pos, insertion.clone())?;
    }
    edges.sort_unstable_by(|a, b| b.cmp(a));
    for pos in edges {
        tr.insert(pos, Fragment::from_node(ctx.marker(insertion.clone())))?;
    }
    Ok(())
}

fn boundary_mark(id: SuggestionId, side: MarkerSide) -> Mark {
    let side = match side {
        MarkerSide::Start => "start",
        MarkerSide::End => "end",
    };
    Mark::Deletion(DeletionAttrs {
        id,
        kind: Some(DeletionKind::Boundary),
        data: Some(json!({ "side": side })),
    })
}

/// Record that the boundary between the textblock ending at `left` and
/// the one starting at `right` is to be removed.
fn mark_removed_boundary(
    tr: &mut Transform,
    left: usize,
    right: usize,
    id: SuggestionId,
    ctx: &SuggestContext<'_>,
) -> Result<()> {
    if left >= right {
        return Ok(());
    }
    let existing = join::find_markers(
        tr.doc(),
        left.saturating_sub(1),
        right + 1,
        Some(Polarity::Deletion),
        ctx.options.boundary_marker,
    );
    let has_end = existing
        .iter()
        .any(|m| m.side == MarkerSide::End && m.pos + 1 == left);
    let has_start = existing
        .iter()
        .any(|m| m.side == MarkerSide::Start && m.pos == right);
    if has_end && has_start {
        return Ok(());
    }
    tr.insert(right, Fragment::from_node(ctx.marker(boundary_mark(id, MarkerSide::Start))))?;
    tr.insert(left, Fragment::from_node(ctx.marker(boundary_mark(id, MarkerSide::End))))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;
    use pretty_assertions::assert_eq;
    use redline_model::builders::*;

    fn text_slice(text: &str) -> Slice {
        Slice::new(Fragment::from_node(txt(text)), 0, 0)
    }

    #[test]
    fn typing_is_wrapped_in_an_insertion() {
        let mut tr = Transform::new(doc(vec![p(vec![txt("ab")])]));
        track_replace(&mut tr, 2, 2, &text_slice("x"), false, &context(1)).unwrap();
        assert_eq!(
            tr.doc(),
            &doc(vec![p(vec![txt("a"), txt_marked("x", vec![ins(1)]), txt("b")])])
        );
    }

    #[test]
    fn replacing_keeps_the_old_text_under_deletion() {
        let mut tr = Transform::new(doc(vec![p(vec![txt("abc")])]));
        track_replace(&mut tr, 2, 3, &text_slice("X"), false, &context(1)).unwrap();
        assert_eq!(
            tr.doc(),
            &doc(vec![p(vec![
                txt("a"),
                txt_marked("b", vec![del(1)]),
                txt_marked("X", vec![ins(1)]),
                txt("c"),
            ])])
        );
    }

    #[test]
    fn deleting_inserted_text_removes_it() {
        let d = doc(vec![p(vec![txt("a"), txt_marked("xyz", vec![ins(3)]), txt("b")])]);
        let mut tr = Transform::new(d);
        track_replace(&mut tr, 3, 4, &Slice::empty(), false, &context(4)).unwrap();
        assert_eq!(
            tr.doc(),
            &doc(vec![p(vec![txt("a"), txt_marked("xz", vec![ins(3)]), txt("b")])])
        );
    }

    #[test]
    fn typing_inside_an_insertion_reuses_its_id() {
        let d = doc(vec![p(vec![txt_marked("new", vec![ins(2)])])]);
        let mut tr = Transform::new(d);
        track_replace(&mut tr, 2, 2, &text_slice("e"), false, &context(3)).unwrap();
        assert_eq!(tr.doc(), &doc(vec![p(vec![txt_marked("neew", vec![ins(2)])])]));
    }

    #[test]
    fn typing_after_a_deletion_gets_a_fresh_id() {
        let d = doc(vec![p(vec![txt_marked("old", vec![del(5)]), txt(" tail")])]);
        let mut tr = Transform::new(d);
        track_replace(&mut tr, 4, 4, &text_slice("new"), false, &context(6)).unwrap();
        assert_eq!(
            tr.doc(),
            &doc(vec![p(vec![
                txt_marked("old", vec![del(5)]),
                txt_marked("new", vec![ins(6)]),
                txt(" tail"),
            ])])
        );
    }

    #[test]
    fn splitting_a_paragraph_adds_insertion_markers() {
        let mut tr = Transform::new(doc(vec![p(vec![txt("ab")])]));
        let split = Slice::new(Fragment::from_vec(vec![p(vec![]), p(vec![])]), 1, 1);
        track_replace(&mut tr, 2, 2, &split, false, &context(1)).unwrap();
        assert_eq!(tr.doc(), &split_doc_with("a", "b", 1));
    }

    #[test]
    fn joining_plain_paragraphs_leaves_deletion_markers() {
        let mut tr = Transform::new(doc(vec![p(vec![txt("a")]), p(vec![txt("b")])]));
        track_replace(&mut tr, 2, 4, &Slice::empty(), false, &context(1)).unwrap();
        assert_eq!(
            tr.doc(),
            &doc(vec![
                p(vec![txt("a"), boundary_marker(1, MarkerSide::End)]),
                p(vec![boundary_marker(1, MarkerSide::Start), txt("b")]),
            ])
        );
    }

    #[test]
    fn unbalanced_slices_are_rejected() {
        let mut tr = Transform::new(doc(vec![p(vec![txt("ab")]), p(vec![txt("cd")])]));
        let slice = Slice::new(Fragment::from_vec(vec![p(vec![txt("x")]), p(vec![])]), 1, 0);
        let err = track_replace(&mut tr, 2, 2, &slice, false, &context(1));
        assert!(err.is_err());
        assert!(!tr.doc_changed());
    }

    fn boundary_marker(id: u64, side: MarkerSide) -> Node {
        txt_marked(&ZWSP.to_string(), vec![boundary_mark(SuggestionId(id), side)])
    }
}
