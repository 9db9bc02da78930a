//! Boundary markers and the block joins they stand for.
//!
//! A boundary marker is the marker character, carrying an insertion or a
//! deletion mark, at the very start or end of a textblock. An end marker
//! and a start marker with the same id, separated only by block tokens,
//! record one block boundary the suggestion created (insertion) or wants
//! removed (deletion). Deleting such a pair joins the two blocks.

use serde::{Deserialize, Serialize};

use redline_model::{Assoc, Mark, Node, Slice, Step, SuggestionId, Transform};

use crate::options::EngineOptions;
use crate::query;

/// Which suggestion mark a marker must carry to take part in a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Insertion,
    Deletion,
}

impl Polarity {
    pub fn id_in(self, marks: &[Mark]) -> Option<SuggestionId> {
        match self {
            Polarity::Insertion => query::insertion_id(marks),
            Polarity::Deletion => query::deletion_id(marks),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerSide {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    /// Position of the marker character.
    pub pos: usize,
    pub id: SuggestionId,
    pub side: MarkerSide,
    pub polarity: Polarity,
    /// Depth of the textblock holding the marker.
    pub depth: usize,
}

/// A range to delete while joining: inline content, or a whole node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinCandidate {
    pub from: usize,
    pub to: usize,
    pub id: SuggestionId,
    pub whole_node: bool,
}

fn marker_polarity(marks: &[Mark], polarity: Option<Polarity>) -> Option<(SuggestionId, Polarity)> {
    let candidates = match polarity {
        Some(p) => vec![p],
        None => vec![Polarity::Insertion, Polarity::Deletion],
    };
    candidates
        .into_iter()
        .find_map(|p| p.id_in(marks).map(|id| (id, p)))
}

/// Markers whose character lies inside `from..to`.
pub fn find_markers(
    doc: &Node,
    from: usize,
    to: usize,
    polarity: Option<Polarity>,
    marker: char,
) -> Vec<Marker> {
    let mut found = Vec::new();
    let to = to.min(doc.content_size());
    if from >= to {
        return found;
    }
    doc.nodes_between(from, to, |node, pos, _, _| {
        if !node.is_textblock() {
            return !node.is_inline();
        }
        let depth = match doc.resolve(pos + 1) {
            Ok(rpos) => rpos.depth(),
            Err(_) => return false,
        };
        let start = pos + 1;
        let end = pos + node.node_size() - 1;
        if let Some(first) = node.first_child()
            && first.text().is_some_and(|t| t.starts_with(marker))
            && start >= from
            && start < to
            && let Some((id, polarity)) = marker_polarity(first.marks(), polarity)
        {
            found.push(Marker {
                pos: start,
                id,
                side: MarkerSide::Start,
                polarity,
                depth,
            });
        }
        if let Some(last) = node.last_child()
            && last.text().is_some_and(|t| t.ends_with(marker))
            && end > from
            && end <= to
            && let Some((id, polarity)) = marker_polarity(last.marks(), polarity)
        {
            found.push(Marker {
                pos: end - 1,
                id,
                side: MarkerSide::End,
                polarity,
                depth,
            });
        }
        false
    });
    found
}

/// Whether the character at `pos` is the marker character.
pub(crate) fn is_marker_char(doc: &Node, pos: usize, marker: char) -> bool {
    let Ok(rpos) = doc.resolve(pos) else {
        return false;
    };
    rpos.node_after()
        .and_then(|n| n.text().and_then(|t| t.chars().next()))
        == Some(marker)
}

/// Nothing but open and close tokens between `from` and `to`.
fn only_tokens_between(doc: &Node, from: usize, to: usize) -> bool {
    if from >= to || to > doc.content_size() {
        return false;
    }
    let mut clean = true;
    doc.nodes_between(from, to, |node, _, _, _| {
        if node.is_inline() || node.is_leaf() {
            clean = false;
        }
        clean
    });
    clean
}

/// Delete the candidate ranges, joining blocks across paired markers.
///
/// Markers inside inline candidates, plus markers of the same polarity
/// found within `marker_scan_window` of `window`, are paired; non-marker
/// candidate content is deleted first, then every pair is joined from the
/// end of the document backwards, then consumed markers and the markers of
/// the candidates are deleted. Positions that no longer resolve are
/// skipped. Returns whether any join happened.
pub fn join_blocks(
    tr: &mut Transform,
    candidates: &[JoinCandidate],
    polarity: Polarity,
    window: Option<(usize, usize)>,
    options: &EngineOptions,
) -> bool {
    let marker = options.boundary_marker;
    let doc = tr.doc();
    let size = doc.content_size();
    let in_node = |pos: usize| {
        candidates
            .iter()
            .any(|c| c.whole_node && pos >= c.from && pos < c.to)
    };

    let mut markers: Vec<Marker> = Vec::new();
    let mut owned: Vec<usize> = Vec::new();
    for c in candidates.iter().filter(|c| !c.whole_node) {
        for m in find_markers(doc, c.from, c.to, Some(polarity), marker) {
            if !in_node(m.pos) {
                owned.push(m.pos);
                markers.push(m);
            }
        }
    }
    if let Some((from, to)) = window {
        let from = from.saturating_sub(options.marker_scan_window);
        let to = (to + options.marker_scan_window).min(size);
        for m in find_markers(doc, from, to, Some(polarity), marker) {
            if !in_node(m.pos) {
                markers.push(m);
            }
        }
    }
    markers.sort_by_key(|m| (m.pos, m.side == MarkerSide::End));
    markers.dedup_by_key(|m| (m.pos, m.side));
    owned.sort_unstable();
    owned.dedup();

    // non-marker content first
    let mut pieces: Vec<(usize, usize, SuggestionId)> = Vec::new();
    for c in candidates {
        if c.whole_node {
            pieces.push((c.from, c.to, c.id));
            continue;
        }
        let mut start = c.from;
        for &m in owned.iter().filter(|&&m| m >= c.from && m < c.to) {
            if m > start {
                pieces.push((start, m, c.id));
            }
            start = m + 1;
        }
        if start < c.to {
            pieces.push((start, c.to, c.id));
        }
    }
    let mut pieces = query::outermost_ranges(pieces);
    pieces.reverse();
    let deletes_start = tr.mapping().len();
    for (from, to, _) in pieces {
        if let Err(err) = tr.delete(from, to) {
            log::debug!("skipping candidate {from}..{to}: {err}");
        }
    }
    let deleted = tr.mapping().slice(deletes_start, usize::MAX);
    for m in &mut markers {
        m.pos = deleted.map(m.pos, Assoc::After);
    }
    let owned: Vec<usize> = owned
        .into_iter()
        .map(|p| deleted.map(p, Assoc::After))
        .collect();

    // pair end markers with the nearest start marker of the same id
    let mut pairs: Vec<(Marker, Marker)> = Vec::new();
    let mut used: Vec<usize> = Vec::new();
    for end in markers.iter().filter(|m| m.side == MarkerSide::End) {
        let partner = markers
            .iter()
            .filter(|s| {
                s.side == MarkerSide::Start
                    && s.id == end.id
                    && s.pos > end.pos
                    && s.depth == end.depth
                    && !used.contains(&s.pos)
            })
            .min_by_key(|s| s.pos);
        let Some(start) = partner else { continue };
        let dist = start.pos - (end.pos + 1);
        if dist == 0 || dist % 2 != 0 || !only_tokens_between(tr.doc(), end.pos + 1, start.pos) {
            continue;
        }
        used.push(start.pos);
        pairs.push((*end, *start));
    }

    pairs.sort_by_key(|(end, _)| std::cmp::Reverse(end.pos));
    let joins_start = tr.mapping().len();
    let mut joined = false;
    let mut consumed: Vec<usize> = Vec::new();
    for (end, start) in pairs {
        let step = Step::Replace {
            from: end.pos + 1,
            to: start.pos,
            slice: Slice::empty(),
            structure: true,
        };
        match tr.step(step) {
            Ok(_) => {
                log::debug!(
                    "joined blocks at {} (suggestion {}, depth {})",
                    end.pos + 1,
                    end.id,
                    (start.pos - end.pos - 1) / 2
                );
                joined = true;
                consumed.push(end.pos);
                consumed.push(start.pos);
            }
            Err(err) => log::debug!("cannot join at {}: {err}", end.pos + 1),
        }
    }

    let joins = tr.mapping().slice(joins_start, usize::MAX);
    let mut doomed: Vec<usize> = consumed
        .into_iter()
        .chain(owned)
        .map(|p| joins.map(p, Assoc::After))
        .collect();
    doomed.sort_unstable_by(|a, b| b.cmp(a));
    doomed.dedup();
    for pos in doomed {
        if !is_marker_char(tr.doc(), pos, marker) {
            log::debug!("marker at {pos} no longer resolves");
            continue;
        }
        if let Err(err) = tr.delete(pos, pos + 1) {
            log::debug!("cannot delete marker at {pos}: {err}");
        }
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;
    use pretty_assertions::assert_eq;
    use redline_model::builders::*;

    #[test]
    fn finds_markers_on_both_edges() {
        let d = split_doc(1);
        let markers = find_markers(&d, 0, d.content_size(), None, ZWSP);
        assert_eq!(markers.len(), 2);
        assert_eq!((markers[0].pos, markers[0].side), (2, MarkerSide::End));
        assert_eq!((markers[1].pos, markers[1].side), (5, MarkerSide::Start));
        assert_eq!(markers[0].depth, 1);
    }

    #[test]
    fn joins_a_marker_pair_and_removes_the_markers() {
        let mut tr = Transform::new(split_doc(1));
        let id = redline_model::SuggestionId(1);
        let candidates = [
            JoinCandidate { from: 2, to: 3, id, whole_node: false },
            JoinCandidate { from: 5, to: 6, id, whole_node: false },
        ];
        let joined = join_blocks(&mut tr, &candidates, Polarity::Insertion, None, &options());
        assert!(joined);
        assert_eq!(tr.doc(), &doc(vec![p(vec![txt("AB")])]));
    }

    #[test]
    fn window_scan_picks_up_the_partner() {
        let mut tr = Transform::new(split_doc(1));
        let id = redline_model::SuggestionId(1);
        let candidates = [JoinCandidate { from: 5, to: 6, id, whole_node: false }];
        let joined = join_blocks(&mut tr, &candidates, Polarity::Insertion, Some((5, 6)), &options());
        assert!(joined);
        assert_eq!(tr.doc(), &doc(vec![p(vec![txt("AB")])]));
    }

    #[test]
    fn mismatched_ids_do_not_join() {
        let d = doc(vec![
            p(vec![txt("A"), ins_marker(1)]),
            p(vec![ins_marker(2), txt("B")]),
        ]);
        let mut tr = Transform::new(d);
        let joined = join_blocks(&mut tr, &[], Polarity::Insertion, Some((3, 5)), &options());
        assert!(!joined);
        assert!(!tr.doc_changed());
    }

    #[test]
    fn out_of_range_candidates_are_ignored() {
        let mut tr = Transform::new(split_doc(1));
        let id = redline_model::SuggestionId(1);
        let candidates = [JoinCandidate { from: 40, to: 44, id, whole_node: true }];
        assert!(!join_blocks(&mut tr, &candidates, Polarity::Insertion, None, &options()));
        assert!(!tr.doc_changed());
    }
}
