//! Rejecting (reverting) and accepting suggestions by id.
//!
//! Every annotation of the id is collected on the document as it is when
//! the id's turn comes. Steps that do not move positions run first; the
//! positional ones follow, each mapped through what came before it.

use std::collections::BTreeMap;

use redline_model::{
    Assoc, ChangeType, DeletionKind, Mark, ModificationAttrs, Schema, Step, StructureAttrs,
    StructureRole, SuggestionId, Transform,
};

use crate::error::Result;
use crate::join::{self, JoinCandidate, Polarity};
use crate::options::EngineOptions;
use crate::query::{self, NodeAnnotation, Suggestion};

fn is_boundary(mark: &Mark) -> bool {
    matches!(mark, Mark::Deletion(a) if a.kind == Some(DeletionKind::Boundary))
}

fn candidates(found: &Suggestion, polarity: Polarity) -> Vec<JoinCandidate> {
    let inline = found.inline.iter().filter_map(|span| {
        polarity.id_in(std::slice::from_ref(&span.mark)).map(|id| JoinCandidate {
            from: span.from,
            to: span.to,
            id,
            whole_node: false,
        })
    });
    let nodes = found.nodes.iter().filter_map(|node| {
        polarity.id_in(std::slice::from_ref(&node.mark)).map(|id| JoinCandidate {
            from: node.pos,
            to: node.end(),
            id,
            whole_node: true,
        })
    });
    inline.chain(nodes).collect()
}

/// Map candidates recorded `since` steps ago onto the current document.
fn map_candidates(tr: &Transform, since: usize, found: Vec<JoinCandidate>) -> Vec<JoinCandidate> {
    let mapping = tr.mapping().slice(since, usize::MAX);
    found
        .into_iter()
        .filter_map(|c| {
            let from = mapping.map(c.from, Assoc::After);
            let to = mapping.map(c.to, Assoc::Before);
            (from < to).then_some(JoinCandidate { from, to, ..c })
        })
        .collect()
}

pub(crate) fn revert_modification(tr: &mut Transform, pos: usize, change: &ModificationAttrs) -> Result<()> {
    tr.remove_node_mark(pos, Mark::Modification(change.clone()))?;
    match change.change_type {
        ChangeType::Attr => {
            tr.set_node_attribute(pos, &change.attr_name, change.previous_value.clone())?;
        }
        ChangeType::Mark => {
            if !change.new_value.is_null() {
                tr.remove_node_mark(pos, Mark::from_json(&change.new_value)?)?;
            }
            if !change.previous_value.is_null() {
                tr.add_node_mark(pos, Mark::from_json(&change.previous_value)?)?;
            }
        }
    }
    Ok(())
}

/// Boundary positions of one structural change, keyed by role.
#[derive(Default)]
struct StructureGroup {
    record: Option<StructureAttrs>,
    bounds: BTreeMap<u8, usize>,
}

fn role_key(role: StructureRole) -> u8 {
    role as u8
}

impl StructureGroup {
    fn inverse(&self, schema: &Schema) -> Result<Option<Step>> {
        let Some(record) = &self.record else {
            return Ok(None);
        };
        let bound = |role| self.bounds.get(&role_key(role)).copied();
        let (Some(from), Some(to)) = (bound(StructureRole::From), bound(StructureRole::To)) else {
            log::warn!(
                "structural suggestion {} lost an outer boundary; leaving its structure as is",
                record.id
            );
            return Ok(None);
        };
        let gap_from = bound(StructureRole::GapFrom).unwrap_or(from + record.gap_from_offset);
        let gap_to = bound(StructureRole::GapTo).unwrap_or(to.saturating_sub(record.gap_to_offset));
        Ok(Some(Step::ReplaceAround {
            from,
            to,
            gap_from,
            gap_to,
            slice: schema.slice_from_json(&record.slice)?,
            insert: record.insert,
            structure: true,
        }))
    }
}

/// Strip the Structure annotations among `nodes` and replay the inverse of
/// every structural change they record, back to front.
fn undo_structure(
    tr: &mut Transform,
    id: SuggestionId,
    nodes: &[NodeAnnotation],
    schema: &Schema,
) -> Result<()> {
    let mut groups: BTreeMap<((usize, usize), (usize, usize)), StructureGroup> = BTreeMap::new();
    for node in nodes {
        let Mark::Structure(record) = &node.mark else {
            continue;
        };
        let group = groups.entry((record.range, record.gap)).or_default();
        let bound = if record.role.anchors_before() {
            node.pos
        } else {
            node.end()
        };
        group.bounds.insert(role_key(record.role), bound);
        group.record.get_or_insert_with(|| record.clone());
        tr.remove_node_mark(node.pos, node.mark.clone())?;
    }

    let mut inverses: Vec<Step> = Vec::new();
    for group in groups.values() {
        if let Some(step) = group.inverse(schema)? {
            inverses.push(step);
        }
    }
    // the groups are ordered by their original range
    for step in inverses.into_iter().rev() {
        log::debug!("undoing structural change of suggestion {id}");
        tr.step(step)?;
    }
    Ok(())
}

/// Reject only the structural part of suggestion `id`.
pub(crate) fn revert_structure(tr: &mut Transform, id: SuggestionId, schema: &Schema) -> Result<()> {
    let found = query::find_suggestion(tr.doc(), id);
    undo_structure(tr, id, &found.nodes, schema)
}

/// Append the steps rejecting suggestion `id` to `tr`.
pub(crate) fn revert_into(
    tr: &mut Transform,
    id: SuggestionId,
    schema: &Schema,
    options: &EngineOptions,
) -> Result<()> {
    let found = query::find_suggestion(tr.doc(), id);
    if found.is_empty() {
        return Ok(());
    }
    let start = tr.mapping().len();

    let mut boundaries: Vec<(usize, usize, SuggestionId)> = Vec::new();
    for span in &found.inline {
        if is_boundary(&span.mark) {
            boundaries.push((span.from, span.to, id));
        } else if matches!(span.mark, Mark::Deletion(_)) {
            tr.remove_mark(span.from, span.to, Some(&span.mark))?;
        }
    }
    for node in &found.nodes {
        match &node.mark {
            Mark::Deletion(_) => {
                tr.remove_node_mark(node.pos, node.mark.clone())?;
            }
            Mark::Modification(change) => revert_modification(tr, node.pos, change)?,
            _ => {}
        }
    }
    undo_structure(tr, id, &found.nodes, schema)?;

    let inserted = map_candidates(tr, start, candidates(&found, Polarity::Insertion));
    join::join_blocks(tr, &inserted, Polarity::Insertion, None, options);

    let mapping = tr.mapping().slice(start, usize::MAX);
    let mut markers: Vec<(usize, usize, SuggestionId)> = boundaries
        .into_iter()
        .map(|(from, to, id)| {
            (
                mapping.map(from, Assoc::After),
                mapping.map(to, Assoc::Before),
                id,
            )
        })
        .filter(|(from, to, _)| from < to)
        .collect();
    markers = query::outermost_ranges(markers);
    for (from, to, _) in markers.into_iter().rev() {
        tr.delete(from, to)?;
    }
    Ok(())
}

/// Append the steps accepting suggestion `id` to `tr`.
pub(crate) fn accept_into(tr: &mut Transform, id: SuggestionId, options: &EngineOptions) -> Result<()> {
    let found = query::find_suggestion(tr.doc(), id);
    if found.is_empty() {
        return Ok(());
    }
    let start = tr.mapping().len();

    let mut markers: Vec<usize> = Vec::new();
    for span in &found.inline {
        if let Mark::Insertion(_) = span.mark {
            markers.extend(
                join::find_markers(
                    tr.doc(),
                    span.from,
                    span.to,
                    Some(Polarity::Insertion),
                    options.boundary_marker,
                )
                .into_iter()
                .filter(|m| m.id == id)
                .map(|m| m.pos),
            );
            tr.remove_mark(span.from, span.to, Some(&span.mark))?;
        }
    }
    for node in &found.nodes {
        if !matches!(node.mark, Mark::Deletion(_)) {
            tr.remove_node_mark(node.pos, node.mark.clone())?;
        }
    }

    let deleted = map_candidates(tr, start, candidates(&found, Polarity::Deletion));
    join::join_blocks(tr, &deleted, Polarity::Deletion, None, options);

    let mapping = tr.mapping().slice(start, usize::MAX);
    let mut markers: Vec<usize> = markers
        .into_iter()
        .map(|pos| mapping.map_result(pos, Assoc::After))
        .filter(|r| !r.deleted)
        .map(|r| r.pos)
        .collect();
    markers.sort_unstable_by(|a, b| b.cmp(a));
    markers.dedup();
    for pos in markers {
        if join::is_marker_char(tr.doc(), pos, options.boundary_marker) {
            tr.delete(pos, pos + 1)?;
        }
    }
    Ok(())
}
