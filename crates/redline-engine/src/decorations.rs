//! Rendering hints derived from the suggestion annotations of a document.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use redline_model::{ChangeType, Mark, Node, StructureRole, SuggestionId};

use crate::join::{self, MarkerSide, Polarity};
use crate::options::EngineOptions;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DecorationHint {
    Inserted {
        id: SuggestionId,
    },
    Deleted {
        id: SuggestionId,
    },
    Modified {
        id: SuggestionId,
        change_type: ChangeType,
        attr_name: String,
        previous_value: Value,
        new_value: Value,
    },
    NodeInserted {
        id: SuggestionId,
    },
    NodeDeleted {
        id: SuggestionId,
    },
    BoundaryMarker {
        id: SuggestionId,
        side: MarkerSide,
        deleted: bool,
    },
    StructureBoundary {
        id: SuggestionId,
        role: StructureRole,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoration {
    pub from: usize,
    pub to: usize,
    pub hint: DecorationHint,
}

fn node_hint(mark: &Mark) -> Option<DecorationHint> {
    Some(match mark {
        Mark::Insertion(a) => DecorationHint::NodeInserted { id: a.id },
        Mark::Deletion(a) => DecorationHint::NodeDeleted { id: a.id },
        Mark::Modification(a) => DecorationHint::Modified {
            id: a.id,
            change_type: a.change_type,
            attr_name: a.attr_name.clone(),
            previous_value: a.previous_value.clone(),
            new_value: a.new_value.clone(),
        },
        Mark::Structure(a) => DecorationHint::StructureBoundary {
            id: a.id,
            role: a.role,
        },
        Mark::Format(_) => return None,
    })
}

fn inline_hint(marks: &[Mark]) -> Option<DecorationHint> {
    marks.iter().find_map(|m| match m {
        Mark::Insertion(a) => Some(DecorationHint::Inserted { id: a.id }),
        Mark::Deletion(a) => Some(DecorationHint::Deleted { id: a.id }),
        _ => None,
    })
}

fn push_inline(out: &mut Vec<Decoration>, from: usize, to: usize, hint: &DecorationHint) {
    if from >= to {
        return;
    }
    match out.last_mut() {
        Some(last) if last.to == from && last.hint == *hint => last.to = to,
        _ => out.push(Decoration {
            from,
            to,
            hint: hint.clone(),
        }),
    }
}

/// Every decoration of `doc`, ordered by start position.
///
/// Boundary markers get their own decoration and are cut out of the
/// inserted or deleted ranges around them.
pub fn query_decorations(doc: &Node, options: &EngineOptions) -> Vec<Decoration> {
    let markers: HashMap<usize, Decoration> = join::find_markers(
        doc,
        0,
        doc.content_size(),
        None,
        options.boundary_marker,
    )
    .into_iter()
    .map(|m| {
        let hint = DecorationHint::BoundaryMarker {
            id: m.id,
            side: m.side,
            deleted: m.polarity == Polarity::Deletion,
        };
        (
            m.pos,
            Decoration {
                from: m.pos,
                to: m.pos + 1,
                hint,
            },
        )
    })
    .collect();

    let mut nodes: Vec<Decoration> = Vec::new();
    let mut inline: Vec<Decoration> = Vec::new();
    doc.descendants(|node, pos, _, _| {
        let end = pos + node.node_size();
        if !node.is_inline() {
            nodes.extend(node.marks().iter().filter_map(node_hint).map(|hint| Decoration {
                from: pos,
                to: end,
                hint,
            }));
            return true;
        }
        let Some(hint) = inline_hint(node.marks()) else {
            return false;
        };
        let mut start = pos;
        for at in pos..end {
            if markers.contains_key(&at) {
                push_inline(&mut inline, start, at, &hint);
                start = at + 1;
            }
        }
        push_inline(&mut inline, start, end, &hint);
        false
    });

    let mut all: Vec<Decoration> = nodes
        .into_iter()
        .chain(inline)
        .chain(markers.into_values())
        .collect();
    all.sort_by_key(|d| (d.from, std::cmp::Reverse(d.to)));
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;
    use pretty_assertions::assert_eq;
    use redline_model::builders::*;

    #[test]
    fn markers_are_cut_out_of_inserted_ranges() {
        let d = doc(vec![
            p(vec![txt("A"), txt_marked(&format!("xy{ZWSP}"), vec![ins(1)])]),
            p(vec![ins_marker(1), txt("B")]),
        ]);
        let found = query_decorations(&d, &options());
        assert_eq!(
            found,
            vec![
                Decoration {
                    from: 2,
                    to: 4,
                    hint: DecorationHint::Inserted { id: SuggestionId(1) }
                },
                Decoration {
                    from: 4,
                    to: 5,
                    hint: DecorationHint::BoundaryMarker {
                        id: SuggestionId(1),
                        side: MarkerSide::End,
                        deleted: false
                    }
                },
                Decoration {
                    from: 7,
                    to: 8,
                    hint: DecorationHint::BoundaryMarker {
                        id: SuggestionId(1),
                        side: MarkerSide::Start,
                        deleted: false
                    }
                },
            ]
        );
    }

    #[test]
    fn adjacent_runs_with_the_same_hint_merge() {
        let d = doc(vec![p(vec![
            txt_marked("ab", vec![del(3)]),
            txt_marked("cd", vec![del(3), Mark::format("em")]),
        ])]);
        let found = query_decorations(&d, &options());
        assert_eq!(found.len(), 1);
        assert_eq!((found[0].from, found[0].to), (1, 5));
    }

    #[test]
    fn hints_serialize_with_a_kind_tag() {
        let hint = DecorationHint::NodeDeleted { id: SuggestionId(2) };
        assert_eq!(
            serde_json::to_value(&hint).unwrap(),
            serde_json::json!({"kind": "nodeDeleted", "id": 2})
        );
    }
}
