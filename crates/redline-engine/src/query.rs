//! Read-only lookups over suggestion annotations.

use std::collections::BTreeSet;

use redline_model::{Mark, Node, SuggestionId};

/// A maximal inline range carrying one suggestion mark.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineSpan {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

/// A suggestion mark attached to a whole node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAnnotation {
    pub pos: usize,
    pub size: usize,
    pub mark: Mark,
}

impl NodeAnnotation {
    pub fn end(&self) -> usize {
        self.pos + self.size
    }
}

/// Every annotation of one suggestion id, in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Suggestion {
    pub id: Option<SuggestionId>,
    pub inline: Vec<InlineSpan>,
    pub nodes: Vec<NodeAnnotation>,
}

impl Suggestion {
    pub fn is_empty(&self) -> bool {
        self.inline.is_empty() && self.nodes.is_empty()
    }
}

/// One inline node clipped to a range, with its marks.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub from: usize,
    pub to: usize,
    pub marks: Vec<Mark>,
}

pub fn find_suggestion(doc: &Node, id: SuggestionId) -> Suggestion {
    let mut found = Suggestion {
        id: Some(id),
        ..Suggestion::default()
    };
    doc.descendants(|node, pos, _, _| {
        for mark in node.marks().iter().filter(|m| m.suggestion_id() == Some(id)) {
            let inline = node.is_inline() && matches!(mark, Mark::Insertion(_) | Mark::Deletion(_));
            if inline {
                let to = pos + node.node_size();
                match found.inline.last_mut() {
                    Some(last) if last.to == pos && last.mark == *mark => last.to = to,
                    _ => found.inline.push(InlineSpan {
                        from: pos,
                        to,
                        mark: mark.clone(),
                    }),
                }
            } else {
                found.nodes.push(NodeAnnotation {
                    pos,
                    size: node.node_size(),
                    mark: mark.clone(),
                });
            }
        }
        true
    });
    found
}

/// Every suggestion id present in the document, ascending.
pub fn suggestion_ids(doc: &Node) -> Vec<SuggestionId> {
    let mut ids = BTreeSet::new();
    doc.descendants(|node, _, _, _| {
        ids.extend(node.marks().iter().filter_map(Mark::suggestion_id));
        true
    });
    ids.into_iter().collect()
}

/// Inline nodes overlapping `from..to`, clipped to the range.
pub fn inline_segments(doc: &Node, from: usize, to: usize) -> Vec<Segment> {
    let mut segments = Vec::new();
    doc.nodes_between(from, to, |node, pos, _, _| {
        if !node.is_inline() {
            return true;
        }
        let start = pos.max(from);
        let end = (pos + node.node_size()).min(to);
        if start < end {
            segments.push(Segment {
                from: start,
                to: end,
                marks: node.marks().to_vec(),
            });
        }
        false
    });
    segments
}

pub fn insertion_id(marks: &[Mark]) -> Option<SuggestionId> {
    marks.iter().find_map(|m| match m {
        Mark::Insertion(a) => Some(a.id),
        _ => None,
    })
}

pub fn deletion_id(marks: &[Mark]) -> Option<SuggestionId> {
    marks.iter().find_map(|m| match m {
        Mark::Deletion(a) => Some(a.id),
        _ => None,
    })
}

pub fn has_structure(marks: &[Mark]) -> bool {
    marks.iter().any(|m| matches!(m, Mark::Structure(_)))
}

/// Drop ranges lying inside another range of the list; the rest is sorted.
pub fn outermost_ranges(mut ranges: Vec<(usize, usize, SuggestionId)>) -> Vec<(usize, usize, SuggestionId)> {
    ranges.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    let mut out: Vec<(usize, usize, SuggestionId)> = Vec::new();
    for range in ranges {
        match out.last() {
            Some(last) if range.0 >= last.0 && range.1 <= last.1 => {}
            _ => out.push(range),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use redline_model::builders::*;

    #[test]
    fn spans_merge_across_differently_formatted_text() {
        let ins = Mark::insertion(SuggestionId(2));
        let d = doc(vec![p(vec![
            txt("a"),
            txt_marked("bc", vec![ins.clone()]),
            txt_marked("de", vec![ins.clone(), Mark::format("em")]),
        ])]);
        let found = find_suggestion(&d, SuggestionId(2));
        assert_eq!(
            found.inline,
            vec![InlineSpan {
                from: 2,
                to: 6,
                mark: ins
            }]
        );
        assert!(found.nodes.is_empty());
    }

    #[test]
    fn lists_ids_from_nodes_and_text() {
        let d = doc(vec![
            marked(p(vec![txt("x")]), vec![Mark::deletion(SuggestionId(4))]),
            p(vec![txt_marked("y", vec![Mark::insertion(SuggestionId(1))])]),
        ]);
        assert_eq!(suggestion_ids(&d), vec![SuggestionId(1), SuggestionId(4)]);
    }

    #[test]
    fn outermost_ranges_drop_nested_ones() {
        let id = SuggestionId(1);
        let ranges = outermost_ranges(vec![(4, 6, id), (0, 10, id), (12, 14, id)]);
        assert_eq!(ranges, vec![(0, 10, id), (12, 14, id)]);
    }
}
