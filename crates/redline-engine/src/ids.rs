//! Suggestion id allocation.
//!
//! Ids are derived from the document alone: the next id is one past the
//! largest id any inline or node mark carries.

use redline_model::{Node, SuggestionId};

pub fn max_suggestion_id(doc: &Node) -> Option<SuggestionId> {
    let mut max = None;
    doc.descendants(|node, _, _, _| {
        for id in node.marks().iter().filter_map(|m| m.suggestion_id()) {
            if max.is_none_or(|current| id > current) {
                max = Some(id);
            }
        }
        true
    });
    max
}

pub fn next_suggestion_id(doc: &Node) -> SuggestionId {
    max_suggestion_id(doc).map_or(SuggestionId(1), SuggestionId::next)
}
