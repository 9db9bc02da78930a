//! Shared fixtures for unit tests.

use redline_model::builders::*;
use redline_model::{Mark, Node, SuggestionId};

use crate::options::EngineOptions;
use crate::suggest::SuggestContext;

pub const ZWSP: char = '\u{200B}';

static OPTIONS: EngineOptions = EngineOptions {
    boundary_marker: ZWSP,
    marker_scan_window: 4,
};

pub fn options() -> EngineOptions {
    OPTIONS.clone()
}

pub(crate) fn context(id: u64) -> SuggestContext<'static> {
    SuggestContext {
        id: SuggestionId(id),
        schema: schema(),
        options: &OPTIONS,
    }
}

pub fn ins(id: u64) -> Mark {
    Mark::insertion(SuggestionId(id))
}

pub fn del(id: u64) -> Mark {
    Mark::deletion(SuggestionId(id))
}

pub fn ins_marker(id: u64) -> Node {
    txt_marked(&ZWSP.to_string(), vec![ins(id)])
}

/// `left` and `right` in two paragraphs split by suggestion `id`.
pub fn split_doc_with(left: &str, right: &str, id: u64) -> Node {
    doc(vec![
        p(vec![txt(left), ins_marker(id)]),
        p(vec![ins_marker(id), txt(right)]),
    ])
}

pub fn split_doc(id: u64) -> Node {
    split_doc_with("A", "B", id)
}
