//! Per-step transformers of suggest mode.
//!
//! Every input step is rebased onto the output transform and handed to the
//! transformer for its kind, which appends the suggestion-annotated steps.

mod attrs;
mod marks;
mod node_marks;
mod replace;
mod structure;

use redline_model::{Assoc, AttrStep, Mapping, Mark, Node, Schema, Step, SuggestionId, Transform};

use crate::error::Result;
use crate::options::EngineOptions;
use crate::rebase::rebase_pos;

pub(crate) use replace::track_replace;

/// What every transformer needs besides the transform itself.
pub(crate) struct SuggestContext<'a> {
    /// Id for content that does not continue an existing suggestion.
    pub id: SuggestionId,
    pub schema: &'a Schema,
    pub options: &'a EngineOptions,
}

impl SuggestContext<'_> {
    /// A boundary marker character carrying `mark`.
    pub fn marker(&self, mark: Mark) -> Node {
        self.schema
            .text(&self.options.boundary_marker.to_string(), vec![mark])
    }
}

/// Rebase `step` (which applied to the input document reached through
/// `back`) onto `tr` and record it as a suggestion.
pub(crate) fn transform_step(
    tr: &mut Transform,
    step: &Step,
    back: &Mapping,
    ctx: &SuggestContext<'_>,
) -> Result<()> {
    let forth = tr.mapping().clone();
    let map = |pos: usize, assoc: Assoc| rebase_pos(pos, back, &forth, assoc);
    let range = |from: usize, to: usize| {
        let from = map(from, Assoc::After);
        (from, map(to, Assoc::Before).max(from))
    };

    match step {
        Step::Replace {
            from,
            to,
            slice,
            structure,
        } => {
            let (from, to) = range(*from, *to);
            track_replace(tr, from, to, slice, *structure, ctx)
        }
        Step::ReplaceAround {
            from,
            to,
            gap_from,
            gap_to,
            slice,
            insert,
            structure,
        } => {
            let (from, to) = range(*from, *to);
            let (gap_from, gap_to) = range(*gap_from, *gap_to);
            let rebased = Step::ReplaceAround {
                from,
                to,
                gap_from: gap_from.max(from),
                gap_to: gap_to.min(to),
                slice: slice.clone(),
                insert: *insert,
                structure: *structure,
            };
            structure::track_replace_around(tr, rebased, ctx)
        }
        Step::SetAttribute(AttrStep { pos, attr, value }) => {
            attrs::track_attribute(tr, map(*pos, Assoc::After), attr, value.clone(), ctx)
        }
        Step::AddMark { from, to, mark } => {
            let (from, to) = range(*from, *to);
            marks::track_add_mark(tr, from, to, mark, ctx)
        }
        Step::RemoveMark { from, to, mark } => {
            let (from, to) = range(*from, *to);
            marks::track_remove_mark(tr, from, to, mark, ctx)
        }
        Step::AddNodeMark { pos, mark } => {
            node_marks::track_add_node_mark(tr, map(*pos, Assoc::After), mark, ctx)
        }
        Step::RemoveNodeMark { pos, mark } => {
            node_marks::track_remove_node_mark(tr, map(*pos, Assoc::After), mark, ctx)
        }
    }
}
