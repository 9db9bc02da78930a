//! Suggest-mode change tracking over a [`redline_model`] document.
//!
//! [`SuggestionEngine::transform_transaction`] turns the steps of a
//! transaction into steps that record every change as a suggestion instead
//! of carrying it out: inserted content is marked, deleted content stays in
//! place under a deletion mark, attribute and node mark changes remember
//! their previous value, and structural changes remember their inverse.
//! Suggestions are later rejected with [`SuggestionEngine::revert_suggestion`]
//! or accepted with [`SuggestionEngine::apply_suggestion`].
//!
//! ```rust
//! # use redline_engine::{EngineOptions, SuggestionEngine};
//! # use redline_model::{Fragment, Schema, Transform};
//! let schema = Schema::basic();
//! let engine = SuggestionEngine::new(&schema, EngineOptions::default()).unwrap();
//!
//! let doc = schema
//!     .node("doc", Default::default(), vec![schema
//!         .node("paragraph", Default::default(), vec![schema.text("ab", vec![])])
//!         .unwrap()])
//!     .unwrap();
//! let mut edit = Transform::new(doc.clone());
//! edit.insert(2, Fragment::from_node(schema.text("x", vec![]))).unwrap();
//!
//! let tracked = engine.transform_transaction(&edit);
//! let ids = engine.suggestion_ids(tracked.transform.doc());
//! assert_eq!(ids.len(), 1);
//!
//! let rejected = engine.revert_suggestion(tracked.transform.doc(), ids[0]).unwrap();
//! assert_eq!(rejected.doc(), &doc);
//! ```

pub mod decorations;
pub mod error;
pub mod ids;
pub mod join;
pub mod options;
pub mod query;
pub mod rebase;
mod revert;
mod suggest;

#[cfg(test)]
pub mod tests;

use serde::Serialize;

use redline_model::mark::SUGGESTION_MARKS;
use redline_model::{Node, Schema, SuggestionId, Transform};

pub use decorations::{Decoration, DecorationHint, query_decorations};
pub use error::{EngineError, Result};
pub use options::EngineOptions;

use suggest::SuggestContext;

/// How one input step fared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum StepOutcome {
    Handled,
    /// The step could not be recorded and was left out of the output.
    NotHandled { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub kind: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// The suggestion-recording counterpart of an input transaction.
#[derive(Debug, Clone)]
pub struct TrackedTransaction {
    /// Starts from the input's original document.
    pub transform: Transform,
    pub report: Vec<StepReport>,
}

impl TrackedTransaction {
    pub fn all_handled(&self) -> bool {
        self.report
            .iter()
            .all(|r| r.outcome == StepOutcome::Handled)
    }
}

#[derive(Debug, Clone)]
pub struct SuggestionEngine {
    schema: Schema,
    options: EngineOptions,
}

impl SuggestionEngine {
    /// Fails when `schema` lacks one of the suggestion mark types.
    pub fn new(schema: &Schema, options: EngineOptions) -> Result<Self> {
        if let Some(missing) = SUGGESTION_MARKS.iter().find(|name| !schema.has_mark(name)) {
            return Err(EngineError::SchemaMissingAnnotation(missing.to_string()));
        }
        Ok(Self {
            schema: schema.clone(),
            options,
        })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Record the steps of `input` as suggestions.
    ///
    /// Steps are processed in order. A step that cannot be recorded leaves
    /// the output as it was before it and is reported as not handled.
    pub fn transform_transaction(&self, input: &Transform) -> TrackedTransaction {
        let ctx = SuggestContext {
            id: ids::next_suggestion_id(input.before()),
            schema: &self.schema,
            options: &self.options,
        };
        let mut tr = Transform::new(input.before().clone());
        let mut report = Vec::with_capacity(input.steps().len());
        for (index, step) in input.steps().iter().enumerate() {
            let back = input.mapping().slice(0, index);
            let checkpoint = tr.clone();
            let outcome = match suggest::transform_step(&mut tr, step, &back, &ctx) {
                Ok(()) => StepOutcome::Handled,
                Err(err) => {
                    log::warn!("step {index} ({}) was not recorded: {err}", step.kind());
                    tr = checkpoint;
                    StepOutcome::NotHandled {
                        reason: err.to_string(),
                    }
                }
            };
            report.push(StepReport {
                index,
                kind: step.kind().to_string(),
                outcome,
            });
        }
        TrackedTransaction {
            transform: tr,
            report,
        }
    }

    /// Steps rejecting suggestion `id` in `doc`.
    pub fn revert_suggestion(&self, doc: &Node, id: SuggestionId) -> Result<Transform> {
        let mut tr = Transform::new(doc.clone());
        revert::revert_into(&mut tr, id, &self.schema, &self.options)?;
        Ok(tr)
    }

    /// Steps accepting suggestion `id` in `doc`.
    pub fn apply_suggestion(&self, doc: &Node, id: SuggestionId) -> Result<Transform> {
        let mut tr = Transform::new(doc.clone());
        revert::accept_into(&mut tr, id, &self.options)?;
        Ok(tr)
    }

    /// Reject every suggestion, newest first.
    pub fn revert_all(&self, doc: &Node) -> Result<Transform> {
        let mut tr = Transform::new(doc.clone());
        for id in query::suggestion_ids(doc).into_iter().rev() {
            revert::revert_into(&mut tr, id, &self.schema, &self.options)?;
        }
        Ok(tr)
    }

    /// Accept every suggestion, newest first.
    pub fn apply_all(&self, doc: &Node) -> Result<Transform> {
        let mut tr = Transform::new(doc.clone());
        for id in query::suggestion_ids(doc).into_iter().rev() {
            revert::accept_into(&mut tr, id, &self.options)?;
        }
        Ok(tr)
    }

    pub fn query_decorations(&self, doc: &Node) -> Vec<Decoration> {
        decorations::query_decorations(doc, &self.options)
    }

    pub fn suggestion_ids(&self, doc: &Node) -> Vec<SuggestionId> {
        query::suggestion_ids(doc)
    }
}
