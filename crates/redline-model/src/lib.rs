//! Reference document model for redline.
//!
//! An immutable tree of [`Node`]s addressed by integer positions, with
//! invertible [`Step`]s, position [`Mapping`]s and a [`Transform`] builder.
//! Marks include the suggestion annotations the engine works with.

#[cfg(any(test, feature = "builders"))]
pub mod builders;
pub mod error;
pub mod fragment;
pub mod json;
pub mod mark;
pub mod node;
mod replace;
pub mod resolved_pos;
pub mod schema;
pub mod slice;
pub mod transform;

use std::collections::BTreeMap;

pub use error::ModelError;
pub use fragment::Fragment;
pub use mark::{
    ChangeType, DeletionAttrs, DeletionKind, FormatMark, InsertionAttrs, Mark, ModificationAttrs,
    StructureAttrs, StructureRole, SuggestionId,
};
pub use node::Node;
pub use resolved_pos::ResolvedPos;
pub use schema::{ContentKind, NodeType, Schema};
pub use slice::Slice;
pub use transform::{Assoc, AttrStep, MapResult, Mapping, Step, StepMap, Transform};

/// Node and mark attributes.
pub type Attrs = BTreeMap<String, serde_json::Value>;
