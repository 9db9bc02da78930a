use serde_json::Value;

use super::map::StepMap;
use crate::{Fragment, Mark, ModelError, Node, Slice};

/// Set (or with `Value::Null`, remove) one attribute of the node at `pos`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrStep {
    pub pos: usize,
    pub attr: String,
    pub value: Value,
}

/// One atomic edit of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Replace {
        from: usize,
        to: usize,
        slice: Slice,
        /// Fails instead of overwriting content; used by structural edits.
        structure: bool,
    },
    /// Replace `from..to` with `slice`, moving the content of
    /// `gap_from..gap_to` to `insert` inside the slice.
    ReplaceAround {
        from: usize,
        to: usize,
        gap_from: usize,
        gap_to: usize,
        slice: Slice,
        insert: usize,
        structure: bool,
    },
    SetAttribute(AttrStep),
    AddMark {
        from: usize,
        to: usize,
        mark: Mark,
    },
    RemoveMark {
        from: usize,
        to: usize,
        mark: Mark,
    },
    AddNodeMark {
        pos: usize,
        mark: Mark,
    },
    RemoveNodeMark {
        pos: usize,
        mark: Mark,
    },
}

impl Step {
    pub fn replace(from: usize, to: usize, slice: Slice) -> Step {
        Step::Replace {
            from,
            to,
            slice,
            structure: false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Step::Replace { .. } => "replace",
            Step::ReplaceAround { .. } => "replaceAround",
            Step::SetAttribute(_) => "attr",
            Step::AddMark { .. } => "addMark",
            Step::RemoveMark { .. } => "removeMark",
            Step::AddNodeMark { .. } => "addNodeMark",
            Step::RemoveNodeMark { .. } => "removeNodeMark",
        }
    }

    pub fn apply(&self, doc: &Node) -> Result<Node, ModelError> {
        match self {
            Step::Replace {
                from,
                to,
                slice,
                structure,
            } => {
                if from > to {
                    return Err(ModelError::StepFailed(format!(
                        "Replace range {from}..{to} is inverted"
                    )));
                }
                if *structure && content_between(doc, *from, *to)? {
                    return Err(ModelError::StepFailed(
                        "Structure replace would overwrite content".into(),
                    ));
                }
                doc.replace(*from, *to, slice)
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
                if !(from <= gap_from && gap_from <= gap_to && gap_to <= to) {
                    return Err(ModelError::StepFailed(format!(
                        "Gap {gap_from}..{gap_to} does not lie within {from}..{to}"
                    )));
                }
                if *insert > slice.size() {
                    return Err(ModelError::StepFailed(format!(
                        "Insert offset {insert} is past the end of a slice of size {}",
                        slice.size()
                    )));
                }
                if *structure
                    && (content_between(doc, *from, *gap_from)?
                        || content_between(doc, *gap_to, *to)?)
                {
                    return Err(ModelError::StepFailed(
                        "Structure gap-replace would overwrite content".into(),
                    ));
                }
                let gap = doc.slice(*gap_from, *gap_to)?;
                if gap.open_start > 0 || gap.open_end > 0 {
                    return Err(ModelError::StepFailed("Gap is not a flat range".into()));
                }
                let inserted = slice.insert_at(*insert, &gap.content)?;
                doc.replace(*from, *to, &inserted)
            }
            Step::SetAttribute(step) => doc.update_at(step.pos, |node| {
                let mut attrs = node.attrs().clone();
                if step.value.is_null() {
                    attrs.remove(&step.attr);
                } else {
                    attrs.insert(step.attr.clone(), step.value.clone());
                }
                Ok(node.with_attrs(attrs))
            }),
            Step::AddMark { from, to, mark } => {
                map_inline_range(doc, *from, *to, |node| mark.add_to_set(node.marks()))
            }
            Step::RemoveMark { from, to, mark } => {
                map_inline_range(doc, *from, *to, |node| mark.remove_from_set(node.marks()))
            }
            Step::AddNodeMark { pos, mark } => doc.update_at(*pos, |node| {
                if node.is_text() {
                    return Err(text_node_mark(*pos));
                }
                Ok(node.with_marks(mark.add_to_set(node.marks())))
            }),
            Step::RemoveNodeMark { pos, mark } => doc.update_at(*pos, |node| {
                Ok(node.with_marks(mark.remove_from_set(node.marks())))
            }),
        }
    }

    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, slice, .. } => {
                StepMap::new(&[(*from, to.saturating_sub(*from), slice.size())])
            }
            Step::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                slice,
                insert,
                ..
            } => StepMap::new(&[
                (*from, gap_from.saturating_sub(*from), *insert),
                (*gap_to, to.saturating_sub(*gap_to), slice.size().saturating_sub(*insert)),
            ]),
            _ => StepMap::empty(),
        }
    }

    /// The step that undoes this one, given the document it applies to.
    pub fn invert(&self, doc: &Node) -> Result<Step, ModelError> {
        Ok(match self {
            Step::Replace {
                from,
                to,
                slice,
                structure,
            } => Step::Replace {
                from: *from,
                to: from + slice.size(),
                slice: doc.slice(*from, *to)?,
                structure: *structure,
            },
            Step::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                slice,
                insert,
                structure,
            } => {
                let gap = gap_to - gap_from;
                Step::ReplaceAround {
                    from: *from,
                    to: from + slice.size() + gap,
                    gap_from: from + insert,
                    gap_to: from + insert + gap,
                    slice: doc
                        .slice(*from, *to)?
                        .remove_between(gap_from - from, gap_to - from)?,
                    insert: gap_from - from,
                    structure: *structure,
                }
            }
            Step::SetAttribute(step) => {
                let node = doc.node_at(step.pos).ok_or(ModelError::NoNodeAt(step.pos))?;
                Step::SetAttribute(AttrStep {
                    pos: step.pos,
                    attr: step.attr.clone(),
                    value: node.attr(&step.attr).cloned().unwrap_or(Value::Null),
                })
            }
            Step::AddMark { from, to, mark } => Step::RemoveMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
            Step::RemoveMark { from, to, mark } => Step::AddMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
            Step::AddNodeMark { pos, mark } => {
                let node = doc.node_at(*pos).ok_or(ModelError::NoNodeAt(*pos))?;
                let new_set = mark.add_to_set(node.marks());
                if new_set.len() == node.marks().len() {
                    let displaced = node.marks().iter().find(|m| !m.is_in_set(&new_set));
                    Step::AddNodeMark {
                        pos: *pos,
                        mark: displaced.unwrap_or(mark).clone(),
                    }
                } else {
                    Step::RemoveNodeMark {
                        pos: *pos,
                        mark: mark.clone(),
                    }
                }
            }
            Step::RemoveNodeMark { pos, mark } => {
                let node = doc.node_at(*pos).ok_or(ModelError::NoNodeAt(*pos))?;
                if mark.is_in_set(node.marks()) {
                    Step::AddNodeMark {
                        pos: *pos,
                        mark: mark.clone(),
                    }
                } else {
                    self.clone()
                }
            }
        })
    }
}

fn text_node_mark(pos: usize) -> ModelError {
    ModelError::StepFailed(format!("Cannot put a node mark on the text at {pos}"))
}

/// Rewrite the mark sets of the inline leaves in `from..to`.
fn map_inline_range(
    doc: &Node,
    from: usize,
    to: usize,
    f: impl Fn(&Node) -> Vec<Mark>,
) -> Result<Node, ModelError> {
    let old = doc.slice(from, to)?;
    let content = map_fragment(&old.content, &f);
    doc.replace(from, to, &Slice::new(content, old.open_start, old.open_end))
}

fn map_fragment(fragment: &Fragment, f: &impl Fn(&Node) -> Vec<Mark>) -> Fragment {
    let mapped = fragment
        .iter()
        .map(|child| {
            let child = if child.content_size() > 0 {
                child.copy(map_fragment(child.content(), f))
            } else {
                child.clone()
            };
            if child.is_inline() && child.is_leaf() {
                let marks = f(&child);
                child.with_marks(marks)
            } else {
                child
            }
        })
        .collect();
    Fragment::from_vec(mapped)
}

/// Whether replacing `from..to` would remove anything besides node tokens.
pub(crate) fn content_between(doc: &Node, from: usize, to: usize) -> Result<bool, ModelError> {
    let rfrom = doc.resolve(from)?;
    let mut dist = to.saturating_sub(from);
    let mut depth = rfrom.depth();
    while dist > 0 && depth > 0 && rfrom.index_after(depth) == rfrom.node(depth).child_count() {
        depth -= 1;
        dist -= 1;
    }
    if dist > 0 {
        let mut next = rfrom.node(depth).maybe_child(rfrom.index_after(depth));
        while dist > 0 {
            match next {
                Some(node) if !node.is_leaf() => next = node.first_child(),
                _ => return Ok(true),
            }
            dist -= 1;
        }
    }
    Ok(false)
}
