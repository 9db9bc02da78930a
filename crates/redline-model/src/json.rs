//! JSON shape of nodes, slices and steps.
//!
//! Documents use the familiar `{"type", "attrs", "content", "marks", "text"}`
//! layout. Deserialising needs a [`Schema`] to resolve node types, so the
//! serde structs here are plain mirrors converted through the schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Attrs, AttrStep, Fragment, Mark, ModelError, Node, Schema, Slice, Step};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeJson {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceJson {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub open_start: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub open_end: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stepType", rename_all = "camelCase")]
pub enum StepJson {
    Replace {
        from: usize,
        to: usize,
        #[serde(default)]
        slice: SliceJson,
        #[serde(default, skip_serializing_if = "is_false")]
        structure: bool,
    },
    #[serde(rename_all = "camelCase")]
    ReplaceAround {
        from: usize,
        to: usize,
        gap_from: usize,
        gap_to: usize,
        insert: usize,
        #[serde(default)]
        slice: SliceJson,
        #[serde(default, skip_serializing_if = "is_false")]
        structure: bool,
    },
    Attr {
        pos: usize,
        attr: String,
        #[serde(default)]
        value: Value,
    },
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

impl Node {
    pub fn to_node_json(&self) -> NodeJson {
        NodeJson {
            ty: self.type_name().to_string(),
            attrs: self.attrs().clone(),
            content: self.content().iter().map(Node::to_node_json).collect(),
            marks: self.marks().to_vec(),
            text: self.text().map(str::to_string),
        }
    }

    pub fn to_json(&self) -> Result<Value, ModelError> {
        Ok(serde_json::to_value(self.to_node_json())?)
    }
}

impl Slice {
    pub fn to_slice_json(&self) -> SliceJson {
        SliceJson {
            content: self.content.iter().map(Node::to_node_json).collect(),
            open_start: self.open_start,
            open_end: self.open_end,
        }
    }

    pub fn to_json(&self) -> Result<Value, ModelError> {
        Ok(serde_json::to_value(self.to_slice_json())?)
    }
}

impl Step {
    pub fn to_step_json(&self) -> StepJson {
        match self {
            Step::Replace {
                from,
                to,
                slice,
                structure,
            } => StepJson::Replace {
                from: *from,
                to: *to,
                slice: slice.to_slice_json(),
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
            } => StepJson::ReplaceAround {
                from: *from,
                to: *to,
                gap_from: *gap_from,
                gap_to: *gap_to,
                insert: *insert,
                slice: slice.to_slice_json(),
                structure: *structure,
            },
            Step::SetAttribute(step) => StepJson::Attr {
                pos: step.pos,
                attr: step.attr.clone(),
                value: step.value.clone(),
            },
            Step::AddMark { from, to, mark } => StepJson::AddMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
            Step::RemoveMark { from, to, mark } => StepJson::RemoveMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
            Step::AddNodeMark { pos, mark } => StepJson::AddNodeMark {
                pos: *pos,
                mark: mark.clone(),
            },
            Step::RemoveNodeMark { pos, mark } => StepJson::RemoveNodeMark {
                pos: *pos,
                mark: mark.clone(),
            },
        }
    }

    pub fn to_json(&self) -> Result<Value, ModelError> {
        Ok(serde_json::to_value(self.to_step_json())?)
    }
}

impl Schema {
    pub fn node_from_json(&self, value: &Value) -> Result<Node, ModelError> {
        let json: NodeJson = serde_json::from_value(value.clone())?;
        self.node_from_mirror(json)
    }

    pub fn node_from_mirror(&self, json: NodeJson) -> Result<Node, ModelError> {
        self.check_marks(&json.marks)?;
        let ty = self.node_type(&json.ty)?;
        if ty.is_text() {
            let text = json.text.ok_or_else(|| ModelError::InvalidContent {
                node_type: json.ty.clone(),
                reason: "text node without text".into(),
            })?;
            return Ok(Node::new_text(ty, &text, json.marks));
        }
        let content = json
            .content
            .into_iter()
            .map(|child| self.node_from_mirror(child))
            .collect::<Result<Vec<_>, _>>()?;
        Node::new(ty, json.attrs, Fragment::from_vec(content), json.marks)
    }

    pub fn slice_from_json(&self, value: &Value) -> Result<Slice, ModelError> {
        let json: SliceJson = serde_json::from_value(value.clone())?;
        self.slice_from_mirror(json)
    }

    pub fn slice_from_mirror(&self, json: SliceJson) -> Result<Slice, ModelError> {
        let content = json
            .content
            .into_iter()
            .map(|child| self.node_from_mirror(child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Slice::new(
            Fragment::from_vec(content),
            json.open_start,
            json.open_end,
        ))
    }

    pub fn step_from_json(&self, value: &Value) -> Result<Step, ModelError> {
        let json: StepJson = serde_json::from_value(value.clone())?;
        self.step_from_mirror(json)
    }

    pub fn step_from_mirror(&self, json: StepJson) -> Result<Step, ModelError> {
        Ok(match json {
            StepJson::Replace {
                from,
                to,
                slice,
                structure,
            } => Step::Replace {
                from,
                to,
                slice: self.slice_from_mirror(slice)?,
                structure,
            },
            StepJson::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                insert,
                slice,
                structure,
            } => Step::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                slice: self.slice_from_mirror(slice)?,
                insert,
                structure,
            },
            StepJson::Attr { pos, attr, value } => {
                Step::SetAttribute(AttrStep { pos, attr, value })
            }
            StepJson::AddMark { from, to, mark } => {
                self.check_marks(std::slice::from_ref(&mark))?;
                Step::AddMark { from, to, mark }
            }
            StepJson::RemoveMark { from, to, mark } => {
                self.check_marks(std::slice::from_ref(&mark))?;
                Step::RemoveMark { from, to, mark }
            }
            StepJson::AddNodeMark { pos, mark } => {
                self.check_marks(std::slice::from_ref(&mark))?;
                Step::AddNodeMark { pos, mark }
            }
            StepJson::RemoveNodeMark { pos, mark } => {
                self.check_marks(std::slice::from_ref(&mark))?;
                Step::RemoveNodeMark { pos, mark }
            }
        })
    }

    fn check_marks(&self, marks: &[Mark]) -> Result<(), ModelError> {
        match marks.iter().find(|m| !self.has_mark(m.type_name())) {
            Some(unknown) => Err(ModelError::UnknownMarkType(unknown.type_name().to_string())),
            None => Ok(()),
        }
    }
}
