use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::mark::SUGGESTION_MARKS;
use crate::{Attrs, Fragment, Mark, ModelError, Node};

/// What a node type may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    /// The node is a text node.
    Text,
    /// Inline content (text, inline leaves). Nodes with this content are textblocks.
    Inline,
    /// Block children.
    Block,
    /// A leaf with no content.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeType {
    name: String,
    content: ContentKind,
    inline: bool,
}

impl NodeType {
    pub fn new(name: &str, content: ContentKind, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            content,
            inline,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> ContentKind {
        self.content
    }

    pub fn is_text(&self) -> bool {
        self.content == ContentKind::Text
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    pub fn is_block(&self) -> bool {
        !self.inline
    }

    pub fn is_textblock(&self) -> bool {
        !self.inline && self.content == ContentKind::Inline
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.content, ContentKind::Empty | ContentKind::Text)
    }

    /// Whether content of `other` can be joined onto a node of this type.
    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self == other
            || (self.content == other.content
                && matches!(self.content, ContentKind::Inline | ContentKind::Block))
    }

    pub fn check_content(&self, content: &Fragment) -> Result<(), ModelError> {
        let invalid = |reason: &str| ModelError::InvalidContent {
            node_type: self.name.clone(),
            reason: reason.to_string(),
        };
        match self.content {
            ContentKind::Text | ContentKind::Empty if content.size() > 0 => {
                Err(invalid("leaf nodes cannot hold content"))
            }
            ContentKind::Inline if content.iter().any(|n| !n.is_inline()) => {
                Err(invalid("block node inside inline content"))
            }
            ContentKind::Block if content.iter().any(|n| n.is_inline()) => {
                Err(invalid("inline node inside block content"))
            }
            _ => Ok(()),
        }
    }
}

/// Registered node and mark types of a document.
#[derive(Debug, Clone)]
pub struct Schema {
    nodes: Vec<Arc<NodeType>>,
    marks: Vec<String>,
}

impl Schema {
    pub fn new(nodes: Vec<NodeType>, marks: Vec<String>) -> Self {
        let mut nodes: Vec<Arc<NodeType>> = nodes.into_iter().map(Arc::new).collect();
        if !nodes.iter().any(|n| n.is_text()) {
            nodes.push(Arc::new(NodeType::new("text", ContentKind::Text, true)));
        }
        Self { nodes, marks }
    }

    /// Paragraphs, headings, quotes, bullet lists, rules, images and breaks,
    /// the common formatting marks and the four suggestion marks.
    pub fn basic() -> Self {
        let nodes = vec![
            NodeType::new("doc", ContentKind::Block, false),
            NodeType::new("paragraph", ContentKind::Inline, false),
            NodeType::new("heading", ContentKind::Inline, false),
            NodeType::new("blockquote", ContentKind::Block, false),
            NodeType::new("bullet_list", ContentKind::Block, false),
            NodeType::new("list_item", ContentKind::Block, false),
            NodeType::new("horizontal_rule", ContentKind::Empty, false),
            NodeType::new("image", ContentKind::Empty, true),
            NodeType::new("hard_break", ContentKind::Empty, true),
            NodeType::new("text", ContentKind::Text, true),
        ];
        let mut marks: Vec<String> = SUGGESTION_MARKS.iter().map(|m| m.to_string()).collect();
        marks.extend(["strong", "em", "code", "link"].map(String::from));
        Self::new(nodes, marks)
    }

    pub fn node_type(&self, name: &str) -> Result<Arc<NodeType>, ModelError> {
        self.nodes
            .iter()
            .find(|n| n.name() == name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownNodeType(name.to_string()))
    }

    pub fn text_type(&self) -> Arc<NodeType> {
        self.nodes
            .iter()
            .find(|n| n.is_text())
            .cloned()
            .unwrap_or_else(|| Arc::new(NodeType::new("text", ContentKind::Text, true)))
    }

    pub fn has_mark(&self, name: &str) -> bool {
        self.marks.iter().any(|m| m == name)
    }

    pub fn mark_names(&self) -> &[String] {
        &self.marks
    }

    pub fn node(&self, name: &str, attrs: Attrs, content: Vec<Node>) -> Result<Node, ModelError> {
        Node::new(self.node_type(name)?, attrs, Fragment::from_vec(content), Vec::new())
    }

    pub fn text(&self, text: &str, marks: Vec<Mark>) -> Node {
        Node::new_text(self.text_type(), text, marks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_schema_registers_suggestion_marks() {
        let schema = Schema::basic();
        for name in SUGGESTION_MARKS {
            assert!(schema.has_mark(name), "missing {name}");
        }
        assert!(schema.node_type("paragraph").unwrap().is_textblock());
        assert!(schema.node_type("image").unwrap().is_leaf());
    }

    #[test]
    fn textblocks_reject_block_children() {
        let schema = Schema::basic();
        let para = schema.node("paragraph", Attrs::new(), vec![]).unwrap();
        let err = schema.node("paragraph", Attrs::new(), vec![para]).unwrap_err();
        assert!(matches!(err, ModelError::InvalidContent { .. }));
    }

    #[test]
    fn compatible_content_allows_joining_textblocks() {
        let schema = Schema::basic();
        let p = schema.node_type("paragraph").unwrap();
        let h = schema.node_type("heading").unwrap();
        let q = schema.node_type("blockquote").unwrap();
        assert!(p.compatible_content(&h));
        assert!(!p.compatible_content(&q));
    }
}
