use std::sync::Arc;

use serde_json::Value;

use crate::replace;
use crate::{Attrs, Fragment, Mark, ModelError, NodeType, ResolvedPos, Slice};

/// An immutable document node.
///
/// Positions inside a node count one token per text character, one token
/// for a leaf node, and an opening plus a closing token around the content
/// of every other node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    ty: Arc<NodeType>,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
    text_len: usize,
}

impl Node {
    pub fn new(
        ty: Arc<NodeType>,
        attrs: Attrs,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Result<Self, ModelError> {
        ty.check_content(&content)?;
        Ok(Self {
            ty,
            attrs,
            content,
            marks,
            text: None,
            text_len: 0,
        })
    }

    pub fn new_text(ty: Arc<NodeType>, text: &str, marks: Vec<Mark>) -> Self {
        Self {
            ty,
            attrs: Attrs::new(),
            content: Fragment::empty(),
            marks,
            text_len: text.chars().count(),
            text: Some(text.to_string()),
        }
    }

    pub fn ty(&self) -> &Arc<NodeType> {
        &self.ty
    }

    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_text(&self) -> bool {
        self.ty.is_text()
    }

    pub fn is_inline(&self) -> bool {
        self.ty.is_inline()
    }

    pub fn is_block(&self) -> bool {
        self.ty.is_block()
    }

    pub fn is_textblock(&self) -> bool {
        self.ty.is_textblock()
    }

    pub fn is_leaf(&self) -> bool {
        self.ty.is_leaf()
    }

    pub fn node_size(&self) -> usize {
        if self.is_text() {
            self.text_len
        } else if self.is_leaf() {
            1
        } else {
            self.content.size() + 2
        }
    }

    pub fn content_size(&self) -> usize {
        self.content.size()
    }

    pub fn child_count(&self) -> usize {
        self.content.child_count()
    }

    pub fn child(&self, index: usize) -> &Node {
        self.content.child(index)
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.content.maybe_child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last_child()
    }

    /// Same type, attributes and marks.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.ty == other.ty && self.attrs == other.attrs && self.marks == other.marks
    }

    /// A node with the same markup and different content.
    pub fn copy(&self, content: Fragment) -> Node {
        Node {
            ty: self.ty.clone(),
            attrs: self.attrs.clone(),
            content,
            marks: self.marks.clone(),
            text: self.text.clone(),
            text_len: self.text_len,
        }
    }

    pub fn with_marks(&self, marks: Vec<Mark>) -> Node {
        Node {
            marks,
            ..self.clone()
        }
    }

    pub fn with_attrs(&self, attrs: Attrs) -> Node {
        Node {
            attrs,
            ..self.clone()
        }
    }

    pub fn with_text(&self, text: &str) -> Node {
        Node {
            text: Some(text.to_string()),
            text_len: text.chars().count(),
            ..self.clone()
        }
    }

    pub fn has_mark(&self, pred: impl Fn(&Mark) -> bool) -> bool {
        self.marks.iter().any(pred)
    }

    /// Cut a text node by character offsets, or any other node by content
    /// offsets.
    pub fn cut(&self, from: usize, to: usize) -> Node {
        match &self.text {
            Some(text) => {
                if from == 0 && to >= self.text_len {
                    return self.clone();
                }
                let sliced: String = text.chars().skip(from).take(to.saturating_sub(from)).collect();
                self.with_text(&sliced)
            }
            None => {
                if from == 0 && to >= self.content.size() {
                    return self.clone();
                }
                self.copy(self.content.cut(from, to))
            }
        }
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos<'_>, ModelError> {
        ResolvedPos::resolve(self, pos)
    }

    /// The node directly after `pos`, or the text node containing it.
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut node = self;
        let mut pos = pos;
        loop {
            let (index, offset) = node.content.find_index(pos, -1).ok()?;
            let child = node.content.maybe_child(index)?;
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    pub fn slice(&self, from: usize, to: usize) -> Result<Slice, ModelError> {
        if from > to {
            return Err(ModelError::Replace(format!("Invalid slice range {from}..{to}")));
        }
        if from == to {
            return Ok(Slice::empty());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = rfrom.shared_depth(to);
        let start = rfrom.start(depth);
        let node = rfrom.node(depth);
        let content = node.content().cut(rfrom.pos() - start, rto.pos() - start);
        Ok(Slice::new(content, rfrom.depth() - depth, rto.depth() - depth))
    }

    /// Replace the range `from..to` with a slice, joining open nodes of the
    /// slice onto the nodes around the range.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, ModelError> {
        if from > to {
            return Err(ModelError::Replace(format!("Invalid replace range {from}..{to}")));
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        replace::replace(&rfrom, &rto, slice)
    }

    /// Call `f` for every node overlapping `from..to` with the node, its
    /// absolute position, its parent and its index. Returning `false` skips
    /// the node's children.
    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        mut f: impl FnMut(&Node, usize, &Node, usize) -> bool,
    ) {
        self.content.nodes_between(from, to, &mut f, 0, self);
    }

    pub fn descendants(&self, f: impl FnMut(&Node, usize, &Node, usize) -> bool) {
        self.nodes_between(0, self.content.size(), f);
    }

    pub fn text_content(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self.content.text_between(0, self.content.size(), "", ""),
        }
    }

    pub fn text_between(&self, from: usize, to: usize, block_separator: &str) -> String {
        self.content.text_between(from, to, block_separator, "")
    }

    /// Replace the node found at `pos` using `f`, rebuilding its ancestors.
    pub fn update_at(
        &self,
        pos: usize,
        f: impl FnOnce(&Node) -> Result<Node, ModelError>,
    ) -> Result<Node, ModelError> {
        let (index, offset) = self.content.find_index(pos, -1)?;
        let child = self
            .content
            .maybe_child(index)
            .ok_or(ModelError::NoNodeAt(pos))?;
        if offset == pos {
            if child.is_text() {
                return Err(ModelError::StepFailed(format!(
                    "Cannot update text at {pos} as a node"
                )));
            }
            let updated = f(child)?;
            return Ok(self.copy(self.content.replace_child(index, updated)));
        }
        if child.is_text() {
            return Err(ModelError::NoNodeAt(pos));
        }
        let updated = child.update_at(pos - offset - 1, f)?;
        Ok(self.copy(self.content.replace_child(index, updated)))
    }
}
