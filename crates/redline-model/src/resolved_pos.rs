use crate::{ModelError, Node};

#[derive(Debug, Clone, Copy)]
struct PathEntry<'a> {
    node: &'a Node,
    index: usize,
    offset: usize,
}

/// A position resolved against one document, with its ancestor chain.
///
/// Depth 0 is the document itself. `ResolvedPos` borrows the document it
/// was resolved in, so it cannot outlive that version.
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pos: usize,
    path: Vec<PathEntry<'a>>,
    parent_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub fn resolve(doc: &'a Node, pos: usize) -> Result<Self, ModelError> {
        if pos > doc.content_size() {
            return Err(ModelError::PositionOutOfRange {
                pos,
                size: doc.content_size(),
            });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc;
        loop {
            let (index, offset) = node.content().find_index(parent_offset, -1)?;
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node,
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            node = node.child(index);
            if node.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
        }
        Ok(Self {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    pub fn doc(&self) -> &'a Node {
        self.path[0].node
    }

    pub fn node(&self, depth: usize) -> &'a Node {
        self.path[depth].node
    }

    pub fn parent(&self) -> &'a Node {
        self.node(self.depth())
    }

    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    pub fn index_after(&self, depth: usize) -> usize {
        let at_boundary = depth == self.depth() && self.text_offset() == 0;
        self.index(depth) + usize::from(!at_boundary)
    }

    /// Start of the content of the ancestor at `depth`.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].offset + 1
        }
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position directly before the ancestor at `depth` (`depth >= 1`).
    pub fn before(&self, depth: usize) -> Result<usize, ModelError> {
        if depth == 0 {
            return Err(ModelError::Replace(
                "There is no position before the top-level node".into(),
            ));
        }
        if depth == self.depth() + 1 {
            return Ok(self.pos);
        }
        Ok(self.path[depth - 1].offset)
    }

    /// Position directly after the ancestor at `depth` (`depth >= 1`).
    pub fn after(&self, depth: usize) -> Result<usize, ModelError> {
        if depth == 0 {
            return Err(ModelError::Replace(
                "There is no position after the top-level node".into(),
            ));
        }
        if depth == self.depth() + 1 {
            return Ok(self.pos);
        }
        Ok(self.path[depth - 1].offset + self.path[depth].node.node_size())
    }

    /// Offset into the text node the position points into, 0 otherwise.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.maybe_child(index)?;
        let offset = self.text_offset();
        Some(if offset > 0 {
            child.cut(offset, child.node_size())
        } else {
            child.clone()
        })
    }

    pub fn node_before(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let offset = self.text_offset();
        if offset > 0 {
            return Some(parent.child(index).cut(0, offset));
        }
        if index == 0 {
            None
        } else {
            parent.maybe_child(index - 1).cloned()
        }
    }

    /// Depth of the deepest ancestor that also contains `pos`.
    pub fn shared_depth(&self, pos: usize) -> usize {
        (1..=self.depth())
            .rev()
            .find(|&d| self.start(d) <= pos && self.end(d) >= pos)
            .unwrap_or(0)
    }

    pub fn same_parent(&self, other: &ResolvedPos<'_>) -> bool {
        self.pos - self.parent_offset == other.pos - other.parent_offset
    }

    /// Depth of the innermost textblock around the position, if any.
    pub fn textblock_depth(&self) -> Option<usize> {
        (1..=self.depth()).rev().find(|&d| self.node(d).is_textblock())
    }
}
