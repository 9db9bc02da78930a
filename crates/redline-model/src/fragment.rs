use crate::{ModelError, Node};

/// An ordered run of sibling nodes.
///
/// Fragments are kept normalised: adjacent text nodes with the same marks
/// are merged and empty text nodes are dropped, so structurally equal
/// documents compare equal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    nodes: Vec<Node>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_node(node: Node) -> Self {
        Self::from_vec(vec![node])
    }

    pub fn from_vec(nodes: Vec<Node>) -> Self {
        let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if node.is_text() && node.node_size() == 0 {
                continue;
            }
            if let Some(last) = out.last_mut()
                && last.is_text()
                && node.is_text()
                && last.same_markup(&node)
            {
                let joined = format!("{}{}", last.text().unwrap_or(""), node.text().unwrap_or(""));
                *last = last.with_text(&joined);
                continue;
            }
            out.push(node);
        }
        let size = out.iter().map(Node::node_size).sum();
        Self { nodes: out, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn child(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.size == 0 {
            return self.clone();
        }
        if self.size == 0 {
            return other.clone();
        }
        let mut nodes = self.nodes.clone();
        nodes.extend(other.nodes.iter().cloned());
        Fragment::from_vec(nodes)
    }

    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut nodes = self.nodes.clone();
        nodes[index] = node;
        Fragment::from_vec(nodes)
    }

    /// Cut out the sub-fragment between two offsets.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        let to = to.min(self.size);
        if from == 0 && to == self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        if to > from {
            let mut pos = 0;
            for child in &self.nodes {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let piece = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(from.saturating_sub(pos), (to - pos).min(child.node_size()))
                        } else {
                            child.cut(
                                from.saturating_sub(pos + 1),
                                (to.saturating_sub(pos + 1)).min(child.content_size()),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    result.push(piece);
                }
                pos = end;
            }
        }
        Fragment::from_vec(result)
    }

    /// Find the child index containing `pos` and the offset where that child
    /// starts. With `round > 0` a position on a child boundary rounds to
    /// the next child.
    pub fn find_index(&self, pos: usize, round: i8) -> Result<(usize, usize), ModelError> {
        if pos == 0 {
            return Ok((0, 0));
        }
        if pos == self.size {
            return Ok((self.nodes.len(), pos));
        }
        if pos > self.size {
            return Err(ModelError::PositionOutOfRange {
                pos,
                size: self.size,
            });
        }
        let mut cur = 0;
        for (i, child) in self.nodes.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos || round > 0 {
                    return Ok((i + 1, end));
                }
                return Ok((i, cur));
            }
            cur = end;
        }
        Err(ModelError::PositionOutOfRange {
            pos,
            size: self.size,
        })
    }

    pub(crate) fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize, &Node, usize) -> bool,
        node_start: usize,
        parent: &Node,
    ) {
        let mut pos = 0;
        for (i, child) in self.nodes.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, parent, i) && child.content_size() > 0 {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    to.saturating_sub(start).min(child.content_size()),
                    f,
                    node_start + start,
                    child,
                );
            }
            pos = end;
        }
    }

    /// Concatenated text of inline content between two offsets. Block
    /// boundaries emit `block_separator`; inline leaves emit `leaf_text`.
    pub fn text_between(&self, from: usize, to: usize, block_separator: &str, leaf_text: &str) -> String {
        let mut text = String::new();
        let mut separated = true;
        let mut pos = 0;
        for child in &self.nodes {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from {
                if child.is_text() {
                    let start = from.saturating_sub(pos);
                    let stop = (to - pos).min(child.node_size());
                    text.push_str(child.cut(start, stop).text().unwrap_or(""));
                    separated = false;
                } else if child.is_leaf() {
                    text.push_str(leaf_text);
                    separated = false;
                } else {
                    if !separated && child.is_block() {
                        text.push_str(block_separator);
                        separated = true;
                    }
                    let inner_from = from.saturating_sub(pos + 1);
                    let inner_to = to.saturating_sub(pos + 1).min(child.content_size());
                    let inner =
                        child
                            .content()
                            .text_between(inner_from, inner_to, block_separator, leaf_text);
                    if !inner.is_empty() {
                        text.push_str(&inner);
                        separated = false;
                    }
                }
            }
            pos = end;
        }
        text
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
