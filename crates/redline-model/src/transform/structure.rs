//! Structural helpers on [`Transform`]: split, join, wrap, lift and block
//! type changes. All of them emit `structure` steps, which fail rather than
//! overwrite content.

use super::{Step, Transform};
use crate::{Attrs, Fragment, ModelError, Node, Slice};

impl Transform {
    /// Join the blocks around `pos`, `depth` levels deep.
    pub fn join(&mut self, pos: usize, depth: usize) -> Result<&mut Self, ModelError> {
        if pos < depth {
            return Err(ModelError::PositionOutOfRange {
                pos,
                size: self.doc().content_size(),
            });
        }
        self.step(Step::Replace {
            from: pos - depth,
            to: pos + depth,
            slice: Slice::empty(),
            structure: true,
        })
    }

    /// Whether the blocks before and after `pos` can be joined.
    pub fn can_join(&self, pos: usize) -> bool {
        let Ok(rpos) = self.doc().resolve(pos) else {
            return false;
        };
        match (rpos.node_before(), rpos.node_after()) {
            (Some(a), Some(b)) => !a.is_leaf() && !b.is_leaf() && a.ty().compatible_content(b.ty()),
            _ => false,
        }
    }

    /// Split the ancestors of `pos`, `depth` levels deep.
    pub fn split(&mut self, pos: usize, depth: usize) -> Result<&mut Self, ModelError> {
        let rpos = self.doc().resolve(pos)?;
        if depth == 0 || depth > rpos.depth() {
            return Err(ModelError::StepFailed(format!(
                "Cannot split {depth} levels at {pos}"
            )));
        }
        let mut before = Fragment::empty();
        let mut after = Fragment::empty();
        for d in (rpos.depth() - depth + 1..=rpos.depth()).rev() {
            before = Fragment::from_node(rpos.node(d).copy(before));
            after = Fragment::from_node(rpos.node(d).copy(after));
        }
        self.step(Step::Replace {
            from: pos,
            to: pos,
            slice: Slice::new(before.append(&after), depth, depth),
            structure: true,
        })
    }

    /// Wrap the sibling blocks between `start` and `end` in `wrapper`
    /// (whose own content is ignored).
    pub fn wrap(&mut self, start: usize, end: usize, wrapper: &Node) -> Result<&mut Self, ModelError> {
        let shell = wrapper.copy(Fragment::empty());
        self.step(Step::ReplaceAround {
            from: start,
            to: end,
            gap_from: start,
            gap_to: end,
            slice: Slice::new(Fragment::from_node(shell), 0, 0),
            insert: 1,
            structure: true,
        })
    }

    /// Lift the sibling blocks between `gap_start` and `gap_end` out of
    /// their parent, splitting the parent when they do not cover it.
    pub fn lift(&mut self, gap_start: usize, gap_end: usize) -> Result<&mut Self, ModelError> {
        let rfrom = self.doc().resolve(gap_start)?;
        let rto = self.doc().resolve(gap_end)?;
        let depth = rfrom.depth();
        if depth == 0 || rto.depth() != depth || !rfrom.same_parent(&rto) {
            return Err(ModelError::StepFailed(format!(
                "Cannot lift {gap_start}..{gap_end}"
            )));
        }
        let mut start = gap_start;
        let mut end = gap_end;
        let mut before = Fragment::empty();
        let mut open_start = 0;
        if rfrom.index(depth) > 0 {
            before = Fragment::from_node(rfrom.node(depth).copy(Fragment::empty()));
            open_start = 1;
        } else {
            start -= 1;
        }
        let mut after = Fragment::empty();
        let mut open_end = 0;
        if gap_end < rto.end(depth) {
            after = Fragment::from_node(rto.node(depth).copy(Fragment::empty()));
            open_end = 1;
        } else {
            end += 1;
        }
        let insert = before.size() - open_start;
        self.step(Step::ReplaceAround {
            from: start,
            to: end,
            gap_from: gap_start,
            gap_to: gap_end,
            slice: Slice::new(before.append(&after), open_start, open_end),
            insert,
            structure: true,
        })
    }

    /// Change every textblock in `from..to` to the named type.
    pub fn set_block_type(
        &mut self,
        from: usize,
        to: usize,
        node_type: &str,
        schema: &crate::Schema,
        attrs: Attrs,
    ) -> Result<&mut Self, ModelError> {
        let target = schema.node_type(node_type)?;
        if !target.is_textblock() {
            return Err(ModelError::InvalidContent {
                node_type: node_type.to_string(),
                reason: "target is not a textblock".into(),
            });
        }
        let mut blocks = Vec::new();
        self.doc().nodes_between(from, to, |node, pos, _, _| {
            if node.is_textblock() {
                if node.ty() != &target || node.attrs() != &attrs {
                    blocks.push(pos);
                }
                return false;
            }
            true
        });
        let map_from = self.mapping().len();
        for pos in blocks {
            let pos = self.mapping().slice(map_from, usize::MAX).map(pos, super::Assoc::After);
            let size = self
                .doc()
                .node_at(pos)
                .ok_or(ModelError::NoNodeAt(pos))?
                .node_size();
            let shell = Node::new(target.clone(), attrs.clone(), Fragment::empty(), Vec::new())?;
            self.step(Step::ReplaceAround {
                from: pos,
                to: pos + size,
                gap_from: pos + 1,
                gap_to: pos + size - 1,
                slice: Slice::new(Fragment::from_node(shell), 0, 0),
                insert: 1,
                structure: true,
            })?;
        }
        Ok(self)
    }
}
