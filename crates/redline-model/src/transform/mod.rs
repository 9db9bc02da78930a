//! Steps, position maps and the [`Transform`] that accumulates them.

mod map;
mod step;
mod structure;

pub use map::{Assoc, MapResult, Mapping, StepMap};
pub use step::{AttrStep, Step};
pub(crate) use step::content_between;

use serde_json::Value;

use crate::{Fragment, Mark, ModelError, Node, Slice};

/// A document plus the steps applied to it so far.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    before: Node,
    doc: Node,
    steps: Vec<Step>,
    docs: Vec<Node>,
    mapping: Mapping,
}

impl Transform {
    pub fn new(doc: Node) -> Self {
        Self {
            before: doc.clone(),
            doc,
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::new(),
        }
    }

    /// The current document.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The document the transform started from.
    pub fn before(&self) -> &Node {
        &self.before
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The document before each step.
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn into_doc(self) -> Node {
        self.doc
    }

    /// Apply a step, failing without changing the transform.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, ModelError> {
        let doc = step.apply(&self.doc)?;
        self.add_step(step, doc);
        Ok(self)
    }

    fn add_step(&mut self, step: Step, doc: Node) {
        let previous = std::mem::replace(&mut self.doc, doc);
        self.docs.push(previous);
        self.mapping.append_map(step.get_map());
        self.steps.push(step);
    }

    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> Result<&mut Self, ModelError> {
        if from == to && slice.size() == 0 {
            return Ok(self);
        }
        self.step(Step::replace(from, to, slice))
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, ModelError> {
        self.replace(from, to, Slice::empty())
    }

    pub fn insert(&mut self, pos: usize, content: Fragment) -> Result<&mut Self, ModelError> {
        self.replace(pos, pos, Slice::new(content, 0, 0))
    }

    /// Add `mark` to the inline content in `from..to`. Marks the new mark
    /// pushes out are removed by explicit steps first so the transform
    /// stays invertible.
    pub fn add_mark(&mut self, from: usize, to: usize, mark: &Mark) -> Result<&mut Self, ModelError> {
        let mut removed: Vec<(usize, usize, Mark)> = Vec::new();
        let mut added: Vec<(usize, usize)> = Vec::new();
        self.doc.nodes_between(from, to, |node, pos, _, _| {
            if !node.is_inline() {
                return true;
            }
            if mark.is_in_set(node.marks()) {
                return false;
            }
            let start = pos.max(from);
            let end = (pos + node.node_size()).min(to);
            let new_set = mark.add_to_set(node.marks());
            for old in node.marks().iter().filter(|m| !m.is_in_set(&new_set)) {
                match removed.last_mut() {
                    Some(last) if last.1 == start && last.2 == *old => last.1 = end,
                    _ => removed.push((start, end, old.clone())),
                }
            }
            match added.last_mut() {
                Some(last) if last.1 == start => last.1 = end,
                _ => added.push((start, end)),
            }
            false
        });
        for (from, to, old) in removed {
            self.step(Step::RemoveMark { from, to, mark: old })?;
        }
        for (from, to) in added {
            self.step(Step::AddMark {
                from,
                to,
                mark: mark.clone(),
            })?;
        }
        Ok(self)
    }

    /// Remove marks from the inline content in `from..to`: exactly `mark`
    /// when given, every mark otherwise.
    pub fn remove_mark(
        &mut self,
        from: usize,
        to: usize,
        mark: Option<&Mark>,
    ) -> Result<&mut Self, ModelError> {
        self.remove_marks_where(from, to, |m| mark.is_none_or(|target| m == target))
    }

    /// Remove every mark of the named type from `from..to`.
    pub fn remove_mark_type(&mut self, from: usize, to: usize, name: &str) -> Result<&mut Self, ModelError> {
        self.remove_marks_where(from, to, |m| m.type_name() == name)
    }

    fn remove_marks_where(
        &mut self,
        from: usize,
        to: usize,
        pred: impl Fn(&Mark) -> bool,
    ) -> Result<&mut Self, ModelError> {
        struct Matched {
            mark: Mark,
            from: usize,
            to: usize,
            step: usize,
        }
        let mut matched: Vec<Matched> = Vec::new();
        let mut step = 0;
        self.doc.nodes_between(from, to, |node, pos, _, _| {
            if !node.is_inline() {
                return true;
            }
            step += 1;
            let end = (pos + node.node_size()).min(to);
            for mark in node.marks().iter().filter(|m| pred(m)) {
                match matched
                    .iter_mut()
                    .find(|m| m.step + 1 == step && m.mark == *mark)
                {
                    Some(found) => {
                        found.to = end;
                        found.step = step;
                    }
                    None => matched.push(Matched {
                        mark: mark.clone(),
                        from: pos.max(from),
                        to: end,
                        step,
                    }),
                }
            }
            false
        });
        for m in matched {
            self.step(Step::RemoveMark {
                from: m.from,
                to: m.to,
                mark: m.mark,
            })?;
        }
        Ok(self)
    }

    pub fn add_node_mark(&mut self, pos: usize, mark: Mark) -> Result<&mut Self, ModelError> {
        self.step(Step::AddNodeMark { pos, mark })
    }

    pub fn remove_node_mark(&mut self, pos: usize, mark: Mark) -> Result<&mut Self, ModelError> {
        self.step(Step::RemoveNodeMark { pos, mark })
    }

    /// Set an attribute on the node at `pos`; `Value::Null` removes it.
    pub fn set_node_attribute(
        &mut self,
        pos: usize,
        attr: &str,
        value: Value,
    ) -> Result<&mut Self, ModelError> {
        self.step(Step::SetAttribute(AttrStep {
            pos,
            attr: attr.to_string(),
            value,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::*;
    use crate::mark::SuggestionId;
    use pretty_assertions::assert_eq;

    #[test]
    fn failed_steps_leave_the_transform_untouched() {
        let mut tr = Transform::new(doc(vec![p(vec![txt("ab")])]));
        assert!(tr.delete(2, 40).is_err());
        assert!(!tr.doc_changed());
        assert!(tr.mapping().is_empty());
    }

    #[test]
    fn add_mark_removes_displaced_marks_explicitly() {
        let d = doc(vec![p(vec![txt_marked(
            "abc",
            vec![Mark::deletion(SuggestionId(1))],
        )])]);
        let mut tr = Transform::new(d.clone());
        tr.add_mark(1, 4, &Mark::insertion(SuggestionId(2))).unwrap();
        assert_eq!(tr.steps().len(), 2);
        assert_eq!(tr.steps()[0].kind(), "removeMark");

        let mut undo = Transform::new(tr.doc().clone());
        for (step, doc) in tr.steps().iter().zip(tr.docs()).rev() {
            undo.step(step.invert(doc).unwrap()).unwrap();
        }
        assert_eq!(undo.doc(), &d);
    }

    #[test]
    fn remove_mark_merges_adjacent_ranges() {
        let strong = Mark::format("strong");
        let d = doc(vec![p(vec![
            txt_marked("ab", vec![strong.clone()]),
            txt_marked("cd", vec![strong.clone(), Mark::format("em")]),
        ])]);
        let mut tr = Transform::new(d);
        tr.remove_mark(1, 5, Some(&strong)).unwrap();
        assert_eq!(tr.steps().len(), 1);
        assert_eq!(
            tr.doc(),
            &doc(vec![p(vec![txt("ab"), txt_marked("cd", vec![Mark::format("em")])])])
        );
    }

    #[test]
    fn mapping_tracks_replacements() {
        let mut tr = Transform::new(doc(vec![p(vec![txt("abc")])]));
        tr.insert(2, Fragment::from_node(txt("xy"))).unwrap();
        tr.delete(1, 2).unwrap();
        assert_eq!(tr.mapping().map(3, Assoc::After), 4);
        assert_eq!(tr.doc().text_content(), "xybc");
    }
}
