use crate::{Fragment, ModelError};

/// A piece cut out of a document. `open_start`/`open_end` count the nodes
/// on each side that are open (cut through) rather than whole.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slice {
    pub content: Fragment,
    pub open_start: usize,
    pub open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
        Self {
            content,
            open_start,
            open_end,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of tokens the slice adds when inserted.
    pub fn size(&self) -> usize {
        self.content
            .size()
            .saturating_sub(self.open_start + self.open_end)
    }

    pub fn is_empty(&self) -> bool {
        self.content.size() == 0
    }

    /// Insert `fragment` at `pos` (relative to the slice's start).
    pub fn insert_at(&self, pos: usize, fragment: &Fragment) -> Result<Slice, ModelError> {
        let content = insert_into(&self.content, pos + self.open_start, fragment)?;
        Ok(Slice::new(content, self.open_start, self.open_end))
    }

    /// Remove the flat range `from..to` (relative to the slice's start).
    pub fn remove_between(&self, from: usize, to: usize) -> Result<Slice, ModelError> {
        let content = remove_range(&self.content, from + self.open_start, to + self.open_start)?;
        Ok(Slice::new(content, self.open_start, self.open_end))
    }
}

fn remove_range(content: &Fragment, from: usize, to: usize) -> Result<Fragment, ModelError> {
    let (index, offset) = content.find_index(from, -1)?;
    let (index_to, offset_to) = content.find_index(to, -1)?;
    let child = content.maybe_child(index);
    if offset == from || child.is_some_and(|c| c.is_text()) {
        if offset_to != to && content.maybe_child(index_to).is_some_and(|c| !c.is_text()) {
            return Err(ModelError::Replace("Removing non-flat range".into()));
        }
        return Ok(content
            .cut(0, from)
            .append(&content.cut(to, content.size())));
    }
    let Some(child) = child else {
        return Err(ModelError::Replace("Removing non-flat range".into()));
    };
    if index != index_to {
        return Err(ModelError::Replace("Removing non-flat range".into()));
    }
    let inner = remove_range(child.content(), from - offset - 1, to - offset - 1)?;
    Ok(content.replace_child(index, child.copy(inner)))
}

fn insert_into(content: &Fragment, dist: usize, insert: &Fragment) -> Result<Fragment, ModelError> {
    let (index, offset) = content.find_index(dist, -1)?;
    match content.maybe_child(index) {
        Some(child) if offset != dist && !child.is_text() => {
            let inner = insert_into(child.content(), dist - offset - 1, insert)?;
            Ok(content.replace_child(index, child.copy(inner)))
        }
        _ => Ok(content
            .cut(0, dist)
            .append(insert)
            .append(&content.cut(dist, content.size()))),
    }
}
