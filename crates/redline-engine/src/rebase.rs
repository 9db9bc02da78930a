use redline_model::{Assoc, Mapping};

/// Translate a position taken from one document version into another one
/// reached by a different step sequence from a common ancestor.
///
/// `back` maps the ancestor to the version `pos` belongs to; `forth` maps
/// the ancestor to the target version.
pub fn rebase_pos(pos: usize, back: &Mapping, forth: &Mapping, assoc: Assoc) -> usize {
    let base = back.invert().map(pos, assoc);
    forth.map(base, assoc)
}
