//! Inline formatting changes.
//!
//! Restyling text that is not part of a suggestion is recorded as a
//! replace of the text by its restyled copy, so the old styling survives
//! under a deletion mark. Inserted text is restyled in place and deleted
//! text is never restyled.

use redline_model::{Mark, ModelError, Step, Transform};

use super::{SuggestContext, track_replace};
use crate::error::Result;
use crate::query;

pub(super) fn track_add_mark(
    tr: &mut Transform,
    from: usize,
    to: usize,
    mark: &Mark,
    ctx: &SuggestContext<'_>,
) -> Result<()> {
    if mark.is_suggestion() {
        tr.step(Step::AddMark {
            from,
            to,
            mark: mark.clone(),
        })?;
        return Ok(());
    }
    restyle(
        tr,
        from,
        to,
        ctx,
        |marks| !mark.is_in_set(marks),
        |t, a, b| t.add_mark(a, b, mark).map(|_| ()),
    )
}

pub(super) fn track_remove_mark(
    tr: &mut Transform,
    from: usize,
    to: usize,
    mark: &Mark,
    ctx: &SuggestContext<'_>,
) -> Result<()> {
    if mark.is_suggestion() {
        tr.step(Step::RemoveMark {
            from,
            to,
            mark: mark.clone(),
        })?;
        return Ok(());
    }
    restyle(
        tr,
        from,
        to,
        ctx,
        |marks| mark.is_in_set(marks),
        |t, a, b| t.remove_mark(a, b, Some(mark)).map(|_| ()),
    )
}

fn restyle(
    tr: &mut Transform,
    from: usize,
    to: usize,
    ctx: &SuggestContext<'_>,
    changes: impl Fn(&[Mark]) -> bool,
    apply: impl Fn(&mut Transform, usize, usize) -> std::result::Result<(), ModelError>,
) -> Result<()> {
    tr.doc().resolve(from)?;
    tr.doc().resolve(to)?;

    let mut direct: Vec<(usize, usize)> = Vec::new();
    let mut tracked: Vec<(usize, usize)> = Vec::new();
    for segment in query::inline_segments(tr.doc(), from, to) {
        if query::deletion_id(&segment.marks).is_some() || !changes(&segment.marks) {
            continue;
        }
        let runs = if query::insertion_id(&segment.marks).is_some() {
            &mut direct
        } else {
            &mut tracked
        };
        match runs.last_mut() {
            Some(last) if last.1 == segment.from => last.1 = segment.to,
            _ => runs.push((segment.from, segment.to)),
        }
    }

    for (a, b) in direct {
        apply(tr, a, b)?;
    }
    // back to front, so earlier runs keep their positions
    for (a, b) in tracked.into_iter().rev() {
        let mut scratch = Transform::new(tr.doc().clone());
        apply(&mut scratch, a, b)?;
        let restyled = scratch.doc().slice(a, b)?;
        log::debug!("restyling {a}..{b} as a replace");
        track_replace(tr, a, b, &restyled, false, ctx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;
    use pretty_assertions::assert_eq;
    use redline_model::builders::*;

    #[test]
    fn bolding_plain_text_replaces_it() {
        let mut tr = Transform::new(doc(vec![p(vec![txt("first paragraph")])]));
        track_add_mark(&mut tr, 1, 6, &Mark::format("strong"), &context(1)).unwrap();
        assert_eq!(
            tr.doc(),
            &doc(vec![p(vec![
                txt_marked("first", vec![del(1)]),
                txt_marked("first", vec![ins(1), Mark::format("strong")]),
                txt(" paragraph"),
            ])])
        );
    }

    #[test]
    fn inserted_text_is_restyled_in_place() {
        let d = doc(vec![p(vec![txt_marked("new", vec![ins(2)])])]);
        let mut tr = Transform::new(d);
        track_add_mark(&mut tr, 1, 4, &Mark::format("em"), &context(3)).unwrap();
        assert_eq!(
            tr.doc(),
            &doc(vec![p(vec![txt_marked("new", vec![ins(2), Mark::format("em")])])])
        );
    }

    #[test]
    fn deleted_text_is_left_alone() {
        let d = doc(vec![p(vec![txt_marked("gone", vec![del(2)])])]);
        let mut tr = Transform::new(d.clone());
        track_add_mark(&mut tr, 1, 5, &Mark::format("em"), &context(3)).unwrap();
        assert_eq!(tr.doc(), &d);
    }

    #[test]
    fn removing_an_absent_mark_changes_nothing() {
        let d = doc(vec![p(vec![txt("plain")])]);
        let mut tr = Transform::new(d.clone());
        track_remove_mark(&mut tr, 1, 6, &Mark::format("strong"), &context(1)).unwrap();
        assert_eq!(tr.doc(), &d);
    }

    #[test]
    fn unbolding_keeps_the_bold_copy_under_deletion() {
        let strong = Mark::format("strong");
        let d = doc(vec![p(vec![txt_marked("loud", vec![strong.clone()])])]);
        let mut tr = Transform::new(d);
        track_remove_mark(&mut tr, 1, 5, &strong, &context(1)).unwrap();
        assert_eq!(
            tr.doc(),
            &doc(vec![p(vec![
                txt_marked("loud", vec![del(1), strong]),
                txt_marked("loud", vec![ins(1)]),
            ])])
        );
    }
}
