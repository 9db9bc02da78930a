//! The replace algorithm: splice a slice into a document, joining the open
//! nodes at the slice's edges onto the nodes around the replaced range.

use crate::{Fragment, ModelError, Node, ResolvedPos, Slice};

pub(crate) fn replace(
    from: &ResolvedPos<'_>,
    to: &ResolvedPos<'_>,
    slice: &Slice,
) -> Result<Node, ModelError> {
    if slice.open_start > from.depth() {
        return Err(ModelError::Replace(
            "Inserted content deeper than insertion position".into(),
        ));
    }
    if from.depth() - slice.open_start != to.depth().wrapping_sub(slice.open_end) {
        return Err(ModelError::Replace("Inconsistent open depths".into()));
    }
    replace_outer(from, to, slice, 0)
}

fn replace_outer(
    from: &ResolvedPos<'_>,
    to: &ResolvedPos<'_>,
    slice: &Slice,
    depth: usize,
) -> Result<Node, ModelError> {
    let index = from.index(depth);
    let node = from.node(depth);
    if index == to.index(depth) && depth < from.depth() - slice.open_start {
        let inner = replace_outer(from, to, slice, depth + 1)?;
        return Ok(node.copy(node.content().replace_child(index, inner)));
    }
    if slice.content.size() == 0 {
        return close(node, replace_two_way(from, to, depth)?);
    }
    if slice.open_start == 0 && slice.open_end == 0 && from.depth() == depth && to.depth() == depth
    {
        let parent = from.parent();
        let content = parent.content();
        let joined = content
            .cut(0, from.parent_offset())
            .append(&slice.content)
            .append(&content.cut(to.parent_offset(), content.size()));
        return close(parent, joined);
    }
    let wrapped = prepare_slice_for_replace(slice, from);
    let extra = from.depth() - slice.open_start;
    let start = wrapped.resolve(slice.open_start + extra)?;
    let end = wrapped.resolve(wrapped.content_size() - slice.open_end - extra)?;
    close(node, replace_three_way(from, &start, &end, to, depth)?)
}

/// Wrap the slice content in copies of the ancestors of `along` so it can
/// be resolved like a document.
fn prepare_slice_for_replace(slice: &Slice, along: &ResolvedPos<'_>) -> Node {
    let extra = along.depth() - slice.open_start;
    let mut node = along.node(extra).copy(slice.content.clone());
    for d in (0..extra).rev() {
        node = along.node(d).copy(Fragment::from_node(node));
    }
    node
}

fn check_join(main: &Node, sub: &Node) -> Result<(), ModelError> {
    if sub.ty().compatible_content(main.ty()) {
        Ok(())
    } else {
        Err(ModelError::Replace(format!(
            "Cannot join {} onto {}",
            sub.type_name(),
            main.type_name()
        )))
    }
}

fn joinable<'a>(
    before: &ResolvedPos<'a>,
    after: &ResolvedPos<'_>,
    depth: usize,
) -> Result<&'a Node, ModelError> {
    let node = before.node(depth);
    check_join(node, after.node(depth))?;
    Ok(node)
}

fn add_range(
    start: Option<&ResolvedPos<'_>>,
    end: Option<&ResolvedPos<'_>>,
    depth: usize,
    target: &mut Vec<Node>,
) {
    let node = match (end, start) {
        (Some(end), _) => end.node(depth),
        (None, Some(start)) => start.node(depth),
        (None, None) => return,
    };
    let mut start_index = 0;
    let end_index = end.map_or(node.child_count(), |e| e.index(depth));
    if let Some(start) = start {
        start_index = start.index(depth);
        if start.depth() > depth {
            start_index += 1;
        } else if start.text_offset() > 0 {
            if let Some(after) = start.node_after() {
                target.push(after);
            }
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        target.push(node.child(i).clone());
    }
    if let Some(end) = end
        && end.depth() == depth
        && end.text_offset() > 0
        && let Some(before) = end.node_before()
    {
        target.push(before);
    }
}

fn close(node: &Node, content: Fragment) -> Result<Node, ModelError> {
    node.ty().check_content(&content)?;
    Ok(node.copy(content))
}

fn replace_three_way(
    from: &ResolvedPos<'_>,
    start: &ResolvedPos<'_>,
    end: &ResolvedPos<'_>,
    to: &ResolvedPos<'_>,
    depth: usize,
) -> Result<Fragment, ModelError> {
    let open_start = if from.depth() > depth {
        Some(joinable(from, start, depth + 1)?)
    } else {
        None
    };
    let open_end = if to.depth() > depth {
        Some(joinable(end, to, depth + 1)?)
    } else {
        None
    };

    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    match (open_start, open_end) {
        (Some(os), Some(oe)) if start.index(depth) == end.index(depth) => {
            check_join(os, oe)?;
            let inner = replace_three_way(from, start, end, to, depth + 1)?;
            content.push(close(os, inner)?);
        }
        _ => {
            if let Some(os) = open_start {
                content.push(close(os, replace_two_way(from, start, depth + 1)?)?);
            }
            add_range(Some(start), Some(end), depth, &mut content);
            if let Some(oe) = open_end {
                content.push(close(oe, replace_two_way(end, to, depth + 1)?)?);
            }
        }
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_vec(content))
}

fn replace_two_way(
    from: &ResolvedPos<'_>,
    to: &ResolvedPos<'_>,
    depth: usize,
) -> Result<Fragment, ModelError> {
    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    if from.depth() > depth {
        let ty = joinable(from, to, depth + 1)?;
        content.push(close(ty, replace_two_way(from, to, depth + 1)?)?);
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_vec(content))
}
