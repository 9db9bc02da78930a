//! Terse constructors over [`Schema::basic`] for tests and benchmarks.
//!
//! These panic on invalid content; use [`Schema::node`] when the input is
//! not known to be well-formed.

use std::sync::LazyLock;

use serde_json::json;

use crate::{Attrs, Mark, Node, Schema};

static BASIC: LazyLock<Schema> = LazyLock::new(Schema::basic);

pub fn schema() -> &'static Schema {
    &BASIC
}

fn build(name: &str, attrs: Attrs, content: Vec<Node>) -> Node {
    BASIC
        .node(name, attrs, content)
        .unwrap_or_else(|e| panic!("invalid {name}: {e}"))
}

pub fn doc(content: Vec<Node>) -> Node {
    build("doc", Attrs::new(), content)
}

pub fn p(content: Vec<Node>) -> Node {
    build("paragraph", Attrs::new(), content)
}

pub fn heading(level: u64, content: Vec<Node>) -> Node {
    let mut attrs = Attrs::new();
    attrs.insert("level".into(), json!(level));
    build("heading", attrs, content)
}

pub fn blockquote(content: Vec<Node>) -> Node {
    build("blockquote", Attrs::new(), content)
}

pub fn ul(content: Vec<Node>) -> Node {
    build("bullet_list", Attrs::new(), content)
}

pub fn li(content: Vec<Node>) -> Node {
    build("list_item", Attrs::new(), content)
}

pub fn hr() -> Node {
    build("horizontal_rule", Attrs::new(), Vec::new())
}

pub fn img(src: &str) -> Node {
    let mut attrs = Attrs::new();
    attrs.insert("src".into(), json!(src));
    build("image", attrs, Vec::new())
}

pub fn br() -> Node {
    build("hard_break", Attrs::new(), Vec::new())
}

pub fn txt(text: &str) -> Node {
    BASIC.text(text, Vec::new())
}

pub fn txt_marked(text: &str, marks: Vec<Mark>) -> Node {
    BASIC.text(text, marks)
}

/// `node` with `marks` as its node marks.
pub fn marked(node: Node, marks: Vec<Mark>) -> Node {
    node.with_marks(marks)
}
