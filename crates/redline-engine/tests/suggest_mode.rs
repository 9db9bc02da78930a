use pretty_assertions::assert_eq;
use redline_engine::{EngineError, EngineOptions, StepOutcome, SuggestionEngine};
use redline_model::builders::*;
use redline_model::schema::{ContentKind, NodeType};
use redline_model::{
    AttrStep, Fragment, Mark, Node, Schema, Slice, Step, StructureRole, SuggestionId, Transform,
};
use rstest::rstest;
use serde_json::json;

fn engine() -> SuggestionEngine {
    SuggestionEngine::new(schema(), EngineOptions::default()).unwrap()
}

fn sample() -> Node {
    doc(vec![
        heading(1, vec![txt("Title")]),
        p(vec![txt("first "), txt_marked("bold", vec![Mark::format("strong")])]),
        blockquote(vec![p(vec![txt("quoted")])]),
    ])
}

fn edit(doc: &Node, steps: Vec<Step>) -> Transform {
    let mut tr = Transform::new(doc.clone());
    for step in steps {
        tr.step(step).unwrap();
    }
    tr
}

fn suggest(doc: &Node, steps: Vec<Step>) -> Node {
    let tracked = engine().transform_transaction(&edit(doc, steps));
    assert!(tracked.all_handled(), "{:?}", tracked.report);
    tracked.transform.into_doc()
}

fn structure_roles(doc: &Node, id: SuggestionId) -> Vec<StructureRole> {
    let mut roles = Vec::new();
    doc.descendants(|node, _, _, _| {
        for mark in node.marks() {
            if let Mark::Structure(attrs) = mark
                && attrs.id == id
            {
                roles.push(attrs.role);
            }
        }
        true
    });
    roles
}

fn wrapper(node: Node) -> Slice {
    Slice::new(Fragment::from_node(node), 0, 0)
}

#[rstest]
#[case::insert_text(Step::replace(3, 3, Slice::new(Fragment::from_node(txt("xx")), 0, 0)))]
#[case::delete_text(Step::replace(9, 12, Slice::empty()))]
#[case::delete_across_blocks(Step::replace(4, 12, Slice::empty()))]
#[case::split_paragraph(Step::replace(
    10,
    10,
    Slice::new(Fragment::from_vec(vec![p(vec![]), p(vec![])]), 1, 1)
))]
#[case::add_mark(Step::AddMark { from: 8, to: 18, mark: Mark::format("em") })]
#[case::remove_mark(Step::RemoveMark { from: 14, to: 18, mark: Mark::format("strong") })]
#[case::add_node_mark(Step::AddNodeMark { pos: 7, mark: Mark::format("highlight") })]
#[case::attr(Step::SetAttribute(AttrStep { pos: 0, attr: "level".into(), value: json!(3) }))]
#[case::unwrap_quote(Step::ReplaceAround {
    from: 19,
    to: 29,
    gap_from: 20,
    gap_to: 28,
    slice: Slice::empty(),
    insert: 0,
    structure: true,
})]
#[case::wrap_paragraph(Step::ReplaceAround {
    from: 7,
    to: 19,
    gap_from: 7,
    gap_to: 19,
    slice: wrapper(blockquote(vec![])),
    insert: 1,
    structure: true,
})]
#[case::set_block_type(Step::ReplaceAround {
    from: 7,
    to: 19,
    gap_from: 8,
    gap_to: 18,
    slice: wrapper(heading(2, vec![])),
    insert: 1,
    structure: true,
})]
fn rejecting_restores_the_original(#[case] step: Step) {
    let original = sample();
    let suggested = suggest(&original, vec![step]);
    assert_ne!(suggested, original);

    let engine = engine();
    let ids = engine.suggestion_ids(&suggested);
    assert_eq!(ids.len(), 1);
    let reverted = engine.revert_suggestion(&suggested, ids[0]).unwrap().into_doc();
    assert_eq!(reverted, original);

    // a second rejection finds nothing left to undo
    let again = engine.revert_suggestion(&reverted, ids[0]).unwrap();
    assert!(!again.doc_changed());
}

#[test]
fn removing_a_node_mark_is_revertible() {
    let highlight = Mark::format("highlight");
    let original = doc(vec![marked(p(vec![txt("x")]), vec![highlight.clone()])]);
    let suggested = suggest(
        &original,
        vec![Step::RemoveNodeMark {
            pos: 0,
            mark: highlight,
        }],
    );
    assert!(suggested.child(0).marks().iter().all(|m| m.is_suggestion()));
    let reverted = engine().revert_all(&suggested).unwrap().into_doc();
    assert_eq!(reverted, original);
}

#[test]
fn bolding_a_word_records_old_and_new_text() {
    let original = doc(vec![p(vec![txt("first paragraph")])]);
    let suggested = suggest(
        &original,
        vec![Step::AddMark {
            from: 1,
            to: 6,
            mark: Mark::format("strong"),
        }],
    );
    let id = SuggestionId(1);
    assert_eq!(
        suggested,
        doc(vec![p(vec![
            txt_marked("first", vec![Mark::deletion(id)]),
            txt_marked("first", vec![Mark::insertion(id), Mark::format("strong")]),
            txt(" paragraph"),
        ])])
    );
}

#[rstest]
#[case::whole_range(Step::replace(2, 6, Slice::empty()))]
#[case::backspace_at_block_start(Step::replace(3, 5, Slice::empty()))]
fn deleting_a_suggested_split_joins_the_blocks(#[case] step: Step) {
    let split = doc(vec![
        p(vec![txt("A"), txt_marked("\u{200B}", vec![Mark::insertion(SuggestionId(1))])]),
        p(vec![txt_marked("\u{200B}", vec![Mark::insertion(SuggestionId(1))]), txt("B")]),
    ]);
    let joined = suggest(&split, vec![step]);
    assert_eq!(joined, doc(vec![p(vec![txt("AB")])]));
    assert!(engine().suggestion_ids(&joined).is_empty());
}

#[test]
fn edits_inside_an_insertion_keep_its_id() {
    let original = doc(vec![p(vec![
        txt("a"),
        txt_marked("inserted", vec![Mark::insertion(SuggestionId(5))]),
        txt("b"),
    ])]);
    let typed = suggest(
        &original,
        vec![Step::replace(4, 4, Slice::new(Fragment::from_node(txt("zz")), 0, 0))],
    );
    assert_eq!(engine().suggestion_ids(&typed), vec![SuggestionId(5)]);
    assert_eq!(typed.child(0).child(1).text(), Some("inzzserted"));

    let deleted = suggest(&typed, vec![Step::replace(3, 7, Slice::empty())]);
    assert_eq!(engine().suggestion_ids(&deleted), vec![SuggestionId(5)]);
    assert_eq!(deleted.child(0).child(1).text(), Some("ierted"));
}

#[test]
fn attribute_changes_collapse_within_one_transaction() {
    let original = doc(vec![heading(1, vec![txt("T")])]);
    let level = |v: u64| {
        Step::SetAttribute(AttrStep {
            pos: 0,
            attr: "level".into(),
            value: json!(v),
        })
    };
    let suggested = suggest(&original, vec![level(2), level(1)]);
    assert_eq!(suggested, original);
}

#[test]
fn attribute_changes_collapse_across_transactions() {
    let original = doc(vec![heading(1, vec![txt("T")])]);
    let level = |v: u64| {
        Step::SetAttribute(AttrStep {
            pos: 0,
            attr: "level".into(),
            value: json!(v),
        })
    };
    let first = suggest(&original, vec![level(3)]);
    assert_eq!(engine().suggestion_ids(&first), vec![SuggestionId(1)]);
    let second = suggest(&first, vec![level(1)]);
    assert_eq!(second, original);
}

#[test]
fn structural_suggestions_come_in_twos_or_fours() {
    let original = doc(vec![p(vec![txt("a")]), p(vec![txt("b")])]);
    let wrapped = suggest(
        &original,
        vec![Step::ReplaceAround {
            from: 0,
            to: 3,
            gap_from: 0,
            gap_to: 3,
            slice: wrapper(blockquote(vec![])),
            insert: 1,
            structure: true,
        }],
    );
    assert_eq!(structure_roles(&wrapped, SuggestionId(1)).len(), 4);

    // the second paragraph sits at 5..8 after the wrap
    let retyped = suggest(
        &wrapped,
        vec![Step::ReplaceAround {
            from: 5,
            to: 8,
            gap_from: 6,
            gap_to: 7,
            slice: wrapper(heading(2, vec![])),
            insert: 1,
            structure: true,
        }],
    );
    assert_eq!(structure_roles(&retyped, SuggestionId(1)).len(), 4);
    assert_eq!(structure_roles(&retyped, SuggestionId(2)).len(), 2);

    let reverted = engine().revert_all(&retyped).unwrap().into_doc();
    assert_eq!(reverted, original);
}

#[test]
fn steps_that_cannot_be_recorded_are_reported() {
    let original = doc(vec![p(vec![txt("a")])]);
    let wrapped = suggest(
        &original,
        vec![Step::ReplaceAround {
            from: 0,
            to: 3,
            gap_from: 0,
            gap_to: 3,
            slice: wrapper(blockquote(vec![])),
            insert: 1,
            structure: true,
        }],
    );
    // the paragraph anchors the wrap and cannot also carry a modification
    let input = edit(
        &wrapped,
        vec![Step::SetAttribute(AttrStep {
            pos: 1,
            attr: "align".into(),
            value: json!("center"),
        })],
    );
    let tracked = engine().transform_transaction(&input);
    assert!(!tracked.all_handled());
    assert!(matches!(tracked.report[0].outcome, StepOutcome::NotHandled { .. }));
    assert_eq!(tracked.transform.doc(), &wrapped);
}

#[test]
fn later_steps_are_rebased_over_earlier_ones() {
    let original = doc(vec![p(vec![txt("abcdef")])]);
    // delete "b", then type at the position that was "e" in the input
    let steps = vec![
        Step::replace(2, 3, Slice::empty()),
        Step::replace(4, 4, Slice::new(Fragment::from_node(txt("X")), 0, 0)),
    ];
    let suggested = suggest(&original, steps);
    let id = SuggestionId(1);
    assert_eq!(
        suggested,
        doc(vec![p(vec![
            txt("a"),
            txt_marked("b", vec![Mark::deletion(id)]),
            txt("cd"),
            txt_marked("X", vec![Mark::insertion(id)]),
            txt("ef"),
        ])])
    );
}

#[test]
fn schemas_without_suggestion_marks_are_rejected() {
    let nodes = vec![
        NodeType::new("doc", ContentKind::Block, false),
        NodeType::new("paragraph", ContentKind::Inline, false),
        NodeType::new("text", ContentKind::Text, true),
    ];
    let marks = ["insertion", "deletion", "modification"].map(String::from).to_vec();
    let err = SuggestionEngine::new(&Schema::new(nodes, marks), EngineOptions::default()).unwrap_err();
    assert_eq!(err, EngineError::SchemaMissingAnnotation("structure".into()));
}

#[test]
fn replacing_across_suggestions_splits_by_id() {
    let original = doc(vec![p(vec![
        txt("ab"),
        txt_marked("cd", vec![Mark::insertion(SuggestionId(1))]),
        txt_marked("ef", vec![Mark::deletion(SuggestionId(2))]),
        txt("gh"),
    ])]);
    let replaced = suggest(
        &original,
        vec![Step::replace(2, 8, Slice::new(Fragment::from_node(txt("Z")), 0, 0))],
    );
    let del = |n| vec![Mark::deletion(SuggestionId(n))];
    assert_eq!(
        replaced,
        doc(vec![p(vec![
            txt("a"),
            txt_marked("b", del(3)),
            txt_marked("ef", del(2)),
            txt_marked("g", del(3)),
            txt_marked("Z", vec![Mark::insertion(SuggestionId(3))]),
            txt("h"),
        ])])
    );
}

#[test]
fn separate_transactions_keep_separate_ids() {
    let original = doc(vec![p(vec![txt("one two")])]);
    let typed = suggest(
        &original,
        vec![Step::replace(4, 4, Slice::new(Fragment::from_node(txt("!")), 0, 0))],
    );
    // the space right after the inserted "!"
    let deleted = suggest(&typed, vec![Step::replace(5, 6, Slice::empty())]);
    assert_eq!(
        engine().suggestion_ids(&deleted),
        vec![SuggestionId(1), SuggestionId(2)]
    );

    let without_insert = engine()
        .revert_suggestion(&deleted, SuggestionId(1))
        .unwrap()
        .into_doc();
    assert_eq!(
        without_insert,
        doc(vec![p(vec![
            txt("one"),
            txt_marked(" ", vec![Mark::deletion(SuggestionId(2))]),
            txt("two"),
        ])])
    );
    assert_eq!(engine().revert_all(&deleted).unwrap().into_doc(), original);
}

#[test]
fn deleting_a_modified_node_restores_its_baseline_on_reject() {
    let original = doc(vec![heading(1, vec![txt("T")]), p(vec![txt("x")])]);
    let relevelled = suggest(
        &original,
        vec![Step::SetAttribute(AttrStep {
            pos: 0,
            attr: "level".into(),
            value: json!(2),
        })],
    );
    let deleted = suggest(&relevelled, vec![Step::replace(0, 3, Slice::empty())]);
    assert_eq!(engine().suggestion_ids(&deleted), vec![SuggestionId(2)]);

    assert_eq!(engine().revert_all(&deleted).unwrap().into_doc(), original);
    assert_eq!(
        engine().apply_all(&deleted).unwrap().into_doc(),
        doc(vec![p(vec![txt("x")])])
    );
}

#[test]
fn accepting_the_deletion_of_a_wrapped_block_removes_it() {
    let original = doc(vec![p(vec![txt("a")]), p(vec![txt("b")])]);
    let wrapped = suggest(
        &original,
        vec![Step::ReplaceAround {
            from: 0,
            to: 3,
            gap_from: 0,
            gap_to: 3,
            slice: wrapper(blockquote(vec![])),
            insert: 1,
            structure: true,
        }],
    );
    // the whole blockquote
    let deleted = suggest(&wrapped, vec![Step::replace(0, 5, Slice::empty())]);
    assert!(structure_roles(&deleted, SuggestionId(1)).is_empty());

    assert_eq!(
        engine().apply_all(&deleted).unwrap().into_doc(),
        doc(vec![p(vec![txt("b")])])
    );
    assert_eq!(engine().revert_all(&deleted).unwrap().into_doc(), original);
}
