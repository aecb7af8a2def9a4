//! Property tests for the snapshot diff.

use ontosync_rdf::GraphDiff;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Subject {
    Iri(usize),
    Blank(usize),
}

#[derive(Debug, Clone)]
enum Object {
    Iri(usize),
    Blank(usize),
    Plain(usize),
    Lang(usize, usize),
    Integer(i64),
}

const WORDS: [&str; 4] = ["Person", "City", "Human", "lives in"];
const LANGS: [&str; 3] = ["en", "es", "ko"];

fn subject(with_blanks: bool) -> BoxedStrategy<Subject> {
    if with_blanks {
        prop_oneof![
            (0usize..4).prop_map(Subject::Iri),
            (0usize..3).prop_map(Subject::Blank),
        ]
        .boxed()
    } else {
        (0usize..4).prop_map(Subject::Iri).boxed()
    }
}

fn object(with_blanks: bool) -> BoxedStrategy<Object> {
    let base = prop_oneof![
        (0usize..4).prop_map(Object::Iri),
        (0usize..WORDS.len()).prop_map(Object::Plain),
        (0usize..WORDS.len(), 0usize..LANGS.len()).prop_map(|(w, l)| Object::Lang(w, l)),
        (-5i64..5).prop_map(Object::Integer),
    ];
    if with_blanks {
        prop_oneof![base, (0usize..3).prop_map(Object::Blank)].boxed()
    } else {
        base.boxed()
    }
}

fn statements(with_blanks: bool) -> impl Strategy<Value = Vec<(Subject, usize, Object)>> {
    prop::collection::vec((subject(with_blanks), 0usize..3, object(with_blanks)), 0..12)
}

fn render(statements: &[(Subject, usize, Object)], blank: impl Fn(usize) -> String) -> String {
    let mut out = String::from(concat!(
        "@prefix ex: <http://example.org/onto#> .\n",
        "@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .\n",
    ));
    for (s, p, o) in statements {
        let s = match s {
            Subject::Iri(i) => format!("ex:r{i}"),
            Subject::Blank(b) => format!("_:{}", blank(*b)),
        };
        let o = match o {
            Object::Iri(i) => format!("ex:r{i}"),
            Object::Blank(b) => format!("_:{}", blank(*b)),
            Object::Plain(w) => format!("\"{}\"", WORDS[*w]),
            Object::Lang(w, l) => format!("\"{}\"@{}", WORDS[*w], LANGS[*l]),
            Object::Integer(n) => format!("\"{n}\"^^xsd:integer"),
        };
        out.push_str(&format!("{s} ex:p{p} {o} .\n"));
    }
    out
}

fn plain(statements: &[(Subject, usize, Object)]) -> String {
    render(statements, |b| format!("b{b}"))
}

/// Directed `ex:q` cycles of blank nodes, one per length. `label` names the
/// node at position `i` of cycle `c`.
fn cycles(lengths: &[usize], label: impl Fn(usize, usize) -> String) -> String {
    let mut out = String::from("@prefix ex: <http://example.org/onto#> .\n");
    for (c, len) in lengths.iter().enumerate() {
        for i in 0..*len {
            out.push_str(&format!("_:{} ex:q _:{} .\n", label(c, i), label(c, (i + 1) % len)));
        }
    }
    out
}

#[test]
fn triangles_and_hexagon_canonicalize_alike() {
    let lengths = [3, 3, 6];
    let triangles_first = cycles(&lengths, |c, i| format!("a{c}x{i}"));
    let hexagon_first = cycles(&lengths, |c, i| format!("{}x{i}", ["t", "u", "a"][c]));

    let diff = GraphDiff::compute(&triangles_first, &hexagon_first).unwrap();
    assert!(diff.is_empty(), "unexpected diff: {:?}", diff.skipped);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn diff_against_itself_is_empty(a in statements(true)) {
        let text = plain(&a);
        prop_assert!(GraphDiff::compute(&text, &text).unwrap().is_empty());
    }

    #[test]
    fn diff_is_symmetric(a in statements(true), b in statements(true)) {
        let (ta, tb) = (plain(&a), plain(&b));
        let forward = GraphDiff::compute(&ta, &tb).unwrap();
        let backward = GraphDiff::compute(&tb, &ta).unwrap();
        prop_assert_eq!(&forward.additions, &backward.removals);
        prop_assert_eq!(&forward.removals, &backward.additions);
        prop_assert_eq!(forward.skipped.len(), backward.skipped.len());
    }

    #[test]
    fn relabelled_blank_cycles_give_empty_diff(
        lengths in prop::collection::vec(1usize..7, 1..5),
        offset in 0usize..6,
    ) {
        let count = lengths.len();
        let original = cycles(&lengths, |c, i| format!("n{c}p{i}"));
        let relabelled = cycles(&lengths, |c, i| {
            format!("m{}p{}", count - c, (i + offset) % lengths[c])
        });
        let diff = GraphDiff::compute(&original, &relabelled).unwrap();
        prop_assert!(diff.is_empty(), "unexpected diff: {:?}", diff.skipped);
    }

    #[test]
    fn relabelled_blank_nodes_give_empty_diff(a in statements(true)) {
        let original = plain(&a);
        let relabelled = render(&a, |b| format!("renamed{}", 7 - b));
        let diff = GraphDiff::compute(&original, &relabelled).unwrap();
        prop_assert!(diff.is_empty(), "unexpected diff: {:?}", diff.skipped);
    }

    #[test]
    fn every_changed_statement_is_reported_once(a in statements(false), b in statements(false)) {
        let (ta, tb) = (plain(&a), plain(&b));
        let diff = GraphDiff::compute(&ta, &tb).unwrap();
        for triple in &diff.additions {
            prop_assert!(!diff.removals.contains(triple));
        }
        let mut additions = diff.additions.clone();
        additions.dedup();
        prop_assert_eq!(additions.len(), diff.additions.len());
    }
}
