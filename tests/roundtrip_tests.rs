// tests/roundtrip_tests.rs
//
// The canonicalizer guarantees that rendering any tree this engine produces
// and parsing the result yields a structurally identical tree. These tests
// exercise that property over a corpus of representative queries, plus the
// identity-preservation contract of the rewriting visitor.

use std::sync::Arc;

use odata_query::ast::Expr;
use odata_query::visitor::Rewriter;
use odata_query::{Value, parse_filter, parse_order_by, render, render_order_by};

fn assert_round_trips(input: &str) {
    let tree = parse_filter(input).unwrap();
    let rendered = render(&tree);
    let reparsed = parse_filter(&rendered)
        .unwrap_or_else(|e| panic!("canonical form {:?} failed to re-parse: {}", rendered, e));
    assert_eq!(tree, reparsed, "round trip changed the tree for {:?}", input);
}

#[test]
fn test_filter_round_trips() {
    let corpus = [
        "a eq 1",
        "a eq 1 or b eq 2 and c eq 3",
        "a sub b sub c",
        "not(done)",
        "x eq -5",
        "x eq -y",
        "price mul 1.1 gt 100",
        "total div 4 mod 2 ne 0",
        "startswith(name,'Mc') and year(birth) gt 1990",
        "substring(name,1,2) eq 'bc'",
        "substringof('free',description)",
        "user/name eq 'Bob'",
        "$it/Name ne null",
        "active eq true and deleted eq false",
        "comment eq 'it''s fine'",
        "note eq 'hello world'",
        "big eq 1234567890123L",
        "ratio eq 1.5f",
        "price eq 9.99M",
        "weight eq 2.5",
        "count eq 5D",
        "created gt datetime'2009-11-21T14:22:59.860Z'",
        "seen le datetimeoffset'2010-01-01T10:00:00.0000000+02:00'",
        "at eq time'13:20:00'",
        "id eq guid'01234567-89ab-cdef-0123-456789abcdef'",
        "data eq binary'00FF'",
        "((a or b) and c) or not(d)",
    ];
    for input in corpus {
        assert_round_trips(input);
    }
}

#[test]
fn test_order_by_round_trips() {
    for input in ["col1 desc, col2", "price mul quantity desc, name asc"] {
        let clauses = parse_order_by(input).unwrap();
        let rendered = render_order_by(&clauses);
        let reparsed = parse_order_by(&rendered).unwrap();
        assert_eq!(clauses, reparsed, "round trip changed clauses for {:?}", input);
    }
}

#[test]
fn test_string_escaping_round_trip() {
    let tree = Expr::constant(Value::String("it's".to_string()));
    let rendered = render(&tree);
    assert_eq!(rendered, "'it''s'");

    let reparsed = parse_filter(&rendered).unwrap();
    match reparsed.as_ref() {
        Expr::Constant(Value::String(s)) => assert_eq!(s, "it's"),
        other => panic!("Expected string constant, got {:?}", other),
    }
}

#[test]
fn test_escaped_whitespace_round_trip() {
    let tree = Expr::equal(
        Expr::field("note"),
        Expr::constant(Value::String("two  spaces".to_string())),
    );
    let rendered = render(&tree);
    assert_eq!(rendered, "(note eq 'two%20%20spaces')");
    assert_eq!(parse_filter(&rendered).unwrap(), tree);
}

// ============================================================================
// Rewriter identity preservation
// ============================================================================

/// Renames top-level field references.
struct RenameField {
    from: &'static str,
    to: &'static str,
}

impl Rewriter for RenameField {
    fn rewrite_member_access(
        &mut self,
        expr: &Arc<Expr>,
        instance: Option<&Arc<Expr>>,
        member: &str,
    ) -> Arc<Expr> {
        let rewritten = instance.map(|i| self.rewrite(i));
        let instance_changed = match (&rewritten, instance) {
            (Some(new), Some(old)) => !Arc::ptr_eq(new, old),
            _ => false,
        };
        if member == self.from {
            Expr::member(rewritten, self.to)
        } else if instance_changed {
            Expr::member(rewritten, member)
        } else {
            Arc::clone(expr)
        }
    }
}

#[test]
fn test_rewriter_replaces_matching_members() {
    let tree = parse_filter("old eq 1 and price gt 2").unwrap();
    let mut rename = RenameField {
        from: "old",
        to: "archived",
    };
    let rewritten = rename.rewrite(&tree);
    assert_eq!(render(&rewritten), "((archived eq 1) and (price gt 2))");
}

#[test]
fn test_rewriter_preserves_identity_on_no_op() {
    let tree = parse_filter("startswith(name,'Mc') or done eq true").unwrap();
    let mut rename = RenameField {
        from: "missing",
        to: "whatever",
    };
    let rewritten = rename.rewrite(&tree);
    assert!(
        Arc::ptr_eq(&rewritten, &tree),
        "a no-op rewrite must return the original node"
    );
}

#[test]
fn test_rewriter_shares_unchanged_subtrees() {
    let tree = parse_filter("old eq 1 and price gt 2").unwrap();
    let mut rename = RenameField {
        from: "old",
        to: "archived",
    };
    let rewritten = rename.rewrite(&tree);
    // the untouched right branch is reused, not rebuilt
    match (tree.as_ref(), rewritten.as_ref()) {
        (
            Expr::Binary { right: before, .. },
            Expr::Binary { right: after, .. },
        ) => assert!(Arc::ptr_eq(before, after)),
        _ => panic!("Expected binary roots"),
    }
}
