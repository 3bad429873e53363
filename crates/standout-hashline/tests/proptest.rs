//! Property-based tests for hashline using proptest.

use proptest::prelude::*;
use serde_json::json;
use standout_hashline::{escape, template, unescape, Compiler};

// ============================================================================
// Strategies
// ============================================================================

// Text that can never contain a directive.
fn plain_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,;:!?\n\t-]{0,60}"
}

fn identifier() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,8}".prop_filter("keywords are not variables", |s| {
        !matches!(s.as_str(), "in" | "true" | "false" | "null" | "undefined")
    })
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Text without directives renders to itself, minus outer newlines.
    #[test]
    fn plain_text_round_trips(text in plain_text()) {
        let output = template(&text).unwrap().render(&json!({})).unwrap();
        prop_assert_eq!(output, text.trim_matches('\n'));
    }

    /// Output never starts or ends with a newline.
    #[test]
    fn output_is_newline_trimmed(
        text in plain_text(),
        values in prop::collection::vec("[a-z\n]{0,5}", 0..5),
    ) {
        let source = format!("{}\n#for v in values\n  #{{v}}\n#end\n{}", text, text);
        let output = template(&source)
            .unwrap()
            .render(&json!({ "values": values }))
            .unwrap();
        prop_assert!(!output.starts_with('\n'));
        prop_assert!(!output.ends_with('\n'));
    }

    /// Escaped text is printable ASCII and unescapes to the original.
    #[test]
    fn escape_round_trips(text in any::<String>()) {
        let escaped = escape(&text);
        prop_assert!(escaped.chars().all(|c| (' '..='~').contains(&c)));
        prop_assert_eq!(unescape(&escaped).unwrap(), text);
    }

    /// A loop emits one line per element, in order.
    #[test]
    fn for_emits_each_element(items in prop::collection::vec(-1000i64..1000, 0..20)) {
        let tpl = template("#for item in items\n  #{item}\n#end").unwrap();
        let output = tpl.render(&json!({ "items": items })).unwrap();
        let expected = items.iter().map(i64::to_string).collect::<Vec<_>>().join("\n");
        prop_assert_eq!(output, expected);
    }

    /// Nested loops see the right elements regardless of sizes.
    #[test]
    fn nested_for_is_a_cross_product(
        outer in prop::collection::vec(0i64..100, 0..6),
        inner in prop::collection::vec(0i64..100, 0..6),
    ) {
        let tpl = template(
            "#for a in outer\n  #for b in inner\n    #{a}-#{b}\n  #end\n#end",
        )
        .unwrap();
        let output = tpl.render(&json!({ "outer": outer, "inner": inner })).unwrap();

        let mut expected = Vec::new();
        for a in &outer {
            for b in &inner {
                expected.push(format!("{}-{}", a, b));
            }
        }
        prop_assert_eq!(output, expected.join("\n"));
    }

    /// `#if` picks exactly one branch.
    #[test]
    fn if_picks_one_branch(cond in any::<bool>(), name in identifier()) {
        let source = format!("#if {}\n  yes\n#else\n  no\n#end", name);
        let output = template(&source)
            .unwrap()
            .render(&json!({ name: cond }))
            .unwrap();
        prop_assert_eq!(output, if cond { "yes" } else { "no" });
    }

    /// Bodies indented by one step render flush left for any step width.
    #[test]
    fn any_indent_step_unindents_bodies(step in 0usize..8, line in "[a-z]{1,10}") {
        let pad = " ".repeat(step);
        let source = format!("#if true\n{}{}\n{}{}\n#end", pad, line, pad, line);
        let output = Compiler::new()
            .indent_step(step)
            .compile(&source)
            .unwrap()
            .render(&json!({}))
            .unwrap();
        prop_assert_eq!(output, format!("{}\n{}", line, line));
    }

    /// Compiling is deterministic.
    #[test]
    fn compile_is_deterministic(text in plain_text(), name in identifier()) {
        let source = format!("#for {} in xs\n  {}#{{{}}}\n#end", name, text, name);
        let first = template(&source);
        let second = template(&source);
        prop_assert_eq!(first.map(|t| t.listing()), second.map(|t| t.listing()));
    }
}
