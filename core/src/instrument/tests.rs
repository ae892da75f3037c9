use super::scanner::{normalize_snippet, Scanner, Segment, Statement};
use super::*;
use crate::parser::{parse_program, semantic_validator};

/// Statements the scanner reports, terminated or trailing
fn statements(source: &str) -> Vec<Statement> {
    Scanner::new(source)
        .filter_map(|segment| match segment {
            Segment::Boundary(s) | Segment::Trailing(s) => Some(s),
            _ => None,
        })
        .collect()
}

fn codes(source: &str) -> Vec<String> {
    statements(source).into_iter().map(|s| s.code).collect()
}

fn assert_compiles(source: &str) {
    let instrumented = instrument_source(source);
    let script = match parse_program(&instrumented) {
        Ok(script) => script,
        Err(e) => panic!("Instrumented source failed to parse: {}\n{}", e, instrumented),
    };
    let errors = semantic_validator::validate_script(&script);
    assert!(errors.is_empty(), "Validation failed: {:?}", errors);
}

/* ===================== Scanner ===================== */

#[test]
fn test_statement_positions() {
    let found = statements("let x = 1; x += 1; report(x);");

    assert_eq!(
        found,
        vec![
            Statement {
                line: 1,
                column: 1,
                code: "let x = 1;".to_string()
            },
            Statement {
                line: 1,
                column: 12,
                code: "x += 1;".to_string()
            },
            Statement {
                line: 1,
                column: 20,
                code: "report(x);".to_string()
            },
        ]
    );
}

#[test]
fn test_positions_across_lines() {
    let found = statements("let a = 1;\n\n  let b =\n      2;");

    assert_eq!((found[1].line, found[1].column), (3, 3));
    assert_eq!(found[1].code, "let b = 2;");
}

#[test]
fn test_whitespace_is_collapsed() {
    assert_eq!(normalize_snippet("  a \t+\n\n b  "), "a + b");
    assert_eq!(normalize_snippet(" \n "), "");
}

#[test]
fn test_empty_statements_are_skipped() {
    assert!(codes(";; ;\n;").is_empty());
}

#[test]
fn test_loop_header_is_not_split() {
    assert_eq!(
        codes("for (let i = 0; i < 3; i++) total += i; done();"),
        vec!["for (let i = 0; i < 3; i++) total += i;", "done();"]
    );
    assert_eq!(
        codes("for(;;) { break; }"),
        vec!["for(;;) { break;", "}"]
    );
}

#[test]
fn test_nested_parens_in_loop_header() {
    assert_eq!(
        codes("for (let i = f(1, g(2)); i < (n); i++) x(); y();"),
        vec!["for (let i = f(1, g(2)); i < (n); i++) x();", "y();"]
    );
}

#[test]
fn test_identifier_ending_in_for_is_not_a_header() {
    assert_eq!(codes("wait_for(a); b();"), vec!["wait_for(a);", "b();"]);
    assert_eq!(codes("before(a;b);"), vec!["before(a;", "b);"]);
}

#[test]
fn test_strings_protect_terminators() {
    assert_eq!(
        codes(r#"const a = "x;y"; const b = 'it\'s; fine'; c();"#),
        vec![
            r#"const a = "x;y";"#,
            r#"const b = 'it\'s; fine';"#,
            "c();"
        ]
    );
}

#[test]
fn test_comment_markers_inside_strings() {
    assert_eq!(
        codes("const url = 'http://host/*x'; next();"),
        vec!["const url = 'http://host/*x';", "next();"]
    );
}

#[test]
fn test_quasi_literals_protect_terminators() {
    assert_eq!(
        codes("const t = `a;${x + 1};b//c`; done();"),
        vec!["const t = `a;${x + 1};b//c`;", "done();"]
    );
}

#[test]
fn test_comments_are_excluded_from_snippets() {
    let found = statements("a(); // b(); c();\n/* d(); */ e();");

    assert_eq!(found.len(), 2);
    assert_eq!(found[1].code, "e();");
    assert_eq!((found[1].line, found[1].column), (2, 12));
}

#[test]
fn test_comment_separates_tokens() {
    assert_eq!(codes("let/*gap*/x = 1;"), vec!["let x = 1;"]);
}

#[test]
fn test_trailing_statement() {
    let segments: Vec<Segment> = Scanner::new("a = 1;\nb = 2").collect();

    assert!(matches!(
        segments.last(),
        Some(Segment::Trailing(Statement { line: 2, column: 1, code })) if code == "b = 2"
    ));
}

#[test]
fn test_unterminated_literal_is_not_flushed() {
    assert!(codes("x = 'abc").is_empty());
    assert!(codes("x = 1 /* open").is_empty());
}

#[test]
fn test_end_position() {
    let mut scanner = Scanner::new("a();\nbc();");
    scanner.by_ref().for_each(drop);

    assert_eq!(scanner.position(), (2, 6));
    assert_eq!(end_position("a();\nbc();"), (2, 6));
    assert_eq!(end_position(""), (1, 1));
}

/* ===================== Instrumentation ===================== */

#[test]
fn test_checkpoint_follows_terminator_on_same_line() {
    let instrumented = instrument_source("a();\nb();");
    let lines: Vec<&str> = instrumented.lines().collect();

    assert!(lines[HEADER_LINES].starts_with(
        "a();yield { kind: \"statement\", index: ++__step, line: 1, column: 1, code: \"a();\""
    ));
    assert!(lines[HEADER_LINES + 1].starts_with("b();yield"));
}

#[test]
fn test_header_and_footer() {
    let instrumented = instrument_source("x();");

    assert!(instrumented.starts_with("let __step = 0; try {\nyield { kind: \"start\", index: __step, line: 1, column: 1, code: \"\""));
    assert!(instrumented.contains("return { kind: \"end\", index: ++__step, line: 1, column: 5"));
    assert!(instrumented.contains("} catch (__error) {"));
    assert!(instrumented.contains("error: __normalizeError(__error)"));
}

#[test]
fn test_snippet_is_escaped() {
    let instrumented = instrument_source(r#"log("a\"b");"#);

    assert!(instrumented.contains(r#"code: "log(\"a\\\"b\");""#));
}

#[test]
fn test_instrumented_programs_parse() {
    let sources = [
        "let x = 1; x += 1; report(x);",
        "if (x) a(); else b();",
        "if (x) { a(); } else if (y) b(); else { c(); }",
        "do x++; while (x < 3);",
        "do { x++; } while (x < 3)",
        "for (let i = 0; i < 3; i++) { sum += i; }",
        "function f(a) {\n  const b = a * 2;\n  return b;\n}\nf(2);",
        "const o = { m() { return 1; }, k: [1, 2] };",
        "items.forEach((v) => { total += v; });",
        "try { risky(); } catch (e) { log(e); } finally { done(); }",
        "const last = 1 // trailing comment",
        "x = `a;${y}`",
        "",
    ];
    for source in sources {
        assert_compiles(source);
    }
}

#[test]
fn test_trailing_statement_in_line_comment() {
    let instrumented = instrument_source("a = 1 // note");

    assert!(instrumented.contains("a = 1 // note\n;yield"));
}

#[test]
fn test_strip_line_comments() {
    let source = "const url = 'http://x'; // note\nlet y = `//k`; /* keep */ // drop\n";

    assert_eq!(
        strip_line_comments(source),
        "const url = 'http://x'; \nlet y = `//k`; /* keep */ \n"
    );
}
