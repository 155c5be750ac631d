use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tela_compiler::node::{NodeKind, NodeTree};
use tela_compiler::parse::{IncludeResolver, ParseErrorKind, parse_page};

struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn resolve(&self, _from: &Path, target: &str) -> io::Result<(PathBuf, String)> {
        Err(io::Error::new(io::ErrorKind::NotFound, target.to_string()))
    }
}

struct MapResolver(HashMap<String, String>);

impl MapResolver {
    fn new(files: &[(&str, &str)]) -> Self {
        Self(
            files
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl IncludeResolver for MapResolver {
    fn resolve(&self, _from: &Path, target: &str) -> io::Result<(PathBuf, String)> {
        self.0
            .get(&target.to_ascii_lowercase())
            .map(|text| (PathBuf::from(target), text.clone()))
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, target.to_string()))
    }
}

#[test]
fn parse_nested_elements_and_text() {
    let out = parse_page(
        Path::new("page.tela"),
        "<html><body>hi</body></html>",
        &NoIncludes,
    );
    assert!(out.errors.is_empty());

    let tree = &out.tree;
    let roots = tree.children(NodeTree::ROOT);
    assert_eq!(roots.len(), 1);
    let html = roots[0];
    match tree.kind(html) {
        NodeKind::OpenTag(tag) => assert_eq!(tag.name, "html"),
        other => panic!("expected open tag, got {other:?}"),
    }

    let html_children = tree.children(html);
    assert_eq!(html_children.len(), 2);
    let body = html_children[0];
    assert!(matches!(tree.kind(body), NodeKind::OpenTag(t) if t.name == "body"));
    assert!(matches!(tree.kind(html_children[1]), NodeKind::CloseTag(t) if t.name == "html"));

    let body_children = tree.children(body);
    assert_eq!(body_children.len(), 2);
    assert!(matches!(tree.kind(body_children[0]), NodeKind::Literal(t) if t == "hi"));
    assert!(matches!(tree.kind(body_children[1]), NodeKind::CloseTag(_)));
}

#[test]
fn parse_attributes_and_derived_flags() {
    let out = parse_page(
        Path::new("page.tela"),
        r#"<form server id="f1" action="/x"></form>"#,
        &NoIncludes,
    );
    assert!(out.errors.is_empty());
    let form = out.tree.children(NodeTree::ROOT)[0];
    match out.tree.kind(form) {
        NodeKind::OpenTag(tag) => {
            assert_eq!(tag.attrs.len(), 3);
            assert!(tag.attrs.is_server());
            assert_eq!(tag.attrs.id(), Some("f1"));
            assert_eq!(tag.attrs.get("action"), Some("/x"));
        }
        other => panic!("expected open tag, got {other:?}"),
    }
}

#[test]
fn parse_directive() {
    let out = parse_page(
        Path::new("page.tela"),
        r#"<%@ page language="rust" title="Home" %>"#,
        &NoIncludes,
    );
    assert!(out.errors.is_empty());
    let directive = out.tree.children(NodeTree::ROOT)[0];
    match out.tree.kind(directive) {
        NodeKind::Directive(d) => {
            assert_eq!(d.name, "page");
            assert_eq!(d.attrs.get("language"), Some("rust"));
            assert_eq!(d.attrs.get("Title"), Some("Home"));
        }
        other => panic!("expected directive, got {other:?}"),
    }
}

#[test]
fn parse_expression_and_code_blocks() {
    let out = parse_page(
        Path::new("page.tela"),
        "a<%= self_title() %>b<% let x = 1; %>",
        &NoIncludes,
    );
    assert!(out.errors.is_empty());
    let roots = out.tree.children(NodeTree::ROOT);
    assert_eq!(roots.len(), 4);
    assert!(matches!(out.tree.kind(roots[0]), NodeKind::Literal(t) if t == "a"));
    assert!(matches!(
        out.tree.kind(roots[1]),
        NodeKind::ExpressionBlock { code, is_expr: true } if code == "self_title()"
    ));
    assert!(matches!(out.tree.kind(roots[2]), NodeKind::Literal(t) if t == "b"));
    assert!(matches!(
        out.tree.kind(roots[3]),
        NodeKind::ExpressionBlock { code, is_expr: false } if code == "let x = 1;"
    ));
}

#[test]
fn server_comment_yields_no_node() {
    let out = parse_page(Path::new("page.tela"), "A<%-- hidden --%>B", &NoIncludes);
    assert!(out.errors.is_empty());
    let roots = out.tree.children(NodeTree::ROOT);
    assert_eq!(roots.len(), 2);
    assert!(matches!(out.tree.kind(roots[0]), NodeKind::Literal(t) if t == "A"));
    assert!(matches!(out.tree.kind(roots[1]), NodeKind::Literal(t) if t == "B"));
}

#[test]
fn unterminated_tag_recovers_as_literal() {
    let src = r#"ok <div class="x"#;
    let out = parse_page(Path::new("page.tela"), src, &NoIncludes);
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].kind, ParseErrorKind::UnterminatedTag);

    let roots = out.tree.children(NodeTree::ROOT);
    assert_eq!(roots.len(), 2);
    assert!(matches!(out.tree.kind(roots[1]), NodeKind::Literal(t) if t == r#"<div class="x"#));
}

#[test]
fn unterminated_directive_recovers_as_literal() {
    let out = parse_page(Path::new("page.tela"), "<%@ page ", &NoIncludes);
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].kind, ParseErrorKind::UnterminatedDirective);
    let roots = out.tree.children(NodeTree::ROOT);
    assert!(matches!(out.tree.kind(roots[0]), NodeKind::Literal(t) if t == "<%@ page "));
}

#[test]
fn all_errors_collected_in_one_pass() {
    let out = parse_page(
        Path::new("page.tela"),
        "<%-- open <% also open",
        &NoIncludes,
    );
    // the comment swallows the rest, so exactly one error here; the point is
    // that parsing continued to end-of-input rather than aborting
    assert!(!out.errors.is_empty());

    let out = parse_page(Path::new("a.tela"), "x<%= 1 + 1", &NoIncludes);
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].kind, ParseErrorKind::UnterminatedCodeBlock);
}

#[test]
fn script_content_is_raw_text() {
    let src = "<script server>fn f() -> Vec<i32> { vec![] }</script>";
    let out = parse_page(Path::new("page.tela"), src, &NoIncludes);
    assert!(out.errors.is_empty());

    let script = out.tree.children(NodeTree::ROOT)[0];
    let children = out.tree.children(script);
    assert_eq!(children.len(), 2);
    assert!(matches!(
        out.tree.kind(children[0]),
        NodeKind::Literal(t) if t == "fn f() -> Vec<i32> { vec![] }"
    ));
    assert!(matches!(out.tree.kind(children[1]), NodeKind::CloseTag(t) if t.name == "script"));
}

#[test]
fn include_parses_under_current_node() {
    let resolver = MapResolver::new(&[("b.tela", "<span/>")]);
    let out = parse_page(
        Path::new("a.tela"),
        r#"<div><%@ include file="b.tela" %></div>"#,
        &resolver,
    );
    assert!(out.errors.is_empty());
    assert_eq!(out.dependencies, vec![PathBuf::from("b.tela")]);

    let div = out.tree.children(NodeTree::ROOT)[0];
    let children = out.tree.children(div);
    assert_eq!(children.len(), 2);
    assert!(matches!(
        out.tree.kind(children[0]),
        NodeKind::SelfClosingTag(t) if t.name == "span"
    ));
}

#[test]
fn circular_include_reports_one_error() {
    let resolver = MapResolver::new(&[
        ("a.tela", r#"A<%@ include file="b.tela" %>"#),
        ("b.tela", r#"B<%@ include file="A.TELA" %>"#),
    ]);
    let out = parse_page(
        Path::new("a.tela"),
        r#"A<%@ include file="b.tela" %>"#,
        &resolver,
    );
    assert_eq!(out.errors.len(), 1);
    assert!(matches!(
        out.errors[0].kind,
        ParseErrorKind::CircularInclude(_)
    ));
    // the include chain stops at the cycle instead of recursing
    assert_eq!(out.dependencies.len(), 1);
}

#[test]
fn missing_include_is_an_error_not_a_panic() {
    let out = parse_page(
        Path::new("a.tela"),
        r#"<%@ include file="gone.tela" %>"#,
        &NoIncludes,
    );
    assert_eq!(out.errors.len(), 1);
    assert!(matches!(
        out.errors[0].kind,
        ParseErrorKind::IncludeNotFound(_)
    ));
}

#[test]
fn roundtrip_reproduces_original_bytes() {
    let src = r#"<%@ page language="rust" %><div class="a">hi<br/>there</div><%= now() %>"#;
    let out = parse_page(Path::new("page.tela"), src, &NoIncludes);
    assert!(out.errors.is_empty());
    assert_eq!(out.tree.serialize(&out.sources), src);
}
