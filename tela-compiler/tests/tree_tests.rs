use std::io;
use std::path::{Path, PathBuf};

use tela_compiler::location::Location;
use tela_compiler::node::{Attributes, NodeKind, NodeTree, TagData, TreeBuilder};
use tela_compiler::parse::{IncludeResolver, parse_page};

struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn resolve(&self, _from: &Path, target: &str) -> io::Result<(PathBuf, String)> {
        Err(io::Error::new(io::ErrorKind::NotFound, target.to_string()))
    }
}

#[test]
fn custom_close_pops_past_unmatched_plain_tag() {
    let out = parse_page(
        Path::new("page.tela"),
        "<x:Foo><b>text</x:Foo>",
        &NoIncludes,
    );
    assert!(out.errors.is_empty(), "no fatal error expected");

    let tree = &out.tree;
    let roots = tree.children(NodeTree::ROOT);
    assert_eq!(roots.len(), 1);
    let foo = roots[0];
    match tree.kind(foo) {
        NodeKind::OpenTag(tag) => {
            assert_eq!(tag.namespace.as_deref(), Some("x"));
            assert_eq!(tag.name, "Foo");
        }
        other => panic!("expected open tag, got {other:?}"),
    }

    // the unclosed <b> stays inside Foo; the close lands on Foo itself
    let foo_children = tree.children(foo);
    assert_eq!(foo_children.len(), 2);
    let b = foo_children[0];
    assert!(matches!(tree.kind(b), NodeKind::OpenTag(t) if t.name == "b"));
    assert!(matches!(tree.kind(foo_children[1]), NodeKind::CloseTag(t) if t.name == "Foo"));
    assert!(matches!(
        tree.kind(tree.children(b)[0]),
        NodeKind::Literal(t) if t == "text"
    ));
}

#[test]
fn plain_close_does_not_cross_custom_boundary() {
    let out = parse_page(Path::new("page.tela"), "<b><x:Foo></b></x:Foo>", &NoIncludes);

    let tree = &out.tree;
    let b = tree.children(NodeTree::ROOT)[0];
    assert!(matches!(tree.kind(b), NodeKind::OpenTag(t) if t.name == "b"));

    // </b> was dropped: b's only child is the custom element
    let b_children = tree.children(b);
    assert_eq!(b_children.len(), 1);
    let foo = b_children[0];
    assert!(matches!(tree.kind(foo), NodeKind::OpenTag(t) if t.is_custom()));

    let foo_children = tree.children(foo);
    assert_eq!(foo_children.len(), 1);
    assert!(matches!(tree.kind(foo_children[0]), NodeKind::CloseTag(t) if t.name == "Foo"));
}

#[test]
fn stray_close_is_dropped_with_current_unchanged() {
    let out = parse_page(Path::new("page.tela"), "<div></span>x</div>", &NoIncludes);

    let tree = &out.tree;
    let div = tree.children(NodeTree::ROOT)[0];
    let children = tree.children(div);
    // stray </span> vanished; the literal and the real close remain
    assert_eq!(children.len(), 2);
    assert!(matches!(tree.kind(children[0]), NodeKind::Literal(t) if t == "x"));
    assert!(matches!(tree.kind(children[1]), NodeKind::CloseTag(t) if t.name == "div"));
}

#[test]
fn close_matching_is_case_insensitive() {
    let out = parse_page(Path::new("page.tela"), "<DIV>x</div>", &NoIncludes);
    let tree = &out.tree;
    let div = tree.children(NodeTree::ROOT)[0];
    let children = tree.children(div);
    assert_eq!(children.len(), 2);
    assert!(matches!(tree.kind(children[1]), NodeKind::CloseTag(_)));
    // original byte shapes survive round-tripping regardless of case
    assert_eq!(out.tree.serialize(&out.sources), "<DIV>x</div>");
}

#[test]
fn parent_links_are_set_once_at_attach() {
    let mut builder = TreeBuilder::new();
    let div = builder.open(
        TagData {
            namespace: None,
            name: "div".to_string(),
            attrs: Attributes::new(),
        },
        Location::new(tela_compiler::SourceId(0), 0, 5),
    );
    let lit = builder.append(
        NodeKind::Literal("x".to_string()),
        Location::new(tela_compiler::SourceId(0), 5, 1),
    );
    let tree = builder.finish();

    assert_eq!(tree.parent(lit), Some(div));
    assert_eq!(tree.parent(div), Some(NodeTree::ROOT));
    assert_eq!(tree.parent(NodeTree::ROOT), None);
}
