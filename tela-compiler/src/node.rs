//! Markup node tree.
//!
//! Nodes live in an arena owned by [`NodeTree`]; the parent link is a plain
//! index used only for upward traversal, and it is set exactly once when the
//! node is attached. The kind enum is closed, so consumers match
//! exhaustively.

use crate::location::{Location, SourceMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Ordered attribute list with the two derived flags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Server-controlled flag: a `server` attribute that is not `"false"`.
    /// The bare form (`<form server>`) counts.
    pub fn is_server(&self) -> bool {
        match self.get("server") {
            Some(v) => !v.eq_ignore_ascii_case("false"),
            None => false,
        }
    }

    /// Identifier flag: the `id` attribute, when present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.get("id").filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagData {
    pub namespace: Option<String>,
    pub name: String,
    pub attrs: Attributes,
}

impl TagData {
    /// Custom elements are namespaced (`t:Button`); they always compile to
    /// constructed objects.
    pub fn is_custom(&self) -> bool {
        self.namespace.is_some()
    }

    pub fn name_is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    fn matches(&self, other: &TagData) -> bool {
        let ns_match = match (&self.namespace, &other.namespace) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            (None, None) => true,
            _ => false,
        };
        ns_match && self.name.eq_ignore_ascii_case(&other.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveData {
    pub name: String,
    pub attrs: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    OpenTag(TagData),
    SelfClosingTag(TagData),
    CloseTag(TagData),
    Directive(DirectiveData),
    ExpressionBlock { code: String, is_expr: bool },
    Literal(String),
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub loc: Option<Location>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                loc: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Attach a new node under `parent`. The parent link is set here and
    /// never again.
    pub fn attach(&mut self, parent: NodeId, kind: NodeKind, loc: Location) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            loc: Some(loc),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn loc(&self, id: NodeId) -> Option<Location> {
        self.nodes[id.0].loc
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Re-serialize the tree by slicing node locations out of the sources.
    /// For a tree parsed from a single unmodified file this reproduces the
    /// original bytes.
    pub fn serialize(&self, sources: &SourceMap) -> String {
        let mut out = String::new();
        self.serialize_node(Self::ROOT, sources, &mut out);
        out
    }

    fn serialize_node(&self, id: NodeId, sources: &SourceMap, out: &mut String) {
        if let Some(loc) = self.loc(id) {
            out.push_str(sources.slice(loc));
        }
        for &child in self.children(id) {
            self.serialize_node(child, sources, out);
        }
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumes parser events and resolves open/close nesting against a
/// current-node pointer.
pub struct TreeBuilder {
    tree: NodeTree,
    current: NodeId,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            tree: NodeTree::new(),
            current: NodeTree::ROOT,
        }
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// Attach a leaf under the current node; the current node is unchanged.
    pub fn append(&mut self, kind: NodeKind, loc: Location) -> NodeId {
        self.tree.attach(self.current, kind, loc)
    }

    /// Attach an open tag and descend into it.
    pub fn open(&mut self, tag: TagData, loc: Location) -> NodeId {
        let id = self.tree.attach(self.current, NodeKind::OpenTag(tag), loc);
        self.current = id;
        id
    }

    /// Close-tag resolution.
    ///
    /// Custom close tags search upward to the root for the nearest open tag
    /// with matching namespace and name. Plain close tags search upward only
    /// until the nearest custom-element ancestor, matching by name. A match
    /// attaches the close node as the last child of the matched element and
    /// moves the current node to its parent; a stray close is dropped with
    /// the current node unchanged.
    pub fn close(&mut self, tag: TagData, loc: Location) {
        let custom = tag.is_custom();
        let mut cursor = self.current;
        let matched = loop {
            if cursor == NodeTree::ROOT {
                break None;
            }
            if let NodeKind::OpenTag(open) = self.tree.kind(cursor) {
                if custom {
                    if open.matches(&tag) {
                        break Some(cursor);
                    }
                } else {
                    if open.matches(&tag) {
                        break Some(cursor);
                    }
                    if open.is_custom() {
                        // plain closes never cross a custom boundary
                        break None;
                    }
                }
            }
            match self.tree.parent(cursor) {
                Some(parent) => cursor = parent,
                None => break None,
            }
        };

        if let Some(element) = matched {
            self.tree.attach(element, NodeKind::CloseTag(tag), loc);
            self.current = self.tree.parent(element).unwrap_or(NodeTree::ROOT);
        }
    }

    pub fn finish(self) -> NodeTree {
        self.tree
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
