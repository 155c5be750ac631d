//! Minimal server-control runtime that generated page code links against.
//!
//! Generated builders construct a tree of boxed [`Control`]s, append children
//! through container accessors, subscribe event handlers, and hand the root
//! back to the host for rendering.

pub mod controls;

pub use controls::{
    Anchor, Button, Checkbox, Form, Label, Media, Placeholder, Repeater, SubmitButton, Table,
    TextInput,
};

pub mod prelude {
    pub use crate::controls::{
        Anchor, Button, Checkbox, Form, Label, Media, Placeholder, Repeater, SubmitButton, Table,
        TextInput,
    };
    pub use crate::{Container, Control, ExprNode, Handler, TemplateFn, TextNode};
}

/// Event handlers subscribe into a list; firing walks every subscriber.
pub type Handler = fn();

pub trait Control {
    fn render(&self, out: &mut String);
    fn append(&mut self, child: Box<dyn Control>);
    fn set_attr(&mut self, name: &str, value: &str);
    fn id(&self) -> Option<&str> {
        None
    }
}

/// Ordered attribute list. Order is preserved so rendering is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attrs {
    entries: Vec<(String, String)>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self, out: &mut String) {
        for (name, value) in &self.entries {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
    }
}

#[derive(Default)]
pub struct Children(Vec<Box<dyn Control>>);

impl Children {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, child: Box<dyn Control>) {
        self.0.push(child);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn render(&self, out: &mut String) {
        for child in &self.0 {
            child.render(out);
        }
    }
}

/// Generic passthrough container; also serves as the page root and as the
/// destination controls hand to deferred templates.
#[derive(Default)]
pub struct Container {
    tag: Option<String>,
    id: Option<String>,
    attrs: Attrs,
    children: Children,
}

impl Container {
    /// Tagless root: renders its children only.
    pub fn page() -> Self {
        Self::default()
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Control for Container {
    fn render(&self, out: &mut String) {
        match &self.tag {
            Some(tag) => {
                out.push('<');
                out.push_str(tag);
                if let Some(id) = &self.id {
                    out.push_str(" id=\"");
                    out.push_str(&escape_attr(id));
                    out.push('"');
                }
                self.attrs.render(out);
                out.push('>');
                self.children.render(out);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            None => self.children.render(out),
        }
    }

    fn append(&mut self, child: Box<dyn Control>) {
        self.children.push(child);
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        self.attrs.set(name, value);
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Verbatim markup run. The text is authored source, so it renders unescaped.
pub struct TextNode {
    text: String,
}

impl TextNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Control for TextNode {
    fn render(&self, out: &mut String) {
        out.push_str(&self.text);
    }

    fn append(&mut self, _child: Box<dyn Control>) {}

    fn set_attr(&mut self, _name: &str, _value: &str) {}
}

/// A deferred expression evaluated at render time.
pub struct ExprNode {
    eval: Box<dyn Fn() -> String>,
}

impl ExprNode {
    pub fn new(eval: impl Fn() -> String + 'static) -> Self {
        Self {
            eval: Box::new(eval),
        }
    }
}

impl Control for ExprNode {
    fn render(&self, out: &mut String) {
        out.push_str(&(self.eval)());
    }

    fn append(&mut self, _child: Box<dyn Control>) {}

    fn set_attr(&mut self, _name: &str, _value: &str) {}
}

/// Deferred child instantiation: the closure fills a destination container
/// when the owning control decides to materialize its content.
pub struct TemplateFn {
    build: Box<dyn Fn(&mut Container)>,
}

impl TemplateFn {
    pub fn new(build: impl Fn(&mut Container) + 'static) -> Self {
        Self {
            build: Box::new(build),
        }
    }

    pub fn instantiate_into(&self, dest: &mut Container) {
        (self.build)(dest);
    }
}

pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::Button;

    #[test]
    fn build_tree_and_render() {
        let mut root = Container::element("div");
        root.set_attr("class", "app");
        root.append(Box::new(TextNode::new("hello ")));
        let mut b = Button::new();
        b.set_text("Go");
        root.append(Box::new(b));

        let mut out = String::new();
        root.render(&mut out);
        assert!(out.starts_with("<div class=\"app\">"));
        assert!(out.contains("hello "));
        assert!(out.contains("<button"));
        assert!(out.ends_with("</div>"));
    }

    #[test]
    fn page_root_renders_children_only() {
        let mut page = Container::page();
        page.append(Box::new(TextNode::new("raw")));
        let mut out = String::new();
        page.render(&mut out);
        assert_eq!(out, "raw");
    }

    #[test]
    fn attr_values_are_escaped() {
        let mut c = Container::element("span");
        c.set_attr("title", "a\"b<c");
        let mut out = String::new();
        c.render(&mut out);
        assert!(out.contains("title=\"a&quot;b&lt;c\""));
    }

    #[test]
    fn template_instantiates_into_destination() {
        let tpl = TemplateFn::new(|dest| {
            dest.append(Box::new(TextNode::new("item")));
        });
        let mut dest = Container::page();
        tpl.instantiate_into(&mut dest);
        assert_eq!(dest.len(), 1);
    }

    #[test]
    fn expr_node_evaluates_at_render() {
        let node = ExprNode::new(|| (1 + 2).to_string());
        let mut out = String::new();
        node.render(&mut out);
        assert_eq!(out, "3");
    }
}
