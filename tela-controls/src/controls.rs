//! Typed server controls the code emitter maps markup elements onto.
//!
//! Event-style bindings subscribe (`on_*` pushes into a handler list); value
//! bindings assign through `set_*`. Anything without a dedicated setter lands
//! in the generic attribute bag.

use crate::{Attrs, Children, Container, Control, Handler, TemplateFn, escape_attr};

pub struct Button {
    id: Option<String>,
    text: String,
    disabled: bool,
    attrs: Attrs,
    children: Children,
    click: Vec<Handler>,
}

impl Button {
    pub fn new() -> Self {
        Self {
            id: None,
            text: String::new(),
            disabled: false,
            attrs: Attrs::new(),
            children: Children::new(),
            click: Vec::new(),
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn on_click(&mut self, handler: Handler) {
        self.click.push(handler);
    }

    pub fn click_handlers(&self) -> usize {
        self.click.len()
    }

    pub fn fire_click(&self) {
        for handler in &self.click {
            handler();
        }
    }
}

impl Default for Button {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for Button {
    fn render(&self, out: &mut String) {
        out.push_str("<button");
        render_id(out, &self.id);
        if self.disabled {
            out.push_str(" disabled");
        }
        self.attrs.render(out);
        out.push('>');
        out.push_str(&escape_attr(&self.text));
        self.children.render(out);
        out.push_str("</button>");
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

pub struct Label {
    id: Option<String>,
    text: String,
    attrs: Attrs,
    children: Children,
}

impl Label {
    pub fn new() -> Self {
        Self {
            id: None,
            text: String::new(),
            attrs: Attrs::new(),
            children: Children::new(),
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

impl Default for Label {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for Label {
    fn render(&self, out: &mut String) {
        out.push_str("<span");
        render_id(out, &self.id);
        self.attrs.render(out);
        out.push('>');
        out.push_str(&escape_attr(&self.text));
        self.children.render(out);
        out.push_str("</span>");
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

pub struct Form {
    id: Option<String>,
    action: String,
    method: String,
    attrs: Attrs,
    children: Children,
    submit: Vec<Handler>,
}

impl Form {
    pub fn new() -> Self {
        Self {
            id: None,
            action: String::new(),
            method: "post".to_string(),
            attrs: Attrs::new(),
            children: Children::new(),
            submit: Vec::new(),
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn set_action(&mut self, action: impl Into<String>) {
        self.action = action.into();
    }

    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = method.into();
    }

    pub fn on_submit(&mut self, handler: Handler) {
        self.submit.push(handler);
    }

    pub fn fire_submit(&self) {
        for handler in &self.submit {
            handler();
        }
    }
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for Form {
    fn render(&self, out: &mut String) {
        out.push_str("<form");
        render_id(out, &self.id);
        if !self.action.is_empty() {
            out.push_str(" action=\"");
            out.push_str(&escape_attr(&self.action));
            out.push('"');
        }
        out.push_str(" method=\"");
        out.push_str(&escape_attr(&self.method));
        out.push('"');
        self.attrs.render(out);
        out.push('>');
        self.children.render(out);
        out.push_str("</form>");
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

pub struct Anchor {
    id: Option<String>,
    href: String,
    attrs: Attrs,
    children: Children,
}

impl Anchor {
    pub fn new() -> Self {
        Self {
            id: None,
            href: String::new(),
            attrs: Attrs::new(),
            children: Children::new(),
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn set_href(&mut self, href: impl Into<String>) {
        self.href = href.into();
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for Anchor {
    fn render(&self, out: &mut String) {
        out.push_str("<a");
        render_id(out, &self.id);
        out.push_str(" href=\"");
        out.push_str(&escape_attr(&self.href));
        out.push('"');
        self.attrs.render(out);
        out.push('>');
        self.children.render(out);
        out.push_str("</a>");
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

/// img / audio / video; the concrete tag is picked by the emitter's name table.
pub struct Media {
    tag: String,
    id: Option<String>,
    src: String,
    attrs: Attrs,
    children: Children,
}

impl Media {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            src: String::new(),
            attrs: Attrs::new(),
            children: Children::new(),
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn set_src(&mut self, src: impl Into<String>) {
        self.src = src.into();
    }
}

impl Control for Media {
    fn render(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        render_id(out, &self.id);
        out.push_str(" src=\"");
        out.push_str(&escape_attr(&self.src));
        out.push('"');
        self.attrs.render(out);
        if self.children.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            self.children.render(out);
            out.push_str("</");
            out.push_str(&self.tag);
            out.push('>');
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

pub struct Table {
    id: Option<String>,
    attrs: Attrs,
    children: Children,
}

impl Table {
    pub fn new() -> Self {
        Self {
            id: None,
            attrs: Attrs::new(),
            children: Children::new(),
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for Table {
    fn render(&self, out: &mut String) {
        out.push_str("<table");
        render_id(out, &self.id);
        self.attrs.render(out);
        out.push('>');
        self.children.render(out);
        out.push_str("</table>");
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

pub struct TextInput {
    id: Option<String>,
    kind: String,
    name: String,
    value: String,
    attrs: Attrs,
    change: Vec<Handler>,
}

impl TextInput {
    pub fn new() -> Self {
        Self {
            id: None,
            kind: "text".to_string(),
            name: String::new(),
            value: String::new(),
            attrs: Attrs::new(),
            change: Vec::new(),
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn set_kind(&mut self, kind: impl Into<String>) {
        self.kind = kind.into();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn on_change(&mut self, handler: Handler) {
        self.change.push(handler);
    }
}

impl Default for TextInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for TextInput {
    fn render(&self, out: &mut String) {
        out.push_str("<input type=\"");
        out.push_str(&escape_attr(&self.kind));
        out.push('"');
        render_id(out, &self.id);
        if !self.name.is_empty() {
            out.push_str(" name=\"");
            out.push_str(&escape_attr(&self.name));
            out.push('"');
        }
        if !self.value.is_empty() {
            out.push_str(" value=\"");
            out.push_str(&escape_attr(&self.value));
            out.push('"');
        }
        self.attrs.render(out);
        out.push_str("/>");
    }

    fn append(&mut self, _child: Box<dyn Control>) {}

    fn set_attr(&mut self, name: &str, value: &str) {
        self.attrs.set(name, value);
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

pub struct Checkbox {
    id: Option<String>,
    name: String,
    checked: bool,
    attrs: Attrs,
    change: Vec<Handler>,
}

impl Checkbox {
    pub fn new() -> Self {
        Self {
            id: None,
            name: String::new(),
            checked: false,
            attrs: Attrs::new(),
            change: Vec::new(),
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }

    pub fn on_change(&mut self, handler: Handler) {
        self.change.push(handler);
    }
}

impl Default for Checkbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for Checkbox {
    fn render(&self, out: &mut String) {
        out.push_str("<input type=\"checkbox\"");
        render_id(out, &self.id);
        if !self.name.is_empty() {
            out.push_str(" name=\"");
            out.push_str(&escape_attr(&self.name));
            out.push('"');
        }
        if self.checked {
            out.push_str(" checked");
        }
        self.attrs.render(out);
        out.push_str("/>");
    }

    fn append(&mut self, _child: Box<dyn Control>) {}

    fn set_attr(&mut self, name: &str, value: &str) {
        self.attrs.set(name, value);
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

pub struct SubmitButton {
    id: Option<String>,
    name: String,
    text: String,
    attrs: Attrs,
}

impl SubmitButton {
    pub fn new() -> Self {
        Self {
            id: None,
            name: String::new(),
            text: String::new(),
            attrs: Attrs::new(),
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

impl Default for SubmitButton {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for SubmitButton {
    fn render(&self, out: &mut String) {
        out.push_str("<input type=\"submit\"");
        render_id(out, &self.id);
        if !self.name.is_empty() {
            out.push_str(" name=\"");
            out.push_str(&escape_attr(&self.name));
            out.push('"');
        }
        if !self.text.is_empty() {
            out.push_str(" value=\"");
            out.push_str(&escape_attr(&self.text));
            out.push('"');
        }
        self.attrs.render(out);
        out.push_str("/>");
    }

    fn append(&mut self, _child: Box<dyn Control>) {}

    fn set_attr(&mut self, name: &str, value: &str) {
        self.attrs.set(name, value);
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Named slot a master template exposes; content regions fill it by id.
pub struct Placeholder {
    id: Option<String>,
    children: Children,
}

impl Placeholder {
    pub fn new() -> Self {
        Self {
            id: None,
            children: Children::new(),
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }
}

impl Default for Placeholder {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for Placeholder {
    fn render(&self, out: &mut String) {
        self.children.render(out);
    }

    fn append(&mut self, child: Box<dyn Control>) {
        self.children.push(child);
    }

    fn set_attr(&mut self, _name: &str, _value: &str) {}

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Repeats its item template `repeat` times into a fresh container per pass.
pub struct Repeater {
    id: Option<String>,
    repeat: i64,
    item_template: Option<TemplateFn>,
}

impl Repeater {
    pub fn new() -> Self {
        Self {
            id: None,
            repeat: 1,
            item_template: None,
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn set_repeat(&mut self, repeat: i64) {
        self.repeat = repeat;
    }

    pub fn set_item_template(&mut self, template: TemplateFn) {
        self.item_template = Some(template);
    }
}

impl Default for Repeater {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for Repeater {
    fn render(&self, out: &mut String) {
        let Some(template) = &self.item_template else {
            return;
        };
        for _ in 0..self.repeat.max(0) {
            let mut item = Container::page();
            template.instantiate_into(&mut item);
            item.render(out);
        }
    }

    fn append(&mut self, _child: Box<dyn Control>) {}

    fn set_attr(&mut self, _name: &str, _value: &str) {}

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

fn render_id(out: &mut String, id: &Option<String>) {
    if let Some(id) = id {
        out.push_str(" id=\"");
        out.push_str(&escape_attr(id));
        out.push('"');
    }
}
