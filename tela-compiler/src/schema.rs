//! Control schemas.
//!
//! Static tables describing how markup elements map onto runtime control
//! types: which constructor to emit, how each attribute binds (string setter,
//! typed setter, or event subscription), and which child elements are
//! deferred templates.

use crate::node::Attributes;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    Bool,
    Int,
}

#[derive(Debug, Clone, Copy)]
pub enum AttrBinding {
    /// Bind through a string setter: `set_text("…")`.
    Text(&'static str),
    /// Parse the value at emit time and bind through a typed setter.
    Typed(&'static str, ValueKind),
    /// Subscribe a handler: `on_click(handler)`.
    Event(&'static str),
    /// Consumed during mapping (e.g. the `type` that selected an input
    /// variant); nothing is emitted.
    Skip,
}

#[derive(Debug, Clone, Copy)]
pub enum Ctor {
    /// Fixed constructor expression, e.g. `Button::new()`.
    Plain(&'static str),
    /// Generic passthrough keyed by the element's own tag name.
    Element,
}

#[derive(Debug)]
pub struct ControlSchema {
    pub ctor: Ctor,
    pub attrs: &'static [(&'static str, AttrBinding)],
    /// Child element name (lowercase) → template setter.
    pub templates: &'static [(&'static str, &'static str)],
}

impl ControlSchema {
    pub fn binding(&self, attr: &str) -> Option<&AttrBinding> {
        self.attrs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attr))
            .map(|(_, binding)| binding)
    }

    pub fn template_setter(&self, child: &str) -> Option<&'static str> {
        self.templates
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(child))
            .map(|(_, setter)| *setter)
    }
}

pub static CONTAINER: ControlSchema = ControlSchema {
    ctor: Ctor::Element,
    attrs: &[],
    templates: &[],
};

static BUTTON: ControlSchema = ControlSchema {
    ctor: Ctor::Plain("Button::new()"),
    attrs: &[
        ("text", AttrBinding::Text("set_text")),
        ("disabled", AttrBinding::Typed("set_disabled", ValueKind::Bool)),
        ("click", AttrBinding::Event("on_click")),
    ],
    templates: &[],
};

static LABEL: ControlSchema = ControlSchema {
    ctor: Ctor::Plain("Label::new()"),
    attrs: &[("text", AttrBinding::Text("set_text"))],
    templates: &[],
};

static FORM: ControlSchema = ControlSchema {
    ctor: Ctor::Plain("Form::new()"),
    attrs: &[
        ("action", AttrBinding::Text("set_action")),
        ("method", AttrBinding::Text("set_method")),
        ("submit", AttrBinding::Event("on_submit")),
    ],
    templates: &[],
};

static ANCHOR: ControlSchema = ControlSchema {
    ctor: Ctor::Plain("Anchor::new()"),
    attrs: &[("href", AttrBinding::Text("set_href"))],
    templates: &[],
};

static TABLE: ControlSchema = ControlSchema {
    ctor: Ctor::Plain("Table::new()"),
    attrs: &[],
    templates: &[],
};

static IMAGE: ControlSchema = ControlSchema {
    ctor: Ctor::Plain("Media::new(\"img\")"),
    attrs: &[("src", AttrBinding::Text("set_src"))],
    templates: &[],
};

static AUDIO: ControlSchema = ControlSchema {
    ctor: Ctor::Plain("Media::new(\"audio\")"),
    attrs: &[("src", AttrBinding::Text("set_src"))],
    templates: &[],
};

static VIDEO: ControlSchema = ControlSchema {
    ctor: Ctor::Plain("Media::new(\"video\")"),
    attrs: &[("src", AttrBinding::Text("set_src"))],
    templates: &[],
};

static TEXT_INPUT: ControlSchema = ControlSchema {
    ctor: Ctor::Plain("TextInput::new()"),
    attrs: &[
        ("name", AttrBinding::Text("set_name")),
        ("value", AttrBinding::Text("set_value")),
        ("type", AttrBinding::Text("set_kind")),
        ("change", AttrBinding::Event("on_change")),
    ],
    templates: &[],
};

static CHECKBOX: ControlSchema = ControlSchema {
    ctor: Ctor::Plain("Checkbox::new()"),
    attrs: &[
        ("name", AttrBinding::Text("set_name")),
        ("checked", AttrBinding::Typed("set_checked", ValueKind::Bool)),
        ("change", AttrBinding::Event("on_change")),
        ("type", AttrBinding::Skip),
    ],
    templates: &[],
};

static SUBMIT: ControlSchema = ControlSchema {
    ctor: Ctor::Plain("SubmitButton::new()"),
    attrs: &[
        ("name", AttrBinding::Text("set_name")),
        ("value", AttrBinding::Text("set_text")),
        ("text", AttrBinding::Text("set_text")),
        ("type", AttrBinding::Skip),
    ],
    templates: &[],
};

static PLACEHOLDER: ControlSchema = ControlSchema {
    ctor: Ctor::Plain("Placeholder::new()"),
    attrs: &[],
    templates: &[],
};

static REPEATER: ControlSchema = ControlSchema {
    ctor: Ctor::Plain("Repeater::new()"),
    attrs: &[("repeat", AttrBinding::Typed("set_repeat", ValueKind::Int))],
    templates: &[("itemtemplate", "set_item_template")],
};

/// Custom (namespaced) element lookup.
pub fn custom(name: &str) -> Option<&'static ControlSchema> {
    let schema = match name.to_ascii_lowercase().as_str() {
        "button" => &BUTTON,
        "label" => &LABEL,
        "form" => &FORM,
        "anchor" => &ANCHOR,
        "table" => &TABLE,
        "image" => &IMAGE,
        "textinput" => &TEXT_INPUT,
        "checkbox" => &CHECKBOX,
        "submit" => &SUBMIT,
        "placeholder" => &PLACEHOLDER,
        "repeater" => &REPEATER,
        _ => return None,
    };
    Some(schema)
}

/// Built-in name table for server-flagged plain elements. `input` is keyed by
/// its `type` attribute; anything unrecognized falls back to the generic
/// passthrough container.
pub fn builtin(tag: &str, attrs: &Attributes) -> &'static ControlSchema {
    match tag.to_ascii_lowercase().as_str() {
        "a" => &ANCHOR,
        "form" => &FORM,
        "table" => &TABLE,
        "img" => &IMAGE,
        "audio" => &AUDIO,
        "video" => &VIDEO,
        "label" => &LABEL,
        "button" => &BUTTON,
        "input" => match attrs.get("type").map(str::to_ascii_lowercase).as_deref() {
            Some("checkbox") => &CHECKBOX,
            Some("submit") => &SUBMIT,
            _ => &TEXT_INPUT,
        },
        _ => &CONTAINER,
    }
}
