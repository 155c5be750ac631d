//! Code emission.
//!
//! Walks analyzed page nodes and writes Rust source that reconstructs the
//! control tree imperatively. A stack of scope levels mirrors container
//! nesting; each level owns its container accessor expression and a local
//! name counter, so generated names never collide across nesting depths.

use std::path::Path;

use crate::analyze::{ControlNode, PageDetails, PageNode, TemplateRegion};
use crate::diag::{DiagLocation, Diagnostic};
use crate::location::Location;
use crate::parse::ParseOutput;
use crate::schema::{self, AttrBinding, Ctor, ValueKind};

#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Crate name of the control runtime the generated code links against.
    pub runtime_crate: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            runtime_crate: "tela_controls".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct EmitOutput {
    pub type_name: String,
    pub entry_symbol: String,
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl EmitOutput {
    pub fn is_ok(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(|d| d.severity == crate::diag::Severity::Error)
    }
}

pub fn emit_page(
    details: &PageDetails,
    parsed: &ParseOutput,
    page_path: &Path,
    opts: &EmitOptions,
) -> EmitOutput {
    let stem = page_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page");
    let mut diagnostics = Vec::new();

    let type_name = match details.directive.as_ref().and_then(|d| d.type_name()) {
        Some(name) if is_type_ident(name) => name.to_string(),
        Some(name) => {
            diagnostics.push(Diagnostic::error(
                "emit/invalid-type-name",
                format!("`{name}` is not a valid type name"),
            ));
            default_type_name(stem)
        }
        None => default_type_name(stem),
    };
    let entry_symbol = entry_symbol_for(&type_name);

    let mut e = Emitter {
        out: String::new(),
        levels: Vec::new(),
        indent: 0,
        diagnostics,
        parsed,
    };

    e.raw(&format!("use {}::prelude::*;\n\n", opts.runtime_crate));
    e.raw(&format!("pub struct {type_name};\n\n"));
    e.raw(&format!("impl {type_name} {{\n"));
    e.indent = 1;
    e.line("pub fn build() -> Container {");
    e.indent = 2;
    e.line("let mut page = Container::page();");
    e.push_level("page");
    for node in &details.nodes {
        e.emit_node(node);
    }
    e.pop_level();
    e.line("page");
    e.indent = 1;
    e.line("}");
    e.indent = 0;
    e.raw("}\n\n");

    let placeholder_list = details
        .placeholders
        .iter()
        .map(|p| string_lit(p))
        .collect::<Vec<_>>()
        .join(", ");
    e.raw(&format!(
        "pub const PLACEHOLDERS: &[&str] = &[{placeholder_list}];\n\n"
    ));

    for region in &details.regions {
        e.emit_region(region);
    }

    let region_entries = details
        .regions
        .iter()
        .map(|r| {
            format!(
                "({}, {} as fn(&mut Container))",
                string_lit(&r.placeholder_id),
                region_fn_name(&r.placeholder_id)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    e.raw("pub fn regions() -> &'static [(&'static str, fn(&mut Container))] {\n");
    e.raw(&format!("    &[{region_entries}]\n"));
    e.raw("}\n\n");

    e.raw(&format!(
        "#[unsafe(no_mangle)]\npub extern \"Rust\" fn {entry_symbol}() -> Box<Container> {{\n    Box::new({type_name}::build())\n}}\n"
    ));

    EmitOutput {
        type_name,
        entry_symbol,
        code: e.out,
        diagnostics: e.diagnostics,
    }
}

struct Level {
    accessor: String,
    counter: usize,
    depth: usize,
}

struct Emitter<'a> {
    out: String,
    levels: Vec<Level>,
    indent: usize,
    diagnostics: Vec<Diagnostic>,
    parsed: &'a ParseOutput,
}

impl Emitter<'_> {
    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn push_level(&mut self, accessor: impl Into<String>) {
        let depth = self.levels.len();
        self.levels.push(Level {
            accessor: accessor.into(),
            counter: 0,
            depth,
        });
    }

    fn pop_level(&mut self) {
        self.levels.pop();
    }

    fn accessor(&self) -> String {
        self.levels
            .last()
            .map(|l| l.accessor.clone())
            .expect("emission always runs inside a scope level")
    }

    fn fresh_name(&mut self) -> String {
        let level = self
            .levels
            .last_mut()
            .expect("emission always runs inside a scope level");
        let name = format!("c{}_{}", level.depth, level.counter);
        level.counter += 1;
        name
    }

    fn emit_node(&mut self, node: &PageNode) {
        match node {
            PageNode::Literal { text, .. } => {
                let acc = self.accessor();
                self.line(&format!(
                    "{acc}.append(Box::new(TextNode::new({})));",
                    string_lit(text)
                ));
            }
            PageNode::Code { code, is_expr, .. } => {
                if *is_expr {
                    let acc = self.accessor();
                    self.line(&format!(
                        "{acc}.append(Box::new(ExprNode::new(|| ({code}).to_string())));"
                    ));
                } else {
                    // authored statements run while the tree is being built
                    for stmt in code.lines() {
                        self.line(stmt.trim_end());
                    }
                }
            }
            PageNode::Control(control) => self.emit_control(control),
        }
    }

    fn emit_control(&mut self, control: &ControlNode) {
        let schema = if control.namespace.is_some() {
            match schema::custom(&control.name) {
                Some(s) => s,
                None => {
                    self.error_at(
                        "emit/unknown-control",
                        format!("unknown control `{}`", control.name),
                        control.loc,
                    );
                    return;
                }
            }
        } else {
            schema::builtin(&control.name, &control.attrs)
        };

        let var = self.fresh_name();
        let ctor = match schema.ctor {
            Ctor::Plain(c) => c.to_string(),
            Ctor::Element => format!(
                "Container::element({})",
                string_lit(&control.name.to_ascii_lowercase())
            ),
        };
        self.line(&format!("let mut {var} = {ctor};"));

        if let Some(id) = control.attrs.id() {
            let id = id.to_string();
            self.line(&format!("{var}.set_id({});", string_lit(&id)));
        }

        for (name, value) in control.attrs.iter() {
            if name.eq_ignore_ascii_case("server") || name.eq_ignore_ascii_case("id") {
                continue;
            }
            match schema.binding(name) {
                Some(AttrBinding::Text(setter)) => {
                    self.line(&format!("{var}.{setter}({});", string_lit(value)));
                }
                Some(AttrBinding::Typed(setter, ValueKind::Bool)) => match parse_bool(value) {
                    Some(parsed) => self.line(&format!("{var}.{setter}({parsed});")),
                    None => self.error_at(
                        "emit/invalid-attribute",
                        format!("`{value}` is not a boolean value for `{name}`"),
                        control.loc,
                    ),
                },
                Some(AttrBinding::Typed(setter, ValueKind::Int)) => {
                    match value.parse::<i64>() {
                        Ok(parsed) => self.line(&format!("{var}.{setter}({parsed});")),
                        Err(_) => self.error_at(
                            "emit/invalid-attribute",
                            format!("`{value}` is not an integer value for `{name}`"),
                            control.loc,
                        ),
                    }
                }
                Some(AttrBinding::Event(subscribe)) => {
                    if is_handler_path(value) {
                        self.line(&format!("{var}.{subscribe}({value});"));
                    } else {
                        self.error_at(
                            "emit/invalid-handler",
                            format!("`{value}` is not a handler name for `{name}`"),
                            control.loc,
                        );
                    }
                }
                Some(AttrBinding::Skip) => {}
                None => {
                    self.line(&format!(
                        "{var}.set_attr({}, {});",
                        string_lit(name),
                        string_lit(value)
                    ));
                }
            }
        }

        // template children bind as deferred closures; the rest nest eagerly
        let mut eager = Vec::new();
        for child in &control.children {
            if let PageNode::Control(c) = child {
                if let Some(setter) = schema.template_setter(&c.name) {
                    self.line(&format!(
                        "{var}.{setter}(TemplateFn::new(|dest: &mut Container| {{"
                    ));
                    self.indent += 1;
                    self.push_level("dest");
                    for template_node in &c.children {
                        self.emit_node(template_node);
                    }
                    self.pop_level();
                    self.indent -= 1;
                    self.line("}));");
                    continue;
                }
            }
            eager.push(child);
        }

        let parent = self.accessor();
        self.push_level(var.clone());
        for child in eager {
            self.emit_node(child);
        }
        self.pop_level();
        self.line(&format!("{parent}.append(Box::new({var}));"));
    }

    fn emit_region(&mut self, region: &TemplateRegion) {
        let fn_name = region_fn_name(&region.placeholder_id);
        self.raw(&format!("pub fn {fn_name}(dest: &mut Container) {{\n"));
        self.indent = 1;
        self.push_level("dest");
        for node in &region.nodes {
            self.emit_node(node);
        }
        self.pop_level();
        self.indent = 0;
        self.raw("}\n\n");
    }

    fn error_at(&mut self, id: &str, message: String, loc: Location) {
        let (line, column) = self.parsed.sources.line_col(loc.source, loc.offset);
        self.diagnostics.push(Diagnostic {
            id: id.to_string(),
            severity: crate::diag::Severity::Error,
            message,
            location: Some(DiagLocation {
                file: self.parsed.sources.path(loc.source).display().to_string(),
                line,
                column,
            }),
        });
    }
}

/// `home` → `HomePage`, `user_list` → `UserListPage`.
pub fn default_type_name(stem: &str) -> String {
    let mut out = String::new();
    let mut upper = true;
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() {
            if upper {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            upper = false;
        } else {
            upper = true;
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "Page");
    }
    if !out.ends_with("Page") {
        out.push_str("Page");
    }
    out
}

pub fn entry_symbol_for(type_name: &str) -> String {
    format!("__tela_create_{}", snake_case(type_name))
}

pub fn snake_case(name: &str) -> String {
    let mut out = String::new();
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    out
}

fn region_fn_name(placeholder_id: &str) -> String {
    let mut out = String::from("region_");
    for ch in placeholder_id.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }
    out
}

fn is_type_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Handler values must be a plain function path, e.g. `on_go` or
/// `handlers::on_go`.
fn is_handler_path(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value.split("::").all(|segment| {
        let mut chars = segment.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// The bare `disabled` form counts as true.
fn parse_bool(value: &str) -> Option<bool> {
    if value.is_empty() || value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Escape a string into a Rust literal.
pub(crate) fn string_lit(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}
