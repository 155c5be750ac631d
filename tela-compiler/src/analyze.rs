//! Page analysis.
//!
//! One depth-first pass over the parse tree that merges adjacent literal
//! runs, pulls out the page directive, template regions, placeholder ids and
//! server script blocks, and flattens non-server markup back into literal
//! text. Only server-controlled elements survive as constructed objects.

use std::path::PathBuf;

use crate::diag::{Diagnostic, order_by_severity};
use crate::location::Location;
use crate::node::{Attributes, NodeId, NodeKind, NodeTree, TagData};
use crate::parse::ParseOutput;

#[derive(Debug, Clone, PartialEq)]
pub struct PageDirective {
    pub attrs: Attributes,
    pub loc: Location,
}

impl PageDirective {
    pub fn language(&self) -> Option<&str> {
        self.attrs.get("language")
    }

    pub fn master(&self) -> Option<&str> {
        self.attrs.get("master")
    }

    pub fn title(&self) -> Option<&str> {
        self.attrs.get("title")
    }

    /// Generated type-name override.
    pub fn type_name(&self) -> Option<&str> {
        self.attrs.get("type")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptBlock {
    pub language: Option<String>,
    pub code: String,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRegion {
    pub placeholder_id: String,
    pub nodes: Vec<PageNode>,
}

/// External module referenced by a `reference` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct PageReference {
    pub module: String,
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageNode {
    Literal {
        text: String,
        loc: Location,
    },
    Code {
        code: String,
        is_expr: bool,
        loc: Location,
    },
    Control(ControlNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlNode {
    pub namespace: Option<String>,
    pub name: String,
    pub attrs: Attributes,
    pub children: Vec<PageNode>,
    pub loc: Location,
}

#[derive(Debug, Default)]
pub struct PageDetails {
    pub directive: Option<PageDirective>,
    pub nodes: Vec<PageNode>,
    pub regions: Vec<TemplateRegion>,
    pub placeholders: Vec<String>,
    pub scripts: Vec<ScriptBlock>,
    pub references: Vec<PageReference>,
    pub dependencies: Vec<PathBuf>,
    pub errors: Vec<Diagnostic>,
}

impl PageDetails {
    /// Warnings may be present on a healthy page; only error severity fails
    /// it.
    pub fn is_ok(&self) -> bool {
        !self
            .errors
            .iter()
            .any(|e| e.severity == crate::diag::Severity::Error)
    }

    /// Errors imply empty node/region collections; nothing downstream runs.
    fn failed(errors: Vec<Diagnostic>, dependencies: Vec<PathBuf>) -> Self {
        let mut errors = errors;
        order_by_severity(&mut errors);
        PageDetails {
            errors,
            dependencies,
            ..PageDetails::default()
        }
    }
}

pub fn analyze(parsed: &ParseOutput) -> PageDetails {
    let parse_errors: Vec<Diagnostic> = parsed
        .errors
        .iter()
        .map(|e| e.to_diagnostic(&parsed.sources))
        .collect();
    if !parse_errors.is_empty() {
        return PageDetails::failed(parse_errors, parsed.dependencies.clone());
    }

    let mut analyzer = Analyzer {
        parsed,
        directive: None,
        regions: Vec::new(),
        placeholders: Vec::new(),
        scripts: Vec::new(),
        references: Vec::new(),
        errors: Vec::new(),
    };
    let nodes = analyzer.lower_children(parsed.tree.children(NodeTree::ROOT), false);

    if analyzer.directive.is_none() {
        analyzer.errors.push(Diagnostic::error(
            "analysis/missing-page-directive",
            "page has no <%@ page %> directive",
        ));
    }

    let has_errors = analyzer
        .errors
        .iter()
        .any(|e| e.severity == crate::diag::Severity::Error);
    if has_errors {
        return PageDetails::failed(analyzer.errors, parsed.dependencies.clone());
    }

    let mut errors = analyzer.errors;
    order_by_severity(&mut errors);
    PageDetails {
        directive: analyzer.directive,
        nodes,
        regions: analyzer.regions,
        placeholders: analyzer.placeholders,
        scripts: analyzer.scripts,
        references: analyzer.references,
        dependencies: parsed.dependencies.clone(),
        errors,
    }
}

struct Analyzer<'a> {
    parsed: &'a ParseOutput,
    directive: Option<PageDirective>,
    regions: Vec<TemplateRegion>,
    placeholders: Vec<String>,
    scripts: Vec<ScriptBlock>,
    references: Vec<PageReference>,
    errors: Vec<Diagnostic>,
}

impl Analyzer<'_> {
    /// `flatten_closes` is set when the parent element was itself flattened
    /// to literal text, so its close tag must be reconstructed as a literal
    /// rather than silently consumed.
    fn lower_children(&mut self, children: &[NodeId], flatten_closes: bool) -> Vec<PageNode> {
        let mut out = Vec::new();
        for &child in children {
            let loc = self
                .parsed
                .tree
                .loc(child)
                .expect("non-root nodes carry a location");
            match self.parsed.tree.kind(child) {
                NodeKind::Root => {}
                NodeKind::Literal(text) => push_literal(&mut out, text.clone(), loc),
                NodeKind::ExpressionBlock { code, is_expr } => out.push(PageNode::Code {
                    code: code.clone(),
                    is_expr: *is_expr,
                    loc,
                }),
                NodeKind::Directive(directive) => self.lower_directive(directive, loc),
                NodeKind::CloseTag(_) => {
                    if flatten_closes {
                        push_literal(&mut out, self.parsed.sources.slice(loc).to_string(), loc);
                    }
                }
                NodeKind::SelfClosingTag(tag) => {
                    let tag = tag.clone();
                    self.lower_element(&tag, &[], loc, &mut out);
                }
                NodeKind::OpenTag(tag) => {
                    let tag = tag.clone();
                    let element_children = self.parsed.tree.children(child).to_vec();
                    self.lower_element(&tag, &element_children, loc, &mut out);
                }
            }
        }
        out
    }

    fn lower_directive(&mut self, directive: &crate::node::DirectiveData, loc: Location) {
        if directive.name.eq_ignore_ascii_case("page") {
            if self.directive.is_some() {
                self.errors.push(self.diag_at(
                    Diagnostic::error(
                        "analysis/duplicate-page-directive",
                        "page declares more than one <%@ page %> directive",
                    ),
                    loc,
                ));
            } else {
                self.directive = Some(PageDirective {
                    attrs: directive.attrs.clone(),
                    loc,
                });
            }
        } else if directive.name.eq_ignore_ascii_case("reference") {
            match directive.attrs.get("module") {
                Some(module) if !module.is_empty() => self.references.push(PageReference {
                    module: module.to_string(),
                    path: directive.attrs.get("path").map(str::to_string),
                }),
                _ => self.errors.push(self.diag_at(
                    Diagnostic::error(
                        "analysis/reference-missing-module",
                        "reference directive is missing a module attribute",
                    ),
                    loc,
                )),
            }
        } else {
            self.errors.push(self.diag_at(
                Diagnostic::warning(
                    "analysis/unknown-directive",
                    format!("unknown directive `{}`", directive.name),
                ),
                loc,
            ));
        }
    }

    fn lower_element(
        &mut self,
        tag: &TagData,
        children: &[NodeId],
        loc: Location,
        out: &mut Vec<PageNode>,
    ) {
        if tag.is_custom() {
            if tag.name_is("content") {
                self.lower_content_region(tag, children, loc);
                return;
            }
            if tag.name_is("placeholder") {
                match tag.attrs.id() {
                    Some(id) => self.placeholders.push(id.to_string()),
                    None => {
                        self.errors.push(self.diag_at(
                            Diagnostic::error(
                                "analysis/placeholder-missing-id",
                                "placeholder element has no id",
                            ),
                            loc,
                        ));
                        return;
                    }
                }
            }
            out.push(PageNode::Control(self.control_node(tag, children, loc)));
            return;
        }

        if tag.name_is("script") && tag.attrs.is_server() {
            self.extract_script(tag, children, loc);
            return;
        }

        if tag.attrs.is_server() {
            out.push(PageNode::Control(self.control_node(tag, children, loc)));
            return;
        }

        // non-server markup: reconstruct the open marker and flatten
        push_literal(out, self.parsed.sources.slice(loc).to_string(), loc);
        let mut lowered = self.lower_children(children, true);
        coalesce_into(out, &mut lowered);
    }

    fn control_node(&mut self, tag: &TagData, children: &[NodeId], loc: Location) -> ControlNode {
        ControlNode {
            namespace: tag.namespace.clone(),
            name: tag.name.clone(),
            attrs: tag.attrs.clone(),
            children: self.lower_children(children, false),
            loc,
        }
    }

    fn lower_content_region(&mut self, tag: &TagData, children: &[NodeId], loc: Location) {
        let Some(placeholder_id) = tag.attrs.get("for").filter(|v| !v.is_empty()) else {
            self.errors.push(self.diag_at(
                Diagnostic::error(
                    "analysis/content-missing-for",
                    "content region does not name its placeholder",
                ),
                loc,
            ));
            return;
        };
        let placeholder_id = placeholder_id.to_string();
        let nodes = self.lower_children(children, false);
        self.regions.push(TemplateRegion {
            placeholder_id,
            nodes,
        });
    }

    /// Script content is a single raw literal child; carry it verbatim.
    fn extract_script(&mut self, tag: &TagData, children: &[NodeId], loc: Location) {
        let mut code = String::new();
        for &child in children {
            if let NodeKind::Literal(text) = self.parsed.tree.kind(child) {
                code.push_str(text);
            }
        }
        self.scripts.push(ScriptBlock {
            language: tag.attrs.get("lang").map(str::to_string),
            code,
            loc,
        });
    }

    fn diag_at(&self, diag: Diagnostic, loc: Location) -> Diagnostic {
        let (line, column) = self.parsed.sources.line_col(loc.source, loc.offset);
        diag.at(
            self.parsed.sources.path(loc.source).display().to_string(),
            line,
            column,
        )
    }
}

/// Append a literal, merging with a trailing literal from the same source.
/// The merged span is the union: first fragment's start to last fragment's
/// end.
fn push_literal(out: &mut Vec<PageNode>, text: String, loc: Location) {
    if let Some(PageNode::Literal {
        text: last_text,
        loc: last_loc,
    }) = out.last_mut()
    {
        if last_loc.source == loc.source {
            last_text.push_str(&text);
            *last_loc = last_loc.span_to(&loc);
            return;
        }
    }
    out.push(PageNode::Literal { text, loc });
}

/// Splice lowered children into the parent list, re-merging at the seam.
fn coalesce_into(out: &mut Vec<PageNode>, lowered: &mut Vec<PageNode>) {
    for node in lowered.drain(..) {
        match node {
            PageNode::Literal { text, loc } => push_literal(out, text, loc),
            other => out.push(other),
        }
    }
}
