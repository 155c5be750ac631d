//! Markup parser.
//!
//! A hand-rolled byte-cursor scanner over the source text. Constructs are
//! dispatched off their opening delimiter: `<%--` server comment, `<%@`
//! directive, `<%=` expression block, `<%` code block, `</` close tag, `<x`
//! open tag; everything else is literal text. Parsing never aborts on the
//! first error: incomplete constructs are recorded and recovered as
//! literals, and all errors in a pass are collected.

use std::io;
use std::path::{Path, PathBuf};

use crate::diag::{DiagLocation, Diagnostic, Severity};
use crate::location::{Location, SourceId, SourceMap};
use crate::node::{Attributes, DirectiveData, NodeKind, NodeTree, TagData, TreeBuilder};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unterminated tag")]
    UnterminatedTag,
    #[error("unterminated directive")]
    UnterminatedDirective,
    #[error("unterminated code block")]
    UnterminatedCodeBlock,
    #[error("unterminated server comment")]
    UnterminatedComment,
    #[error("script element is never closed")]
    UnterminatedScript,
    #[error("circular include of {0}")]
    CircularInclude(String),
    #[error("include could not be read: {0}")]
    IncludeNotFound(String),
    #[error("include directive is missing a file attribute")]
    IncludeMissingFile,
}

impl ParseErrorKind {
    pub fn error_id(&self) -> &'static str {
        match self {
            ParseErrorKind::UnterminatedTag => "parse/unterminated-tag",
            ParseErrorKind::UnterminatedDirective => "parse/unterminated-directive",
            ParseErrorKind::UnterminatedCodeBlock => "parse/unterminated-code-block",
            ParseErrorKind::UnterminatedComment => "parse/unterminated-comment",
            ParseErrorKind::UnterminatedScript => "parse/unterminated-script",
            ParseErrorKind::CircularInclude(_) => "parse/circular-include",
            ParseErrorKind::IncludeNotFound(_) => "parse/include-not-found",
            ParseErrorKind::IncludeMissingFile => "parse/include-missing-file",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub loc: Location,
}

impl ParseError {
    pub fn to_diagnostic(&self, sources: &SourceMap) -> Diagnostic {
        let (line, column) = sources.line_col(self.loc.source, self.loc.offset);
        Diagnostic {
            id: self.kind.error_id().to_string(),
            severity: Severity::Error,
            message: self.kind.to_string(),
            location: Some(DiagLocation {
                file: sources.path(self.loc.source).display().to_string(),
                line,
                column,
            }),
        }
    }
}

/// Resolves an include target relative to the including file.
pub trait IncludeResolver {
    fn resolve(&self, from: &Path, target: &str) -> io::Result<(PathBuf, String)>;
}

/// Resolver over the real filesystem, relative to the including file's
/// directory.
pub struct DiskResolver;

impl IncludeResolver for DiskResolver {
    fn resolve(&self, from: &Path, target: &str) -> io::Result<(PathBuf, String)> {
        let path = match from.parent() {
            Some(dir) => dir.join(target),
            None => PathBuf::from(target),
        };
        let text = std::fs::read_to_string(&path)?;
        Ok((path, text))
    }
}

pub struct ParseOutput {
    pub tree: NodeTree,
    pub sources: SourceMap,
    pub root_source: SourceId,
    pub errors: Vec<ParseError>,
    /// Included files, in first-seen order. The root file is not listed.
    pub dependencies: Vec<PathBuf>,
}

pub fn parse_page(path: &Path, text: &str, resolver: &dyn IncludeResolver) -> ParseOutput {
    let mut parser = Parser {
        sources: SourceMap::new(),
        errors: Vec::new(),
        dependencies: Vec::new(),
        stack: vec![normalize_path(path)],
        resolver,
    };
    let root = parser.sources.insert(path, text);
    let mut builder = TreeBuilder::new();
    parser.parse_source(root, &mut builder);
    ParseOutput {
        tree: builder.finish(),
        sources: parser.sources,
        root_source: root,
        errors: parser.errors,
        dependencies: parser.dependencies,
    }
}

/// Case-insensitive key used by the circular-include check.
fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().to_lowercase().replace('\\', "/")
}

struct Parser<'r> {
    sources: SourceMap,
    errors: Vec<ParseError>,
    dependencies: Vec<PathBuf>,
    /// Active include chain, normalized; membership means recursion.
    stack: Vec<String>,
    resolver: &'r dyn IncludeResolver,
}

impl Parser<'_> {
    fn parse_source(&mut self, source: SourceId, builder: &mut TreeBuilder) {
        let text = self.sources.shared_text(source);
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if is_construct_start(bytes, i) {
                i = self.scan_construct(&text, source, i, builder);
            } else {
                let start = i;
                i += 1;
                while i < bytes.len() && !is_construct_start(bytes, i) {
                    i += 1;
                }
                builder.append(
                    NodeKind::Literal(text[start..i].to_string()),
                    Location::new(source, start, i - start),
                );
            }
        }
    }

    fn scan_construct(
        &mut self,
        text: &str,
        source: SourceId,
        start: usize,
        builder: &mut TreeBuilder,
    ) -> usize {
        let rest = &text[start..];
        if rest.starts_with("<%--") {
            self.scan_comment(text, source, start, builder)
        } else if rest.starts_with("<%@") {
            self.scan_directive(text, source, start, builder)
        } else if rest.starts_with("<%") {
            self.scan_code_block(text, source, start, builder)
        } else if rest.starts_with("</") {
            self.scan_close_tag(text, source, start, builder)
        } else {
            self.scan_open_tag(text, source, start, builder)
        }
    }

    /// `<%-- … --%>`: consumed whole, yields no node. Splits literal runs.
    fn scan_comment(
        &mut self,
        text: &str,
        source: SourceId,
        start: usize,
        builder: &mut TreeBuilder,
    ) -> usize {
        match text[start + 4..].find("--%>") {
            Some(rel) => start + 4 + rel + 4,
            None => self.recover_literal(
                text,
                source,
                start,
                ParseErrorKind::UnterminatedComment,
                builder,
            ),
        }
    }

    fn scan_directive(
        &mut self,
        text: &str,
        source: SourceId,
        start: usize,
        builder: &mut TreeBuilder,
    ) -> usize {
        let Some(rel) = text[start + 3..].find("%>") else {
            return self.recover_literal(
                text,
                source,
                start,
                ParseErrorKind::UnterminatedDirective,
                builder,
            );
        };
        let body = &text[start + 3..start + 3 + rel];
        let end = start + 3 + rel + 2;
        let loc = Location::new(source, start, end - start);
        let (name, attrs) = parse_directive_body(body);
        if name.eq_ignore_ascii_case("include") {
            self.handle_include(&attrs, source, loc, builder);
        } else {
            builder.append(NodeKind::Directive(DirectiveData { name, attrs }), loc);
        }
        end
    }

    /// `<% statements %>` and `<%= expression %>`.
    fn scan_code_block(
        &mut self,
        text: &str,
        source: SourceId,
        start: usize,
        builder: &mut TreeBuilder,
    ) -> usize {
        let is_expr = text.as_bytes().get(start + 2) == Some(&b'=');
        let body_start = start + if is_expr { 3 } else { 2 };
        match text[body_start..].find("%>") {
            Some(rel) => {
                let code = text[body_start..body_start + rel].trim().to_string();
                let end = body_start + rel + 2;
                builder.append(
                    NodeKind::ExpressionBlock { code, is_expr },
                    Location::new(source, start, end - start),
                );
                end
            }
            None => self.recover_literal(
                text,
                source,
                start,
                ParseErrorKind::UnterminatedCodeBlock,
                builder,
            ),
        }
    }

    fn scan_close_tag(
        &mut self,
        text: &str,
        source: SourceId,
        start: usize,
        builder: &mut TreeBuilder,
    ) -> usize {
        let bytes = text.as_bytes();
        let mut i = start + 2;
        let (namespace, name) = read_qualified_name(text, &mut i);
        while i < bytes.len() && bytes[i] != b'>' {
            i += 1;
        }
        if i >= bytes.len() {
            return self.recover_literal(
                text,
                source,
                start,
                ParseErrorKind::UnterminatedTag,
                builder,
            );
        }
        i += 1;
        builder.close(
            TagData {
                namespace,
                name,
                attrs: Attributes::new(),
            },
            Location::new(source, start, i - start),
        );
        i
    }

    fn scan_open_tag(
        &mut self,
        text: &str,
        source: SourceId,
        start: usize,
        builder: &mut TreeBuilder,
    ) -> usize {
        let bytes = text.as_bytes();
        let mut i = start + 1;
        let (namespace, name) = read_qualified_name(text, &mut i);
        let mut attrs = Attributes::new();
        let mut self_closing = false;
        let mut terminated = false;

        while i < bytes.len() {
            skip_ws(bytes, &mut i);
            if i >= bytes.len() {
                break;
            }
            match bytes[i] {
                b'/' => {
                    self_closing = true;
                    i += 1;
                    skip_ws(bytes, &mut i);
                    if i < bytes.len() && bytes[i] == b'>' {
                        i += 1;
                        terminated = true;
                    }
                    break;
                }
                b'>' => {
                    i += 1;
                    terminated = true;
                    break;
                }
                _ => {
                    if let Some((n, v)) = read_attribute(text, &mut i) {
                        attrs.push(n, v);
                    } else {
                        i += 1;
                    }
                }
            }
        }

        if !terminated {
            return self.recover_literal(
                text,
                source,
                start,
                ParseErrorKind::UnterminatedTag,
                builder,
            );
        }

        let loc = Location::new(source, start, i - start);
        let tag = TagData {
            namespace,
            name,
            attrs,
        };
        if self_closing {
            builder.append(NodeKind::SelfClosingTag(tag), loc);
            return i;
        }
        // script content is raw text up to the matching close tag; anything
        // inside would otherwise be misread as markup
        let raw_script = tag.namespace.is_none() && tag.name_is("script");
        builder.open(tag, loc);
        if raw_script {
            self.scan_raw_script(text, source, i, builder)
        } else {
            i
        }
    }

    fn scan_raw_script(
        &mut self,
        text: &str,
        source: SourceId,
        from: usize,
        builder: &mut TreeBuilder,
    ) -> usize {
        match find_ascii_ci(text, from, "</script") {
            Some(pos) => {
                if pos > from {
                    builder.append(
                        NodeKind::Literal(text[from..pos].to_string()),
                        Location::new(source, from, pos - from),
                    );
                }
                self.scan_close_tag(text, source, pos, builder)
            }
            None => self.recover_literal(
                text,
                source,
                from,
                ParseErrorKind::UnterminatedScript,
                builder,
            ),
        }
    }

    fn handle_include(
        &mut self,
        attrs: &Attributes,
        source: SourceId,
        loc: Location,
        builder: &mut TreeBuilder,
    ) {
        let Some(file) = attrs.get("file") else {
            self.errors.push(ParseError {
                kind: ParseErrorKind::IncludeMissingFile,
                loc,
            });
            return;
        };
        let from = self.sources.path(source).to_path_buf();
        match self.resolver.resolve(&from, file) {
            Ok((path, content)) => {
                let key = normalize_path(&path);
                if self.stack.iter().any(|p| *p == key) {
                    self.errors.push(ParseError {
                        kind: ParseErrorKind::CircularInclude(path.display().to_string()),
                        loc,
                    });
                    return;
                }
                if !self.dependencies.contains(&path) {
                    self.dependencies.push(path.clone());
                }
                let included = self.sources.insert(path, content);
                self.stack.push(key);
                self.parse_source(included, builder);
                self.stack.pop();
            }
            Err(err) => {
                self.errors.push(ParseError {
                    kind: ParseErrorKind::IncludeNotFound(format!("{file}: {err}")),
                    loc,
                });
            }
        }
    }

    /// Record an error spanning from `start` to end-of-input and keep the raw
    /// text as a literal so downstream output still carries it.
    fn recover_literal(
        &mut self,
        text: &str,
        source: SourceId,
        start: usize,
        kind: ParseErrorKind,
        builder: &mut TreeBuilder,
    ) -> usize {
        let loc = Location::new(source, start, text.len() - start);
        self.errors.push(ParseError { kind, loc });
        if start < text.len() {
            builder.append(NodeKind::Literal(text[start..].to_string()), loc);
        }
        text.len()
    }
}

fn is_construct_start(bytes: &[u8], i: usize) -> bool {
    if bytes[i] != b'<' {
        return false;
    }
    match bytes.get(i + 1) {
        Some(b'%') | Some(b'/') => true,
        Some(c) => c.is_ascii_alphabetic(),
        None => false,
    }
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// `name` or `ns:name`.
fn read_qualified_name(text: &str, i: &mut usize) -> (Option<String>, String) {
    let bytes = text.as_bytes();
    let start = *i;
    while *i < bytes.len() && (is_name_byte(bytes[*i]) || bytes[*i] == b':') {
        *i += 1;
    }
    let raw = &text[start..*i];
    match raw.split_once(':') {
        Some((ns, name)) if !ns.is_empty() && !name.is_empty() => {
            (Some(ns.to_string()), name.to_string())
        }
        _ => (None, raw.to_string()),
    }
}

/// `name`, `name="value"` or `name='value'`. A bare name gets an empty value.
fn read_attribute(text: &str, i: &mut usize) -> Option<(String, String)> {
    let bytes = text.as_bytes();
    let start = *i;
    while *i < bytes.len() && (is_name_byte(bytes[*i]) || bytes[*i] == b':' || bytes[*i] == b'.') {
        *i += 1;
    }
    if *i == start {
        return None;
    }
    let name = text[start..*i].to_string();

    skip_ws(bytes, i);
    if *i < bytes.len() && bytes[*i] == b'=' {
        *i += 1;
        skip_ws(bytes, i);
        if let Some(value) = read_quoted(text, i) {
            return Some((name, value));
        }
    }
    Some((name, String::new()))
}

fn read_quoted(text: &str, i: &mut usize) -> Option<String> {
    let bytes = text.as_bytes();
    if *i >= bytes.len() {
        return None;
    }
    let quote = bytes[*i];
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    *i += 1;
    let start = *i;
    while *i < bytes.len() && bytes[*i] != quote {
        *i += 1;
    }
    let value = text[start..*i].to_string();
    if *i < bytes.len() {
        *i += 1;
    }
    Some(value)
}

fn parse_directive_body(body: &str) -> (String, Attributes) {
    let bytes = body.as_bytes();
    let mut i = 0;
    skip_ws(bytes, &mut i);
    let start = i;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name = body[start..i].to_string();
    let mut attrs = Attributes::new();
    while i < bytes.len() {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            break;
        }
        if let Some((n, v)) = read_attribute(body, &mut i) {
            attrs.push(n, v);
        } else {
            i += 1;
        }
    }
    (name, attrs)
}

/// ASCII case-insensitive substring search.
fn find_ascii_ci(text: &str, from: usize, needle: &str) -> Option<usize> {
    let haystack = text.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() || from > haystack.len() - needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}
