//! Per-fragment source languages.
//!
//! Every authored fragment names its language; a provider lowers it to Rust
//! source for the final compilation unit. `rust` is the default and passes
//! through after a syntax check; `expr` is a small binding DSL that lowers to
//! a constants module. Both can appear in the same compilation unit.

use pest::Parser as _;

use crate::diag::Diagnostic;
use crate::emit::string_lit;
use crate::orchestrate::SourceFragment;

pub trait LanguageProvider: Send + Sync {
    fn language(&self) -> &'static str;
    fn lower(&self, fragment: &SourceFragment) -> Result<String, Diagnostic>;
}

/// Default language: authored Rust, validated with `syn` so syntax errors
/// surface with their own location instead of a later rustc failure on the
/// assembled unit.
pub struct RustLanguage;

impl LanguageProvider for RustLanguage {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn lower(&self, fragment: &SourceFragment) -> Result<String, Diagnostic> {
        match syn::parse_file(&fragment.code) {
            Ok(_) => Ok(fragment.code.clone()),
            Err(err) => {
                let start = err.span().start();
                Err(Diagnostic::error("rust/parse", err.to_string()).at(
                    fragment.origin.clone(),
                    start.line,
                    start.column + 1,
                ))
            }
        }
    }
}

#[derive(pest_derive::Parser)]
#[grammar = "expr.pest"]
struct ExprParser;

/// `name = literal` bindings lowered to a `pub mod` of constants named after
/// the fragment.
pub struct ExprLanguage;

impl LanguageProvider for ExprLanguage {
    fn language(&self) -> &'static str {
        "expr"
    }

    fn lower(&self, fragment: &SourceFragment) -> Result<String, Diagnostic> {
        let mut pairs = ExprParser::parse(Rule::file, &fragment.code)
            .map_err(|err| expr_error(&err, fragment))?;
        let Some(file) = pairs.next() else {
            return Ok(format!("pub mod {} {{}}\n", fragment.name));
        };

        let mut body = String::new();
        let mut seen = Vec::new();
        for binding in file.into_inner() {
            if binding.as_rule() != Rule::binding {
                continue;
            }
            let (line, column) = binding.as_span().start_pos().line_col();
            let mut parts = binding.into_inner();
            let (Some(ident), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            let const_name = ident.as_str().to_ascii_uppercase();
            if seen.contains(&const_name) {
                return Err(Diagnostic::error(
                    "expr/duplicate-binding",
                    format!("`{}` is bound more than once", ident.as_str()),
                )
                .at(fragment.origin.clone(), line, column));
            }
            seen.push(const_name.clone());

            match value.as_rule() {
                Rule::string => {
                    let raw = value.as_str();
                    let inner = &raw[1..raw.len() - 1];
                    body.push_str(&format!(
                        "    pub const {const_name}: &str = {};\n",
                        string_lit(inner)
                    ));
                }
                Rule::boolean => {
                    body.push_str(&format!(
                        "    pub const {const_name}: bool = {};\n",
                        value.as_str()
                    ));
                }
                Rule::number => {
                    body.push_str(&format!(
                        "    pub const {const_name}: i64 = {};\n",
                        value.as_str()
                    ));
                }
                _ => {}
            }
        }

        Ok(format!("pub mod {} {{\n{}}}\n", fragment.name, body))
    }
}

fn expr_error(err: &pest::error::Error<Rule>, fragment: &SourceFragment) -> Diagnostic {
    let (line, column) = match err.line_col {
        pest::error::LineColLocation::Pos((line, column)) => (line, column),
        pest::error::LineColLocation::Span((line, column), _) => (line, column),
    };
    Diagnostic::error("expr/parse", format!("malformed binding: {}", err.variant.message()))
        .at(fragment.origin.clone(), line, column)
}
