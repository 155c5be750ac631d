pub mod analyze;
pub mod diag;
pub mod emit;
pub mod error;
pub mod lang;
pub mod location;
pub mod node;
pub mod orchestrate;
pub mod parse;
pub mod schema;

pub use analyze::{PageDetails, PageDirective, PageNode, analyze};
pub use diag::{DiagLocation, Diagnostic, Severity, order_by_severity};
pub use emit::{EmitOptions, EmitOutput, emit_page};
pub use error::CompileError;
pub use lang::{ExprLanguage, LanguageProvider, RustLanguage};
pub use location::{Location, SourceId, SourceMap};
pub use node::{Attributes, NodeId, NodeKind, NodeTree, TagData, TreeBuilder};
pub use orchestrate::{
    Artifact, BuildOptions, CancelToken, CompilationUnit, CompileOutcome, ModuleRef, Orchestrator,
    SourceFragment, dedup_references,
};
pub use parse::{DiskResolver, IncludeResolver, ParseError, ParseErrorKind, ParseOutput, parse_page};
