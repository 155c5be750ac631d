use tela_compiler::lang::{ExprLanguage, LanguageProvider, RustLanguage};
use tela_compiler::orchestrate::{CompilationUnit, Orchestrator, SourceFragment};

fn fragment(language: &str, name: &str, code: &str) -> SourceFragment {
    SourceFragment {
        language: language.to_string(),
        name: name.to_string(),
        code: code.to_string(),
        origin: format!("home.tela#{name}"),
    }
}

fn unit(fragments: Vec<SourceFragment>) -> CompilationUnit {
    CompilationUnit {
        crate_name: "tela_page_test".to_string(),
        type_name: "TestPage".to_string(),
        entry_symbol: "__tela_create_test_page".to_string(),
        embedded_source: "<div>original</div>".to_string(),
        fragments,
        references: Vec::new(),
    }
}

#[test]
fn rust_fragments_pass_through_after_validation() {
    let lowered = RustLanguage
        .lower(&fragment("rust", "script_0", "pub fn on_go() {}\n"))
        .expect("valid rust");
    assert!(lowered.contains("pub fn on_go()"));
}

#[test]
fn rust_syntax_errors_carry_a_location() {
    let err = RustLanguage
        .lower(&fragment("rust", "script_0", "fn broken( {"))
        .expect_err("invalid rust");
    assert_eq!(err.id, "rust/parse");
    let loc = err.location.expect("location");
    assert_eq!(loc.file, "home.tela#script_0");
    assert!(loc.line >= 1);
}

#[test]
fn expr_bindings_lower_to_constants_module() {
    let code = "# page values\ntitle = \"Hello\"\ncount = 3\nflag = true\n";
    let lowered = ExprLanguage
        .lower(&fragment("expr", "script_0", code))
        .expect("valid bindings");
    assert!(lowered.contains("pub mod script_0 {"));
    assert!(lowered.contains(r#"pub const TITLE: &str = "Hello";"#));
    assert!(lowered.contains("pub const COUNT: i64 = 3;"));
    assert!(lowered.contains("pub const FLAG: bool = true;"));
}

#[test]
fn expr_negative_numbers_parse() {
    let lowered = ExprLanguage
        .lower(&fragment("expr", "values", "offset = -12"))
        .expect("valid binding");
    assert!(lowered.contains("pub const OFFSET: i64 = -12;"));
}

#[test]
fn expr_malformed_binding_is_a_diagnostic() {
    let err = ExprLanguage
        .lower(&fragment("expr", "script_0", "title ="))
        .expect_err("malformed");
    assert_eq!(err.id, "expr/parse");
    assert!(err.location.is_some());
}

#[test]
fn expr_duplicate_binding_is_a_diagnostic() {
    let err = ExprLanguage
        .lower(&fragment("expr", "script_0", "a = 1\na = 2"))
        .expect_err("duplicate");
    assert_eq!(err.id, "expr/duplicate-binding");
}

#[test]
fn both_languages_assemble_into_one_unit() {
    let orchestrator = Orchestrator::with_default_providers();
    let unit = unit(vec![
        fragment("rust", "script_0", "pub fn handler() {}\n"),
        fragment("expr", "script_1", "title = \"Hi\"\n"),
    ]);
    let assembled = orchestrator.assemble(&unit).expect("both providers");
    assert!(assembled.contains("pub fn handler()"));
    assert!(assembled.contains("pub mod script_1"));
    assert!(assembled.contains(r#"pub const TITLE: &str = "Hi";"#));
}

#[test]
fn unknown_language_is_a_diagnostic() {
    let orchestrator = Orchestrator::with_default_providers();
    let unit = unit(vec![fragment("cobol", "script_0", "MOVE 1 TO X")]);
    let err = orchestrator.assemble(&unit).expect_err("no cobol provider");
    assert!(err.iter().any(|d| d.id == "orchestrate/unknown-language"));
}
