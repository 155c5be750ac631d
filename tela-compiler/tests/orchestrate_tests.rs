use tela_compiler::diag::{Diagnostic, Severity, order_by_severity, parse_rustc_output};
use tela_compiler::orchestrate::{
    BuildOptions, CancelToken, CompilationUnit, CompileOutcome, ModuleRef, Orchestrator,
    SourceFragment, dedup_references,
};

fn unit() -> CompilationUnit {
    CompilationUnit {
        crate_name: "tela_page_home".to_string(),
        type_name: "HomePage".to_string(),
        entry_symbol: "__tela_create_home_page".to_string(),
        embedded_source: "<div>markup</div>".to_string(),
        fragments: vec![SourceFragment {
            language: "rust".to_string(),
            name: "page".to_string(),
            code: "pub fn build() {}\n".to_string(),
            origin: "home.tela".to_string(),
        }],
        references: Vec::new(),
    }
}

#[test]
fn references_dedup_by_stable_identity_not_path() {
    let refs = vec![
        ModuleRef::at("tela_controls", "/a/libtela_controls.rlib"),
        ModuleRef::named("extra_widgets"),
        ModuleRef::at("tela_controls", "/b/libtela_controls.rlib"),
    ];
    let deduped = dedup_references(&refs);
    assert_eq!(deduped.len(), 2);
    assert_eq!(deduped[0].name, "tela_controls");
    // first occurrence wins
    assert_eq!(
        deduped[0].path.as_deref(),
        Some(std::path::Path::new("/a/libtela_controls.rlib"))
    );
    assert_eq!(deduped[1].name, "extra_widgets");
}

#[test]
fn diagnostics_order_most_severe_first() {
    let mut diags = vec![
        Diagnostic::warning("w1", "first warning"),
        Diagnostic::error("e1", "the error"),
        Diagnostic {
            id: "n1".to_string(),
            severity: Severity::Note,
            message: "a note".to_string(),
            location: None,
        },
        Diagnostic::error("e2", "second error"),
    ];
    order_by_severity(&mut diags);
    assert_eq!(diags[0].id, "e1");
    assert_eq!(diags[1].id, "e2");
    assert_eq!(diags[2].id, "w1");
    assert_eq!(diags[3].id, "n1");
}

#[test]
fn rustc_json_lines_map_to_diagnostics() {
    let stderr = concat!(
        r#"{"$message_type":"diagnostic","message":"cannot find value `x` in this scope","code":{"code":"E0425"},"level":"error","spans":[{"file_name":"tela_page_home.rs","byte_start":10,"byte_end":11,"line_start":3,"line_end":3,"column_start":5,"column_end":6,"is_primary":true}]}"#,
        "\n",
        r#"{"$message_type":"diagnostic","message":"unused variable: `y`","code":{"code":"unused_variables"},"level":"warning","spans":[{"file_name":"tela_page_home.rs","line_start":1,"line_end":1,"column_start":1,"column_end":2,"is_primary":true}]}"#,
        "\n",
        "error: aborting due to previous error\n",
    );
    let diags = parse_rustc_output(stderr);
    assert_eq!(diags.len(), 2);
    assert_eq!(diags[0].id, "E0425");
    assert_eq!(diags[0].severity, Severity::Error);
    let loc = diags[0].location.as_ref().expect("primary span");
    assert_eq!(loc.line, 3);
    assert_eq!(loc.column, 5);
    assert_eq!(diags[1].severity, Severity::Warning);
}

#[test]
fn assembled_unit_embeds_original_source() {
    let orchestrator = Orchestrator::with_default_providers();
    let assembled = orchestrator.assemble(&unit()).expect("assembles");
    assert!(assembled.contains("pub static PAGE_SOURCE: &str ="));
    assert!(assembled.contains("<div>markup</div>"));
    assert!(assembled.contains("pub fn build()"));
}

#[test]
fn canceled_compile_publishes_nothing() {
    let orchestrator = Orchestrator::with_default_providers();
    let cancel = CancelToken::new();
    cancel.cancel();
    let opts = BuildOptions::new(std::env::temp_dir().join("tela-never-used"));
    let outcome = orchestrator
        .compile(&unit(), &opts, &cancel)
        .expect("no io happens before the cancel check");
    assert!(matches!(outcome, CompileOutcome::Canceled));
    assert!(!opts.out_dir.join("tela_page_home.rs").exists());
}
