//! End-to-end pipeline tests over the shared fixtures: manifest → file
//! selection → merge → resolve → convert → write, via the real filesystem
//! reader and an in-memory writer.
#![allow(clippy::expect_used)]

use std::path::PathBuf;

use tokenkit_core::{
    BundleOptions, BundleRecord, CancellationToken, DocumentLoader, FsReader, MemoryWriter,
    OutputFormat, ResolveMode, ResolveOptions, TokenDocument, build_graph, bundle_all, resolve,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures")
}

fn fixture(name: &str) -> String {
    fixtures_dir().join(name).to_string_lossy().into_owned()
}

fn run_bundle(opts: &BundleOptions) -> (Vec<BundleRecord>, MemoryWriter) {
    let writer = MemoryWriter::new();
    let records = bundle_all(
        &fixture("manifest.json"),
        &FsReader,
        &writer,
        opts,
        &CancellationToken::new(),
    )
    .expect("bundle");
    (records, writer)
}

#[test]
fn enumerates_two_by_two_permutations() {
    let (records, _writer) = run_bundle(&BundleOptions::default());
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "theme-light_density-default",
            "theme-light_density-compact",
            "theme-dark_density-default",
            "theme-dark_density-compact",
        ]
    );
    assert!(records.iter().all(BundleRecord::is_ok));
}

#[test]
fn dark_theme_overrides_base_colors() {
    let (_records, writer) = run_bundle(&BundleOptions {
        output: Some("out".to_owned()),
        ..BundleOptions::default()
    });
    let dark = writer
        .text("out/theme-dark_density-default.json")
        .expect("dark output");
    assert!(dark.contains("#000000"), "bg overridden: {dark}");
    assert!(dark.contains("#eeeeee"), "fg overridden: {dark}");
    let light = writer
        .text("out/theme-light_density-default.json")
        .expect("light output");
    assert!(light.contains("#ffffff"), "bg kept: {light}");
}

#[test]
fn compact_density_overrides_spacing() {
    let (_records, writer) = run_bundle(&BundleOptions {
        output: Some("out".to_owned()),
        ..BundleOptions::default()
    });
    let compact = writer
        .text("out/theme-light_density-compact.json")
        .expect("compact output");
    assert!(compact.contains("\"2px\""), "sm overridden: {compact}");
    let default = writer
        .text("out/theme-light_density-default.json")
        .expect("default output");
    assert!(default.contains("\"4px\""), "sm kept: {default}");
}

#[test]
fn bundling_twice_is_byte_identical() {
    let (_r1, w1) = run_bundle(&BundleOptions::default());
    let (_r2, w2) = run_bundle(&BundleOptions::default());
    assert_eq!(w1.files(), w2.files(), "deterministic output bytes");
}

#[test]
fn resolve_all_removes_every_reference() {
    let (records, writer) = run_bundle(&BundleOptions {
        resolve_all: true,
        output: Some("out".to_owned()),
        ..BundleOptions::default()
    });
    assert!(records.iter().all(BundleRecord::is_ok));
    for (path, bytes) in writer.files() {
        let text = String::from_utf8(bytes).expect("utf8");
        assert!(!text.contains("$ref"), "{path} still has $ref: {text}");
        assert!(!text.contains("{color."), "{path} still has aliases: {text}");
    }
}

#[test]
fn alias_format_emits_alias_dialect() {
    let (_records, writer) = run_bundle(&BundleOptions {
        format: OutputFormat::Alias,
        output: Some("out".to_owned()),
        ..BundleOptions::default()
    });
    let light = writer
        .text("out/theme-light_density-default.json")
        .expect("light output");
    assert!(
        light.contains("{color.fg}"),
        "pointer refs became aliases: {light}"
    );
    assert!(!light.contains("$ref"), "no pointer refs remain: {light}");
}

#[test]
fn pointer_format_emits_pointer_dialect() {
    let (_records, writer) = run_bundle(&BundleOptions {
        format: OutputFormat::Pointer,
        output: Some("out".to_owned()),
        ..BundleOptions::default()
    });
    let light = writer
        .text("out/theme-light_density-default.json")
        .expect("light output");
    assert!(
        light.contains(r##""$ref": "#/color/fg""##),
        "aliases became pointer refs: {light}"
    );
}

#[test]
fn graph_over_bundled_output_is_clean() {
    let (_records, writer) = run_bundle(&BundleOptions {
        output: Some("out".to_owned()),
        ..BundleOptions::default()
    });
    let text = writer
        .text("out/theme-light_density-default.json")
        .expect("output");
    let doc = TokenDocument::from_json(&text).expect("parse output");
    let graph = build_graph(&doc);
    assert_eq!(graph.stats.invalid_references, 0);
    assert_eq!(graph.stats.circular_references, 0);
    assert!(graph.stats.token_count >= 6);
}

#[test]
fn cycle_fixture_fails_strict_resolution() {
    let reader = FsReader;
    let mut loader = DocumentLoader::new(&reader);
    let doc = loader
        .read_document(&fixture("tokens-cycle.json"))
        .expect("fixture");
    let err = resolve(
        &doc,
        &mut loader,
        &ResolveOptions {
            strict: true,
            mode: ResolveMode::All,
            ..ResolveOptions::default()
        },
    )
    .expect_err("cycle must fail strict resolution");
    assert!(err.to_string().contains("cycle"), "{err}");
}
