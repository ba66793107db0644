use std::sync::Arc;

use tempfile::TempDir;
use termshield::config::{AppConfig, Settings};
use termshield::dictionary::DictionaryRegistry;
use termshield::pipeline::ShieldPipeline;
use termshield::DictError;

const DICT: &str = "main_fuzzy[80]
word[Apple Pencil]
kor[애플 펜슬]
fuzzy[90]

word[kill two birds
with one stone]
kor[일석이조]
";

fn setup(files: &[(&str, &str)]) -> (TempDir, Arc<DictionaryRegistry>) {
    let tmp = TempDir::new().expect("tempdir");
    for (name, body) in files {
        std::fs::write(tmp.path().join(name), body).expect("write dictionary");
    }
    let registry = Arc::new(DictionaryRegistry::new(tmp.path()));
    (tmp, registry)
}

/// Stand-in translator: upper-cases everything except sentinels, which it moves around.
fn fake_translate(text: &str) -> anyhow::Result<String> {
    let mut words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            if w.starts_with("TkdicoTranslate") {
                w.to_string()
            } else {
                w.to_uppercase()
            }
        })
        .collect();
    words.reverse();
    Ok(words.join(" "))
}

#[test]
fn translates_with_shielded_terms() {
    let (_tmp, registry) = setup(&[("dd.tkdic", DICT)]);
    registry.select("dd.tkdic").expect("select");
    let pipeline = ShieldPipeline::with_registry(registry, 85);

    let shielded = pipeline.prepare("I want to kill two birds with one stone using my Apple Pencil");
    assert_eq!(
        shielded.text,
        "I want to TkdicoTranslate2 using my TkdicoTranslate1"
    );
    assert_eq!(shielded.mapping.len(), 2);

    let out = pipeline
        .translate(
            "I want to kill two birds with one stone using my Apple Pencil",
            &mut fake_translate,
        )
        .expect("translate");
    assert_eq!(out, "애플 펜슬 MY USING 일석이조 TO WANT I");
}

#[test]
fn no_selection_passes_text_through() {
    let (_tmp, registry) = setup(&[("dd.tkdic", DICT)]);
    let pipeline = ShieldPipeline::with_registry(registry, 85);
    let s = pipeline.prepare("my Apple Pencil");
    assert_eq!(s.text, "my Apple Pencil");
    assert!(s.mapping.is_empty());
}

#[test]
fn unreadable_dictionary_passes_text_through() {
    let (tmp, registry) = setup(&[("dd.tkdic", DICT)]);
    registry.select("dd.tkdic").expect("select");
    std::fs::remove_file(tmp.path().join("dd.tkdic")).expect("remove behind registry's back");

    let pipeline = ShieldPipeline::with_registry(registry, 85);
    let s = pipeline.prepare("my Apple Pencil");
    assert_eq!(s.text, "my Apple Pencil");
    assert!(s.mapping.is_empty());
    assert!(matches!(
        pipeline.shield_with("x", "dd.tkdic"),
        Err(DictError::NotFound { .. })
    ));
}

#[test]
fn dictionary_edits_apply_to_the_next_request() {
    let (tmp, registry) = setup(&[("dd.tkdic", "word[stone]\nkor[돌]\n")]);
    registry.select("dd.tkdic").expect("select");
    let pipeline = ShieldPipeline::with_registry(registry, 85);
    assert_eq!(pipeline.prepare("a stone").text, "a TkdicoTranslate1");

    std::fs::write(tmp.path().join("dd.tkdic"), "word[bird]\nkor[새]\n").expect("rewrite");
    assert_eq!(pipeline.prepare("a stone").text, "a stone");
}

#[test]
fn deleting_the_active_dictionary_clears_selection() {
    let (_tmp, registry) = setup(&[("dd.tkdic", DICT)]);
    registry.select("dd.tkdic").expect("select");
    registry.delete("dd.tkdic").expect("delete");
    assert_eq!(registry.active(), None);

    let pipeline = ShieldPipeline::with_registry(registry, 85);
    assert!(pipeline.prepare("my Apple Pencil").mapping.is_empty());
}

#[test]
fn transform_errors_propagate() {
    let (_tmp, registry) = setup(&[]);
    let pipeline = ShieldPipeline::with_registry(registry, 85);
    let mut failing = |_: &str| -> anyhow::Result<String> { Err(anyhow::anyhow!("backend down")) };
    let err = pipeline.translate("x", &mut failing).unwrap_err();
    assert!(err.to_string().contains("backend down"));
}

#[test]
fn trace_files_are_written_per_request() {
    let (tmp, registry) = setup(&[("dd.tkdic", DICT)]);
    registry.select("dd.tkdic").expect("select");
    let mut settings = Settings::from_config(AppConfig::default(), None).expect("settings");
    settings.trace = true;
    settings.trace_dir = tmp.path().join("trace");

    let pipeline = ShieldPipeline::new(&settings, registry).expect("pipeline");
    pipeline
        .translate("my Apple Pencil", &mut |t: &str| -> anyhow::Result<String> { Ok(t.to_string()) })
        .expect("translate");

    let dir = tmp.path().join("trace");
    let shielded = std::fs::read_to_string(dir.join("req_000001.shielded.txt")).expect("trace");
    assert_eq!(shielded, "my TkdicoTranslate1");
    let restored = std::fs::read_to_string(dir.join("req_000001.restored.txt")).expect("trace");
    assert_eq!(restored, "my 애플 펜슬");
}
