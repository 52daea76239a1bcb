//! End-to-end behaviour of the engine through its public API.

use pretty_assertions::assert_eq;
use snix_compose::config::{DEFAULT_ERROR_STORAGE_KEY, DEFAULT_STORAGE_KEY};
use snix_compose::{
    Engine, EngineError, FileStore, KeyValueStore, LinkType, MemoryStore, OverrideMode,
    Placeholder, Snippet, StorageKeys,
};

fn engine() -> Engine<MemoryStore> {
    Engine::open(MemoryStore::new(), StorageKeys::default()).unwrap()
}

fn names<S: KeyValueStore>(engine: &Engine<S>) -> Vec<String> {
    engine
        .collection()
        .names()
        .into_iter()
        .map(String::from)
        .collect()
}

#[test]
fn duplicate_names_are_numbered() {
    let mut engine = engine();
    for _ in 0..3 {
        engine.add(Snippet::new("foo", ""), OverrideMode::Duplicate).unwrap();
    }
    assert_eq!(names(&engine), vec!["foo", "foo(1)", "foo(2)"]);
}

#[test]
fn overwrite_keeps_position() {
    let mut engine = engine();
    for name in ["a", "b", "c"] {
        engine.add(Snippet::new(name, "old"), OverrideMode::Duplicate).unwrap();
    }
    engine.add(Snippet::new("b", "new"), OverrideMode::Overwrite).unwrap();

    assert_eq!(names(&engine), vec!["a", "b", "c"]);
    assert_eq!(engine.collection().get("b").unwrap().code, "new");
}

#[test]
fn removal_cascades_transitively() {
    let mut engine = engine();
    for name in ["a", "b", "c", "d"] {
        engine.add(Snippet::new(name, ""), OverrideMode::Duplicate).unwrap();
    }
    engine.link("b", "a", LinkType::DependsOn).unwrap();
    engine.link("c", "b", LinkType::DependsOn).unwrap();

    let removed = engine.remove("a").unwrap();
    assert_eq!(removed, vec!["a", "b", "c"]);
    assert_eq!(names(&engine), vec!["d"]);
    assert_eq!(engine.collection().links().len(), 1);
}

#[test]
fn cyclic_both_links_terminate() {
    let mut engine = engine();
    for name in ["a", "b"] {
        engine.add(Snippet::new(name, ""), OverrideMode::Duplicate).unwrap();
    }
    engine.link("a", "b", LinkType::Both).unwrap();
    engine.link("b", "a", LinkType::Both).unwrap();

    let mut removed = engine.remove("b").unwrap();
    removed.sort();
    assert_eq!(removed, vec!["a", "b"]);
    assert!(engine.collection().is_empty());
}

#[test]
fn both_link_locks_order() {
    let mut engine = engine();
    for name in ["x", "y"] {
        engine.add(Snippet::new(name, ""), OverrideMode::Duplicate).unwrap();
    }
    engine.link("x", "y", LinkType::Both).unwrap();

    assert!(!engine.move_up("y", 1).unwrap());
    assert!(!engine.move_down("x", 1).unwrap());
    assert_eq!(names(&engine), vec!["x", "y"]);
}

#[test]
fn dependency_cannot_move_below_dependent() {
    let mut engine = engine();
    for name in ["lib", "other", "app"] {
        engine.add(Snippet::new(name, ""), OverrideMode::Duplicate).unwrap();
    }
    engine.link("app", "lib", LinkType::DependsOn).unwrap();

    assert!(engine.move_down("lib", 1).unwrap());
    assert!(!engine.move_down("lib", 1).unwrap());
    assert!(!engine.move_up("app", 2).unwrap());
    assert_eq!(names(&engine), vec!["other", "lib", "app"]);
}

#[test]
fn invalid_value_falls_back_to_error_code() {
    let mut engine = engine();
    let snippet = Snippet::new("counter", "let X = 1;")
        .with_placeholder(Placeholder::new("n", "X").with_pattern("[a-z]+"))
        .with_error_code("// fix me");
    engine.add(snippet, OverrideMode::Duplicate).unwrap();
    engine.set_value("counter", "n", "not valid!").unwrap();

    assert!(engine.has_errors());
    let error = &engine.errors()[0];
    assert_eq!(error.snippet_name, "counter");
    assert_eq!(error.placeholder_id, "n");
    assert_eq!(
        engine.output(),
        "/* Snippet counter */\n// fix me\n/*\n\tcounter.n: wrong pattern!\n\tCorrect pattern:\n\t[a-z]+\n*/\n\n\n"
    );

    engine.set_value("counter", "n", "count").unwrap();
    assert!(!engine.has_errors());
    assert_eq!(engine.output(), "/* Snippet counter */\nlet count = 1;\n\n");
}

#[test]
fn default_value_fills_placeholder() {
    let mut engine = engine();
    let snippet = Snippet::new("counter", "let X = 1;")
        .with_placeholder(Placeholder::new("n", "X").with_default("count"));
    engine.add(snippet, OverrideMode::Duplicate).unwrap();
    assert_eq!(engine.output(), "/* Snippet counter */\nlet count = 1;\n\n");
}

#[test]
fn errors_do_not_spill_into_other_snippets() {
    let mut engine = engine();
    engine
        .add(
            Snippet::new("bad", "X").with_placeholder(Placeholder::new("p", "X")),
            OverrideMode::Duplicate,
        )
        .unwrap();
    engine.add(Snippet::new("good", "ok();"), OverrideMode::Duplicate).unwrap();

    assert_eq!(engine.errors().len(), 1);
    assert!(engine.output().ends_with("/* Snippet good */\nok();\n\n"));
}

#[test]
fn unknown_names_are_errors() {
    let mut engine = engine();
    assert!(matches!(
        engine.remove("ghost"),
        Err(EngineError::SnippetNotFound(name)) if name == "ghost"
    ));
    engine.add(Snippet::new("a", ""), OverrideMode::Duplicate).unwrap();
    assert!(matches!(
        engine.set_value("a", "nope", "v"),
        Err(EngineError::PlaceholderNotFound { .. })
    ));
}

#[test]
fn state_survives_reload() {
    let mut engine = engine();
    engine
        .add(
            Snippet::new("lib", "fn F() {}").with_placeholder(Placeholder::new("f", "F")),
            OverrideMode::Duplicate,
        )
        .unwrap();
    engine.add(Snippet::new("app", "F();"), OverrideMode::Duplicate).unwrap();
    engine.link("app", "lib", LinkType::DependsOn).unwrap();
    engine.set_value("lib", "f", "helper").unwrap();

    let raw = engine.store().get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
    let store = MemoryStore::new().with_entry(DEFAULT_STORAGE_KEY, &raw);
    let reloaded = Engine::open(store, StorageKeys::default()).unwrap();

    assert_eq!(reloaded.snapshot(), engine.snapshot());
    assert_eq!(reloaded.output(), engine.output());
    assert!(reloaded.diagnostic().is_none());
    let app = reloaded.collection().id_of("app").unwrap();
    let lib = reloaded.collection().id_of("lib").unwrap();
    assert_eq!(reloaded.collection().links().outgoing(app)[0].target, lib);
}

#[test]
fn malformed_payload_is_quarantined() {
    let store = MemoryStore::new().with_entry(DEFAULT_STORAGE_KEY, "[[{\"name\": 3}]]");
    let engine = Engine::open(store, StorageKeys::default()).unwrap();

    assert!(engine.collection().is_empty());
    let diagnostic = engine.diagnostic().unwrap();
    assert_eq!(diagnostic.payload.as_deref(), Some("[[{\"name\": 3}]]"));
    assert_eq!(
        engine.store().get(DEFAULT_ERROR_STORAGE_KEY).unwrap().as_deref(),
        Some("[[{\"name\": 3}]]")
    );
    assert_eq!(
        engine.store().get(DEFAULT_STORAGE_KEY).unwrap().as_deref(),
        Some("[[],{},{}]")
    );
}

#[test]
fn link_table_mismatch_resets_on_load() {
    let payload = r#"[[{"name":"a","code":"x","placeholders":[]}],{}]"#;
    let store = MemoryStore::new().with_entry(DEFAULT_STORAGE_KEY, payload);
    let engine = Engine::open(store, StorageKeys::default()).unwrap();

    assert!(engine.collection().is_empty());
    assert_eq!(engine.output(), "");
    assert!(engine.diagnostic().is_some());
}

#[test]
fn earlier_quarantine_is_reported_on_open() {
    let store = MemoryStore::new().with_entry(DEFAULT_ERROR_STORAGE_KEY, "garbage");
    let engine = Engine::open(store, StorageKeys::default()).unwrap();
    assert_eq!(
        engine.diagnostic().and_then(|d| d.payload.as_deref()),
        Some("garbage")
    );
}

#[test]
fn file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileStore::with_dir(dir.path()).unwrap();
        let mut engine = Engine::open(store, StorageKeys::default()).unwrap();
        engine.add(Snippet::new("a", "one"), OverrideMode::Duplicate).unwrap();
        engine.add(Snippet::new("b", "two"), OverrideMode::Duplicate).unwrap();
        engine.move_down("a", 1).unwrap();
    }

    let store = FileStore::with_dir(dir.path()).unwrap();
    let engine = Engine::open(store, StorageKeys::default()).unwrap();
    assert_eq!(names(&engine), vec!["b", "a"]);
    assert_eq!(
        engine.output(),
        "/* Snippet b */\ntwo\n\n/* Snippet a */\none\n\n"
    );
}
