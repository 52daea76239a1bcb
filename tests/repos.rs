//! Repo manifests and web loading through the public `remote` API.

use pretty_assertions::assert_eq;
use snix_compose::remote::{RepoStatus, WebSource, categories, check_repos};
use snix_compose::{Engine, MemoryStore, StorageKeys};
use std::fs;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn reports_up_and_down_repos() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("main.repo.json");
    fs::write(
        &manifest,
        r#"{"repoID":"main","snippetLinks":[
            {"repoID":"main","name":"a","link":"./a.json","category":"ui"},
            {"repoID":"main","name":"b","link":"./b.json","category":"net"},
            {"repoID":"main","name":"c","link":"./c.json","category":"ui"}
        ]}"#,
    )
    .unwrap();
    let missing = dir.path().join("gone.repo.json");
    let urls = vec![
        manifest.to_string_lossy().into_owned(),
        missing.to_string_lossy().into_owned(),
    ];

    let source = WebSource::new(Duration::from_secs(1)).unwrap();
    let reports = check_repos(&source, &urls).await;

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].status, RepoStatus::Up { snippet_count: 3 });
    assert_eq!(reports[0].display_name(), "main");
    assert!(matches!(reports[1].status, RepoStatus::Down { .. }));
    assert!(reports[1].repo.is_none());

    let repos: Vec<_> = reports.into_iter().filter_map(|r| r.repo).collect();
    let grouped = categories(&repos);
    let names: Vec<_> = grouped.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["ui", "net"]);
    assert_eq!(grouped[0].links.len(), 2);
}

#[tokio::test]
async fn loads_snippet_file_with_imports() {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("lib.yaml");
    let app = dir.path().join("app.json");
    fs::write(&lib, "name: lib\ncode: \"lib();\"\n").unwrap();
    fs::write(
        &app,
        format!(
            r#"{{"name":"app","code":"app();","imports":[{{"link":"{}","linkType":"dependson"}}]}}"#,
            lib.display()
        ),
    )
    .unwrap();

    let source = WebSource::new(Duration::from_secs(1)).unwrap();
    let mut engine = Engine::open(MemoryStore::new(), StorageKeys::default()).unwrap();
    let name = engine
        .load_from_web(&app.to_string_lossy(), &source, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(name, "app");
    assert_eq!(engine.collection().names(), vec!["lib", "app"]);
    assert_eq!(
        engine.output(),
        "/* Snippet lib */\nlib();\n\n/* Snippet app */\napp();\n\n"
    );
}
