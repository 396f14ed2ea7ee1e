//! Integration tests for opening, saving, loading and migrating source lists.

mod common;

use std::fs;

use common::{feed_with, test_config, FakeGateway};
use feeder::registry::{backup_path, RefreshSettings};
use feeder::{
    AddSources, AlwaysConfirm, FeederError, NeverConfirm, RegistryState, SourceRegistry,
};
use tempfile::TempDir;

#[test]
fn test_open_creates_missing_source_list() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());

    let registry = SourceRegistry::open(&config).unwrap();

    let path = temp_dir.path().join("sourcelist.conf");
    assert!(path.exists());
    assert_eq!(registry.count(), 0);
    assert_eq!(registry.state(), RegistryState::Saved);
    assert_eq!(registry.savefile(), Some(path.as_path()));
}

#[test]
fn test_open_loads_existing_source_list() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());

    let mut first = SourceRegistry::open(&config).unwrap();
    first
        .add_unchecked(AddSources::one("http://a.example/rss").with_names(["Alpha"]))
        .unwrap();
    first.save(None, &AlwaysConfirm).unwrap();

    let second = SourceRegistry::open(&config).unwrap();
    assert_eq!(second.state(), RegistryState::Loaded);
    assert_eq!(second.count(), 1);
    assert_eq!(second.sources()[0].name(), "Alpha");
}

#[test]
fn test_open_corrupt_source_list_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());
    let path = config.data.sourcelist_path();
    fs::write(&path, "version = \"0.1.1\"\nsources_urls = [\"http://a\"]\n").unwrap();

    let result = SourceRegistry::open(&config);

    assert!(matches!(result, Err(FeederError::Parse(_))));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "version = \"0.1.1\"\nsources_urls = [\"http://a\"]\n"
    );
}

#[test]
fn test_open_corrupt_source_list_recreated_on_request() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(temp_dir.path());
    config.data.recreate_on_load_failure = true;
    let path = config.data.sourcelist_path();
    fs::write(&path, "not [valid toml").unwrap();

    let registry = SourceRegistry::open(&config).unwrap();

    assert_eq!(registry.count(), 0);
    assert_eq!(
        fs::read_to_string(backup_path(&path)).unwrap(),
        "not [valid toml"
    );
    assert!(fs::read_to_string(&path).unwrap().contains("0.1.1"));
}

#[test]
fn test_add_save_load_keeps_order() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("list.conf");

    let mut registry = SourceRegistry::new(temp_dir.path());
    registry
        .add_unchecked(vec!["http://a", "http://b"])
        .unwrap();
    registry.save(Some(&path), &AlwaysConfirm).unwrap();

    let mut loaded = SourceRegistry::new(temp_dir.path());
    loaded.load(&path, &AlwaysConfirm).unwrap();

    let urls: Vec<&str> = loaded.sources().iter().map(|s| s.url()).collect();
    assert_eq!(urls, vec!["http://a", "http://b"]);
    assert!(!loaded.has_unsaved_changes());
}

#[test]
fn test_open_migrates_legacy_source_list() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());
    let path = config.data.sourcelist_path();
    let legacy = r#"version = "0.1"
savefile_list = []
sources_url = ["http://rss.example.com/news.xml", "http://b.example/feed"]
sources_title = ["Example News", "Bee"]
sources_subtitle = ["Front Page", ""]
"#;
    fs::write(&path, legacy).unwrap();

    let registry = SourceRegistry::open(&config).unwrap();

    let backup = temp_dir.path().join("sourcelist_v0.1.conf");
    assert_eq!(fs::read_to_string(backup).unwrap(), legacy);
    assert_eq!(registry.version(), "0.1.1");
    assert_eq!(registry.count(), 2);
    assert_eq!(registry.sources()[0].display_name(), "Example News - Front Page");
    assert_eq!(registry.sources()[1].name(), "Bee");
    assert_eq!(registry.sources()[1].subname(), "");

    // The rewritten file loads without another migration.
    let reopened = SourceRegistry::open(&config).unwrap();
    assert_eq!(reopened.count(), 2);
    assert!(!temp_dir.path().join("sourcelist_v0.1.1.conf").exists());
}

#[test]
fn test_save_overwrite_declined_leaves_file_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());
    let mut registry = SourceRegistry::open(&config).unwrap();
    let path = config.data.sourcelist_path();
    let before = fs::read(&path).unwrap();

    registry.add_unchecked("http://a").unwrap();
    let result = registry.save(None, &NeverConfirm);

    assert!(matches!(result, Err(FeederError::Cancelled(_))));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn test_freshness_time_survives_save_and_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("list.conf");
    let gateway = FakeGateway::new().feed("http://a", feed_with("A", &["one", "two"]));

    let mut registry =
        SourceRegistry::new(temp_dir.path()).with_refresh_settings(RefreshSettings::default());
    registry
        .add_unchecked(AddSources::one("http://a").with_names(["Alpha"]))
        .unwrap();
    registry.refresh_all(&gateway).await;
    let time = registry.sources()[0].time().copied();
    assert!(time.is_some());
    registry.save(Some(&path), &AlwaysConfirm).unwrap();

    let mut loaded = SourceRegistry::new(temp_dir.path());
    loaded.load(&path, &AlwaysConfirm).unwrap();
    assert_eq!(loaded.sources()[0].file_time().copied(), time);

    // Articles come back from the article file.
    assert_eq!(loaded.load_articles(), 2);
    assert_eq!(loaded.sources()[0].articles()[0].summary(), "one");
}
