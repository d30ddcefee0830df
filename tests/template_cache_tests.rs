//! Integration Tests for the Template Cache
//!
//! Exercises lookups, freshness, explicit eviction and timed eviction against
//! real template files and against an in-memory source.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde_json::json;
use template_cache::{
    CacheConfig, CacheError, HandlebarsEngine, HandlebarsTemplate, Result, TemplateCache,
    TemplateEngine, TemplateSource,
};
use tempfile::TempDir;

// == Helper Functions ==

/// Creates a templates directory like the one the service reads from.
fn templates_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in [
        ("test1.txt", "Test1 {{variable}}"),
        ("test1-1.txt", "Test1 {{variable}}"),
        ("test1-2.txt", "Test1-2 {{variable}}"),
        ("test2.txt", "Test2 {{variable}}"),
        ("test3.txt", "Test3 {{variable}}"),
        ("test4.txt", "Test4 {{variable}}"),
        ("helpers.txt", "{{personalized_helper}}"),
    ] {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn cache_for(dir: &TempDir) -> TemplateCache {
    TemplateCache::new(CacheConfig::new(dir.path())).unwrap()
}

/// Overwrites `dest` with the content of `src` and moves its mtime forward.
fn replace_file(dir: &TempDir, src: &str, dest: &str, mtime_offset: Duration) {
    let content = fs::read(dir.path().join(src)).unwrap();
    let dest = dir.path().join(dest);
    fs::write(&dest, content).unwrap();

    let file = fs::File::options().write(true).open(&dest).unwrap();
    file.set_modified(SystemTime::now() + mtime_offset).unwrap();
}

async fn compile_many(cache: &TemplateCache, names: &[&str]) {
    for name in names {
        cache.get_template(name).await.unwrap();
    }
}

fn render(template: &HandlebarsTemplate, variable: &str) -> String {
    template.render(&json!({ "variable": variable })).unwrap()
}

fn personalized_helper(
    _: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    out.write("PERSONALIZED_HELPER")?;
    Ok(())
}

// == Retrieval Tests ==

#[tokio::test]
async fn test_rendering_one_file() {
    let dir = templates_dir();
    let cache = cache_for(&dir);

    let test1 = cache.get_template("test1.txt").await.unwrap();
    assert_eq!(render(&test1, "1"), "Test1 1");
    assert_eq!(render(&test1, "2"), "Test1 2");
    assert_eq!(render(&test1, "3"), "Test1 3");

    let missing = cache.get_template("non existent.txt").await;
    assert!(matches!(missing, Err(CacheError::NotFound(_))));
    assert_eq!(cache.count_in_memory().await, 1);
}

#[tokio::test]
async fn test_repeated_lookup_returns_same_template() {
    let dir = templates_dir();
    let cache = cache_for(&dir);

    let first = cache.get_template("test1.txt").await.unwrap();
    let second = cache.get_template("test1.txt").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.count_in_memory().await, 1);

    let stats = cache.stats().await;
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_rendering_various_files_and_removing() {
    let dir = templates_dir();
    let cache = cache_for(&dir);

    let test1 = cache.get_template("test1.txt").await.unwrap();
    let test2 = cache.get_template("test2.txt").await.unwrap();
    let test3 = cache.get_template("test3.txt").await.unwrap();
    assert_eq!(cache.count_in_memory().await, 3);

    assert_eq!(render(&test1, "1"), "Test1 1");
    assert_eq!(render(&test2, "2"), "Test2 2");
    assert_eq!(render(&test3, "3"), "Test3 3");

    assert!(cache.remove("test1.txt").await);
    assert_eq!(cache.count_in_memory().await, 2);
    assert!(cache.remove("test2.txt").await);
    assert_eq!(cache.count_in_memory().await, 1);
    assert!(cache.remove("test3.txt").await);
    assert_eq!(cache.count_in_memory().await, 0);
}

#[tokio::test]
async fn test_remove_absent_name() {
    let dir = templates_dir();
    let cache = cache_for(&dir);
    cache.get_template("test1.txt").await.unwrap();

    assert!(!cache.remove("test2.txt").await);
    assert_eq!(cache.count_in_memory().await, 1);
}

#[tokio::test]
async fn test_emptying_memory() {
    let dir = templates_dir();
    let cache = cache_for(&dir);

    compile_many(&cache, &["test1.txt", "test2.txt", "test3.txt"]).await;
    assert_eq!(cache.count_in_memory().await, 3);

    cache.empty().await;
    assert_eq!(cache.count_in_memory().await, 0);
    assert!(cache.cached_names().await.is_empty());
}

#[tokio::test]
async fn test_cached_names() {
    let dir = templates_dir();
    let cache = cache_for(&dir);

    compile_many(&cache, &["test3.txt", "test1.txt"]).await;
    assert_eq!(cache.cached_names().await, vec!["test1.txt", "test3.txt"]);
}

// == Freshness Tests ==

#[tokio::test]
async fn test_updating_compiled_when_file_is_modified() {
    let dir = templates_dir();
    let cache = cache_for(&dir);

    let test1 = cache.get_template("test1.txt").await.unwrap();
    assert_eq!(render(&test1, "1"), "Test1 1");

    replace_file(&dir, "test1-2.txt", "test1.txt", Duration::from_secs(2));
    let modified = cache.get_template("test1.txt").await.unwrap();
    assert_eq!(render(&modified, "1"), "Test1-2 1");
    assert!(!Arc::ptr_eq(&test1, &modified));

    replace_file(&dir, "test1-1.txt", "test1.txt", Duration::from_secs(4));
    let again = cache.get_template("test1.txt").await.unwrap();
    assert_eq!(render(&again, "1"), "Test1 1");

    assert_eq!(cache.count_in_memory().await, 1);
    assert_eq!(cache.stats().await.recompilations, 2);
}

#[tokio::test]
async fn test_compile_failure_keeps_previous_entry() {
    let dir = templates_dir();
    let cache = cache_for(&dir);

    let original = cache.get_template("test2.txt").await.unwrap();

    fs::write(dir.path().join("broken.txt"), "{{#if variable}}unterminated").unwrap();
    replace_file(&dir, "broken.txt", "test2.txt", Duration::from_secs(2));

    let result = cache.get_template("test2.txt").await;
    assert!(matches!(result, Err(CacheError::Compile { .. })));
    assert_eq!(cache.cached_names().await, vec!["test2.txt"]);

    fs::write(dir.path().join("fixed.txt"), "Fixed {{variable}}").unwrap();
    replace_file(&dir, "fixed.txt", "test2.txt", Duration::from_secs(4));

    let fixed = cache.get_template("test2.txt").await.unwrap();
    assert_eq!(render(&fixed, "2"), "Fixed 2");
    assert_eq!(render(&original, "2"), "Test2 2");
}

#[tokio::test]
async fn test_deleted_source_is_not_found() {
    let dir = templates_dir();
    let cache = cache_for(&dir);

    cache.get_template("test4.txt").await.unwrap();
    fs::remove_file(dir.path().join("test4.txt")).unwrap();

    let result = cache.get_template("test4.txt").await;
    assert!(matches!(result, Err(CacheError::NotFound(_))));
}

// == Engine Access Tests ==

#[tokio::test]
async fn test_access_to_engine_helpers() {
    let dir = templates_dir();
    let cache = cache_for(&dir);

    cache
        .engine()
        .register_helper("personalized_helper", Box::new(personalized_helper));

    let helper_test = cache.get_template("helpers.txt").await.unwrap();
    assert_eq!(helper_test.render(&json!({})).unwrap(), "PERSONALIZED_HELPER");
}

#[tokio::test]
async fn test_independent_caches_have_independent_engines() {
    let dir = templates_dir();
    let with_helper = cache_for(&dir);
    let without_helper = cache_for(&dir);

    with_helper
        .engine()
        .register_helper("personalized_helper", Box::new(personalized_helper));
    without_helper.engine().set_strict_mode(true);

    let rendered = with_helper.get_template("helpers.txt").await.unwrap();
    assert_eq!(rendered.render(&json!({})).unwrap(), "PERSONALIZED_HELPER");

    let other = without_helper.get_template("helpers.txt").await.unwrap();
    assert!(other.render(&json!({})).is_err());
}

// == Timed Eviction Tests ==

#[tokio::test(start_paused = true)]
async fn test_controlling_memory_leaks() {
    let dir = templates_dir();
    let cache = cache_for(&dir);

    cache.set_max_duration(Duration::from_secs(1));
    cache.set_sweep_interval(Duration::from_secs(1)).unwrap();
    compile_many(&cache, &["test1.txt", "test2.txt", "test3.txt", "test4.txt"]).await;
    assert_eq!(cache.count_in_memory().await, 4);

    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(cache.count_in_memory().await, 4);

    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(cache.count_in_memory().await, 0);
    assert_eq!(cache.stats().await.evictions, 4);
}

#[tokio::test(start_paused = true)]
async fn test_controlling_memory_leaks_staggered() {
    let dir = templates_dir();
    let cache = cache_for(&dir);

    cache.set_max_duration(Duration::from_secs(2));
    cache.set_sweep_interval(Duration::from_millis(100)).unwrap();

    cache.get_template("test1.txt").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    cache.get_template("test2.txt").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    cache.get_template("test3.txt").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    cache.get_template("test4.txt").await.unwrap();
    assert_eq!(cache.count_in_memory().await, 4);

    // Checks sit between sweeps so each lands after exactly one more eviction
    tokio::time::sleep(Duration::from_millis(650)).await;
    assert_eq!(cache.count_in_memory().await, 3);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(cache.count_in_memory().await, 2);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(cache.count_in_memory().await, 1);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(cache.count_in_memory().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_fresh_hits_do_not_extend_lifetime() {
    let dir = templates_dir();
    let cache = cache_for(&dir);

    cache.set_max_duration(Duration::from_secs(1));
    cache.set_sweep_interval(Duration::from_millis(100)).unwrap();

    cache.get_template("test1.txt").await.unwrap();
    for _ in 0..9 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cache.get_template("test1.txt").await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(cache.count_in_memory().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_shorter_max_duration_applies_immediately() {
    let dir = templates_dir();
    let cache = cache_for(&dir);

    compile_many(&cache, &["test1.txt", "test2.txt"]).await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(cache.count_in_memory().await, 2);

    cache.set_max_duration(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(cache.count_in_memory().await, 0);
}

// == In-Memory Source ==

/// Source backed by a map, with modification times set by the test.
#[derive(Clone, Default)]
struct MemorySource {
    files: Arc<Mutex<HashMap<PathBuf, (String, SystemTime)>>>,
    fail_stat: Arc<AtomicBool>,
}

impl MemorySource {
    fn write(&self, path: &str, content: &str, modified_secs: u64) {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(modified_secs);
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), (content.to_string(), modified));
    }
}

impl TemplateSource for MemorySource {
    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|(content, _)| content.clone().into_bytes())
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        if self.fail_stat.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|(_, modified)| *modified)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}

/// Engine that counts how often it compiles.
#[derive(Default)]
struct CountingEngine {
    inner: HandlebarsEngine,
    compiles: Arc<AtomicUsize>,
}

impl TemplateEngine for CountingEngine {
    type Template = HandlebarsTemplate;

    fn compile(&self, name: &str, source: &str) -> Result<HandlebarsTemplate> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        self.inner.compile(name, source)
    }
}

fn memory_cache() -> (
    TemplateCache<CountingEngine, MemorySource>,
    Arc<AtomicUsize>,
    MemorySource,
) {
    let engine = CountingEngine::default();
    let compiles = Arc::clone(&engine.compiles);
    let source = MemorySource::default();
    let cache =
        TemplateCache::with_parts(CacheConfig::new("/templates"), engine, source.clone()).unwrap();
    (cache, compiles, source)
}

#[tokio::test]
async fn test_equal_mtime_is_fresh() {
    let (cache, compiles, source) = memory_cache();
    source.write("/templates/page", "A {{x}}", 100);

    let first = cache.get_template("page").await.unwrap();
    source.write("/templates/page", "B {{x}}", 100);
    let served = cache.get_template("page").await.unwrap();

    assert!(Arc::ptr_eq(&first, &served));
    assert_eq!(served.render(&json!({"x": 1})).unwrap(), "A 1");
    assert_eq!(compiles.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_older_mtime_is_fresh() {
    let (cache, compiles, source) = memory_cache();
    source.write("/templates/page", "A", 100);

    cache.get_template("page").await.unwrap();
    source.write("/templates/page", "B", 50);
    let served = cache.get_template("page").await.unwrap();

    assert_eq!(served.render(&json!({})).unwrap(), "A");
    assert_eq!(compiles.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_round_trip_recompiles_each_time() {
    let (cache, compiles, source) = memory_cache();

    source.write("/templates/page", "A {{x}}", 100);
    let a = cache.get_template("page").await.unwrap();
    source.write("/templates/page", "B {{x}}", 101);
    let b = cache.get_template("page").await.unwrap();
    source.write("/templates/page", "A {{x}}", 102);
    let a_again = cache.get_template("page").await.unwrap();

    let data = json!({"x": "!"});
    assert_eq!(a.render(&data).unwrap(), "A !");
    assert_eq!(b.render(&data).unwrap(), "B !");
    assert_eq!(a_again.render(&data).unwrap(), "A !");
    assert_eq!(compiles.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_stat_failure_keeps_cached_entry() {
    let (cache, _compiles, source) = memory_cache();
    source.write("/templates/page", "A", 100);
    cache.get_template("page").await.unwrap();

    source.fail_stat.store(true, Ordering::SeqCst);
    let result = cache.get_template("page").await;

    assert!(matches!(result, Err(CacheError::Io { .. })));
    assert_eq!(cache.cached_names().await, vec!["page"]);
}

#[tokio::test]
async fn test_io_failure_on_first_load_caches_nothing() {
    let (cache, _compiles, source) = memory_cache();
    source.write("/templates/page", "A", 100);
    source.fail_stat.store(true, Ordering::SeqCst);

    let result = cache.get_template("page").await;

    assert!(matches!(result, Err(CacheError::Io { .. })));
    assert_eq!(cache.count_in_memory().await, 0);
}

#[tokio::test]
async fn test_base_path_change_resolves_new_directory() {
    let (cache, _compiles, source) = memory_cache();
    source.write("/templates/page", "old", 100);
    source.write("/other/page", "new", 200);

    let first = cache.get_template("page").await.unwrap();
    assert_eq!(first.render(&json!({})).unwrap(), "old");

    cache.set_base_path("/other");
    let second = cache.get_template("page").await.unwrap();
    assert_eq!(second.render(&json!({})).unwrap(), "new");
    assert!(matches!(
        cache.get_template("missing").await,
        Err(CacheError::NotFound(_))
    ));
}
