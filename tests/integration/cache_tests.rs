use filetime::{set_file_mtime, FileTime};
use reportwatch::reports::{ReportCache, ReportSnapshot};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn write_with_mtime(dir: &Path, name: &str, content: &[u8], secs: i64) {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(secs, 0)).unwrap();
}

#[test]
fn test_newest_json_wins() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "a.json", br#"{"x":1}"#, 1_600_000_000);
    write_with_mtime(dir.path(), "b.json", br#"{"x":2}"#, 1_700_000_000);

    let cache = ReportCache::new(dir.path());
    cache.reload();

    assert_eq!(cache.json(), Some(json!({"x": 2})));
}

#[test]
fn test_json_and_text_selected_independently() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "new.json", br#"{"v":"new"}"#, 1_700_000_000);
    write_with_mtime(dir.path(), "old.json", br#"{"v":"old"}"#, 1_500_000_000);
    write_with_mtime(dir.path(), "old.txt", b"old text", 1_500_000_000);
    write_with_mtime(dir.path(), "new.txt", b"new text", 1_800_000_000);

    let cache = ReportCache::new(dir.path());
    cache.reload();

    assert_eq!(cache.json(), Some(json!({"v": "new"})));
    assert_eq!(cache.text().as_deref(), Some("new text"));
}

#[test]
fn test_mixed_case_extensions_are_scanned() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "lower.json", br#"{"n":1}"#, 1_600_000_000);
    write_with_mtime(dir.path(), "UPPER.JSON", br#"{"n":2}"#, 1_700_000_000);
    write_with_mtime(dir.path(), "Notes.TXT", b"shout", 1_700_000_000);

    let cache = ReportCache::new(dir.path());
    cache.reload();

    assert_eq!(cache.json(), Some(json!({"n": 2})));
    assert_eq!(cache.text().as_deref(), Some("shout"));
}

#[test]
fn test_no_json_clears_previous_value() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "r.json", br#"{"x":1}"#, 1_600_000_000);

    let cache = ReportCache::new(dir.path());
    cache.reload();
    assert!(cache.json().is_some());

    fs::remove_file(dir.path().join("r.json")).unwrap();
    cache.reload();
    assert!(cache.json().is_none());
}

#[test]
fn test_deleting_newest_falls_back_to_previous() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "a.json", br#"{"x":1}"#, 1_600_000_000);
    write_with_mtime(dir.path(), "b.json", br#"{"x":2}"#, 1_700_000_000);

    let cache = ReportCache::new(dir.path());
    cache.reload();
    assert_eq!(cache.json(), Some(json!({"x": 2})));

    fs::remove_file(dir.path().join("b.json")).unwrap();
    cache.reload();
    assert_eq!(cache.json(), Some(json!({"x": 1})));
}

#[test]
fn test_reload_is_idempotent() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "r.json", br#"{"a":[1,2,3]}"#, 1_600_000_000);
    write_with_mtime(dir.path(), "r.txt", b"body", 1_600_000_000);
    write_with_mtime(dir.path(), "broken.json", b"{", 1_500_000_000);

    let cache = ReportCache::new(dir.path());
    cache.reload();
    let first = cache.snapshot();
    cache.reload();
    let second = cache.snapshot();

    assert_eq!(*first, *second);
    assert_eq!(cache.generation(), 2);
}

#[test]
fn test_malformed_newest_json_is_absent_text_unaffected() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "good.json", br#"{"x":1}"#, 1_600_000_000);
    write_with_mtime(dir.path(), "bad.json", b"{", 1_700_000_000);
    write_with_mtime(dir.path(), "r.txt", b"fine", 1_600_000_000);

    let cache = ReportCache::new(dir.path());
    cache.reload();

    assert!(cache.json().is_none());
    assert_eq!(cache.text().as_deref(), Some("fine"));
}

#[test]
fn test_undecodable_text_is_replaced() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "r.txt", b"caf\xe9 report", 1_600_000_000);

    let cache = ReportCache::new(dir.path());
    cache.reload();

    assert_eq!(cache.text().as_deref(), Some("caf\u{FFFD} report"));
}

#[test]
fn test_subdirectories_are_not_scanned() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("archive");
    fs::create_dir(&nested).unwrap();
    write_with_mtime(&nested, "deep.json", br#"{"deep":true}"#, 1_900_000_000);
    write_with_mtime(dir.path(), "top.json", br#"{"deep":false}"#, 1_600_000_000);

    let cache = ReportCache::new(dir.path());
    cache.reload();

    assert_eq!(cache.json(), Some(json!({"deep": false})));
}

#[test]
fn test_missing_directory_is_empty_not_fatal() {
    let dir = tempdir().unwrap();
    let cache = ReportCache::new(dir.path().join("never-created"));
    cache.reload();
    assert_eq!(*cache.snapshot(), ReportSnapshot::default());
}

#[test]
fn test_readers_never_see_torn_snapshots() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "r.json", br#"{"gen":0}"#, 1_600_000_000);
    write_with_mtime(dir.path(), "r.txt", b"0", 1_600_000_000);

    let cache = Arc::new(ReportCache::new(dir.path()));
    cache.reload();

    let writer = {
        let cache = Arc::clone(&cache);
        let root = dir.path().to_path_buf();
        thread::spawn(move || {
            for gen in 1..=50i64 {
                let secs = 1_600_000_000 + gen;
                let name = format!("r{gen}");
                write_with_mtime(
                    &root,
                    &format!("{name}.json"),
                    format!(r#"{{"gen":{gen}}}"#).as_bytes(),
                    secs,
                );
                write_with_mtime(&root, &format!("{name}.txt"), gen.to_string().as_bytes(), secs);
                cache.reload();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..500 {
                    let snapshot = cache.snapshot();
                    let json_gen = snapshot.json.as_ref().and_then(|doc| doc["gen"].as_i64());
                    let text_gen = snapshot
                        .text
                        .as_deref()
                        .and_then(|text| text.parse::<i64>().ok());
                    assert_eq!(json_gen, text_gen);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(cache.json(), Some(json!({"gen": 50})));
}
