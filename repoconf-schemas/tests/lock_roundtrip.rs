use camino::Utf8PathBuf;
use proptest::prelude::*;
use repoconf_schemas::{SchemaLockFile, lock_file_path};
use repoconf_types::{LoadedSchema, SchemaLock};
use std::collections::BTreeMap;

fn arb_schemas() -> impl Strategy<Value = Vec<LoadedSchema>> {
    prop::collection::btree_map(
        "[a-z][a-z0-9-]{0,12}",
        ("v[0-9]\\.[0-9]\\.[0-9]", "[0-9a-f]{64}"),
        0..8,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .map(|(name, (version, hash))| LoadedSchema {
                lock: SchemaLock {
                    url: format!("https://example.com/{version}/{name}.json"),
                    name,
                    version,
                    hash,
                },
                data: Vec::new(),
            })
            .collect::<Vec<_>>()
    })
    .prop_shuffle()
}

proptest! {
    #[test]
    fn save_then_load_reproduces_the_mapping(schemas in arb_schemas()) {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let path = lock_file_path(&dir);

        let lock = SchemaLockFile::new(&schemas);
        lock.save(&path).expect("save");
        let reloaded = SchemaLockFile::load(&path).expect("load").expect("present");

        let expected: BTreeMap<String, SchemaLock> = schemas
            .iter()
            .map(|s| (s.lock.name.clone(), s.lock.clone()))
            .collect();
        prop_assert_eq!(&reloaded.schemas, &expected);
        prop_assert_eq!(reloaded.updated, lock.updated);
    }
}

#[test]
fn lock_file_is_indented_json() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
    let path = lock_file_path(&dir);

    let lock = SchemaLockFile::new(&[LoadedSchema {
        lock: SchemaLock {
            name: "core".to_string(),
            url: "https://example.com/core.json".to_string(),
            version: "v1.0.0".to_string(),
            hash: "ab".repeat(32),
        },
        data: b"{}".to_vec(),
    }]);
    lock.save(&path).expect("save");

    let text = std::fs::read_to_string(&path).expect("read");
    assert!(text.starts_with("{\n  \"updated\": "));
    assert!(text.contains("\"schemas\": {\n    \"core\": {"));
    assert!(path.as_str().ends_with("schema.lock.json"));
}
