use super::*;

#[test]
fn memory_storage_set_get_remove() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.get_item("access_token"), None);

    storage.set_item("access_token", "t1").unwrap();
    assert_eq!(storage.get_item("access_token").as_deref(), Some("t1"));

    storage.set_item("access_token", "t2").unwrap();
    assert_eq!(storage.get_item("access_token").as_deref(), Some("t2"));

    storage.remove_item("access_token").unwrap();
    assert_eq!(storage.get_item("access_token"), None);
}

#[test]
fn memory_storage_remove_absent_is_ok() {
    let storage = MemoryStorage::new();
    assert!(storage.remove_item("access_token").is_ok());
}

#[test]
fn file_storage_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path().join("nested"));
    assert_eq!(storage.get_item("access_token"), None);

    storage.set_item("access_token", "abc.def.ghi").unwrap();
    assert!(dir.path().join("nested").join("access_token").exists());
    assert_eq!(storage.get_item("access_token").as_deref(), Some("abc.def.ghi"));

    // A second handle over the same directory sees the value.
    let reopened = FileStorage::new(dir.path().join("nested"));
    assert_eq!(reopened.get_item("access_token").as_deref(), Some("abc.def.ghi"));

    storage.remove_item("access_token").unwrap();
    assert_eq!(reopened.get_item("access_token"), None);
}

#[test]
fn file_storage_remove_absent_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path());
    assert!(storage.remove_item("access_token").is_ok());
}

#[test]
fn file_storage_rejects_path_like_keys() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path());
    for key in ["", "../escape", "a/b", ".hidden"] {
        assert!(matches!(storage.set_item(key, "x"), Err(StorageError::InvalidKey(_))), "{key}");
        assert_eq!(storage.get_item(key), None);
    }
}

#[cfg(unix)]
#[test]
fn file_storage_restricts_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path());
    storage.set_item("access_token", "secret").unwrap();
    let mode = std::fs::metadata(dir.path().join("access_token"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[cfg(unix)]
#[test]
fn file_storage_tightens_existing_file_on_overwrite() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("access_token");
    std::fs::write(&path, "old-token-with-a-longer-value").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    let storage = FileStorage::new(dir.path());
    storage.set_item("access_token", "new").unwrap();

    assert_eq!(std::fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);
    assert_eq!(storage.get_item("access_token").as_deref(), Some("new"));
}
