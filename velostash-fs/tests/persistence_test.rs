use tempfile::tempdir;
use velostash::{KeyValueStore, StorageGateway, keys};
use velostash_fs::FileStore;

#[test]
fn test_entries_survive_reopen() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;

    let mut store = FileStore::new(temp_dir.path())?;
    store.set_item("users", r#"[{"id":1,"email":"ana@x.io"}]"#)?;
    store.set_item("currentUser", r#"{"id":1,"email":"ana@x.io"}"#)?;
    let used = store.used_bytes();
    drop(store);

    let reopened = FileStore::new(temp_dir.path())?;
    assert_eq!(
        reopened.get_item("users")?.as_deref(),
        Some(r#"[{"id":1,"email":"ana@x.io"}]"#)
    );
    assert_eq!(reopened.keys()?, vec!["currentUser", "users"]);
    // Usage is recomputed from the files on open.
    assert_eq!(reopened.used_bytes(), used);
    Ok(())
}

#[test]
fn test_remove_item() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let mut store = FileStore::new(temp_dir.path())?;

    store.set_item("routes", "[]")?;
    assert_eq!(store.remove_item("routes")?.as_deref(), Some("[]"));
    assert_eq!(store.remove_item("routes")?, None);
    assert_eq!(store.get_item("routes")?, None);
    assert_eq!(store.used_bytes(), 0);
    Ok(())
}

#[test]
fn test_quota_rejects_oversized_write() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    // "bikes" + "[]" is 7 UTF-16 units, 14 bytes.
    let mut store = FileStore::with_quota(temp_dir.path(), 20)?;

    store.set_item("bikes", "[]")?;
    let err = store
        .set_item("rentals", "[1,2,3]")
        .expect_err("write over quota should fail");
    assert!(err.is_quota_exceeded());
    assert_eq!(store.get_item("rentals")?, None);

    // Rewriting an entry only counts the difference.
    store.set_item("bikes", "[1]")?;
    assert_eq!(store.used_bytes(), 16);
    Ok(())
}

#[test]
fn test_gateway_over_file_store() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;

    {
        let mut gateway = StorageGateway::new(FileStore::new(temp_dir.path())?);
        let report = gateway.bootstrap();
        assert!(report.admin_created);

        let outcome = gateway.login("admin@cychris.com", "admin123")?;
        assert!(outcome.user.is_admin());
    }

    let gateway = StorageGateway::new(FileStore::new(temp_dir.path())?);
    let current = gateway.current_user().expect("session survives reopen");
    assert_eq!(current.email, "admin@cychris.com");
    assert!(gateway.contains(keys::BIKES));
    assert!(gateway.contains(keys::ROUTES));
    assert!(gateway.rentals().is_empty());
    Ok(())
}
