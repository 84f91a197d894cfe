//! Integration tests running the same scenarios against every built-in backend.
//!
//! These tests verify that:
//! 1. Local and adapter backends agree on observable behaviour
//! 2. Root and same-source guards fire before any I/O
//! 3. Recursive copy, move and delete handle whole trees
//! 4. File handles, listings and uploads work end-to-end

use anystore::*;
use std::io::Write;
use std::sync::Arc;

// =============================================================================
// Fixtures
// =============================================================================

struct Backends {
    _dir: tempfile::TempDir,
    all: Vec<(&'static str, Arc<dyn StoreBackend>)>,
}

fn backends() -> Backends {
    let dir = tempfile::tempdir().unwrap();
    let local: Arc<dyn StoreBackend> = Arc::new(LocalBackend::open(dir.path()).unwrap());
    let memory: Arc<dyn StoreBackend> = Arc::new(AdapterBackend::new(Arc::new(MemoryAdapter::new())));
    Backends {
        _dir: dir,
        all: vec![("local", local), ("memory", memory)],
    }
}

fn p(s: &str) -> StorePath {
    StorePath::parse(s).unwrap()
}

fn names(entries: &[Entry]) -> Vec<String> {
    entries.iter().map(|e| e.path.to_string()).collect()
}

// =============================================================================
// Backend Operations
// =============================================================================

#[test]
fn write_read_and_size() {
    let fx = backends();
    for (name, backend) in &fx.all {
        backend.write(&p("a/b/c.txt"), b"12345").unwrap();
        assert_eq!(backend.size(&p("a/b/c.txt")).unwrap(), 5, "{name}");
        assert_eq!(backend.read(&p("a/b/c.txt")).unwrap(), b"12345", "{name}");
        assert!(backend.is_dir(&p("a/b")).unwrap(), "{name}");
        assert_eq!(backend.mime_type(&p("a/b/c.txt")).unwrap(), "text/plain", "{name}");
        assert_eq!(backend.mime_type(&p("a")).unwrap(), DIRECTORY_MIME, "{name}");
    }
}

#[test]
fn stream_write_matches_buffered_write() {
    let fx = backends();
    for (name, backend) in &fx.all {
        let mut reader: &[u8] = b"streamed bytes";
        backend.write_stream(&p("s.bin"), &mut reader).unwrap();
        let mut out = String::new();
        std::io::Read::read_to_string(&mut backend.read_stream(&p("s.bin")).unwrap(), &mut out)
            .unwrap();
        assert_eq!(out, "streamed bytes", "{name}");
    }
}

#[test]
fn root_is_protected() {
    let fx = backends();
    for (name, backend) in &fx.all {
        let root = StorePath::root();
        for err in [
            backend.delete(&root).unwrap_err(),
            backend.write(&root, b"x").unwrap_err(),
            backend.read(&root).unwrap_err(),
            backend.rename(&root, &p("x")).unwrap_err(),
            backend.size(&root).unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::RootPathForbidden, "{name}: {err}");
        }
        assert!(backend.is_dir(&root).unwrap(), "{name}");
    }
}

#[test]
fn same_source_is_rejected() {
    let fx = backends();
    for (name, backend) in &fx.all {
        backend.write(&p("a.txt"), b"a").unwrap();
        let err = backend.rename(&p("a.txt"), &p("./a.txt")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SameSource, "{name}");
        let err = backend.copy(&p("a.txt"), &p("a.txt")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SameSource, "{name}");
        assert_eq!(backend.read(&p("a.txt")).unwrap(), b"a", "{name}");
    }
}

#[test]
fn missing_entries_are_not_found() {
    let fx = backends();
    for (name, backend) in &fx.all {
        for err in [
            backend.read(&p("nope")).unwrap_err(),
            backend.delete(&p("nope")).unwrap_err(),
            backend.rename(&p("nope"), &p("other")).unwrap_err(),
            backend.metadata(&p("nope/deeper")).unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::NotFound, "{name}: {err}");
        }
        assert!(!backend.exists(&p("nope")).unwrap(), "{name}");
    }
}

#[test]
fn type_mismatches() {
    let fx = backends();
    for (name, backend) in &fx.all {
        backend.write(&p("file.txt"), b"x").unwrap();
        backend.mkdir(&p("dir")).unwrap();
        let err = backend.read(&p("dir")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAFile, "{name}");
        let err = backend.list_children(&p("file.txt")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory, "{name}");
    }
}

#[test]
fn recursive_copy_and_move() {
    let fx = backends();
    for (name, backend) in &fx.all {
        backend.write(&p("src/one.txt"), b"1").unwrap();
        backend.write(&p("src/deep/two.txt"), b"22").unwrap();

        backend.copy(&p("src"), &p("copy")).unwrap();
        assert_eq!(backend.read(&p("copy/deep/two.txt")).unwrap(), b"22", "{name}");
        assert!(backend.exists(&p("src/one.txt")).unwrap(), "{name}");

        backend.rename(&p("src"), &p("moved/here")).unwrap();
        assert!(!backend.exists(&p("src")).unwrap(), "{name}");
        assert_eq!(backend.read(&p("moved/here/one.txt")).unwrap(), b"1", "{name}");

        let err = backend.copy(&p("copy"), &p("copy/inner")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPath, "{name}");
    }
}

#[test]
fn delete_removes_trees() {
    let fx = backends();
    for (name, backend) in &fx.all {
        backend.write(&p("t/a/b/c.txt"), b"x").unwrap();
        backend.write(&p("t/d.txt"), b"y").unwrap();
        backend.delete(&p("t")).unwrap();
        assert!(!backend.exists(&p("t")).unwrap(), "{name}");
        assert!(!backend.exists(&p("t/a/b/c.txt")).unwrap(), "{name}");
    }
}

#[test]
fn access_round_trip() {
    let Backends { _dir, all } = backends();
    for (name, backend) in all {
        if cfg!(not(unix)) && name == "local" {
            continue;
        }
        backend.write(&p("secret.txt"), b"x").unwrap();
        assert_eq!(backend.access(&p("secret.txt")).unwrap(), Access::Public, "{name}");
        backend.set_access(&p("secret.txt"), Access::Private).unwrap();
        assert_eq!(backend.access(&p("secret.txt")).unwrap(), Access::Private, "{name}");
        let listed = backend
            .list(&StorePath::root(), &ListFilter::new().access(Access::Private))
            .unwrap();
        assert_eq!(names(&listed), ["secret.txt"], "{name}");
    }
}

#[test]
fn folder_access_round_trip() {
    let Backends { _dir, all } = backends();
    for (name, backend) in all {
        if cfg!(not(unix)) && name == "local" {
            continue;
        }
        backend.mkdir(&p("vault")).unwrap();
        backend.write(&p("vault/item.txt"), b"x").unwrap();
        assert_eq!(backend.access(&p("vault")).unwrap(), Access::Public, "{name}");

        backend.set_access(&p("vault"), Access::Private).unwrap();
        assert_eq!(backend.access(&p("vault")).unwrap(), Access::Private, "{name}");
        assert!(backend.is_dir(&p("vault")).unwrap(), "{name}");

        backend.set_access(&p("vault"), Access::Public).unwrap();
        assert_eq!(backend.access(&p("vault")).unwrap(), Access::Public, "{name}");
        assert_eq!(backend.read(&p("vault/item.txt")).unwrap(), b"x", "{name}");
    }
}

#[test]
fn root_access_cannot_change() {
    let fx = backends();
    for (name, backend) in &fx.all {
        let err = backend.set_access(&StorePath::root(), Access::Private).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RootPathForbidden, "{name}");
    }
}

#[test]
fn created_parents_take_default_access() {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalBackend::new(LocalConfig::new(dir.path()).default_access(Access::Private)).unwrap();
    let memory = AdapterBackend::new(Arc::new(MemoryAdapter::new())).with_default_access(Access::Private);
    let all: Vec<(&str, Arc<dyn StoreBackend>)> = vec![("local", Arc::new(local)), ("memory", Arc::new(memory))];
    for (name, backend) in all {
        if cfg!(not(unix)) && name == "local" {
            continue;
        }
        backend.write(&p("secret/key"), b"x").unwrap();
        assert_eq!(backend.access(&p("secret")).unwrap(), Access::Private, "{name}");
        assert_eq!(backend.access(&p("secret/key")).unwrap(), Access::Private, "{name}");

        backend.copy(&p("secret/key"), &p("copies/deep/key")).unwrap();
        assert_eq!(backend.access(&p("copies")).unwrap(), Access::Private, "{name}");
        assert_eq!(backend.access(&p("copies/deep")).unwrap(), Access::Private, "{name}");

        backend.rename(&p("secret/key"), &p("moved/key")).unwrap();
        assert_eq!(backend.access(&p("moved")).unwrap(), Access::Private, "{name}");
    }
}

// =============================================================================
// Listings
// =============================================================================

#[test]
fn listing_is_sorted_and_filtered() {
    let fx = backends();
    for (name, backend) in &fx.all {
        for file in ["b.jpg", "a.png", ".hidden", "c.txt", "sub/d.jpg", "sub/.x/e.jpg"] {
            backend.write(&p(file), b"x").unwrap();
        }
        let all = backend.list(&StorePath::root(), &ListFilter::new()).unwrap();
        assert_eq!(names(&all), [".hidden", "a.png", "b.jpg", "c.txt", "sub"], "{name}");

        let images = ListFilter::new()
            .files_only()
            .hidden(false)
            .recursive(8)
            .name_matches(r"\.(jpg|png)$")
            .unwrap();
        let found = backend.list(&StorePath::root(), &images).unwrap();
        assert_eq!(names(&found), ["a.png", "b.jpg", "sub/d.jpg"], "{name}");

        let dirs = backend
            .list(&StorePath::root(), &ListFilter::new().dirs_only().recursive(8))
            .unwrap();
        assert_eq!(names(&dirs), ["sub", "sub/.x"], "{name}");
    }
}

#[test]
fn listing_is_deterministic() {
    let fx = backends();
    for (name, backend) in &fx.all {
        for i in (0..20).rev() {
            backend.write(&p(&format!("f{i:02}")), b"x").unwrap();
        }
        let first = backend.list(&StorePath::root(), &ListFilter::new()).unwrap();
        let second = backend.list(&StorePath::root(), &ListFilter::new()).unwrap();
        assert_eq!(names(&first), names(&second), "{name}");
        assert_eq!(first[0].path.to_string(), "f00", "{name}");
    }
}

// =============================================================================
// Paths and Handles
// =============================================================================

#[test]
fn paths_normalize() {
    assert_eq!(p("/dir/../dir/to/file").to_string(), "dir/to/file");
    assert_eq!(p("a//b/./c/").to_string(), "a/b/c");
    assert!(p("..").is_root());
    assert_eq!(p("a/b").join("../c").unwrap().to_string(), "a/c");
}

#[test]
fn handles_share_a_backend() {
    let fx = backends();
    for (name, backend) in &fx.all {
        let mut file = FileHandle::parse(backend.clone(), "docs/draft.md").unwrap();
        file.put_contents("# Title").unwrap();
        file.rename("final.md").unwrap();
        assert_eq!(file.path().to_string(), "docs/final.md", "{name}");
        assert!(!backend.exists(&p("docs/draft.md")).unwrap(), "{name}");

        let docs = file.parent().unwrap();
        let listed = docs.list(&ListFilter::new()).unwrap();
        assert_eq!(listed.len(), 1, "{name}");
        assert_eq!(listed[0].contents_string().unwrap(), "# Title", "{name}");

        file.delete().unwrap();
        file.delete().unwrap();
        assert!(!file.exists().unwrap(), "{name}");
    }
}

#[test]
fn handle_url_uses_base_url() {
    let backend: Arc<dyn StoreBackend> = Arc::new(
        AdapterBackend::new(Arc::new(MemoryAdapter::new())).with_base_url("https://cdn.test/files"),
    );
    let file = FileHandle::parse(backend.clone(), "img/logo.png").unwrap();
    assert_eq!(file.url(), Some("https://cdn.test/files/img/logo.png"));
}

// =============================================================================
// Uploads
// =============================================================================

#[test]
fn upload_is_imported_under_storage_name() {
    let tmp = tempfile::tempdir().unwrap();
    let temp_path = tmp.path().join("php1234");
    std::fs::File::create(&temp_path)
        .unwrap()
        .write_all(b"uploaded")
        .unwrap();

    let upload = UploadedFile {
        name: "C:\\Users\\me\\Holiday Photo.JPG".to_owned(),
        size: 8,
        mime_type: "image/jpeg".to_owned(),
        error: UploadError::Ok,
        temp_path,
    };
    upload.validate(Some(1024)).unwrap();

    let name = upload.storage_name("photo", 3).unwrap();
    assert_eq!(name.original_name(), "Holiday Photo.JPG");

    let fx = backends();
    for (label, backend) in &fx.all {
        let target = FileHandle::root(backend.clone()).child(&name.to_string()).unwrap();
        target.import_upload(&upload).unwrap();
        assert_eq!(target.contents().unwrap(), b"uploaded", "{label}");
        let parsed = StorageName::parse(target.name().unwrap()).unwrap();
        assert_eq!(parsed, name, "{label}");
    }
}

#[test]
fn failed_upload_is_rejected() {
    let upload = UploadedFile {
        name: "big.bin".to_owned(),
        size: 0,
        mime_type: "application/octet-stream".to_owned(),
        error: UploadError::from_code(1),
        temp_path: "/nonexistent".into(),
    };
    assert!(matches!(
        upload.validate(None),
        Err(UploadRejected::Transport { .. })
    ));
    let fx = backends();
    for (name, backend) in &fx.all {
        let target = FileHandle::parse(backend.clone(), "big.bin").unwrap();
        let err = target.import_upload(&upload).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError, "{name}");
    }
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn config_opens_backends() {
    let dir = tempfile::tempdir().unwrap();
    let local = BackendConfig::Local(LocalConfig::new(dir.path().join("store")).create_root(true))
        .open()
        .unwrap();
    local.write(&p("x.txt"), b"x").unwrap();
    assert!(dir.path().join("store/x.txt").is_file());

    let missing = BackendConfig::Local(LocalConfig::new(dir.path().join("absent"))).open();
    assert_eq!(missing.unwrap_err().kind(), ErrorKind::ConfigError);
}
