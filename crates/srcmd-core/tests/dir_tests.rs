//! Integration tests for the directory layout

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use srcmd_core::dir::{MANIFEST, TSCONFIG};
use srcmd_core::{
    decode, encode, read_dir, write_dir, Cell, DirError, EncodeOptions, FileSystem, OsFileSystem,
};

const NOTEBOOK: &str = r#"<!-- srcbook:{"language":"typescript","tsconfig.json":"{\"strict\":true}"} -->

# Directory notebook

<details>
  <summary>package.json</summary>

```json
{"type": "module"}
```
</details>

Prose between cells.

<details open>
  <summary>index.ts</summary>

```typescript
import { greet } from './lib/greet.ts';
greet();
```
</details>

<details open>
  <summary>lib/greet.ts</summary>

```typescript
export const greet = () => console.log('hi');
```
</details>
"#;

/// In-memory filesystem for exercising the layout without touching disk.
#[derive(Default)]
struct MemoryFs {
    files: RefCell<BTreeMap<PathBuf, String>>,
}

impl FileSystem for MemoryFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }
}

// ============================================================================
// Filesystem Round Trip Tests
// ============================================================================

#[test]
fn test_write_dir_layout_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("notebook");
    let decoded = decode(NOTEBOOK).unwrap();

    write_dir(&OsFileSystem, &root, &decoded.cells, &decoded.metadata).unwrap();

    assert!(root.join(MANIFEST).is_file());
    assert_eq!(
        fs::read_to_string(root.join("package.json")).unwrap(),
        "{\"type\": \"module\"}"
    );
    assert_eq!(
        fs::read_to_string(root.join("src/lib/greet.ts")).unwrap(),
        "export const greet = () => console.log('hi');"
    );
    assert_eq!(
        fs::read_to_string(root.join(TSCONFIG)).unwrap(),
        "{\"strict\":true}"
    );

    let manifest = fs::read_to_string(root.join(MANIFEST)).unwrap();
    assert!(manifest.contains("[index.ts](./src/index.ts)"));
    assert!(!manifest.contains("greet();"));
}

#[test]
fn test_read_dir_restores_inline_notebook() {
    let tmp = tempfile::tempdir().unwrap();
    let decoded = decode(NOTEBOOK).unwrap();
    write_dir(&OsFileSystem, tmp.path(), &decoded.cells, &decoded.metadata).unwrap();

    let restored = read_dir(&OsFileSystem, tmp.path()).unwrap();
    assert!(restored.external.is_empty());
    assert_eq!(restored.metadata, decoded.metadata);

    let text = encode(&restored.cells, &restored.metadata, EncodeOptions::inline()).unwrap();
    assert_eq!(text, NOTEBOOK);
}

#[test]
fn test_read_dir_picks_up_tsconfig_file() {
    let fs = MemoryFs::default();
    let root = Path::new("/nb");
    let decoded = decode(NOTEBOOK).unwrap();
    let mut metadata = decoded.metadata.clone();
    metadata.tsconfig = None;
    write_dir(&fs, root, &decoded.cells, &metadata).unwrap();
    fs.write(&root.join(TSCONFIG), "{}").unwrap();

    let restored = read_dir(&fs, root).unwrap();
    assert_eq!(restored.metadata.tsconfig.as_deref(), Some("{}"));
}

// ============================================================================
// In-memory Layout Tests
// ============================================================================

#[test]
fn test_write_dir_paths_in_memory() {
    let fs = MemoryFs::default();
    let root = Path::new("/nb");
    let decoded = decode(NOTEBOOK).unwrap();
    write_dir(&fs, root, &decoded.cells, &decoded.metadata).unwrap();

    let paths: Vec<PathBuf> = fs.files.borrow().keys().cloned().collect();
    assert_eq!(
        paths,
        [
            PathBuf::from("/nb/README.md"),
            PathBuf::from("/nb/package.json"),
            PathBuf::from("/nb/src/index.ts"),
            PathBuf::from("/nb/src/lib/greet.ts"),
            PathBuf::from("/nb/tsconfig.json"),
        ]
    );
}

#[test]
fn test_read_dir_hydrates_sources() {
    let fs = MemoryFs::default();
    let root = Path::new("/nb");
    let decoded = decode(NOTEBOOK).unwrap();
    write_dir(&fs, root, &decoded.cells, &decoded.metadata).unwrap();
    fs.write(&root.join("src/index.ts"), "edited();").unwrap();

    let restored = read_dir(&fs, root).unwrap();
    let index = restored
        .cells
        .iter()
        .find(|cell| cell.filename() == Some("index.ts"))
        .unwrap();
    match index {
        Cell::Code(c) => assert_eq!(c.source, "edited();"),
        other => panic!("Expected code, got {:?}", other),
    }
}

#[test]
fn test_read_dir_missing_linked_file() {
    let fs = MemoryFs::default();
    let root = Path::new("/nb");
    let decoded = decode(NOTEBOOK).unwrap();
    write_dir(&fs, root, &decoded.cells, &decoded.metadata).unwrap();
    fs.files.borrow_mut().remove(Path::new("/nb/src/index.ts"));

    let err = read_dir(&fs, root).unwrap_err();
    match err {
        DirError::Read { path, source } => {
            assert_eq!(path, PathBuf::from("/nb/src/index.ts"));
            assert_eq!(source.kind(), io::ErrorKind::NotFound);
        }
        other => panic!("Expected read error, got {:?}", other),
    }
}

#[test]
fn test_read_dir_rejects_links_outside_root() {
    let fs = MemoryFs::default();
    let root = Path::new("/nb");
    let manifest = NOTEBOOK.replace(
        "```json\n{\"type\": \"module\"}\n```",
        "[package.json](../../etc/passwd)\n",
    );
    fs.write(&root.join(MANIFEST), &manifest).unwrap();

    let err = read_dir(&fs, root).unwrap_err();
    assert!(matches!(err, DirError::UnsafeLink { href } if href == "../../etc/passwd"));
}

#[test]
fn test_read_dir_reports_decode_errors() {
    let fs = MemoryFs::default();
    let root = Path::new("/nb");
    fs.write(&root.join(MANIFEST), "no title here\n").unwrap();

    let err = read_dir(&fs, root).unwrap_err();
    match err {
        DirError::Decode(errors) => assert_eq!(errors.len(), 2),
        other => panic!("Expected decode error, got {:?}", other),
    }
}

// ============================================================================
// Path Confinement Tests
// ============================================================================

#[test]
fn test_write_dir_rejects_filenames_outside_root() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("nb");
    let text = NOTEBOOK.replace("lib/greet.ts", "../../escaped.ts");
    let decoded = decode(&text).unwrap();

    let err = write_dir(&OsFileSystem, &root, &decoded.cells, &decoded.metadata).unwrap_err();
    assert!(
        matches!(err, DirError::UnsafeFilename { ref filename } if filename == "../../escaped.ts")
    );
    assert!(!tmp.path().join("escaped.ts").exists());
    assert!(!root.exists());
}

#[test]
fn test_write_dir_rejects_absolute_filenames() {
    let fs = MemoryFs::default();
    let text = NOTEBOOK.replace("lib/greet.ts", "/etc/escaped.ts");
    let decoded = decode(&text).unwrap();

    let err = write_dir(&fs, Path::new("/nb"), &decoded.cells, &decoded.metadata).unwrap_err();
    assert!(matches!(err, DirError::UnsafeFilename { .. }));
    assert!(fs.files.borrow().is_empty());
}
