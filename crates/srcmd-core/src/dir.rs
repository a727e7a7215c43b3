//! Directory form of a notebook.
//!
//! ```text
//! <root>/README.md        manifest, encoded with external file links
//! <root>/package.json
//! <root>/tsconfig.json    only when the metadata carries one
//! <root>/src/<filename>   one file per code cell
//! ```

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::cell::{Cell, SrcbookMetadata};
use crate::codec::{decode, Decoded};
use crate::encode::{encode, EncodeOptions, SOURCE_DIR};
use crate::error::DirError;

/// File name of the notebook manifest.
pub const MANIFEST: &str = "README.md";
/// File name the metadata's tsconfig is written to.
pub const TSCONFIG: &str = "tsconfig.json";

/// Filesystem operations the directory layout needs.
pub trait FileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn exists(&self, path: &Path) -> bool;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Write `cells` under `root` in the directory layout.
pub fn write_dir<F: FileSystem + ?Sized>(
    fs: &F,
    root: &Path,
    cells: &[Cell],
    metadata: &SrcbookMetadata,
) -> Result<(), DirError> {
    let manifest = encode(cells, metadata, EncodeOptions::external())?;

    // Resolve every path before touching the filesystem.
    let mut files = Vec::new();
    for cell in cells {
        let (base, filename, source) = match cell {
            Cell::PackageJson(c) => (root.to_path_buf(), &c.filename, &c.source),
            Cell::Code(c) => (root.join(SOURCE_DIR), &c.filename, &c.source),
            _ => continue,
        };
        let relative = confined_path(filename).ok_or_else(|| DirError::UnsafeFilename {
            filename: filename.to_string(),
        })?;
        files.push((base.join(relative), source));
    }

    create_dir(fs, root)?;
    write_file(fs, &root.join(MANIFEST), &manifest)?;

    for (path, source) in files {
        if let Some(parent) = path.parent() {
            create_dir(fs, parent)?;
        }
        write_file(fs, &path, source)?;
    }

    if let Some(tsconfig) = &metadata.tsconfig {
        write_file(fs, &root.join(TSCONFIG), tsconfig)?;
    }

    tracing::debug!(root = %root.display(), cells = cells.len(), "wrote notebook directory");
    Ok(())
}

/// Read a notebook from its directory layout, filling every linked cell's
/// source from the file it links to.
pub fn read_dir<F: FileSystem + ?Sized>(fs: &F, root: &Path) -> Result<Decoded, DirError> {
    let manifest = read_file(fs, &root.join(MANIFEST))?;
    let mut decoded = decode(&manifest)?;

    for external in std::mem::take(&mut decoded.external) {
        let path = root.join(relative_link(&external.href)?);
        let source = read_file(fs, &path)?;
        if let Some(slot) = decoded
            .cells
            .iter_mut()
            .find(|cell| cell.id() == external.cell_id)
            .and_then(Cell::source_mut)
        {
            *slot = source;
        }
    }

    let tsconfig_path = root.join(TSCONFIG);
    if decoded.metadata.tsconfig.is_none() && fs.exists(&tsconfig_path) {
        decoded.metadata.tsconfig = Some(read_file(fs, &tsconfig_path)?);
    }

    tracing::debug!(root = %root.display(), cells = decoded.cells.len(), "read notebook directory");
    Ok(decoded)
}

/// Resolve a link destination to a path that stays inside the notebook.
fn relative_link(href: &str) -> Result<PathBuf, DirError> {
    confined_path(href).ok_or_else(|| DirError::UnsafeLink {
        href: href.to_string(),
    })
}

/// Normalize `path` to a non-empty relative path with no `..`, root or
/// prefix components.
fn confined_path(path: &str) -> Option<PathBuf> {
    let mut confined = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => confined.push(part),
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if confined.as_os_str().is_empty() {
        return None;
    }
    Some(confined)
}

fn read_file<F: FileSystem + ?Sized>(fs: &F, path: &Path) -> Result<String, DirError> {
    fs.read_to_string(path).map_err(|source| DirError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file<F: FileSystem + ?Sized>(fs: &F, path: &Path, contents: &str) -> Result<(), DirError> {
    fs.write(path, contents).map_err(|source| DirError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn create_dir<F: FileSystem + ?Sized>(fs: &F, path: &Path) -> Result<(), DirError> {
    fs.create_dir_all(path).map_err(|source| DirError::Write {
        path: path.to_path_buf(),
        source,
    })
}
