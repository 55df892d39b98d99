//! Folder Exporter
//!
//! This module writes the file listing of an open book into a plain
//! filesystem folder, so that external tools (diff, version control) can
//! work on the unpacked files. Content is copied byte-for-byte: nothing is
//! re-encoded, and embedded fonts are written exactly as listed.
//!
//! ## Usage
//!
//! ```rust, ignore
//! # use epub_unpack::{Book, FolderExporter};
//! # fn main() -> Result<(), epub_unpack::error::UnpackError> {
//! let book = Book::open("path/to/book.epub")?;
//!
//! let exporter = FolderExporter::new("/tmp/unpacked");
//! let report = exporter.export(&book)?;
//! println!("{} files written", report.count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Notes
//!
//! - A book carrying `META-INF/encryption.xml` is refused before anything
//!   is written.
//! - Pre-existing destination files that do not collide with a listing path
//!   are left unchanged.

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use log::info;

use crate::{book::Book, error::UnpackError, utils::destination_has_encryption};

/// Name and required content of the package media-type file
const MIMETYPE_NAME: &str = "mimetype";
const MIMETYPE_CONTENT: &[u8] = b"application/epub+zip";

/// Summary of a completed export
///
/// Lists the relative paths written to the destination, in the order they
/// were written.
#[derive(Debug)]
pub struct ExportReport {
    written: Vec<PathBuf>,
}

impl ExportReport {
    /// Returns the relative paths written to the destination
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Returns the number of files written
    pub fn count(&self) -> usize {
        self.written.len()
    }
}

/// Writes book listings into a destination folder
///
/// The `FolderExporter` structure holds the destination path and the export
/// policy, and performs the copy on demand. One exporter can unpack any
/// number of books into its destination; every invocation runs the same
/// guards first.
///
/// The destination folder is exclusively owned by an export for its
/// duration; invocations are synchronous and there is no shared state
/// between them.
pub struct FolderExporter {
    /// The folder the book files are written into
    destination: PathBuf,

    /// Whether a missing `mimetype` file is supplied after the copy
    supplement_mimetype: bool,
}

impl FolderExporter {
    /// Creates an exporter for the given destination folder
    ///
    /// The folder does not need to exist yet; it is created on export. By
    /// default a missing `mimetype` file is supplied after the copy.
    ///
    /// # Parameters
    /// - `destination`: The folder to unpack into
    pub fn new<P: AsRef<Path>>(destination: P) -> Self {
        Self {
            destination: destination.as_ref().to_path_buf(),
            supplement_mimetype: true,
        }
    }

    /// Sets whether a missing `mimetype` file is supplied after the copy
    ///
    /// The supplement never replaces a `mimetype` entry carried by the
    /// listing itself; this switch only controls what happens when the
    /// listing has none.
    pub fn supplement_mimetype(mut self, enabled: bool) -> Self {
        self.supplement_mimetype = enabled;
        self
    }

    /// Returns the destination folder of this exporter
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Unpacks a book listing into the destination folder
    ///
    /// Every guard runs before the first write, so a refused export leaves
    /// the destination exactly as it was:
    ///
    /// 1. A listing with an entry at `META-INF/encryption.xml` is refused.
    /// 2. A destination that exists but is not a directory is refused.
    /// 3. A destination that already holds an encryption manifest under a
    ///    `META-INF` directory (any letter case) is refused.
    /// 4. Listing paths that are absolute or contain `..` are refused.
    ///
    /// The copy itself then writes every entry verbatim to
    /// `destination/relative_path`, creating intermediate directories as
    /// needed. Files at colliding paths are overwritten; unrelated
    /// destination files are left alone.
    ///
    /// # Parameters
    /// - `book`: The listing to unpack
    ///
    /// # Return
    /// - `Ok(ExportReport)`: The paths written, in listing order
    /// - `Err(UnpackError)`: A guard refused the export (nothing written),
    ///   or a write failed (partial output possible, not rolled back)
    pub fn export(&self, book: &Book) -> Result<ExportReport, UnpackError> {
        if book.has_encryption() {
            return Err(UnpackError::EncryptionPresent);
        }

        if self.destination.exists() && !self.destination.is_dir() {
            return Err(UnpackError::DestinationNotDirectory {
                path: self.destination.to_string_lossy().to_string(),
            });
        }

        if self.destination.is_dir() && destination_has_encryption(&self.destination)? {
            return Err(UnpackError::DestinationEncrypted {
                path: self.destination.to_string_lossy().to_string(),
            });
        }

        for (path, _) in book.iter() {
            check_entry_path(path)?;
        }

        fs::create_dir_all(&self.destination)?;

        let mut written = Vec::with_capacity(book.len());
        for (path, data) in book.iter() {
            let target = self.destination.join(path);
            if let Some(parent) = target.parent() {
                if !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }

            fs::write(&target, data)?;
            info!("saved: {}", path.display());
            written.push(path.to_path_buf());
        }

        if self.supplement_mimetype && !book.contains(MIMETYPE_NAME) {
            fs::write(self.destination.join(MIMETYPE_NAME), MIMETYPE_CONTENT)?;
            info!("saved: {}", MIMETYPE_NAME);
            written.push(PathBuf::from(MIMETYPE_NAME));
        }

        Ok(ExportReport { written })
    }
}

/// Checks that a listing path stays inside the destination folder
///
/// A valid entry path is relative and built from normal components; `..`
/// segments, root markers, and empty paths are rejected.
fn check_entry_path(path: &Path) -> Result<(), UnpackError> {
    if path.as_os_str().is_empty() {
        return Err(UnpackError::PathEscapesDestination {
            path: String::new(),
        });
    }

    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(UnpackError::PathEscapesDestination {
                    path: path.to_string_lossy().to_string(),
                });
            }
        }
    }

    Ok(())
}
