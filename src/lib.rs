//! Epub unpack library
//!
//! A Rust library for unpacking EPUB eBook files into plain filesystem
//! folders.
//!
//! This library takes the file listing of an open book, either supplied
//! entry by entry by a host application or read from an EPUB container, and
//! writes every file byte-for-byte into a destination folder. The unpacked
//! tree mirrors the book's internal relative paths, so external tools such
//! as version control can operate on the individual files.
//!
//! ## Features
//!
//! - Build a book listing from raw entries or straight from an `.epub` file.
//! - Refuse to unpack books that declare encrypted resources, and refuse
//!   destination folders that already hold an encryption manifest.
//! - Merge into existing folders: colliding paths are overwritten, other
//!   files are kept.
//! - Suggest a folder name from the book's title, cleaned for use on every
//!   common filesystem.
//!
//! ## Quick Start
//!
//! ```rust, ignore
//! # use epub_unpack::{Book, FolderExporter};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Read the file listing of an EPUB
//! let book = Book::open("path/to/epub/file.epub")?;
//!
//! // Unpack it into a folder named after the book
//! let destination = std::path::Path::new("/some/folder").join(book.suggested_folder_name());
//! let report = FolderExporter::new(&destination).export(&book)?;
//!
//! println!("{} files written to {}", report.count(), destination.display());
//! # Ok(())
//! # }
//! ```
//!
//! Fonts and every other resource are written exactly as listed: this
//! library never obfuscates, de-obfuscates, or otherwise rewrites content.
//! Packaging the folder back into an EPUB is left to other tools.

pub(crate) mod utils;

pub mod book;
pub mod error;
pub mod export;
pub mod prefs;

pub use book::Book;
pub use export::{ExportReport, FolderExporter};
pub use prefs::Preferences;
pub use utils::{DecodeBytes, sanitize_file_name};
