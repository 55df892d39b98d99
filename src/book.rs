use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use log::warn;
use zip::ZipArchive;

use crate::{
    error::UnpackError,
    utils::{
        DecodeBytes, compression_method_check, parse_first_dc_title, parse_rootfile_path,
        sanitize_file_name,
    },
};

/// Path of the encryption manifest inside an EPUB container
pub const ENCRYPTION_PATH: &str = "META-INF/encryption.xml";

/// Path of the container file inside an EPUB container
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Folder name used when a book has no usable title
const DEFAULT_FOLDER_NAME: &str = "foldername";

/// The file listing of an open book
///
/// The `Book` structure is the in-memory representation the exporter works
/// from: an ordered collection of (relative path, byte content) pairs
/// covering every file inside the publication, manifested or not. Entries
/// keep the order in which they were supplied, and their content is never
/// reinterpreted: what goes in is what the exporter writes out.
///
/// A listing can be assembled directly by the host, entry by entry, or read
/// from an EPUB container with [`Book::from_reader`] or [`Book::open`].
pub struct Book {
    /// Relative entry paths mapped to their raw content, in insertion order
    entries: IndexMap<PathBuf, Vec<u8>>,
}

impl Book {
    /// Creates an empty book listing
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Creates a book listing from (path, content) pairs
    ///
    /// The pairs keep their iteration order. A path supplied twice keeps the
    /// position of its first occurrence and the content of its last.
    ///
    /// # Parameters
    /// - `pairs`: The (relative path, byte content) pairs of the listing
    pub fn from_pairs<P, I>(pairs: I) -> Self
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = (P, Vec<u8>)>,
    {
        let mut book = Self::new();
        for (path, data) in pairs {
            book.insert(path, data);
        }

        book
    }

    /// Reads a book listing out of an EPUB container
    ///
    /// This function loads every file entry of the ZIP archive into memory.
    /// Directory entries carry no content and are skipped; the directories
    /// they describe are implied by the entry paths. The OCF compression
    /// rule is checked up front: an EPUB container may only use the Stored
    /// and Deflated methods.
    ///
    /// # Parameters
    /// - `reader`: The data source that implements the `Read` and `Seek` traits,
    ///   usually a file or memory buffer
    ///
    /// # Return
    /// - `Ok(Book)`: The complete file listing of the container
    /// - `Err(UnpackError)`: The archive is unreadable or violates the
    ///   compression rule
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, UnpackError> {
        let mut archive = ZipArchive::new(reader).map_err(UnpackError::from)?;

        compression_method_check(&mut archive)?;

        let mut entries = IndexMap::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }

            let path = PathBuf::from(file.name());
            let mut data = Vec::<u8>::new();
            file.read_to_end(&mut data)?;

            if entries.insert(path, data).is_some() {
                warn!(
                    "Duplicate archive entry, keeping the last one: {}",
                    file.name()
                );
            }
        }

        Ok(Self { entries })
    }

    /// Adds or replaces a single entry
    ///
    /// # Parameters
    /// - `path`: The entry path, relative to the book root
    /// - `data`: The raw content of the entry
    ///
    /// # Return
    /// - `Some(Vec<u8>)`: The previous content, if the path was already listed
    /// - `None`: The path is new to the listing
    pub fn insert<P: Into<PathBuf>>(&mut self, path: P, data: Vec<u8>) -> Option<Vec<u8>> {
        self.entries.insert(path.into(), data)
    }

    /// Returns the content of an entry
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<&[u8]> {
        self.entries.get(path.as_ref()).map(Vec::as_slice)
    }

    /// Checks whether the listing contains an entry at the given path
    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        self.entries.contains_key(path.as_ref())
    }

    /// Iterates the entries in listing order
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &[u8])> {
        self.entries
            .iter()
            .map(|(path, data)| (path.as_path(), data.as_slice()))
    }

    /// Returns the number of entries in the listing
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks whether the listing is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the book contains `encryption.xml`
    ///
    /// This function determines whether the publication declares encrypted
    /// resources by checking for an entry at exactly `META-INF/encryption.xml`.
    /// The comparison is case-sensitive: inside an OCF container that path is
    /// fixed by the specification, so nothing else can be the manifest.
    ///
    /// # Return
    /// - `true` if the publication contains an encryption manifest
    /// - `false` if the publication does not contain an encryption manifest
    ///
    /// # Notes
    /// - This function only checks the existence of the manifest entry;
    ///   its content is ignored.
    pub fn has_encryption(&self) -> bool {
        self.entries.contains_key(Path::new(ENCRYPTION_PATH))
    }

    /// Retrieves the title of the publication
    ///
    /// This function resolves the OPF package document through
    /// `META-INF/container.xml` and extracts the first `dc:title` from it.
    ///
    /// # Return
    /// - `Ok(Some(String))`: The whitespace-normalized first title
    /// - `Ok(None)`: The package document carries no usable title
    /// - `Err(UnpackError)`: The container or package document is missing
    ///   or cannot be parsed
    pub fn title(&self) -> Result<Option<String>, UnpackError> {
        let container = self
            .get(CONTAINER_PATH)
            .ok_or_else(|| UnpackError::NonCanonicalEpub {
                expected_file: CONTAINER_PATH.to_string(),
            })?
            .to_vec()
            .decode()?;

        let package_path = parse_rootfile_path(&container)?;

        let package = self
            .get(&package_path)
            .ok_or_else(|| UnpackError::NonCanonicalEpub {
                expected_file: package_path.to_string_lossy().to_string(),
            })?
            .to_vec()
            .decode()?;

        parse_first_dc_title(&package)
    }

    /// Suggests a folder name for unpacking this book
    ///
    /// The suggestion is the sanitized first title of the publication. Books
    /// without a readable title, and titles that sanitize away entirely,
    /// fall back to a fixed placeholder name.
    ///
    /// # Return
    /// - `String`: A name usable as a single path component
    pub fn suggested_folder_name(&self) -> String {
        let title = match self.title() {
            Ok(Some(title)) => title,
            Ok(None) => return DEFAULT_FOLDER_NAME.to_string(),
            Err(err) => {
                warn!("Unable to read the book title: {}", err);
                return DEFAULT_FOLDER_NAME.to_string();
            }
        };

        let name = sanitize_file_name(&title);
        if name.is_empty() {
            DEFAULT_FOLDER_NAME.to_string()
        } else {
            name
        }
    }
}

impl Book {
    /// Reads a book listing from an EPUB file on disk
    ///
    /// This function is a convenience constructor for `Book`, used to build
    /// the listing directly from a file path.
    ///
    /// # Parameters
    /// - `path`: The path to the EPUB file
    ///
    /// # Return
    /// - `Ok(Book)`: The complete file listing of the container
    /// - `Err(UnpackError)`: An error occurred while opening or reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, UnpackError> {
        let file = File::open(path).map_err(UnpackError::from)?;

        Self::from_reader(BufReader::new(file))
    }
}

impl Default for Book {
    fn default() -> Self {
        Self::new()
    }
}
