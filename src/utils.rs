use std::{
    io::{Read, Seek},
    path::{Path, PathBuf},
};

use quick_xml::{NsReader, events::Event};
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipArchive};

use crate::error::UnpackError;

/// Cleans a book title into a usable folder name
///
/// This function reduces an arbitrary title string to something every common
/// filesystem accepts as a single path component. Non-ASCII and non-printable
/// characters are dropped, characters that are reserved on Windows and
/// whitespace are replaced with `_`, and dot sequences that would confuse
/// path resolution are neutralized.
///
/// ## Parameters
/// - `name`: The raw name, usually the first `dc:title` of a publication
///
/// ## Return
/// - `String`: The cleaned name; may be empty if nothing printable remains
///
/// ## Notes
/// - Windows doesn't accept path components that end with a period.
/// - Mac and Unix don't like file names that begin with a full stop.
pub fn sanitize_file_name(name: &str) -> String {
    const SUBSTITUTE: char = '_';
    const RESERVED: [char; 10] = ['\\', '|', '?', '*', '<', '"', ':', '>', '+', '/'];

    let mut cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_graphic() || c.is_ascii_whitespace())
        .map(|c| {
            if RESERVED.contains(&c) || c.is_ascii_whitespace() {
                SUBSTITUTE
            } else {
                c
            }
        })
        .collect();

    // A name made of nothing but dots collapses to a single substitute
    if !cleaned.is_empty() && cleaned.chars().all(|c| c == '.') {
        return SUBSTITUTE.to_string();
    }

    cleaned = cleaned.replace("..", "_");

    if cleaned.ends_with('.') {
        cleaned.pop();
        cleaned.push(SUBSTITUTE);
    }

    if cleaned.starts_with('.') {
        cleaned.replace_range(0..1, "_");
    }

    cleaned
}

/// Checks if the compression method of all entries in the EPUB file
/// conforms to the specification requirements.
///
/// According to the OCF (Open Container Format) specification, EPUB files
/// can only use either Stored (uncompressed) or Deflated (deflate compression).
/// If any other compression method is found, an error will be returned.
///
/// ## Parameters
/// - `zip_archive`: The ZIP archive to check.
///
/// ## Return
/// - `Ok(())`: All files use the supported compression method
/// - `Err(UnpackError)`: Unsupported compression method found
pub fn compression_method_check<R: Read + Seek>(
    zip_archive: &mut ZipArchive<R>,
) -> Result<(), UnpackError> {
    for index in 0..zip_archive.len() {
        let file = zip_archive.by_index(index)?;

        match file.compression() {
            CompressionMethod::Stored | CompressionMethod::Deflated => continue,
            _ => {
                return Err(UnpackError::UnusableCompressionMethod {
                    file: file.name().to_string(),
                    method: file.compression().to_string(),
                });
            }
        };
    }

    Ok(())
}

/// Extracts the OPF rootfile path from a `META-INF/container.xml` document
///
/// According to the EPUB specification, the container file must contain at
/// least one `rootfile` element pointing to the main OPF file. When multiple
/// `rootfile` elements exist, the first one is used.
///
/// ## Parameters
/// - `content`: The content string of the container.xml
///
/// ## Return
/// - `Ok(PathBuf)`: The path to the OPF file, relative to the container root
/// - `Err(UnpackError)`: The element or its `full-path` attribute is missing,
///   or the XML could not be parsed
pub fn parse_rootfile_path(content: &str) -> Result<PathBuf, UnpackError> {
    if content.is_empty() {
        return Err(UnpackError::EmptyDataError);
    }

    let mut reader = NsReader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,

            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                if element.local_name().as_ref() == b"rootfile" {
                    for attr in element.attributes().flatten() {
                        if attr.key.as_ref() == b"full-path" {
                            let path = String::from_utf8_lossy(&attr.value).to_string();
                            return Ok(PathBuf::from(path));
                        }
                    }

                    return Err(UnpackError::MissingRequiredAttribute {
                        tag: "rootfile".to_string(),
                        attribute: "full-path".to_string(),
                    });
                }
            }

            Err(err) => return Err(err.into()),

            _ => {}
        }

        buf.clear();
    }

    Err(UnpackError::NonCanonicalFile {
        tag: "rootfile".to_string(),
    })
}

/// Extracts the first `dc:title` value from an OPF package document
///
/// The EPUB specification requires each publication to carry at least one
/// title, but books in the wild do not always comply, so a missing or empty
/// title is not an error here.
///
/// ## Parameters
/// - `content`: The content string of the OPF file
///
/// ## Return
/// - `Ok(Some(String))`: The whitespace-normalized text of the first title
/// - `Ok(None)`: The document has no `dc:title`, or its text is empty
/// - `Err(UnpackError)`: The XML could not be parsed
pub fn parse_first_dc_title(content: &str) -> Result<Option<String>, UnpackError> {
    if content.is_empty() {
        return Err(UnpackError::EmptyDataError);
    }

    let mut reader = NsReader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut in_title = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,

            Ok(Event::Start(element)) => {
                in_title = element.local_name().as_ref() == b"title"
                    && element
                        .name()
                        .prefix()
                        .is_some_and(|prefix| prefix.as_ref() == b"dc");
            }

            Ok(Event::Text(text)) if in_title => {
                let title = String::from_utf8_lossy(text.as_ref()).normalize_whitespace();
                return Ok((!title.is_empty()).then_some(title));
            }

            Ok(Event::End(_)) => in_title = false,

            Err(err) => return Err(err.into()),

            _ => {}
        }

        buf.clear();
    }

    Ok(None)
}

/// Checks a destination folder for a pre-existing encryption manifest
///
/// This function walks the destination directory looking for any file whose
/// relative path has a `META-INF` segment and an `encryption.xml` segment.
/// The comparison is case-insensitive: a folder that was populated on a
/// case-preserving filesystem may carry either spelling.
///
/// ## Parameters
/// - `destination`: The folder to scan
///
/// ## Return
/// - `Ok(true)`: The folder already holds an encryption manifest
/// - `Ok(false)`: The folder is usable as an unpack destination
/// - `Err(UnpackError)`: The directory walk failed
pub fn destination_has_encryption(destination: &Path) -> Result<bool, UnpackError> {
    for entry in WalkDir::new(destination) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(destination).unwrap_or(entry.path());

        let mut meta_inf = false;
        let mut encryption_xml = false;
        for segment in relative.components() {
            let segment = segment.as_os_str().to_string_lossy();
            if segment.eq_ignore_ascii_case("META-INF") {
                meta_inf = true;
            } else if segment.eq_ignore_ascii_case("encryption.xml") {
                encryption_xml = true;
            }
        }

        if meta_inf && encryption_xml {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Provides functionality to decode byte data into strings
///
/// This trait is primarily used to decode raw byte data (such as the
/// container and package documents of a book) into a suitable string
/// representation. It supports automatic detection of multiple encoding
/// formats, including UTF-8 (with or without BOM), UTF-16 BE, and UTF-16 LE.
///
/// ## Notes
/// - A byte stream lacking a BOM (Byte Order Mark) is assumed to be UTF-8;
///   non-UTF-8 data without a BOM falls back to a lossy conversion.
pub trait DecodeBytes {
    fn decode(&self) -> Result<String, UnpackError>;
}

impl DecodeBytes for Vec<u8> {
    fn decode(&self) -> Result<String, UnpackError> {
        if self.len() < 4 {
            return Err(UnpackError::EmptyDataError);
        }

        // UTF-8 BOM (0xEF, 0xBB, 0xBF)
        if let Some(rest) = self.strip_prefix([0xEF, 0xBB, 0xBF].as_slice()) {
            return String::from_utf8(rest.to_vec()).map_err(UnpackError::from);
        }

        // UTF-16 BE BOM (0xFE, 0xFF)
        if let Some(rest) = self.strip_prefix([0xFE, 0xFF].as_slice()) {
            let utf16_units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .collect();

            return String::from_utf16(&utf16_units).map_err(UnpackError::from);
        }

        // UTF-16 LE BOM (0xFF, 0xFE)
        if let Some(rest) = self.strip_prefix([0xFF, 0xFE].as_slice()) {
            let utf16_units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .collect();

            return String::from_utf16(&utf16_units).map_err(UnpackError::from);
        }

        match String::from_utf8(self.clone()) {
            Ok(text) => Ok(text),
            Err(_) => Ok(String::from_utf8_lossy(self).to_string()),
        }
    }
}

/// Provides functionality for normalizing whitespace characters
///
/// This trait normalizes various sequences of whitespace characters
/// (including spaces, tabs, newlines, etc.) in a string into a single
/// whitespace character, removing leading and trailing whitespace characters.
pub trait NormalizeWhitespace {
    fn normalize_whitespace(&self) -> String;
}

impl NormalizeWhitespace for &str {
    fn normalize_whitespace(&self) -> String {
        self.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl NormalizeWhitespace for String {
    fn normalize_whitespace(&self) -> String {
        self.as_str().normalize_whitespace()
    }
}

impl NormalizeWhitespace for std::borrow::Cow<'_, str> {
    fn normalize_whitespace(&self) -> String {
        self.as_ref().normalize_whitespace()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::{
        error::UnpackError,
        utils::{
            DecodeBytes, NormalizeWhitespace, destination_has_encryption, parse_first_dc_title,
            parse_rootfile_path, sanitize_file_name,
        },
    };

    /// Ordinary titles pass through unchanged
    #[test]
    fn test_sanitize_plain_name() {
        assert_eq!(sanitize_file_name("Moby-Dick"), "Moby-Dick");
        assert_eq!(sanitize_file_name("book_01"), "book_01");
    }

    /// Reserved characters and whitespace are substituted
    #[test]
    fn test_sanitize_reserved_characters() {
        assert_eq!(sanitize_file_name("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_file_name("what? why*"), "what__why_");
        assert_eq!(sanitize_file_name("The Great Gatsby"), "The_Great_Gatsby");
        assert_eq!(sanitize_file_name("tab\there"), "tab_here");
    }

    /// Non-printable and non-ASCII characters are dropped
    #[test]
    fn test_sanitize_non_printable() {
        assert_eq!(sanitize_file_name("a\u{0}b\u{7f}c"), "abc");
        assert_eq!(sanitize_file_name("caf\u{e9}"), "caf");
    }

    /// Dot sequences cannot survive sanitization
    #[test]
    fn test_sanitize_dots() {
        assert_eq!(sanitize_file_name("..."), "_");
        assert_eq!(sanitize_file_name("a..b"), "a_b");
        assert_eq!(sanitize_file_name("name."), "name_");
        assert_eq!(sanitize_file_name(".hidden"), "_hidden");
    }

    /// Test with empty data
    #[test]
    fn test_decode_empty_data() {
        let data = vec![];
        let result = data.decode();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), UnpackError::EmptyDataError);
    }

    /// Test data with a length of less than 4 bytes
    #[test]
    fn test_decode_short_data() {
        let data = vec![0xEF, 0xBB];
        let result = data.decode();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), UnpackError::EmptyDataError);
    }

    /// Testing text decoding with UTF-8 BOM
    #[test]
    fn test_decode_utf8_with_bom() {
        let data: Vec<u8> = vec![0xEF, 0xBB, 0xBF, b'H', b'e', b'l', b'l', b'o'];
        let result = data.decode();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Hello");
    }

    /// Test text decoding with UTF-16 BE BOM
    #[test]
    fn test_decode_utf16_be_with_bom() {
        let data = vec![
            0xFE, 0xFF, // BOM
            0x00, b'H', // H
            0x00, b'i', // i
            0x00, b'!', // !
        ];
        let result = data.decode();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Hi!");
    }

    /// Testing text decoding with UTF-16 LE BOM
    #[test]
    fn test_decode_utf16_le_with_bom() {
        let data = vec![
            0xFF, 0xFE, // BOM
            b'H', 0x00, // H
            b'i', 0x00, // i
            b'!', 0x00, // !
        ];
        let result = data.decode();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Hi!");
    }

    /// Testing ordinary UTF-8 text (without BOM)
    #[test]
    fn test_decode_plain_utf8() {
        let data = b"Hello, World!".to_vec();
        let result = data.decode();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Hello, World!");
    }

    /// Test text standardization containing various whitespace characters
    #[test]
    fn test_normalize_whitespace_trait() {
        let text = "  Hello,\tWorld!\n\nRust  ";
        let normalized = text.normalize_whitespace();
        assert_eq!(normalized, "Hello, World! Rust");
    }

    /// The first rootfile element wins
    #[test]
    fn test_parse_rootfile_path() {
        let content = r#"<?xml version="1.0" encoding="UTF-8"?>
            <container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
                <rootfiles>
                    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
                    <rootfile full-path="OEBPS/other.opf" media-type="application/oebps-package+xml"/>
                </rootfiles>
            </container>"#;

        let result = parse_rootfile_path(content);
        assert!(result.is_ok());
        assert_eq!(result.unwrap().to_str().unwrap(), "OEBPS/content.opf");
    }

    /// A rootfile without a full-path attribute is non-canonical
    #[test]
    fn test_parse_rootfile_path_missing_attribute() {
        let content = r#"<container><rootfiles><rootfile media-type="application/oebps-package+xml"/></rootfiles></container>"#;

        let result = parse_rootfile_path(content);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err(),
            UnpackError::MissingRequiredAttribute {
                tag: "rootfile".to_string(),
                attribute: "full-path".to_string(),
            }
        );
    }

    /// A container without any rootfile is non-canonical
    #[test]
    fn test_parse_rootfile_path_missing_element() {
        let content = r#"<container><rootfiles></rootfiles></container>"#;

        let result = parse_rootfile_path(content);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err(),
            UnpackError::NonCanonicalFile {
                tag: "rootfile".to_string(),
            }
        );
    }

    /// The first dc:title is extracted and normalized
    #[test]
    fn test_parse_first_dc_title() {
        let content = r#"<?xml version="1.0"?>
            <package xmlns="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/" version="3.0">
                <metadata>
                    <dc:identifier id="pub-id">urn:uuid:0000</dc:identifier>
                    <dc:title>  A  Tale of
                        Two Cities  </dc:title>
                    <dc:title>Second Title</dc:title>
                </metadata>
            </package>"#;

        let result = parse_first_dc_title(content);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Some("A Tale of Two Cities".to_string()));
    }

    /// A package without a title yields None
    #[test]
    fn test_parse_first_dc_title_missing() {
        let content = r#"<package xmlns:dc="http://purl.org/dc/elements/1.1/">
                <metadata><dc:language>en</dc:language></metadata>
            </package>"#;

        let result = parse_first_dc_title(content);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), None);
    }

    /// An empty destination folder carries no encryption manifest
    #[test]
    fn test_destination_without_encryption() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("OEBPS")).unwrap();
        fs::write(dir.path().join("OEBPS/ch1.xhtml"), "<html/>").unwrap();

        let result = destination_has_encryption(dir.path());
        assert!(result.is_ok());
        assert!(!result.unwrap());
    }

    /// The destination scan matches the manifest path case-insensitively
    #[test]
    fn test_destination_with_encryption() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("meta-inf")).unwrap();
        fs::write(dir.path().join("meta-inf/ENCRYPTION.XML"), "<encryption/>").unwrap();

        let result = destination_has_encryption(dir.path());
        assert!(result.is_ok());
        assert!(result.unwrap());
    }

    /// An encryption.xml outside META-INF does not trip the scan
    #[test]
    fn test_destination_encryption_outside_meta_inf() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("OEBPS")).unwrap();
        fs::write(dir.path().join("OEBPS/encryption.xml"), "<encryption/>").unwrap();

        let result = destination_has_encryption(dir.path());
        assert!(result.is_ok());
        assert!(!result.unwrap());
    }
}
