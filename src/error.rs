//! Error Type Definition Module
//!
//! This module defines the various error types that may be encountered while
//! reading a book listing and unpacking it into a folder. All errors are
//! uniformly wrapped in the `UnpackError` enumeration for convenient error
//! handling by the caller.

use thiserror::Error;

/// Types of errors that can occur while unpacking a book
///
/// This enumeration defines the various error cases that can be encountered
/// when loading a book listing from an EPUB container and exporting it to a
/// destination folder, including archive errors, policy guards, and
/// filesystem failures.
#[derive(Debug, Error)]
pub enum UnpackError {
    /// ZIP archive related errors
    ///
    /// Errors occur when processing the ZIP structure of EPUB files,
    /// such as file corruption, unreadability, etc.
    #[error("Archive error: {source}")]
    ArchiveError { source: zip::result::ZipError },

    /// Encrypted destination error
    ///
    /// This error is triggered when the destination folder already holds an
    /// `encryption.xml` under a `META-INF` directory. Unpacking into such a
    /// folder would mix plain resources with an encryption manifest that no
    /// longer describes them.
    #[error("Destination not usable: \"{path}\" already contains an encryption.xml.")]
    DestinationEncrypted { path: String },

    /// Destination is not a directory error
    ///
    /// Triggered when the destination path exists but names something other
    /// than a directory.
    #[error("Destination not usable: \"{path}\" is not a directory.")]
    DestinationNotDirectory { path: String },

    /// Data Decoding Error - Null data
    ///
    /// This error occurs when trying to decode an empty stream.
    #[error("Decode error: The data is empty.")]
    EmptyDataError,

    /// Encrypted book error
    ///
    /// The book listing contains a `META-INF/encryption.xml` entry. The
    /// export is refused before anything is written, so the destination
    /// folder is left exactly as it was.
    #[error(
        "Encryption present: The book contains \"META-INF/encryption.xml\", nothing was written."
    )]
    EncryptionPresent,

    #[error("IO error: {source}")]
    IOError { source: std::io::Error },

    /// Missing required attribute error
    ///
    /// Triggered when an XML element in the book lacks an attribute required
    /// by the EPUB specification.
    #[error(
        "Missing required attribute: The \"{attribute}\" attribute is a must attribute for the \"{tag}\" element."
    )]
    MissingRequiredAttribute { tag: String, attribute: String },

    /// Non-canonical EPUB structure error
    ///
    /// This error occurs when the book lacks a file that is required in the
    /// EPUB specification.
    #[error("Non-canonical epub: The \"{expected_file}\" file was not found.")]
    NonCanonicalEpub { expected_file: String },

    /// Non-canonical file structure error
    ///
    /// This error is triggered when the required XML elements in the
    /// specification are missing from the book.
    #[error("Non-canonical file: The \"{tag}\" elements was not found.")]
    NonCanonicalFile { tag: String },

    /// Entry path leak error
    ///
    /// This error occurs when a listing entry path would resolve outside the
    /// destination folder, which is a security protection mechanism.
    #[error("Entry path leakage: Path \"{path}\" is out of destination range.")]
    PathEscapesDestination { path: String },

    /// Preferences decoding error
    ///
    /// This error occurs when a stored preferences file cannot be parsed.
    #[error("Preferences error: {source}")]
    PreferencesDecodeError { source: toml::de::Error },

    /// Preferences encoding error
    #[error("Preferences error: {source}")]
    PreferencesEncodeError { source: toml::ser::Error },

    /// QuickXml error
    ///
    /// This error occurs when parsing XML data using the QuickXml library.
    #[error("QuickXml error: {source}")]
    QuickXmlError { source: quick_xml::Error },

    /// Unusable compression method error
    ///
    /// This error occurs when an EPUB file uses an unsupported compression method.
    #[error(
        "Unusable compression method: The \"{file}\" file uses the unsupported \"{method}\" compression method."
    )]
    UnusableCompressionMethod { file: String, method: String },

    /// UTF-8 decoding error
    ///
    /// This error occurs when attempting to decode byte data into a UTF-8 string
    /// but the data is not formatted correctly.
    #[error("Decode error: {source}")]
    Utf8DecodeError { source: std::string::FromUtf8Error },

    /// UTF-16 decoding error
    ///
    /// This error occurs when attempting to decode byte data into a UTF-16 string
    /// but the data is not formatted correctly.
    #[error("Decode error: {source}")]
    Utf16DecodeError { source: std::string::FromUtf16Error },

    /// WalkDir error
    ///
    /// This error occurs when using the WalkDir library to traverse the
    /// destination directory.
    #[error("WalkDir error: {source}")]
    WalkDirError { source: walkdir::Error },
}

impl From<zip::result::ZipError> for UnpackError {
    fn from(value: zip::result::ZipError) -> Self {
        UnpackError::ArchiveError { source: value }
    }
}

impl From<quick_xml::Error> for UnpackError {
    fn from(value: quick_xml::Error) -> Self {
        UnpackError::QuickXmlError { source: value }
    }
}

impl From<std::io::Error> for UnpackError {
    fn from(value: std::io::Error) -> Self {
        UnpackError::IOError { source: value }
    }
}

impl From<std::string::FromUtf8Error> for UnpackError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        UnpackError::Utf8DecodeError { source: value }
    }
}

impl From<std::string::FromUtf16Error> for UnpackError {
    fn from(value: std::string::FromUtf16Error) -> Self {
        UnpackError::Utf16DecodeError { source: value }
    }
}

impl From<walkdir::Error> for UnpackError {
    fn from(value: walkdir::Error) -> Self {
        UnpackError::WalkDirError { source: value }
    }
}

impl From<toml::de::Error> for UnpackError {
    fn from(value: toml::de::Error) -> Self {
        UnpackError::PreferencesDecodeError { source: value }
    }
}

impl From<toml::ser::Error> for UnpackError {
    fn from(value: toml::ser::Error) -> Self {
        UnpackError::PreferencesEncodeError { source: value }
    }
}

#[cfg(test)]
impl PartialEq for UnpackError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::DestinationEncrypted { path: l_path },
                Self::DestinationEncrypted { path: r_path },
            ) => l_path == r_path,
            (
                Self::DestinationNotDirectory { path: l_path },
                Self::DestinationNotDirectory { path: r_path },
            ) => l_path == r_path,
            (
                Self::MissingRequiredAttribute {
                    tag: l_tag,
                    attribute: l_attribute,
                },
                Self::MissingRequiredAttribute {
                    tag: r_tag,
                    attribute: r_attribute,
                },
            ) => l_tag == r_tag && l_attribute == r_attribute,
            (
                Self::NonCanonicalEpub {
                    expected_file: l_expected_file,
                },
                Self::NonCanonicalEpub {
                    expected_file: r_expected_file,
                },
            ) => l_expected_file == r_expected_file,
            (Self::NonCanonicalFile { tag: l_tag }, Self::NonCanonicalFile { tag: r_tag }) => {
                l_tag == r_tag
            }
            (
                Self::PathEscapesDestination { path: l_path },
                Self::PathEscapesDestination { path: r_path },
            ) => l_path == r_path,
            (
                Self::UnusableCompressionMethod {
                    file: l_file,
                    method: l_method,
                },
                Self::UnusableCompressionMethod {
                    file: r_file,
                    method: r_method,
                },
            ) => l_file == r_file && l_method == r_method,
            (
                Self::Utf8DecodeError { source: l_source },
                Self::Utf8DecodeError { source: r_source },
            ) => l_source == r_source,

            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}
