//! Template Sources
//!
//! Abstracts the filesystem the cache reads template sources from, and the
//! text encodings those sources may be stored in.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::time::SystemTime;

use crate::error::CacheError;

// == Template Source Trait ==
/// Provides template bytes and modification times.
pub trait TemplateSource: Send + Sync + 'static {
    /// Returns true if a template exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Reads the raw bytes stored at `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Returns the last modification time of `path`.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Reads `path` and decodes it with `encoding`.
    fn read_to_string(&self, path: &Path, encoding: Encoding) -> io::Result<String> {
        let bytes = self.read(path)?;
        encoding.decode(&bytes)
    }
}

// == Filesystem Source ==
/// Reads templates from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl TemplateSource for FsSource {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        let metadata = fs::metadata(path)?;
        // Some platforms do not record mtime
        metadata.modified().or_else(|_| metadata.created())
    }
}

// == Encoding ==
/// Text encoding of a template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Latin1,
    Ascii,
}

impl Encoding {
    /// Decodes `bytes`, failing with `InvalidData` if they are not valid.
    pub fn decode(self, bytes: &[u8]) -> io::Result<String> {
        match self {
            Encoding::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                String::from_utf8(bytes.to_vec()).map_err(|e| invalid_data(self, e))
            }
            Encoding::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    return Err(invalid_data(self, "odd number of bytes"));
                }
                let units = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
                char::decode_utf16(units)
                    .collect::<Result<String, _>>()
                    .map_err(|e| invalid_data(self, e))
            }
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Encoding::Ascii => {
                if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                    return Err(invalid_data(
                        self,
                        format!("non-ASCII byte at offset {}", pos),
                    ));
                }
                Ok(bytes.iter().map(|&b| char::from(b)).collect())
            }
        }
    }

    /// Canonical label of this encoding.
    pub fn label(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Utf16Le => "utf16le",
            Encoding::Latin1 => "latin1",
            Encoding::Ascii => "ascii",
        }
    }
}

fn invalid_data(encoding: Encoding, detail: impl fmt::Display) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("content is not valid {}: {}", encoding.label(), detail),
    )
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Encoding {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(Encoding::Utf16Le),
            "latin1" | "binary" => Ok(Encoding::Latin1),
            "ascii" => Ok(Encoding::Ascii),
            other => Err(CacheError::InvalidRequest(format!(
                "unsupported encoding: {}",
                other
            ))),
        }
    }
}
