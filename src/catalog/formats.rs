//! Registry of image formats the scanner understands
//!
//! Formats are selected by the leading bytes of the file, not by extension.
//! Only the header is decoded, so scanning a large mirror stays cheap.

use image::{ImageError, ImageFormat, ImageReader};
use std::io::{BufRead, Seek};

/// Bytes read from the start of a file to pick a format
pub const SNIFF_LEN: usize = 16;

/// Wildcard byte inside a signature
const ANY: u8 = b'?';

/// JPEG Start Of Image (SOI) followed by a marker prefix
const JPEG_MAGIC: &[u8] = b"\xff\xd8\xff";
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const GIF87_MAGIC: &[u8] = b"GIF87a";
const GIF89_MAGIC: &[u8] = b"GIF89a";
const WEBP_MAGIC: &[u8] = b"RIFF????WEBPVP8";
const BMP_MAGIC: &[u8] = b"BM????\x00\x00\x00\x00";

/// Why a header could not be read
#[derive(Debug)]
pub enum HeaderError {
    /// The decoder rejected the bytes (corrupt, truncated, or unsupported)
    Format(ImageError),
    /// The underlying reader failed
    Io(std::io::Error),
}

/// A registered format: how to recognize it and which decoder reads it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub name: &'static str,
    /// Magic prefixes at offset 0; `?` matches any byte
    pub signatures: Vec<&'static [u8]>,
    pub image_format: ImageFormat,
}

impl Format {
    pub fn jpeg() -> Self {
        Self {
            name: "jpeg",
            signatures: vec![JPEG_MAGIC],
            image_format: ImageFormat::Jpeg,
        }
    }

    pub fn png() -> Self {
        Self {
            name: "png",
            signatures: vec![PNG_MAGIC],
            image_format: ImageFormat::Png,
        }
    }

    pub fn gif() -> Self {
        Self {
            name: "gif",
            signatures: vec![GIF87_MAGIC, GIF89_MAGIC],
            image_format: ImageFormat::Gif,
        }
    }

    pub fn webp() -> Self {
        Self {
            name: "webp",
            signatures: vec![WEBP_MAGIC],
            image_format: ImageFormat::WebP,
        }
    }

    pub fn bmp() -> Self {
        Self {
            name: "bmp",
            signatures: vec![BMP_MAGIC],
            image_format: ImageFormat::Bmp,
        }
    }

    /// Look up a built-in format by its lowercase name
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::jpeg()),
            "png" => Some(Self::png()),
            "gif" => Some(Self::gif()),
            "webp" => Some(Self::webp()),
            "bmp" => Some(Self::bmp()),
            _ => None,
        }
    }

    /// Check whether `head` starts with one of this format's signatures
    pub fn matches(&self, head: &[u8]) -> bool {
        self.signatures.iter().any(|magic| {
            head.len() >= magic.len()
                && magic
                    .iter()
                    .zip(head)
                    .all(|(&want, &got)| want == ANY || want == got)
        })
    }

    /// Decode width and height from the header without reading pixel data
    pub fn dimensions<R: BufRead + Seek>(&self, reader: R) -> Result<(u32, u32), HeaderError> {
        ImageReader::with_format(reader, self.image_format)
            .into_dimensions()
            .map_err(|err| match err {
                ImageError::IoError(io) if io.kind() != std::io::ErrorKind::UnexpectedEof => {
                    HeaderError::Io(io)
                }
                other => HeaderError::Format(other),
            })
    }
}

/// Explicit set of supported formats, tried in registration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRegistry {
    formats: Vec<Format>,
}

impl FormatRegistry {
    /// A registry with nothing registered
    pub fn empty() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Add a format; later registrations never shadow earlier ones
    pub fn register(&mut self, format: Format) -> &mut Self {
        self.formats.push(format);
        self
    }

    pub fn with(mut self, format: Format) -> Self {
        self.register(format);
        self
    }

    /// Build a registry from format names, failing on the first unknown one
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        let mut registry = Self::empty();
        for name in names {
            let format = Format::by_name(name.as_ref()).ok_or_else(|| name.as_ref().to_string())?;
            if !registry.names().contains(&format.name) {
                registry.register(format);
            }
        }
        Ok(registry)
    }

    /// Find the format whose signature matches the leading bytes
    pub fn sniff(&self, head: &[u8]) -> Option<&Format> {
        self.formats.iter().find(|format| format.matches(head))
    }

    /// Names of the registered formats, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.formats.iter().map(|format| format.name).collect()
    }
}

impl Default for FormatRegistry {
    /// JPEG and PNG, the formats the wallpaper collection ships
    fn default() -> Self {
        Self::empty().with(Format::jpeg()).with(Format::png())
    }
}
