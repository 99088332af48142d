//! Text/binary detection and MIME type lookup

use std::path::Path;

/// Bytes inspected when sniffing content
const SNIFF_WINDOW: usize = 512;

/// Share of suspicious bytes (in percent) above which content is binary
const SUSPICIOUS_PERCENT: usize = 10;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";

/// Decides whether a byte payload is binary.
///
/// Implementations must be deterministic for a given input.
pub trait BinarySniffer: Send + Sync {
    fn is_binary(&self, bytes: &[u8], declared_size: u64) -> bool;
}

/// Default sniffer: looks for NUL bytes and the density of control
/// characters and broken UTF-8 in a prefix window.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteSniffer;

impl BinarySniffer for ByteSniffer {
    fn is_binary(&self, bytes: &[u8], declared_size: u64) -> bool {
        if declared_size == 0 || bytes.is_empty() {
            return false;
        }

        let window = &bytes[..bytes.len().min(SNIFF_WINDOW)];

        // UTF-8, UTF-16 and UTF-32 byte order marks
        if window.starts_with(&[0xEF, 0xBB, 0xBF])
            || window.starts_with(&[0xFE, 0xFF])
            || window.starts_with(&[0xFF, 0xFE])
            || window.starts_with(&[0x00, 0x00, 0xFE, 0xFF])
        {
            return false;
        }
        if window.starts_with(b"%PDF-") {
            return true;
        }
        if window.contains(&0) {
            return true;
        }

        let mut suspicious = window
            .iter()
            .filter(|&&b| b < 7 || (b > 13 && b < 32 && b != 27) || b == 127)
            .count();

        // A multi-byte sequence cut by the window edge is still text.
        if let Err(e) = std::str::from_utf8(window) {
            if e.error_len().is_some() {
                suspicious += window[e.valid_up_to()..]
                    .iter()
                    .filter(|&&b| b > 127)
                    .count();
            }
        }

        suspicious * 100 / window.len() > SUSPICIOUS_PERCENT
    }
}

/// Result of classifying a file payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_binary: bool,
    pub mimetype: String,
}

/// Combines a [`BinarySniffer`] with extension-based MIME lookup
pub struct Classifier {
    sniffer: Box<dyn BinarySniffer>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ByteSniffer)
    }
}

impl Classifier {
    pub fn new(sniffer: impl BinarySniffer + 'static) -> Self {
        Self {
            sniffer: Box::new(sniffer),
        }
    }

    pub fn classify(&self, name: &str, bytes: &[u8], declared_size: u64) -> Classification {
        let is_binary = self.sniffer.is_binary(bytes, declared_size);
        Classification {
            is_binary,
            mimetype: mimetype(name, is_binary),
        }
    }
}

/// MIME type from the file extension, falling back on the binary verdict
pub fn mimetype(name: &str, is_binary: bool) -> String {
    match mime_guess::from_path(Path::new(name)).first() {
        Some(mime) => mime.to_string(),
        None if is_binary => OCTET_STREAM.to_string(),
        None => TEXT_PLAIN.to_string(),
    }
}
