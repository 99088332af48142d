//! Wire and domain types for content operations

use crate::error::ContentError;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
}

/// Snapshot of one entry, always addressed by its virtual path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryStats {
    pub path: String,
    /// `None` for entries that are neither files nor directories
    #[serde(rename = "type")]
    pub entry_type: Option<EntryType>,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
    pub name: String,
    pub writeable: bool,
}

impl EntryStats {
    pub fn is_directory(&self) -> bool {
        self.entry_type == Some(EntryType::Directory)
    }
}

/// Encoding of a content payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentFormat {
    #[serde(rename = "base64")]
    Base64,
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
}

impl ContentFormat {
    /// Decode a payload string into raw bytes
    pub fn decode(self, content: &str) -> Result<Vec<u8>, ContentError> {
        match self {
            ContentFormat::Utf8 => Ok(content.as_bytes().to_vec()),
            ContentFormat::Base64 => base64::engine::general_purpose::STANDARD
                .decode(content.trim())
                .map_err(|e| ContentError::InvalidContent(e.to_string())),
        }
    }

    /// Encode raw bytes; UTF-8 encoding replaces invalid sequences
    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            ContentFormat::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            ContentFormat::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContent {
    pub stats: EntryStats,
    pub content: String,
    pub format: ContentFormat,
    pub mimetype: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryContent {
    pub stats: EntryStats,
    pub content: Vec<EntryStats>,
}

/// Result of reading a path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Content {
    File(FileContent),
    Directory(DirectoryContent),
}

/// Request to create a file or directory inside a directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentCreation {
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub format: Option<ContentFormat>,
    /// Absent or `1` overwrites; anything else appends
    #[serde(default)]
    pub chunk: Option<u64>,
}

impl ContentCreation {
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            entry_type: EntryType::Directory,
            name: name.into(),
            content: None,
            format: None,
            chunk: None,
        }
    }

    pub fn file(
        name: impl Into<String>,
        content: impl Into<String>,
        format: ContentFormat,
    ) -> Self {
        Self {
            entry_type: EntryType::File,
            name: name.into(),
            content: Some(content.into()),
            format: Some(format),
            chunk: None,
        }
    }

    pub fn with_chunk(mut self, chunk: u64) -> Self {
        self.chunk = Some(chunk);
        self
    }

    /// Whether this request appends to an existing file
    pub fn is_append(&self) -> bool {
        !matches!(self.chunk, None | Some(1))
    }

    /// Raw bytes carried by this request
    pub fn decoded_content(&self) -> Result<Vec<u8>, ContentError> {
        match &self.content {
            Some(content) => self.format.unwrap_or_default().decode(content),
            None => Ok(Vec::new()),
        }
    }
}

/// Request to move an entry to a new virtual path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMove {
    pub path: String,
}

/// Action performed on an existing path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentAction {
    CopyTo { path: String },
    NewFolder,
    NewFile,
}

/// Untyped action body as it arrives on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContentAction {
    pub action: String,
    #[serde(default)]
    pub path: Option<String>,
}

impl TryFrom<RawContentAction> for ContentAction {
    type Error = ContentError;

    fn try_from(raw: RawContentAction) -> Result<Self, Self::Error> {
        match raw.action.as_str() {
            "COPY_TO" => match raw.path {
                Some(path) if !path.is_empty() => Ok(ContentAction::CopyTo { path }),
                _ => Err(ContentError::InvalidPath(
                    "COPY_TO requires a destination path".to_string(),
                )),
            },
            "NEW_FOLDER" => Ok(ContentAction::NewFolder),
            "NEW_FILE" => Ok(ContentAction::NewFile),
            other => Err(ContentError::UnknownAction(other.to_string())),
        }
    }
}

/// Outcome of a delete request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
