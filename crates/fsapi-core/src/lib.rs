//! FS API - Core Library
//!
//! Maps a root directory onto a virtual path space and implements the
//! content operations (read, create, delete, move, copy, new entries)
//! served by the HTTP layer.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod paths;
pub mod stats;
pub mod types;

pub use classify::{BinarySniffer, ByteSniffer, Classification, Classifier};
pub use config::Settings;
pub use engine::ContentEngine;
pub use error::{ContentError, ContentResult, FsError, Result};
pub use paths::{PathResolver, VirtualPath};
pub use stats::StatInspector;
pub use types::*;
