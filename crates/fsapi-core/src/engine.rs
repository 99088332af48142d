//! Content engine
//!
//! Translates virtual-path operations into filesystem calls. Nothing is
//! cached: every operation re-reads the filesystem, and preconditions are
//! checked immediately before acting, so a concurrent client can still slip
//! in between the check and the act. Losing such a race surfaces as an I/O
//! fault, never as silently overwritten data.

use crate::classify::Classifier;
use crate::config::Settings;
use crate::error::{ContentError, ContentResult};
use crate::paths::{PathResolver, VirtualPath};
use crate::stats::{is_writeable, StatInspector};
use crate::types::{
    Content, ContentAction, ContentCreation, ContentFormat, DirectoryContent, EntryStats,
    EntryType, FileContent,
};
use std::io::ErrorKind;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const NEW_FOLDER_PREFIX: &str = "Untitled Folder";
const NEW_FILE_STEM: &str = "untitled";
const NEW_FILE_EXTENSION: &str = "txt";

/// Path-addressed content operations over one root directory
pub struct ContentEngine {
    inspector: StatInspector,
    classifier: Classifier,
}

impl ContentEngine {
    pub fn new(resolver: PathResolver) -> Self {
        Self::with_classifier(resolver, Classifier::default())
    }

    pub fn with_classifier(resolver: PathResolver, classifier: Classifier) -> Self {
        Self {
            inspector: StatInspector::new(resolver),
            classifier,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(PathResolver::new(settings.root_dir.clone()))
    }

    pub fn resolver(&self) -> &PathResolver {
        self.inspector.resolver()
    }

    pub async fn exists(&self, path: &VirtualPath) -> bool {
        self.inspector.exists(path).await
    }

    pub async fn stat(&self, path: &VirtualPath) -> ContentResult<Option<EntryStats>> {
        self.inspector.stat(path).await
    }

    /// File content or directory listing; `None` when nothing is at `path`
    pub async fn get_content(&self, path: &VirtualPath) -> ContentResult<Option<Content>> {
        debug!("get content: {}", path);

        let Some(stats) = self.inspector.stat(path).await? else {
            return Ok(None);
        };

        match stats.entry_type {
            Some(EntryType::Directory) => {
                let content = self.list_directory(path).await?;
                Ok(Some(Content::Directory(DirectoryContent { stats, content })))
            }
            Some(EntryType::File) => {
                let data = tokio::fs::read(self.resolver().resolve(path)).await?;
                let class = self.classifier.classify(path.name(), &data, stats.size);
                // text that is not UTF-8 (UTF-16, Latin-1) would not survive the utf-8 format
                let format = if class.is_binary || std::str::from_utf8(&data).is_err() {
                    ContentFormat::Base64
                } else {
                    ContentFormat::Utf8
                };

                Ok(Some(Content::File(FileContent {
                    content: format.encode(&data),
                    format,
                    mimetype: class.mimetype,
                    stats,
                })))
            }
            None => {
                debug!("{} is neither a file nor a directory", path);
                Ok(None)
            }
        }
    }

    async fn list_directory(&self, path: &VirtualPath) -> ContentResult<Vec<EntryStats>> {
        let dir_path = path.with_trailing_slash();
        let mut entries = tokio::fs::read_dir(self.resolver().resolve(&dir_path)).await?;

        let mut content = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!("skipping {:?} in {}: name is not valid UTF-8", raw, dir_path);
                    continue;
                }
            };

            let child = match dir_path.join(&file_name) {
                Ok(child) => child,
                Err(e) => {
                    warn!("skipping {}{}: {}", dir_path, file_name, e);
                    continue;
                }
            };

            match self.inspector.stat(&child).await? {
                Some(child_stats) => content.push(child_stats),
                None => warn!("skipping {}: removed during listing", child),
            }
        }

        if !path.is_root() {
            if let Some(mut parent) = self.inspector.stat(&dir_path.parent()).await? {
                parent.name = "..".to_string();
                content.push(parent);
            }
        }

        Ok(content)
    }

    /// Create a file or directory named `data.name` inside `path`
    pub async fn create_content(
        &self,
        path: &VirtualPath,
        data: &ContentCreation,
    ) -> ContentResult<EntryStats> {
        let content_path = path.join(&data.name)?;
        let full_path = self.resolver().resolve(&content_path);
        debug!("create content: {} ({:?})", content_path, data.entry_type);

        let existing = self.inspector.stat(&content_path).await?;
        if let Some(stats) = &existing {
            if stats.is_directory() {
                return Err(ContentError::CannotOverwriteDirectory);
            }
            if !stats.writeable {
                return Err(ContentError::NotWriteable);
            }
        }

        if !is_writeable(&self.resolver().resolve(path)).await {
            return Err(ContentError::ParentNotWriteable);
        }

        match data.entry_type {
            EntryType::Directory => {
                tokio::fs::create_dir(&full_path).await?;
                info!("created directory {}", content_path);
            }
            EntryType::File => {
                let bytes = data.decoded_content()?;

                if !data.is_append() {
                    tokio::fs::write(&full_path, &bytes).await?;
                    info!("wrote {} bytes to {}", bytes.len(), content_path);
                } else if existing.is_some() {
                    let mut file = tokio::fs::OpenOptions::new()
                        .append(true)
                        .open(&full_path)
                        .await?;
                    file.write_all(&bytes).await?;
                    file.flush().await?;
                    info!(
                        "appended chunk {:?} ({} bytes) to {}",
                        data.chunk,
                        bytes.len(),
                        content_path
                    );
                } else {
                    return Err(ContentError::ChunkTargetMissing);
                }
            }
        }

        self.restat(&content_path).await
    }

    /// Remove a file, or a directory with everything below it
    pub async fn delete_content(&self, path: &VirtualPath) -> ContentResult<()> {
        debug!("delete content: {}", path);

        if path.is_root() {
            return Err(ContentError::CannotDeleteRoot);
        }

        let Some(stats) = self.inspector.stat(path).await? else {
            return Err(ContentError::PathNotFound);
        };

        let full_path = self.resolver().resolve(path);
        if stats.is_directory() {
            tokio::fs::remove_dir_all(&full_path).await?;
        } else {
            tokio::fs::remove_file(&full_path).await?;
        }

        info!("deleted {}", path);
        Ok(())
    }

    /// Rename `source` to `destination`; never overwrites
    pub async fn move_content(
        &self,
        source: &VirtualPath,
        destination: &str,
    ) -> ContentResult<EntryStats> {
        let destination = VirtualPath::parse(destination)?;
        debug!("move content: {} -> {}", source, destination);

        if !self.inspector.exists(source).await {
            return Err(ContentError::PathNotFound);
        }
        if self.inspector.stat(&destination).await?.is_some() {
            return Err(ContentError::DestinationExists);
        }
        if !self.inspector.exists(&destination.parent()).await {
            return Err(ContentError::DestinationFolderMissing);
        }

        tokio::fs::rename(
            self.resolver().resolve(source),
            self.resolver().resolve(&destination),
        )
        .await?;
        info!("moved {} to {}", source, destination);

        self.restat(&destination).await
    }

    pub async fn perform_content_action(
        &self,
        path: &VirtualPath,
        action: &ContentAction,
    ) -> ContentResult<EntryStats> {
        debug!("content action on {}: {:?}", path, action);

        if !self.inspector.exists(path).await {
            return Err(ContentError::PathNotFound);
        }

        match action {
            ContentAction::CopyTo { path: destination } => self.copy_to(path, destination).await,
            ContentAction::NewFolder => self.new_folder(path).await,
            ContentAction::NewFile => self.new_file(path).await,
        }
    }

    async fn copy_to(&self, source: &VirtualPath, destination: &str) -> ContentResult<EntryStats> {
        let destination = VirtualPath::parse(destination)?;

        let source_stats = self
            .inspector
            .stat(source)
            .await?
            .ok_or(ContentError::PathNotFound)?;
        if source_stats.is_directory() {
            return Err(ContentError::CannotCopyDirectory);
        }

        if let Some(stats) = self.inspector.stat(&destination).await? {
            if stats.is_directory() {
                return Err(ContentError::CannotOverwriteDirectory);
            }
            if !stats.writeable {
                return Err(ContentError::NotWriteable);
            }
        } else if !self.inspector.exists(&destination.parent()).await {
            return Err(ContentError::DestinationFolderMissing);
        }

        let bytes = tokio::fs::copy(
            self.resolver().resolve(source),
            self.resolver().resolve(&destination),
        )
        .await?;
        info!("copied {} to {} ({} bytes)", source, destination, bytes);

        self.restat(&destination).await
    }

    async fn new_folder(&self, path: &VirtualPath) -> ContentResult<EntryStats> {
        let dir_path = self.require_directory(path).await?;
        let folder_path = self
            .unique_child(&dir_path, |index| match index {
                0 => NEW_FOLDER_PREFIX.to_string(),
                n => format!("{} {}", NEW_FOLDER_PREFIX, n),
            })
            .await?;

        tokio::fs::create_dir(self.resolver().resolve(&folder_path)).await?;
        info!("created folder {}", folder_path);

        self.restat(&folder_path).await
    }

    async fn new_file(&self, path: &VirtualPath) -> ContentResult<EntryStats> {
        let dir_path = self.require_directory(path).await?;
        let file_path = self
            .unique_child(&dir_path, |index| match index {
                0 => format!("{}.{}", NEW_FILE_STEM, NEW_FILE_EXTENSION),
                n => format!("{}{}.{}", NEW_FILE_STEM, n, NEW_FILE_EXTENSION),
            })
            .await?;

        // create_new so that a name taken since the probe is a fault, not a truncation
        tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.resolver().resolve(&file_path))
            .await?;
        info!("created file {}", file_path);

        self.restat(&file_path).await
    }

    async fn require_directory(&self, path: &VirtualPath) -> ContentResult<VirtualPath> {
        // stat without the trailing slash: `file.txt/` is ENOTDIR, not a file
        let stats = self
            .inspector
            .stat(path)
            .await?
            .ok_or(ContentError::PathNotFound)?;
        if !stats.is_directory() {
            return Err(ContentError::NotADirectory);
        }
        Ok(path.with_trailing_slash())
    }

    /// First name produced by `candidate(0)`, `candidate(1)`, ... that is free
    async fn unique_child<F>(&self, dir: &VirtualPath, candidate: F) -> ContentResult<VirtualPath>
    where
        F: Fn(u64) -> String,
    {
        let mut index = 0;
        loop {
            let child = dir.join(&candidate(index))?;
            if !self.inspector.exists(&child).await {
                return Ok(child);
            }
            index += 1;
        }
    }

    async fn restat(&self, path: &VirtualPath) -> ContentResult<EntryStats> {
        self.inspector.stat(path).await?.ok_or_else(|| {
            ContentError::Io(std::io::Error::new(
                ErrorKind::NotFound,
                format!("{} disappeared after the operation", path),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use std::path::Path;

    fn engine(root: &Path) -> ContentEngine {
        ContentEngine::new(PathResolver::new(root))
    }

    fn vp(raw: &str) -> VirtualPath {
        VirtualPath::parse(raw).unwrap()
    }

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[tokio::test]
    async fn test_absent_path() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        let engine = engine(dir.path());

        let path = vp("/missing/file.txt");
        assert!(engine.get_content(&path).await?.is_none());
        assert!(!engine.exists(&path).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_base64_in_text_out() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir(dir.path().join("docs"))?;
        let engine = engine(dir.path());

        let created = engine
            .create_content(
                &vp("/docs"),
                &ContentCreation::file("a.txt", "aGVsbG8=", ContentFormat::Base64),
            )
            .await?;
        assert_eq!(created.path, "/docs/a.txt");
        assert_eq!(created.size, 5);

        match engine.get_content(&vp("/docs/a.txt")).await? {
            Some(Content::File(file)) => {
                assert_eq!(file.content, "hello");
                assert_eq!(file.format, ContentFormat::Utf8);
                assert_eq!(file.mimetype, "text/plain");
                assert_eq!(file.stats.name, "a.txt");
            }
            other => panic!("expected file content, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_binary_file_is_base64() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        let bytes = [0x89u8, b'P', b'N', b'G', 0x00, 0x01, 0x02];
        std::fs::write(dir.path().join("img.png"), bytes)?;

        match engine(dir.path()).get_content(&vp("/img.png")).await? {
            Some(Content::File(file)) => {
                assert_eq!(file.format, ContentFormat::Base64);
                assert_eq!(file.content, b64(&bytes));
                assert_eq!(file.mimetype, "image/png");
            }
            other => panic!("expected file content, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_directory_listing_has_parent_entry() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir_all(dir.path().join("a/b"))?;
        std::fs::write(dir.path().join("a/b/one.txt"), b"1")?;
        std::fs::create_dir(dir.path().join("a/b/sub"))?;
        let engine = engine(dir.path());

        let Some(Content::Directory(listing)) = engine.get_content(&vp("/a/b")).await? else {
            panic!("expected a directory listing");
        };
        assert_eq!(listing.stats.path, "/a/b");
        assert_eq!(listing.content.len(), 3);

        let parent = listing.content.last().unwrap();
        assert_eq!(parent.name, "..");
        assert_eq!(parent.path, "/a");
        assert!(parent.is_directory());

        let mut children: Vec<_> = listing.content[..2]
            .iter()
            .map(|s| s.path.as_str())
            .collect();
        children.sort();
        assert_eq!(children, vec!["/a/b/one.txt", "/a/b/sub"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_top_level_parent_is_root() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir(dir.path().join("top"))?;

        let Some(Content::Directory(listing)) =
            engine(dir.path()).get_content(&vp("/top/")).await?
        else {
            panic!("expected a directory listing");
        };
        assert_eq!(listing.content.len(), 1);
        assert_eq!(listing.content[0].path, "/");
        assert_eq!(listing.content[0].name, "..");
        Ok(())
    }

    #[tokio::test]
    async fn test_root_listing_has_no_parent() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("x.txt"), b"x")?;

        let Some(Content::Directory(listing)) = engine(dir.path()).get_content(&vp("/")).await?
        else {
            panic!("expected a directory listing");
        };
        assert_eq!(listing.content.len(), 1);
        assert_eq!(listing.content[0].path, "/x.txt");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_directory() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        let engine = engine(dir.path());

        let stats = engine
            .create_content(&vp("/"), &ContentCreation::directory("docs"))
            .await?;
        assert_eq!(stats.path, "/docs");
        assert!(stats.is_directory());
        assert!(dir.path().join("docs").is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_never_overwrites_directory() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir(dir.path().join("docs"))?;
        let engine = engine(dir.path());

        let result = engine
            .create_content(
                &vp("/"),
                &ContentCreation::file("docs", "x", ContentFormat::Utf8),
            )
            .await;
        assert!(matches!(result, Err(ContentError::CannotOverwriteDirectory)));
        assert!(dir.path().join("docs").is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_bad_name() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        let result = engine(dir.path())
            .create_content(
                &vp("/"),
                &ContentCreation::file("../escape.txt", "x", ContentFormat::Utf8),
            )
            .await;
        assert!(matches!(result, Err(ContentError::InvalidPath(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_chunked_append() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        let engine = engine(dir.path());
        let first = [0u8, 1, 2, 3];
        let second = [4u8, 5, 6];

        engine
            .create_content(
                &vp("/"),
                &ContentCreation::file("b.bin", b64(&first), ContentFormat::Base64).with_chunk(1),
            )
            .await?;
        let stats = engine
            .create_content(
                &vp("/"),
                &ContentCreation::file("b.bin", b64(&second), ContentFormat::Base64).with_chunk(2),
            )
            .await?;

        assert_eq!(stats.size, 7);
        assert_eq!(std::fs::read(dir.path().join("b.bin"))?, vec![0, 1, 2, 3, 4, 5, 6]);
        Ok(())
    }

    #[tokio::test]
    async fn test_chunk_without_target() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        let result = engine(dir.path())
            .create_content(
                &vp("/"),
                &ContentCreation::file("c.bin", b64(b"abc"), ContentFormat::Base64).with_chunk(2),
            )
            .await;

        let err = result.unwrap_err();
        assert!(!err.is_fault());
        assert_eq!(err.to_string(), "received chunk for file that does not exist");
        assert!(!dir.path().join("c.bin").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_full_write_truncates() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("a.txt"), b"a much longer original body")?;

        let stats = engine(dir.path())
            .create_content(
                &vp("/"),
                &ContentCreation::file("a.txt", "short", ContentFormat::Utf8),
            )
            .await?;
        assert_eq!(stats.size, 5);
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt"))?, "short");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_directory_recursively() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir_all(dir.path().join("tree/deep/deeper"))?;
        std::fs::write(dir.path().join("tree/deep/deeper/leaf.txt"), b"leaf")?;
        std::fs::write(dir.path().join("tree/top.txt"), b"top")?;
        let engine = engine(dir.path());

        engine.delete_content(&vp("/tree")).await?;

        for former in [
            "/tree",
            "/tree/top.txt",
            "/tree/deep",
            "/tree/deep/deeper/leaf.txt",
        ] {
            assert!(!engine.exists(&vp(former)).await, "{} still exists", former);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_absent_is_domain_error() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("once.txt"), b"x")?;
        let engine = engine(dir.path());

        engine.delete_content(&vp("/once.txt")).await?;
        for _ in 0..2 {
            let err = engine.delete_content(&vp("/once.txt")).await.unwrap_err();
            assert!(matches!(err, ContentError::PathNotFound));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_move() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir(dir.path().join("dest"))?;
        std::fs::write(dir.path().join("src.txt"), b"payload")?;
        let engine = engine(dir.path());

        let stats = engine.move_content(&vp("/src.txt"), "dest/moved.txt").await?;
        assert_eq!(stats.path, "/dest/moved.txt");
        assert!(!dir.path().join("src.txt").exists());
        assert_eq!(std::fs::read(dir.path().join("dest/moved.txt"))?, b"payload");
        Ok(())
    }

    #[tokio::test]
    async fn test_move_never_overwrites() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("src.txt"), b"source")?;
        std::fs::write(dir.path().join("dst.txt"), b"destination")?;
        let engine = engine(dir.path());

        let err = engine
            .move_content(&vp("/src.txt"), "/dst.txt")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "destination path already exists");
        assert_eq!(std::fs::read(dir.path().join("src.txt"))?, b"source");
        assert_eq!(std::fs::read(dir.path().join("dst.txt"))?, b"destination");
        Ok(())
    }

    #[tokio::test]
    async fn test_move_into_missing_folder() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("src.txt"), b"source")?;

        let err = engine(dir.path())
            .move_content(&vp("/src.txt"), "/nowhere/dst.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::DestinationFolderMissing));
        assert!(dir.path().join("src.txt").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_new_folder_names() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        let engine = engine(dir.path());

        let first = engine
            .perform_content_action(&vp("/"), &ContentAction::NewFolder)
            .await?;
        let second = engine
            .perform_content_action(&vp("/"), &ContentAction::NewFolder)
            .await?;
        assert_eq!(first.name, "Untitled Folder");
        assert_eq!(second.name, "Untitled Folder 1");
        assert!(second.is_directory());
        Ok(())
    }

    #[tokio::test]
    async fn test_new_folder_skips_existing_entries() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir(dir.path().join("work"))?;
        std::fs::write(dir.path().join("work/Untitled Folder"), b"a file squatting")?;
        std::fs::create_dir(dir.path().join("work/Untitled Folder 1"))?;

        let stats = engine(dir.path())
            .perform_content_action(&vp("/work"), &ContentAction::NewFolder)
            .await?;
        assert_eq!(stats.path, "/work/Untitled Folder 2");
        Ok(())
    }

    #[tokio::test]
    async fn test_new_file_names() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("untitled.txt"), b"taken")?;
        let engine = engine(dir.path());

        let first = engine
            .perform_content_action(&vp("/"), &ContentAction::NewFile)
            .await?;
        let second = engine
            .perform_content_action(&vp("/"), &ContentAction::NewFile)
            .await?;
        assert_eq!(first.name, "untitled1.txt");
        assert_eq!(second.name, "untitled2.txt");
        assert_eq!(first.size, 0);
        assert_eq!(std::fs::read(dir.path().join("untitled.txt"))?, b"taken");
        Ok(())
    }

    #[tokio::test]
    async fn test_new_entry_requires_directory() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("plain.txt"), b"x")?;
        let engine = engine(dir.path());

        for action in [ContentAction::NewFolder, ContentAction::NewFile] {
            let err = engine
                .perform_content_action(&vp("/plain.txt"), &action)
                .await
                .unwrap_err();
            assert!(matches!(err, ContentError::NotADirectory));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_action_on_missing_path() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        let err = engine(dir.path())
            .perform_content_action(&vp("/ghost"), &ContentAction::NewFile)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "path does not exist");
        Ok(())
    }

    #[tokio::test]
    async fn test_copy_to() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("a.txt"), b"copy me")?;
        std::fs::write(dir.path().join("old.txt"), b"replace me entirely")?;
        let engine = engine(dir.path());

        let copy = engine
            .perform_content_action(
                &vp("/a.txt"),
                &ContentAction::CopyTo {
                    path: "b.txt".to_string(),
                },
            )
            .await?;
        assert_eq!(copy.path, "/b.txt");
        assert_eq!(std::fs::read(dir.path().join("b.txt"))?, b"copy me");

        engine
            .perform_content_action(
                &vp("/a.txt"),
                &ContentAction::CopyTo {
                    path: "/old.txt".to_string(),
                },
            )
            .await?;
        assert_eq!(std::fs::read(dir.path().join("old.txt"))?, b"copy me");
        assert_eq!(std::fs::read(dir.path().join("a.txt"))?, b"copy me");
        Ok(())
    }

    #[tokio::test]
    async fn test_copy_rejections() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir(dir.path().join("folder"))?;
        std::fs::write(dir.path().join("a.txt"), b"x")?;
        let engine = engine(dir.path());

        let copy_to = |path: &str| ContentAction::CopyTo {
            path: path.to_string(),
        };

        let err = engine
            .perform_content_action(&vp("/folder"), &copy_to("/folder2"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::CannotCopyDirectory));

        let err = engine
            .perform_content_action(&vp("/a.txt"), &copy_to("/folder"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::CannotOverwriteDirectory));

        let err = engine
            .perform_content_action(&vp("/a.txt"), &copy_to("/missing/a.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::DestinationFolderMissing));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_new_files_do_not_collide_silently() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        let engine = std::sync::Arc::new(engine(dir.path()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine
                        .perform_content_action(&VirtualPath::root(), &ContentAction::NewFile)
                        .await
                })
            })
            .collect();

        let mut created = Vec::new();
        for task in tasks {
            match task.await.expect("task panicked") {
                Ok(stats) => created.push(stats.name),
                // a lost probe/create race is a fault, never an overwrite
                Err(e) => assert!(e.is_fault(), "unexpected domain error: {}", e),
            }
        }

        let unique: std::collections::HashSet<_> = created.iter().collect();
        assert_eq!(unique.len(), created.len());
        assert!(!created.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_non_utf8_text_keeps_its_bytes() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        let utf16 = vec![0xFFu8, 0xFE, b'h', 0x00, b'i', 0x00];
        let latin1 = b"caf\xe9 au lait, cr\xe8me br\xfbl\xe9e".to_vec();
        std::fs::write(dir.path().join("u16.txt"), &utf16)?;
        std::fs::write(dir.path().join("latin.txt"), &latin1)?;
        let engine = engine(dir.path());

        for (name, bytes) in [("/u16.txt", utf16), ("/latin.txt", latin1)] {
            let Some(Content::File(file)) = engine.get_content(&vp(name)).await? else {
                panic!("expected file content for {}", name);
            };
            assert_eq!(file.format, ContentFormat::Base64, "{}", name);
            assert_eq!(ContentFormat::Base64.decode(&file.content)?, bytes, "{}", name);
        }
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_listing_skips_names_that_are_not_utf8() -> ContentResult<()> {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("ok.txt"), b"ok")?;
        std::fs::write(
            dir.path().join(std::ffi::OsStr::from_bytes(b"bad\xffname")),
            b"bad",
        )?;

        let Some(Content::Directory(listing)) = engine(dir.path()).get_content(&vp("/")).await?
        else {
            panic!("expected a directory listing");
        };
        let names: Vec<_> = listing.content.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ok.txt"]);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_create_permission_checks_in_order() -> ContentResult<()> {
        use std::os::unix::fs::PermissionsExt;

        // root bypasses permission bits
        if nix::unistd::geteuid().is_root() {
            return Ok(());
        }

        let dir = tempfile::tempdir()?;
        let locked = dir.path().join("locked");
        std::fs::create_dir_all(locked.join("sub"))?;
        std::fs::write(locked.join("ro.txt"), b"x")?;
        std::fs::set_permissions(locked.join("ro.txt"), std::fs::Permissions::from_mode(0o444))?;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555))?;
        let engine = engine(dir.path());

        let create = |name: &str| ContentCreation::file(name, "y", ContentFormat::Utf8);
        let outcomes = [
            engine.create_content(&vp("/locked"), &create("sub")).await,
            engine.create_content(&vp("/locked"), &create("ro.txt")).await,
            engine.create_content(&vp("/locked"), &create("new.txt")).await,
        ];

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755))?;

        assert!(matches!(outcomes[0], Err(ContentError::CannotOverwriteDirectory)));
        assert!(matches!(outcomes[1], Err(ContentError::NotWriteable)));
        assert!(matches!(outcomes[2], Err(ContentError::ParentNotWriteable)));
        assert_eq!(std::fs::read(locked.join("ro.txt"))?, b"x");
        assert!(!locked.join("new.txt").exists());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_onto_read_only_file() -> ContentResult<()> {
        use std::os::unix::fs::PermissionsExt;

        if nix::unistd::geteuid().is_root() {
            return Ok(());
        }

        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("a.txt"), b"new")?;
        std::fs::write(dir.path().join("ro.txt"), b"old")?;
        std::fs::set_permissions(
            dir.path().join("ro.txt"),
            std::fs::Permissions::from_mode(0o444),
        )?;

        let err = engine(dir.path())
            .perform_content_action(
                &vp("/a.txt"),
                &ContentAction::CopyTo {
                    path: "/ro.txt".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NotWriteable));
        assert_eq!(std::fs::read(dir.path().join("ro.txt"))?, b"old");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_root_is_refused() -> ContentResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("keep.txt"), b"keep")?;
        let engine = engine(dir.path());

        for root in ["/", "//"] {
            let err = engine.delete_content(&vp(root)).await.unwrap_err();
            assert!(matches!(err, ContentError::CannotDeleteRoot));
        }
        assert!(dir.path().join("keep.txt").exists());
        Ok(())
    }
}
