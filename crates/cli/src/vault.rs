use async_trait::async_trait;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use vault_suggest_protocol::{Document, MARKDOWN_EXTENSION};
use vault_suggest_search::{DocumentLookup, Result as SearchResult, SearchError};

/// A Markdown note discovered on disk
#[derive(Debug, Clone)]
pub struct VaultEntry {
    pub document: Document,
    pub absolute: PathBuf,
    /// Modification time in seconds since the epoch
    pub mtime: u64,
}

/// Notes under a vault root, rescanned on every listing
#[derive(Debug, Clone)]
pub struct VaultCorpus {
    root: PathBuf,
    ignored_folders: Vec<PathBuf>,
}

impl VaultCorpus {
    pub fn new(root: impl AsRef<Path>, ignored_folders: &[String]) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ignored_folders: ignored_folders.iter().map(PathBuf::from).collect(),
        }
    }

    /// Walk the vault (hidden entries and ignored folders skipped), sorted by path
    pub fn scan(&self) -> Vec<VaultEntry> {
        let root = self.root.clone();
        let ignored = self.ignored_folders.clone();

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .sort_by_file_path(|a, b| a.cmp(b));
        builder.filter_entry(move |entry| {
            let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            !ignored.iter().any(|folder| relative.starts_with(folder))
        });

        let mut entries = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("Skipping unreadable vault entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(MARKDOWN_EXTENSION) {
                continue;
            }
            let relative = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            let mtime = entry
                .metadata()
                .ok()
                .and_then(|meta| meta.modified().ok())
                .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |elapsed| elapsed.as_secs());

            entries.push(VaultEntry {
                document: Document::new(name, relative),
                absolute: path.to_path_buf(),
                mtime,
            });
        }

        log::debug!("Found {} notes under {}", entries.len(), self.root.display());
        entries
    }

    async fn scan_async(&self) -> SearchResult<Vec<VaultEntry>> {
        let corpus = self.clone();
        tokio::task::spawn_blocking(move || corpus.scan())
            .await
            .map_err(|e| SearchError::Corpus(format!("vault scan failed: {e}")))
    }
}

#[async_trait]
impl DocumentLookup for VaultCorpus {
    async fn list_documents(&self) -> SearchResult<Vec<Document>> {
        Ok(self
            .scan_async()
            .await?
            .into_iter()
            .map(|entry| entry.document)
            .collect())
    }

    async fn read_document(&self, name: &str) -> SearchResult<String> {
        let entry = self
            .scan_async()
            .await?
            .into_iter()
            .find(|entry| entry.document.name == name)
            .ok_or_else(|| SearchError::LookupMiss(name.to_string()))?;

        tokio::fs::read_to_string(&entry.absolute)
            .await
            .map_err(|e| SearchError::read_failure(name, e))
    }

    /// Opens the vault-relative path directly instead of walking the vault again
    async fn load_document(&self, document: &Document) -> SearchResult<String> {
        tokio::fs::read_to_string(self.root.join(&document.path))
            .await
            .map_err(|e| SearchError::read_failure(&document.name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn vault() -> tempfile::TempDir {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("dist")).unwrap();
        fs::create_dir_all(root.join("Templates")).unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::write(root.join("dist/Broadcast.md"), "## Reliable Broadcast\nbody").unwrap();
        fs::write(root.join("Index.md"), "# Index").unwrap();
        fs::write(root.join("Templates/Daily.md"), "# Daily").unwrap();
        fs::write(root.join(".obsidian/workspace.md"), "hidden").unwrap();
        fs::write(root.join("image.png"), [0u8, 1, 2]).unwrap();
        temp
    }

    #[tokio::test]
    async fn lists_markdown_notes_with_relative_paths() {
        let temp = vault();
        let corpus = VaultCorpus::new(temp.path(), &["Templates".to_string()]);

        let documents = corpus.list_documents().await.unwrap();
        assert_eq!(
            documents,
            vec![
                Document::new("Index.md", "Index.md"),
                Document::new("Broadcast.md", "dist/Broadcast.md"),
            ]
        );
    }

    #[tokio::test]
    async fn reads_by_name_and_reports_misses() {
        let temp = vault();
        let corpus = VaultCorpus::new(temp.path(), &[]);

        let text = corpus.read_document("Broadcast.md").await.unwrap();
        assert!(text.starts_with("## Reliable Broadcast"));
        assert!(corpus.find_document("Daily.md").await.unwrap().is_some());

        let err = corpus.read_document("Nope.md").await.unwrap_err();
        assert!(matches!(err, SearchError::LookupMiss(_)));
    }

    #[tokio::test]
    async fn loads_located_document_by_path_without_rescanning() {
        let temp = vault();
        let corpus = VaultCorpus::new(temp.path(), &["Templates".to_string()]);

        // A rescan would skip the ignored folder, so only a direct read finds this note.
        let daily = Document::new("Daily.md", "Templates/Daily.md");
        assert_eq!(corpus.load_document(&daily).await.unwrap(), "# Daily");
        assert!(corpus.read_document("Daily.md").await.is_err());

        let gone = Document::new("Gone.md", "dist/Gone.md");
        let err = corpus.load_document(&gone).await.unwrap_err();
        assert!(matches!(err, SearchError::ReadFailure { .. }));
    }
}
