use crate::error::{Result, SearchError};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use vault_suggest_protocol::Document;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Read-only access to the document corpus
#[async_trait]
pub trait DocumentLookup: Send + Sync {
    async fn list_documents(&self) -> Result<Vec<Document>>;

    async fn read_document(&self, name: &str) -> Result<String>;

    /// Read a document already located by `find_document`.
    /// Lookups that can open `document.path` directly should skip the name search.
    async fn load_document(&self, document: &Document) -> Result<String> {
        self.read_document(&document.name).await
    }

    /// First document whose name equals `name`
    async fn find_document(&self, name: &str) -> Result<Option<Document>> {
        let documents = self.list_documents().await?;
        Ok(documents.into_iter().find(|doc| doc.name == name))
    }
}

#[async_trait]
impl<T: DocumentLookup + ?Sized> DocumentLookup for Arc<T> {
    async fn list_documents(&self) -> Result<Vec<Document>> {
        (**self).list_documents().await
    }

    async fn read_document(&self, name: &str) -> Result<String> {
        (**self).read_document(name).await
    }

    async fn load_document(&self, document: &Document) -> Result<String> {
        (**self).load_document(document).await
    }

    async fn find_document(&self, name: &str) -> Result<Option<Document>> {
        (**self).find_document(name).await
    }
}

/// In-memory corpus, in insertion order
#[derive(Debug, Clone, Default)]
pub struct MemoryCorpus {
    documents: Vec<(Document, String)>,
}

impl MemoryCorpus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a document whose path equals its name
    #[must_use]
    pub fn with_document(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        let name = name.into();
        self.insert(Document::new(name.clone(), name), text);
        self
    }

    pub fn insert(&mut self, document: Document, text: impl Into<String>) {
        self.documents.push((document, text.into()));
    }
}

#[async_trait]
impl DocumentLookup for MemoryCorpus {
    async fn list_documents(&self) -> Result<Vec<Document>> {
        Ok(self.documents.iter().map(|(doc, _)| doc.clone()).collect())
    }

    async fn read_document(&self, name: &str) -> Result<String> {
        self.documents
            .iter()
            .find(|(doc, _)| doc.name == name)
            .map(|(_, text)| text.clone())
            .ok_or_else(|| SearchError::LookupMiss(name.to_string()))
    }
}

/// Keeps recently read document text; staleness is the caller's window to manage
pub struct CachedCorpus<C> {
    inner: C,
    cache: Mutex<LruCache<String, Arc<str>>>,
}

impl<C: DocumentLookup> CachedCorpus<C> {
    pub fn new(inner: C) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(inner: C, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Drop one cached document, e.g. after it changed on disk
    pub async fn invalidate(&self, name: &str) {
        self.cache.lock().await.pop(name);
    }

    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }

    async fn cached(&self, name: &str) -> Option<String> {
        let text = self.cache.lock().await.get(name).map(|text| text.to_string());
        if text.is_some() {
            log::debug!("Cache hit for {name}");
        }
        text
    }

    async fn remember(&self, name: &str, text: &str) {
        self.cache.lock().await.put(name.to_string(), Arc::from(text));
    }
}

#[async_trait]
impl<C: DocumentLookup> DocumentLookup for CachedCorpus<C> {
    async fn list_documents(&self) -> Result<Vec<Document>> {
        self.inner.list_documents().await
    }

    async fn read_document(&self, name: &str) -> Result<String> {
        if let Some(text) = self.cached(name).await {
            return Ok(text);
        }
        let text = self.inner.read_document(name).await?;
        self.remember(name, &text).await;
        Ok(text)
    }

    async fn load_document(&self, document: &Document) -> Result<String> {
        if let Some(text) = self.cached(&document.name).await {
            return Ok(text);
        }
        let text = self.inner.load_document(document).await?;
        self.remember(&document.name, &text).await;
        Ok(text)
    }

    async fn find_document(&self, name: &str) -> Result<Option<Document>> {
        self.inner.find_document(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCorpus {
        inner: MemoryCorpus,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl DocumentLookup for CountingCorpus {
        async fn list_documents(&self) -> Result<Vec<Document>> {
            self.inner.list_documents().await
        }

        async fn read_document(&self, name: &str) -> Result<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read_document(name).await
        }
    }

    fn counting() -> CountingCorpus {
        CountingCorpus {
            inner: MemoryCorpus::new()
                .with_document("a.md", "alpha")
                .with_document("b.md", "beta"),
            reads: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_find_document_takes_first_match() {
        let mut corpus = MemoryCorpus::new();
        corpus.insert(Document::new("a.md", "one/a.md"), "first");
        corpus.insert(Document::new("a.md", "two/a.md"), "second");

        let found = corpus.find_document("a.md").await.unwrap().unwrap();
        assert_eq!(found.path, "one/a.md");
        assert!(corpus.find_document("missing.md").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_document_read_is_lookup_miss() {
        let corpus = MemoryCorpus::new();
        let err = corpus.read_document("nope.md").await.unwrap_err();
        assert!(matches!(err, SearchError::LookupMiss(name) if name == "nope.md"));
    }

    #[tokio::test]
    async fn test_cached_reads_hit_inner_once() {
        let cached = CachedCorpus::new(counting());
        assert_eq!(cached.read_document("a.md").await.unwrap(), "alpha");
        assert_eq!(cached.read_document("a.md").await.unwrap(), "alpha");
        assert_eq!(cached.inner().reads.load(Ordering::SeqCst), 1);

        cached.invalidate("a.md").await;
        cached.read_document("a.md").await.unwrap();
        assert_eq!(cached.inner().reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_located_loads_share_the_name_cache() {
        let cached = CachedCorpus::new(counting());
        let document = cached.find_document("b.md").await.unwrap().unwrap();

        assert_eq!(cached.load_document(&document).await.unwrap(), "beta");
        assert_eq!(cached.read_document("b.md").await.unwrap(), "beta");
        assert_eq!(cached.load_document(&document).await.unwrap(), "beta");
        assert_eq!(cached.inner().reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_evicts_least_recent() {
        let cached = CachedCorpus::with_capacity(counting(), 1);
        cached.read_document("a.md").await.unwrap();
        cached.read_document("b.md").await.unwrap();
        assert_eq!(cached.cached_len().await, 1);

        cached.read_document("a.md").await.unwrap();
        assert_eq!(cached.inner().reads.load(Ordering::SeqCst), 3);

        cached.clear().await;
        assert_eq!(cached.cached_len().await, 0);
    }
}
