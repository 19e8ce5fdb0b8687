//! Open document sessions, bounded by an LRU

use crate::error::{Error, Result};
use crate::pdf::PageSize;
use crate::session::{AnnotationLayer, Viewer};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// One opened document: its bytes plus viewer and annotation state
#[derive(Debug)]
pub struct DocumentSession {
    pub id: String,
    pub file_name: String,
    pub data: Arc<[u8]>,
    pub password: Option<String>,
    pub page_sizes: Vec<PageSize>,
    pub viewer: Viewer,
    pub annotations: AnnotationLayer,
}

impl DocumentSession {
    pub fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    /// Size of the viewer's current page
    pub fn current_page_size(&self) -> Option<PageSize> {
        self.page_sizes
            .get(self.viewer.page() as usize - 1)
            .copied()
    }
}

/// Sessions keyed by UUID. The least recently used session is dropped when
/// the store is full.
pub struct SessionStore {
    sessions: Mutex<LruCache<String, DocumentSession>>,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Register a decoded document and return its session id
    pub fn open(
        &self,
        file_name: String,
        data: Vec<u8>,
        password: Option<String>,
        page_sizes: Vec<PageSize>,
        max_scale: f32,
    ) -> Result<String> {
        if page_sizes.is_empty() {
            return Err(Error::InvalidPdf {
                reason: "document has no pages".to_string(),
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        let page_count = page_sizes.len() as u32;
        let session = DocumentSession {
            id: id.clone(),
            file_name,
            data: data.into(),
            password,
            page_sizes,
            viewer: Viewer::new(page_count, max_scale),
            annotations: AnnotationLayer::new(page_count),
        };

        if let Some((evicted, _)) = self.sessions.lock().push(id.clone(), session) {
            tracing::debug!(session = %evicted, "session store full, closed least recently used");
        }

        Ok(id)
    }

    /// Run `f` against a session. Errors returned by `f` leave the session as
    /// `f` left it, so callers validate before mutating.
    pub fn with_session<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut DocumentSession) -> Result<R>,
    ) -> Result<R> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(id).ok_or_else(|| Error::SessionNotFound {
            id: id.to_string(),
        })?;
        f(session)
    }

    pub fn close(&self, id: &str) -> bool {
        self.sessions.lock().pop(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn letter_pages(count: usize) -> Vec<PageSize> {
        vec![
            PageSize {
                width: 612.0,
                height: 792.0
            };
            count
        ]
    }

    #[test]
    fn test_open_and_mutate() {
        let store = SessionStore::new(4);
        let id = store
            .open("a.pdf".to_string(), vec![1, 2, 3], None, letter_pages(3), 10.0)
            .unwrap();

        let page = store
            .with_session(&id, |s| {
                s.viewer.next();
                Ok(s.viewer.page())
            })
            .unwrap();
        assert_eq!(page, 2);

        let (page, count) = store
            .with_session(&id, |s| Ok((s.viewer.page(), s.page_count())))
            .unwrap();
        assert_eq!((page, count), (2, 3));
    }

    #[test]
    fn test_close_and_missing() {
        let store = SessionStore::new(4);
        let id = store
            .open("a.pdf".to_string(), vec![], None, letter_pages(1), 10.0)
            .unwrap();

        assert!(store.close(&id));
        assert!(!store.close(&id));
        assert!(matches!(
            store.with_session(&id, |_| Ok(())),
            Err(Error::SessionNotFound { .. })
        ));
    }

    #[test]
    fn test_lru_eviction() {
        let store = SessionStore::new(2);
        let first = store
            .open("1.pdf".to_string(), vec![], None, letter_pages(1), 10.0)
            .unwrap();
        let second = store
            .open("2.pdf".to_string(), vec![], None, letter_pages(1), 10.0)
            .unwrap();

        // touch the first so the second becomes least recently used
        store.with_session(&first, |_| Ok(())).unwrap();
        let third = store
            .open("3.pdf".to_string(), vec![], None, letter_pages(1), 10.0)
            .unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.contains(&first));
        assert!(!store.contains(&second));
        assert!(store.contains(&third));
    }

    #[test]
    fn test_rejects_empty_document() {
        let store = SessionStore::new(2);
        assert!(matches!(
            store.open("0.pdf".to_string(), vec![], None, vec![], 10.0),
            Err(Error::InvalidPdf { .. })
        ));
        assert!(store.is_empty());
    }
}
