use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a loaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A source document. Immutable once loaded; the engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(),
            name: name.into(),
            text: text.into(),
        }
    }

    /// Content hash of the document text, for drift detection between runs.
    pub fn content_hash(&self) -> String {
        blake3::hash(self.text.as_bytes()).to_hex().to_string()
    }
}

/// Documents in load order. Owned by the session, read-only to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSet {
    docs: Vec<Document>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document. A document with the same name replaces the old one
    /// (re-loading a file is not an error).
    pub fn insert(&mut self, doc: Document) -> DocumentId {
        let id = doc.id;
        if let Some(existing) = self.docs.iter_mut().find(|d| d.name == doc.name) {
            *existing = doc;
        } else {
            self.docs.push(doc);
        }
        id
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.docs.iter().find(|d| d.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Document> {
        self.docs.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.iter()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_same_name() {
        let mut set = DocumentSet::new();
        set.insert(Document::new("a.md", "one"));
        set.insert(Document::new("a.md", "two"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.by_name("a.md").unwrap().text, "two");
    }

    #[test]
    fn test_content_hash_tracks_text() {
        let a = Document::new("a.md", "same");
        let b = Document::new("b.md", "same");
        let c = Document::new("c.md", "different");
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let mut set = DocumentSet::new();
        let id = set.insert(Document::new("a.md", "text"));
        assert!(set.get(id).is_some());
        assert!(set.by_name("a.md").is_some());
        assert!(set.by_name("missing.md").is_none());
    }
}
