//! Field registry: named fields, their literal references, and the
//! user-supplied replacement for each reference.
//!
//! Replacements are a two-level mapping (field -> reference -> value), not
//! a flat map keyed by string concatenation — reference text can contain
//! any delimiter a composite key could use.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A named, reusable variable with its references and replacements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub label: String,
    /// Newest first — added references are prepended.
    pub references: Vec<String>,
    replacements: FxHashMap<String, String>,
}

impl Field {
    fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            references: Vec::new(),
            replacements: FxHashMap::default(),
        }
    }

    pub fn replacement_for(&self, reference: &str) -> Option<&str> {
        self.replacements.get(reference).map(String::as_str)
    }
}

/// State captured per field for its undo history: the reference list and
/// the replacement entries belonging to that field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub references: Vec<String>,
    pub replacements: FxHashMap<String, String>,
}

/// The field collection. `order` preserves creation order so payload
/// output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    order: Vec<String>,
    fields: FxHashMap<String, Field>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a field key from a user-supplied label: lower-cased,
    /// whitespace runs collapsed to `_`.
    pub fn slugify(label: &str) -> String {
        label
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Create a field from a label. Blank labels are ignored.
    ///
    /// On key collision this is insert-or-merge: the existing field keeps
    /// its references and replacements and takes the new label. Returns the
    /// key the label resolved to.
    pub fn create_field(&mut self, label: &str) -> Option<String> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        let key = Self::slugify(label);
        match self.fields.get_mut(&key) {
            Some(existing) => {
                existing.label = label.to_string();
            }
            None => {
                self.fields.insert(key.clone(), Field::new(&key, label));
                self.order.push(key.clone());
            }
        }
        Some(key)
    }

    /// Insert a field under an externally supplied key (discovery results
    /// carry their own keys). Merge semantics: existing references that the
    /// discovered list does not mention are retained after it, and their
    /// replacement values carry forward; fresh references seed identity.
    pub fn merge_discovered(&mut self, key: &str, label: &str, discovered: &[String]) {
        if !self.fields.contains_key(key) {
            self.order.push(key.to_string());
        }
        let field = self
            .fields
            .entry(key.to_string())
            .or_insert_with(|| Field::new(key, label));

        if !label.trim().is_empty() {
            field.label = label.trim().to_string();
        }

        let mut merged: Vec<String> = discovered.to_vec();
        for local in &field.references {
            if !merged.iter().any(|r| r == local) {
                merged.push(local.clone());
            }
        }

        let mut replacements = FxHashMap::default();
        for reference in &merged {
            let value = field
                .replacements
                .get(reference)
                .cloned()
                .unwrap_or_else(|| reference.clone());
            replacements.insert(reference.clone(), value);
        }

        field.references = merged;
        field.replacements = replacements;
    }

    /// Update a field's display label. Blank labels are ignored.
    pub fn rename_field(&mut self, key: &str, label: &str) -> bool {
        let label = label.trim();
        if label.is_empty() {
            return false;
        }
        match self.fields.get_mut(key) {
            Some(field) => {
                field.label = label.to_string();
                true
            }
            None => false,
        }
    }

    /// Add a reference to a field, newest first. Blank or duplicate text is
    /// ignored. Seeds the replacement with the identity value.
    pub fn add_reference(&mut self, key: &str, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let Some(field) = self.fields.get_mut(key) else {
            return false;
        };
        if field.references.iter().any(|r| r == text) {
            return false;
        }
        field.references.insert(0, text.to_string());
        field.replacements.insert(text.to_string(), text.to_string());
        true
    }

    /// Remove the reference at `index`, dropping its replacement entry.
    /// Returns the removed text so callers can purge selections.
    pub fn remove_reference(&mut self, key: &str, index: usize) -> Option<String> {
        let field = self.fields.get_mut(key)?;
        if index >= field.references.len() {
            return None;
        }
        let removed = field.references.remove(index);
        field.replacements.remove(&removed);
        Some(removed)
    }

    /// Rewrite the reference at `index` in place, carrying the stored
    /// replacement value over to the new text. Blank text is ignored.
    /// Returns `(old, new)` when a change was made.
    pub fn rename_reference(
        &mut self,
        key: &str,
        index: usize,
        new_text: &str,
    ) -> Option<(String, String)> {
        let new_text = new_text.trim();
        if new_text.is_empty() {
            return None;
        }
        let field = self.fields.get_mut(key)?;
        if index >= field.references.len() {
            return None;
        }
        let old = field.references[index].clone();
        if old == new_text {
            return None;
        }
        field.references[index] = new_text.to_string();
        let carried = field
            .replacements
            .remove(&old)
            .unwrap_or_else(|| new_text.to_string());
        field.replacements.insert(new_text.to_string(), carried);
        Some((old, new_text.to_string()))
    }

    /// Store the user's replacement for a reference. Plain map update;
    /// not itself undoable.
    pub fn set_replacement(&mut self, key: &str, reference: &str, value: &str) {
        if let Some(field) = self.fields.get_mut(key) {
            field
                .replacements
                .insert(reference.to_string(), value.to_string());
        }
    }

    pub fn replacement_for(&self, key: &str, reference: &str) -> Option<&str> {
        self.fields.get(key)?.replacement_for(reference)
    }

    /// Delete a field with everything it owns. Returns whether it existed.
    pub fn delete_field(&mut self, key: &str) -> bool {
        if self.fields.remove(key).is_none() {
            return false;
        }
        self.order.retain(|k| k != key);
        true
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Fields in creation order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.order.iter().filter_map(|k| self.fields.get(k))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn field_snapshot(&self, key: &str) -> Option<FieldSnapshot> {
        let field = self.fields.get(key)?;
        Some(FieldSnapshot {
            references: field.references.clone(),
            replacements: field.replacements.clone(),
        })
    }

    pub fn restore_field(&mut self, key: &str, snapshot: FieldSnapshot) {
        if let Some(field) = self.fields.get_mut(key) {
            field.references = snapshot.references;
            field.replacements = snapshot.replacements;
        }
    }

    /// The final `[old_text, new_text]` list for document generation.
    ///
    /// A pair is included only when the stored replacement, after trimming,
    /// is non-blank and differs from the trimmed reference — identity
    /// replacements would be pointless work for the generation service.
    pub fn build_replacement_list(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for field in self.fields() {
            for reference in &field.references {
                let Some(value) = field.replacements.get(reference) else {
                    continue;
                };
                let value = value.trim();
                if !value.is_empty() && value != reference.trim() {
                    out.push((reference.clone(), value.to_string()));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(Registry::slugify("Venue Name"), "venue_name");
        assert_eq!(Registry::slugify("  Org  Name "), "org_name");
    }

    #[test]
    fn test_create_field_blank_is_noop() {
        let mut reg = Registry::new();
        assert_eq!(reg.create_field("   "), None);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_create_field_collision_merges() {
        let mut reg = Registry::new();
        let key = reg.create_field("Org Name").unwrap();
        reg.add_reference(&key, "Acme Corp");

        // Different label, same slug: references survive, label updates.
        let key2 = reg.create_field("org name").unwrap();
        assert_eq!(key, key2);
        assert_eq!(reg.len(), 1);
        let field = reg.field(&key).unwrap();
        assert_eq!(field.label, "org name");
        assert_eq!(field.references, vec!["Acme Corp"]);
    }

    #[test]
    fn test_add_reference_prepends_and_seeds_identity() {
        let mut reg = Registry::new();
        let key = reg.create_field("Org").unwrap();
        assert!(reg.add_reference(&key, "Acme Corp"));
        assert!(reg.add_reference(&key, "Acme Inc"));
        let field = reg.field(&key).unwrap();
        assert_eq!(field.references, vec!["Acme Inc", "Acme Corp"]);
        assert_eq!(field.replacement_for("Acme Corp"), Some("Acme Corp"));
    }

    #[test]
    fn test_add_reference_rejects_blank_and_duplicate() {
        let mut reg = Registry::new();
        let key = reg.create_field("Org").unwrap();
        assert!(!reg.add_reference(&key, "  "));
        assert!(reg.add_reference(&key, "Acme"));
        assert!(!reg.add_reference(&key, "Acme"));
        assert_eq!(reg.field(&key).unwrap().references.len(), 1);
    }

    #[test]
    fn test_remove_reference_drops_replacement() {
        let mut reg = Registry::new();
        let key = reg.create_field("Org").unwrap();
        reg.add_reference(&key, "Acme");
        reg.set_replacement(&key, "Acme", "Globex");
        let removed = reg.remove_reference(&key, 0);
        assert_eq!(removed.as_deref(), Some("Acme"));
        assert_eq!(reg.replacement_for(&key, "Acme"), None);
        assert_eq!(reg.remove_reference(&key, 5), None);
    }

    #[test]
    fn test_rename_reference_carries_replacement_forward() {
        let mut reg = Registry::new();
        let key = reg.create_field("Org").unwrap();
        reg.add_reference(&key, "Acme");
        reg.set_replacement(&key, "Acme", "Globex");
        let renamed = reg.rename_reference(&key, 0, "Acme Corp");
        assert_eq!(renamed, Some(("Acme".to_string(), "Acme Corp".to_string())));
        // The user's value survives the rename instead of resetting.
        assert_eq!(reg.replacement_for(&key, "Acme Corp"), Some("Globex"));
        assert_eq!(reg.replacement_for(&key, "Acme"), None);
    }

    #[test]
    fn test_rename_reference_same_text_is_noop() {
        let mut reg = Registry::new();
        let key = reg.create_field("Org").unwrap();
        reg.add_reference(&key, "Acme");
        assert_eq!(reg.rename_reference(&key, 0, "Acme"), None);
        assert_eq!(reg.rename_reference(&key, 0, "  "), None);
    }

    #[test]
    fn test_build_replacement_list_omits_identity_and_blank() {
        let mut reg = Registry::new();
        let key = reg.create_field("Org").unwrap();
        reg.add_reference(&key, "Acme Corp");
        reg.add_reference(&key, "Acme Inc");
        reg.add_reference(&key, "Acme LLC");
        reg.set_replacement(&key, "Acme Corp", "Globex");
        reg.set_replacement(&key, "Acme Inc", "  Acme Inc  "); // identity after trim
        reg.set_replacement(&key, "Acme LLC", "   "); // blank

        let list = reg.build_replacement_list();
        assert_eq!(list, vec![("Acme Corp".to_string(), "Globex".to_string())]);
    }

    #[test]
    fn test_build_replacement_list_trims_emitted_value() {
        let mut reg = Registry::new();
        let key = reg.create_field("Org").unwrap();
        reg.add_reference(&key, "Acme");
        reg.set_replacement(&key, "Acme", "  Globex  ");
        assert_eq!(
            reg.build_replacement_list(),
            vec![("Acme".to_string(), "Globex".to_string())]
        );
    }

    #[test]
    fn test_delete_field_cascades() {
        let mut reg = Registry::new();
        let key = reg.create_field("Org").unwrap();
        reg.add_reference(&key, "Acme");
        assert!(reg.delete_field(&key));
        assert!(!reg.contains(&key));
        assert!(reg.build_replacement_list().is_empty());
        assert!(!reg.delete_field(&key));
    }

    #[test]
    fn test_merge_discovered_union_prefers_fresh_order() {
        let mut reg = Registry::new();
        let key = reg.create_field("Org").unwrap();
        reg.add_reference(&key, "Local Ref");
        reg.add_reference(&key, "Shared Ref");
        reg.set_replacement(&key, "Shared Ref", "Kept");

        reg.merge_discovered(
            &key,
            "Organization",
            &["Shared Ref".to_string(), "Fresh Ref".to_string()],
        );

        let field = reg.field(&key).unwrap();
        assert_eq!(field.label, "Organization");
        // Discovered order first, then retained local extras.
        assert_eq!(field.references, vec!["Shared Ref", "Fresh Ref", "Local Ref"]);
        assert_eq!(field.replacement_for("Shared Ref"), Some("Kept"));
        assert_eq!(field.replacement_for("Fresh Ref"), Some("Fresh Ref"));
    }

    #[test]
    fn test_fields_iterate_in_creation_order() {
        let mut reg = Registry::new();
        reg.create_field("Bravo").unwrap();
        reg.create_field("Alpha").unwrap();
        let keys: Vec<&str> = reg.fields().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["bravo", "alpha"]);
    }
}
