//! The editing session: single owner of all mutable template state.
//!
//! Every state transition goes through a `&mut self` method here, so one
//! logical transaction runs at a time by construction — no locks, no racing
//! callbacks. Undoable operations capture the matching snapshot *before*
//! mutating.
//!
//! Results from the asynchronous discovery service are guarded by a ticket:
//! `begin_discovery` stamps each outbound call, and `ingest` discards any
//! result whose ticket is no longer current, so a slow first response can
//! never overwrite the state produced by a newer one.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use docforge_core::{dedupe, locate, Document, DocumentId, DocumentSet, Span};
use docforge_protocol::{
    DiscoveryRequest, DiscoveryResult, DocumentPayload, GenerateRequest, Replacement,
    TableEditPayload,
};

use crate::error::SessionError;
use crate::history::{History, KeyedHistory};
use crate::overlay::{
    flatten_for_transport, record_edit, TableEdit, TableSnapshot, TableView,
};
use crate::registry::{FieldSnapshot, Registry};

/// Stamp for one outbound discovery call. Only the most recently issued
/// ticket may ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryTicket {
    epoch: u64,
}

impl DiscoveryTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    documents: DocumentSet,
    registry: Registry,
    tables: Vec<TableSnapshot>,
    table_edits: Vec<TableEdit>,
    table_views: FxHashMap<usize, TableView>,

    selected_fields: FxHashSet<String>,
    selected_refs: FxHashSet<(String, String)>,
    highlight_all: bool,

    field_history: KeyedHistory<FieldSnapshot>,
    fields_history: History<Registry>,
    table_history: History<Vec<TableEdit>>,

    discovery_epoch: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::with_history_limit(crate::history::DEFAULT_HISTORY_LIMIT)
    }

    /// `history_limit` caps each history's past stack; 0 means unbounded.
    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            documents: DocumentSet::new(),
            registry: Registry::new(),
            tables: Vec::new(),
            table_edits: Vec::new(),
            table_views: FxHashMap::default(),
            selected_fields: FxHashSet::default(),
            selected_refs: FxHashSet::default(),
            highlight_all: false,
            field_history: KeyedHistory::new(history_limit),
            fields_history: History::new(history_limit),
            table_history: History::new(history_limit),
            discovery_epoch: 0,
        }
    }

    // =========================================================================
    // Documents
    // =========================================================================

    pub fn add_document(&mut self, doc: Document) -> DocumentId {
        self.documents.insert(doc)
    }

    pub fn documents(&self) -> &DocumentSet {
        &self.documents
    }

    // =========================================================================
    // Field-set operations (whole-registry history)
    // =========================================================================

    pub fn create_field(&mut self, label: &str) -> Option<String> {
        if label.trim().is_empty() {
            return None;
        }
        self.fields_history.push(&self.registry);
        self.registry.create_field(label)
    }

    pub fn rename_field_label(&mut self, key: &str, label: &str) -> bool {
        if !self.registry.contains(key) || label.trim().is_empty() {
            return false;
        }
        self.fields_history.push(&self.registry);
        self.registry.rename_field(key, label)
    }

    /// Delete a field and everything hanging off it: references,
    /// replacements, its undo history, and any selections pointing at it.
    pub fn delete_field(&mut self, key: &str) -> bool {
        if !self.registry.contains(key) {
            return false;
        }
        self.fields_history.push(&self.registry);
        self.registry.delete_field(key);
        self.field_history.remove(key);
        self.selected_fields.remove(key);
        self.selected_refs.retain(|(field, _)| field != key);
        true
    }

    pub fn undo_fields(&mut self) -> bool {
        match self.fields_history.undo(&self.registry) {
            Some(previous) => {
                self.registry = previous;
                true
            }
            None => false,
        }
    }

    pub fn redo_fields(&mut self) -> bool {
        match self.fields_history.redo(&self.registry) {
            Some(next) => {
                self.registry = next;
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Per-field operations (per-field history)
    // =========================================================================

    pub fn add_reference(&mut self, key: &str, text: &str) -> bool {
        let text = text.trim();
        let Some(field) = self.registry.field(key) else {
            return false;
        };
        if text.is_empty() || field.references.iter().any(|r| r == text) {
            return false;
        }
        self.push_field_snapshot(key);
        self.registry.add_reference(key, text)
    }

    pub fn remove_reference(&mut self, key: &str, index: usize) -> bool {
        let Some(field) = self.registry.field(key) else {
            return false;
        };
        if index >= field.references.len() {
            return false;
        }
        self.push_field_snapshot(key);
        let Some(removed) = self.registry.remove_reference(key, index) else {
            return false;
        };
        // No dangling selection for a reference that no longer exists.
        self.selected_refs.remove(&(key.to_string(), removed));
        true
    }

    pub fn rename_reference(&mut self, key: &str, index: usize, new_text: &str) -> bool {
        let new_text = new_text.trim();
        let Some(field) = self.registry.field(key) else {
            return false;
        };
        if new_text.is_empty()
            || index >= field.references.len()
            || field.references[index] == new_text
        {
            return false;
        }
        self.push_field_snapshot(key);
        let Some((old, new)) = self.registry.rename_reference(key, index, new_text) else {
            return false;
        };
        // Selections follow the rename.
        if self.selected_refs.remove(&(key.to_string(), old)) {
            self.selected_refs.insert((key.to_string(), new));
        }
        true
    }

    /// Not undoable at this granularity; only field/table-level snapshots
    /// capture replacement values.
    pub fn set_replacement(&mut self, key: &str, reference: &str, value: &str) {
        self.registry.set_replacement(key, reference, value);
    }

    fn push_field_snapshot(&mut self, key: &str) {
        if let Some(snapshot) = self.registry.field_snapshot(key) {
            self.field_history.push(key, &snapshot);
        }
    }

    pub fn undo_field(&mut self, key: &str) -> bool {
        let Some(current) = self.registry.field_snapshot(key) else {
            return false;
        };
        match self.field_history.undo(key, &current) {
            Some(previous) => {
                self.registry.restore_field(key, previous);
                true
            }
            None => false,
        }
    }

    pub fn redo_field(&mut self, key: &str) -> bool {
        let Some(current) = self.registry.field_snapshot(key) else {
            return false;
        };
        match self.field_history.redo(key, &current) {
            Some(next) => {
                self.registry.restore_field(key, next);
                true
            }
            None => false,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // =========================================================================
    // Selection / highlighting
    // =========================================================================

    pub fn toggle_field_selection(&mut self, key: &str) -> bool {
        if self.selected_fields.remove(key) {
            false
        } else {
            self.selected_fields.insert(key.to_string());
            true
        }
    }

    pub fn toggle_reference_selection(&mut self, key: &str, reference: &str) -> bool {
        let entry = (key.to_string(), reference.to_string());
        if self.selected_refs.remove(&entry) {
            false
        } else {
            self.selected_refs.insert(entry);
            true
        }
    }

    pub fn set_highlight_all(&mut self, on: bool) {
        self.highlight_all = on;
    }

    pub fn highlight_all(&self) -> bool {
        self.highlight_all
    }

    /// Resolve the current selection into highlight spans for one document:
    /// everything when highlight-all is on, else the selected references,
    /// else the references of the selected fields. Result is deduped and
    /// ordered for outside-in markup application.
    pub fn highlight_spans(&self, document_name: &str) -> Result<Vec<Span>, SessionError> {
        let doc = self
            .documents
            .by_name(document_name)
            .ok_or_else(|| SessionError::UnknownDocument(document_name.to_string()))?;

        let mut all = Vec::new();
        if self.highlight_all {
            for field in self.registry.fields() {
                for reference in &field.references {
                    all.extend(locate(&doc.text, reference, &doc.name));
                }
            }
        } else if !self.selected_refs.is_empty() {
            for (field_key, reference) in &self.selected_refs {
                if self.registry.contains(field_key) {
                    all.extend(locate(&doc.text, reference, &doc.name));
                }
            }
        } else {
            for key in &self.selected_fields {
                if let Some(field) = self.registry.field(key) {
                    for reference in &field.references {
                        all.extend(locate(&doc.text, reference, &doc.name));
                    }
                }
            }
        }
        Ok(dedupe(all))
    }

    // =========================================================================
    // Tables (table-set history)
    // =========================================================================

    pub fn add_table(&mut self, table: TableSnapshot) {
        self.tables.push(table);
    }

    pub fn tables(&self) -> &[TableSnapshot] {
        &self.tables
    }

    pub fn table(&self, index: usize) -> Option<&TableSnapshot> {
        self.tables.iter().find(|t| t.index == index)
    }

    pub fn table_edits(&self) -> &[TableEdit] {
        &self.table_edits
    }

    /// Record a cell edit against the *pristine* grid. The old value is
    /// looked up from the snapshot here, never taken from an intermediate
    /// edited state, so reverting always has a correct baseline. Editing a
    /// cell back to its original value removes the overlay entry instead.
    pub fn record_table_edit(
        &mut self,
        table_index: usize,
        row: usize,
        col: usize,
        new_value: &str,
    ) -> bool {
        let Some(old_value) = self
            .table(table_index)
            .and_then(|t| t.cell(row, col))
            .map(str::to_string)
        else {
            return false;
        };

        let has_entry = self
            .table_edits
            .iter()
            .any(|e| e.table_index == table_index && e.row == row && e.col == col);
        if old_value == new_value && !has_entry {
            return false;
        }

        self.table_history.push(&self.table_edits);
        if old_value == new_value {
            self.table_edits
                .retain(|e| !(e.table_index == table_index && e.row == row && e.col == col));
        } else {
            record_edit(
                &mut self.table_edits,
                TableEdit {
                    table_index,
                    row,
                    col,
                    old_value,
                    new_value: new_value.to_string(),
                },
            );
        }
        true
    }

    pub fn undo_tables(&mut self) -> bool {
        let current = self.table_edits.clone();
        match self.table_history.undo(&current) {
            Some(previous) => {
                self.table_edits = previous;
                true
            }
            None => false,
        }
    }

    pub fn redo_tables(&mut self) -> bool {
        let current = self.table_edits.clone();
        match self.table_history.redo(&current) {
            Some(next) => {
                self.table_edits = next;
                true
            }
            None => false,
        }
    }

    pub fn table_view(&self, index: usize) -> TableView {
        self.table_views.get(&index).copied().unwrap_or_default()
    }

    /// Read-side only: flipping the view never touches grids or edits.
    pub fn toggle_table_view(&mut self, index: usize) -> TableView {
        let next = self.table_view(index).toggled();
        self.table_views.insert(index, next);
        next
    }

    // =========================================================================
    // External collaborators
    // =========================================================================

    /// Stamp an outbound discovery call. Issuing a new ticket invalidates
    /// every earlier one.
    pub fn begin_discovery(&mut self) -> DiscoveryTicket {
        self.discovery_epoch += 1;
        DiscoveryTicket {
            epoch: self.discovery_epoch,
        }
    }

    /// Merge a discovery result into the session. All-or-nothing: a stale
    /// ticket leaves state untouched. Freshly discovered references take
    /// precedence; locally added ones not re-discovered are retained;
    /// discovered tables are appended without discarding existing ones.
    pub fn ingest(
        &mut self,
        ticket: DiscoveryTicket,
        result: &DiscoveryResult,
        source: &str,
    ) -> Result<(), SessionError> {
        if ticket.epoch != self.discovery_epoch {
            return Err(SessionError::StaleDiscovery {
                issued: ticket.epoch,
                current: self.discovery_epoch,
            });
        }
        for (key, spec) in &result.schema.document_fields.fields {
            self.registry.merge_discovered(key, &spec.label, &spec.references);
        }
        for table in &result.tables {
            self.tables.push(TableSnapshot {
                index: table.index,
                source: source.to_string(),
                preview: table.preview.clone(),
            });
        }
        Ok(())
    }

    /// Outbound discovery payload: every loaded document with non-blank text.
    pub fn discovery_request(&self, instructions: Option<&str>) -> DiscoveryRequest {
        DiscoveryRequest {
            documents: self
                .documents
                .iter()
                .filter(|d| !d.text.trim().is_empty())
                .map(|d| DocumentPayload {
                    filename: d.name.clone(),
                    markdown: d.text.clone(),
                })
                .collect(),
            instructions: instructions.map(str::to_string),
        }
    }

    /// Flatten registry and overlay into the generation payload.
    pub fn generate_request(&self) -> GenerateRequest {
        GenerateRequest {
            replacements: self
                .registry
                .build_replacement_list()
                .into_iter()
                .map(|(old, new)| Replacement(old, new))
                .collect(),
            table_edits: flatten_for_transport(&self.table_edits)
                .into_iter()
                .map(|e| TableEditPayload {
                    table_index: e.table_index,
                    row: e.row,
                    col: e.col,
                    old_value: e.old_value,
                    new_value: e.new_value,
                })
                .collect(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
