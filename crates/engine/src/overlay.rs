//! Sparse table edit overlay.
//!
//! Source tables are immutable as extracted; user edits live in a sparse
//! list of cell replacements layered on top. Either view — pristine or
//! edited — is reconstructed on demand without mutating anything.

use serde::{Deserialize, Serialize};

/// A table as extracted from a source document. Row 0 of `preview` is the
/// header row. Never mutated after load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub index: usize,
    /// Originating document name (or the discovery pass that produced it).
    pub source: String,
    pub preview: Vec<Vec<String>>,
}

/// One cell replacement. `old_value` is always the value from the pristine
/// grid, never from an intermediate edited state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEdit {
    pub table_index: usize,
    pub row: usize,
    pub col: usize,
    pub old_value: String,
    pub new_value: String,
}

/// Which reconstruction of a table to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableView {
    #[default]
    Original,
    Edited,
}

impl TableView {
    pub fn toggled(self) -> Self {
        match self {
            TableView::Original => TableView::Edited,
            TableView::Edited => TableView::Original,
        }
    }
}

/// Insert `edit` into the overlay. Any earlier edit of the same cell is
/// dropped first, so the list holds at most one edit per cell and list
/// order remains application order (append-only convention).
pub fn record_edit(edits: &mut Vec<TableEdit>, edit: TableEdit) {
    edits.retain(|e| {
        !(e.table_index == edit.table_index && e.row == edit.row && e.col == edit.col)
    });
    edits.push(edit);
}

impl TableSnapshot {
    /// Reconstruct the edited grid: deep copy of the pristine preview with
    /// matching edits applied in list order. Edits for other tables or
    /// out-of-range cells are skipped, not errors — the table list can
    /// change underneath a stale overlay.
    pub fn apply_edits(&self, edits: &[TableEdit]) -> Vec<Vec<String>> {
        let mut grid = self.preview.clone();
        for edit in edits.iter().filter(|e| e.table_index == self.index) {
            if let Some(cell) = grid.get_mut(edit.row).and_then(|row| row.get_mut(edit.col)) {
                *cell = edit.new_value.clone();
            }
        }
        grid
    }

    /// Read-side view selection. Never mutates the preview or the overlay.
    pub fn view(&self, edits: &[TableEdit], mode: TableView) -> Vec<Vec<String>> {
        match mode {
            TableView::Original => self.preview.clone(),
            TableView::Edited => self.apply_edits(edits),
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.preview.get(row)?.get(col).map(String::as_str)
    }
}

/// Decompose a multi-line cell edit into per-line edits.
///
/// The generation service matches replacements against flat paragraph runs,
/// so an edit spanning multiple lines must become one literal replacement
/// per differing line. Both sides are split on `'\n'` and the shorter side
/// is padded with empty strings. Single-line edits pass through; a no-op
/// edit yields nothing.
pub fn split_multiline(edit: &TableEdit) -> Vec<TableEdit> {
    if !edit.old_value.contains('\n') && !edit.new_value.contains('\n') {
        if edit.old_value != edit.new_value {
            return vec![edit.clone()];
        }
        return Vec::new();
    }

    let old_lines: Vec<&str> = edit.old_value.split('\n').collect();
    let new_lines: Vec<&str> = edit.new_value.split('\n').collect();
    let line_count = old_lines.len().max(new_lines.len());

    let mut out = Vec::new();
    for i in 0..line_count {
        let old_line = old_lines.get(i).copied().unwrap_or("");
        let new_line = new_lines.get(i).copied().unwrap_or("");
        if old_line != new_line {
            out.push(TableEdit {
                table_index: edit.table_index,
                row: edit.row,
                col: edit.col,
                old_value: old_line.to_string(),
                new_value: new_line.to_string(),
            });
        }
    }
    out
}

/// Transport shape for a whole overlay: every edit split per line.
pub fn flatten_for_transport(edits: &[TableEdit]) -> Vec<TableEdit> {
    edits.iter().flat_map(split_multiline).collect()
}
