pub mod document;
pub mod span;

pub use document::{Document, DocumentId, DocumentSet};
pub use span::{apply_marks, dedupe, locate, Span, CONTEXT_LINE_MAX};
