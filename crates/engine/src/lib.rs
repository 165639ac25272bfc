//! `docforge-engine` — field registry, snapshot histories, table overlays.
//!
//! Pure engine crate: owns the mutable template state and its undo model.
//! No IO, no HTTP — payloads for the external services are built here and
//! handed to callers.

pub mod error;
pub mod history;
pub mod overlay;
pub mod registry;
pub mod session;

pub use error::SessionError;
pub use history::{History, KeyedHistory, DEFAULT_HISTORY_LIMIT};
pub use overlay::{flatten_for_transport, record_edit, split_multiline, TableEdit, TableSnapshot, TableView};
pub use registry::{Field, FieldSnapshot, Registry};
pub use session::{DiscoveryTicket, Session};
