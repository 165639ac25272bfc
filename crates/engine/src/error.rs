use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Highlight or payload request named a document the session never loaded.
    UnknownDocument(String),
    /// A discovery result arrived after a newer discovery was started.
    StaleDiscovery { issued: u64, current: u64 },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDocument(name) => write!(f, "unknown document: {name}"),
            Self::StaleDiscovery { issued, current } => {
                write!(
                    f,
                    "stale discovery result (ticket {issued}, current {current}) — discarded"
                )
            }
        }
    }
}

impl std::error::Error for SessionError {}
