use std::fmt;

use serde::Serialize;

use crate::error::ErrorInfo;

/// What the status badge shows for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum SaveState {
    Synced,
    Unsaved,
    Syncing,
    Error(ErrorInfo),
}

impl SaveState {
    /// Pure derivation; the state is never stored on its own.
    ///
    /// A failure keeps precedence until a save succeeds, even while the next
    /// attempt is in flight.
    pub fn derive(dirty: bool, in_flight: bool, last_error: Option<&ErrorInfo>) -> Self {
        if let Some(error) = last_error {
            return SaveState::Error(error.clone());
        }
        if in_flight {
            SaveState::Syncing
        } else if dirty {
            SaveState::Unsaved
        } else {
            SaveState::Synced
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, SaveState::Synced)
    }
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveState::Synced => f.write_str("Saved"),
            SaveState::Unsaved => f.write_str("Unsaved changes"),
            SaveState::Syncing => f.write_str("Saving..."),
            SaveState::Error(error) => write!(f, "Save failed: {}", error.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_table() {
        let error = ErrorInfo::from_text("boom");

        assert_eq!(SaveState::derive(false, false, None), SaveState::Synced);
        assert_eq!(SaveState::derive(true, false, None), SaveState::Unsaved);
        assert_eq!(SaveState::derive(true, true, None), SaveState::Syncing);
        assert_eq!(SaveState::derive(false, true, None), SaveState::Syncing);
        assert_eq!(
            SaveState::derive(true, true, Some(&error)),
            SaveState::Error(error.clone())
        );
        assert_eq!(
            SaveState::derive(false, false, Some(&error)),
            SaveState::Error(error)
        );
    }
}
