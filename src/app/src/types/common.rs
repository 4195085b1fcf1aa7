use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body encoding used when persisting a payload
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Urlencoded,
    Json,
}

impl Encoding {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Urlencoded => "application/x-www-form-urlencoded",
            Self::Json => "application/json",
        }
    }
}

/// Errors raised at the transport boundary
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncError {
    #[error("{0}")]
    Transport(String),
    #[error("device rejected request ({status}): {message}")]
    ServerRejected { status: u16, message: String },
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Result of persisting a payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SaveOutcome {
    Accepted,
    Rejected { status: u16, message: String },
    TransportError(String),
}

impl SaveOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Typed error of a failed outcome
    pub fn error(&self) -> Option<SyncError> {
        match self {
            Self::Accepted => None,
            Self::Rejected { status, message } => Some(SyncError::ServerRejected {
                status: *status,
                message: message.clone(),
            }),
            Self::TransportError(msg) => Some(SyncError::Transport(msg.clone())),
        }
    }

    /// Message surfaced to the user for this outcome
    pub fn notification(&self, what: &str) -> String {
        match self {
            Self::Accepted => format!("{what} saved"),
            Self::Rejected { status, message } if message.is_empty() => {
                format!("Saving {what} failed: HTTP {status}")
            }
            Self::Rejected { status, message } => {
                format!("Saving {what} failed: HTTP {status} - {message}")
            }
            Self::TransportError(msg) => format!("Saving {what} failed: {msg}"),
        }
    }
}

/// Synchronization state of a page with the device
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Unloaded,
    Loading,
    Ready,
    Saving,
    LoadFailed(String),
}

impl SyncState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Loading | Self::Saving)
    }
}

/// Overlay spinner state (UI state)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverlaySpinnerState {
    overlay: bool,
    title: String,
    text: Option<String>,
    progress: Option<u8>,
    countdown_seconds: Option<u32>,
}

impl OverlaySpinnerState {
    /// Create a new overlay spinner with the given title (shown by default)
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            overlay: true,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn set_progress(&mut self, progress: u8) {
        self.progress = Some(progress);
    }

    pub fn set_countdown(&mut self, seconds: u32) {
        self.countdown_seconds = Some(seconds);
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    pub fn is_visible(&self) -> bool {
        self.overlay
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn progress(&self) -> Option<u8> {
        self.progress
    }

    pub fn countdown_seconds(&self) -> Option<u32> {
        self.countdown_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_notification_includes_status() {
        let outcome = SaveOutcome::Rejected {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(
            outcome.notification("Network settings"),
            "Saving Network settings failed: HTTP 500 - boom"
        );
        assert!(!outcome.is_accepted());
    }

    #[test]
    fn sync_state_gates_submit() {
        assert!(SyncState::Ready.is_ready());
        assert!(SyncState::Saving.is_busy());
        assert!(!SyncState::LoadFailed("x".into()).is_ready());
    }
}
