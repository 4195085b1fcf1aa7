use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Required suffix of firmware and filesystem images
pub const IMAGE_SUFFIX: &str = ".bin";
pub const DEFAULT_REBOOT_COUNTDOWN_SECS: u32 = 10;
/// Where the client navigates once the reboot countdown elapsed
pub const REDIRECT_TARGET: &str = "/";
/// Body prefix the device answers with when flashing failed
const UPDATE_FAILED_MARKER: &str = "Update Failed";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageKind {
    #[default]
    Firmware,
    Filesystem,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub kind: ImageKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum UploadFailure {
    ConnectionError(String),
    ServerError { status: u16, message: String },
}

impl std::fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionError(msg) => write!(f, "Connection error: {msg}"),
            Self::ServerError { status, message } if message.is_empty() => {
                write!(f, "Device rejected the image (HTTP {status})")
            }
            Self::ServerError { status, message } => {
                write!(f, "Device rejected the image (HTTP {status}): {message}")
            }
        }
    }
}

/// State of the firmware upload
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum UploadState {
    #[default]
    Idle,
    FileSelected,
    Uploading {
        progress: u8,
    },
    Succeeded,
    Failed(UploadFailure),
    Rebooting {
        countdown: u32,
    },
}

impl UploadState {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::FileSelected => "FileSelected",
            Self::Uploading { .. } => "Uploading",
            Self::Succeeded => "Succeeded",
            Self::Failed(_) => "Failed",
            Self::Rebooting { .. } => "Rebooting",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Invalid file: {0} (expected a .bin image)")]
    InvalidFile(String),
    #[error("cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: &'static str },
}

/// Lifecycle of transferring one image to the device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadSession {
    state: UploadState,
    file: Option<SelectedFile>,
    countdown_secs: u32,
    redirect_to: Option<String>,
}

impl Default for UploadSession {
    fn default() -> Self {
        Self {
            state: UploadState::Idle,
            file: None,
            countdown_secs: DEFAULT_REBOOT_COUNTDOWN_SECS,
            redirect_to: None,
        }
    }
}

impl UploadSession {
    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn redirect_to(&self) -> Option<&str> {
        self.redirect_to.as_deref()
    }

    pub fn countdown_secs(&self) -> u32 {
        self.countdown_secs
    }

    pub fn progress(&self) -> Option<u8> {
        match self.state {
            UploadState::Uploading { progress } => Some(progress),
            UploadState::Succeeded | UploadState::Rebooting { .. } => Some(100),
            _ => None,
        }
    }

    /// Upload trigger is enabled only with a file selected and nothing in flight
    pub fn can_start(&self) -> bool {
        self.state == UploadState::FileSelected
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.state, UploadState::Uploading { .. })
    }

    /// Countdown length used after the next successful upload (minimum one second)
    pub fn set_countdown_secs(&mut self, secs: u32) {
        self.countdown_secs = secs.max(1);
    }

    pub fn select(&mut self, name: &str, size: u64) -> Result<&SelectedFile, UploadError> {
        if !matches!(
            self.state,
            UploadState::Idle | UploadState::FileSelected | UploadState::Failed(_)
        ) {
            return Err(self.invalid("select a file"));
        }
        if !name.ends_with(IMAGE_SUFFIX) || name.len() == IMAGE_SUFFIX.len() {
            return Err(UploadError::InvalidFile(name.to_string()));
        }

        let kind = if name.to_lowercase().contains("spiffs") {
            ImageKind::Filesystem
        } else {
            ImageKind::Firmware
        };
        self.state = UploadState::FileSelected;
        Ok(&*self.file.insert(SelectedFile {
            name: name.to_string(),
            size,
            kind,
        }))
    }

    pub fn start(&mut self) -> Result<&SelectedFile, UploadError> {
        if !self.can_start() {
            return Err(self.invalid("start an upload"));
        }
        let file = self.file.as_ref().ok_or(UploadError::InvalidTransition {
            action: "start an upload",
            state: "without a file",
        })?;
        self.state = UploadState::Uploading { progress: 0 };
        self.redirect_to = None;
        Ok(file)
    }

    /// Record a transport progress report, returns the new percentage if it changed.
    ///
    /// Progress never decreases and is clamped to 100.
    pub fn report_progress(&mut self, loaded: u64, total: u64) -> Option<u8> {
        let UploadState::Uploading { progress } = &mut self.state else {
            return None;
        };
        if total == 0 {
            return None;
        }
        let (loaded, total) = (u128::from(loaded), u128::from(total));
        let percent = ((loaded * 200 + total) / (total * 2)).min(100) as u8;
        if percent <= *progress {
            return None;
        }
        *progress = percent;
        Some(percent)
    }

    /// Evaluate the device response to the upload request
    pub fn finish(&mut self, status: u16, body: &str) -> Result<(), UploadError> {
        if !(200..300).contains(&status) || body.trim_start().starts_with(UPDATE_FAILED_MARKER) {
            return self.fail(UploadFailure::ServerError {
                status,
                message: body.trim().to_string(),
            });
        }
        self.accept()
    }

    pub fn accept(&mut self) -> Result<(), UploadError> {
        if !self.is_uploading() {
            return Err(self.invalid("accept an upload"));
        }
        self.state = UploadState::Succeeded;
        Ok(())
    }

    pub fn fail(&mut self, failure: UploadFailure) -> Result<(), UploadError> {
        if !self.is_uploading() {
            return Err(self.invalid("fail an upload"));
        }
        self.state = UploadState::Failed(failure);
        Ok(())
    }

    /// Keep the selected file and arm the upload trigger again
    pub fn retry(&mut self) -> Result<(), UploadError> {
        if !matches!(self.state, UploadState::Failed(_)) || self.file.is_none() {
            return Err(self.invalid("retry"));
        }
        self.state = UploadState::FileSelected;
        Ok(())
    }

    /// Advance the reboot countdown by one second.
    ///
    /// Returns `true` on the tick that reaches zero and sets the redirect target.
    pub fn tick(&mut self) -> bool {
        let remaining = match self.state {
            UploadState::Succeeded => self.countdown_secs.saturating_sub(1),
            UploadState::Rebooting { countdown } if countdown > 0 => countdown - 1,
            _ => return false,
        };
        self.state = UploadState::Rebooting {
            countdown: remaining,
        };
        if remaining == 0 {
            self.redirect_to = Some(REDIRECT_TARGET.to_string());
            return true;
        }
        false
    }

    fn invalid(&self, action: &'static str) -> UploadError {
        UploadError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploading(name: &str) -> UploadSession {
        let mut session = UploadSession::default();
        session.select(name, 1000).unwrap();
        session.start().unwrap();
        session
    }

    #[test]
    fn filesystem_image_upload_succeeds() {
        let mut session = UploadSession::default();

        let file = session.select("spiffs.bin", 100).unwrap();
        assert_eq!(file.kind, ImageKind::Filesystem);
        assert_eq!(session.state(), &UploadState::FileSelected);

        session.start().unwrap();
        assert_eq!(session.state(), &UploadState::Uploading { progress: 0 });

        assert_eq!(session.report_progress(50, 100), Some(50));
        assert_eq!(session.state(), &UploadState::Uploading { progress: 50 });

        session.report_progress(100, 100);
        session.finish(200, "Update Success! Rebooting...").unwrap();
        assert_eq!(session.state(), &UploadState::Succeeded);
    }

    #[test]
    fn wrong_extension_is_rejected() {
        let mut session = UploadSession::default();

        assert_eq!(
            session.select("firmware.txt", 10),
            Err(UploadError::InvalidFile("firmware.txt".into()))
        );
        assert_eq!(session.state(), &UploadState::Idle);
        assert!(session.file().is_none());
        assert!(session.select(".bin", 10).is_err());
        assert!(session.select("firmware.BIN", 10).is_err());
    }

    #[test]
    fn progress_is_monotonic_and_bounded() {
        let mut session = uploading("firmware.bin");
        let mut observed = vec![];

        for (loaded, total) in [(10, 100), (5, 100), (40, 0), (60, 100), (300, 100), (90, 100)] {
            session.report_progress(loaded, total);
            observed.extend(session.progress());
        }

        assert_eq!(observed, vec![10, 10, 10, 60, 100, 100]);
        assert!(observed.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn countdown_reaches_zero_after_exactly_ten_ticks() {
        let mut session = uploading("firmware.bin");
        session.accept().unwrap();

        for i in 1..10 {
            assert!(!session.tick(), "tick {i} must not redirect");
            assert_eq!(
                session.state(),
                &UploadState::Rebooting { countdown: 10 - i }
            );
            assert_eq!(session.redirect_to(), None);
        }

        assert!(session.tick());
        assert_eq!(session.state(), &UploadState::Rebooting { countdown: 0 });
        assert_eq!(session.redirect_to(), Some("/"));

        assert!(!session.tick());
        assert_eq!(session.state(), &UploadState::Rebooting { countdown: 0 });
    }

    #[test]
    fn countdown_length_is_configurable() {
        let mut session = UploadSession::default();
        session.set_countdown_secs(3);
        session.select("firmware.bin", 1).unwrap();
        session.start().unwrap();
        session.accept().unwrap();

        assert!(!session.tick());
        assert!(!session.tick());
        assert!(session.tick());
    }

    #[test]
    fn update_failed_body_is_a_server_error() {
        let mut session = uploading("firmware.bin");

        session.finish(200, "Update Failed...").unwrap();

        assert_eq!(
            session.state(),
            &UploadState::Failed(UploadFailure::ServerError {
                status: 200,
                message: "Update Failed...".into()
            })
        );
    }

    #[test]
    fn retry_keeps_file() {
        let mut session = uploading("firmware.bin");
        session
            .fail(UploadFailure::ConnectionError("reset".into()))
            .unwrap();

        session.retry().unwrap();

        assert_eq!(session.state(), &UploadState::FileSelected);
        assert_eq!(session.file().map(|f| f.name.as_str()), Some("firmware.bin"));
        assert!(session.can_start());
    }

    #[test]
    fn second_start_while_uploading_is_refused() {
        let mut session = uploading("firmware.bin");
        session.report_progress(30, 100);

        assert_eq!(
            session.start().err(),
            Some(UploadError::InvalidTransition {
                action: "start an upload",
                state: "Uploading"
            })
        );
        assert!(session.select("other.bin", 1).is_err());
        assert_eq!(session.state(), &UploadState::Uploading { progress: 30 });
    }

    #[test]
    fn invalid_transitions_leave_state_unchanged() {
        let mut session = UploadSession::default();

        assert!(session.start().is_err());
        assert!(session.retry().is_err());
        assert!(session.accept().is_err());
        assert!(!session.tick());
        assert_eq!(session.report_progress(1, 2), None);
        assert_eq!(session.state(), &UploadState::Idle);
    }

    #[test]
    fn progress_rounds_to_nearest_percent() {
        let mut session = uploading("firmware.bin");

        assert_eq!(session.report_progress(1, 200), Some(1));
        assert_eq!(session.report_progress(2, 3), Some(67));
        assert_eq!(session.report_progress(199, 200), Some(100));
    }

    #[test]
    fn zero_countdown_redirects_on_first_tick() {
        let mut value = serde_json::to_value(uploading("firmware.bin")).unwrap();
        value["countdown_secs"] = 0.into();
        let mut session: UploadSession = serde_json::from_value(value).unwrap();
        session.accept().unwrap();

        assert!(session.tick());
        assert_eq!(session.state(), &UploadState::Rebooting { countdown: 0 });
        assert_eq!(session.redirect_to(), Some("/"));
    }
}
