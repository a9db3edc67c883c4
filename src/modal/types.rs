//! Core modal types and traits
//!
//! Errors, chrome configuration, lifecycle notifications and the trait caller
//! content implements to be shown inside a modal.

use super::dom::{ElementId, ElementTree};
use super::manager::ModalHandle;
use crate::tui::{styles::Theme, Frame};
use anyhow::Result;
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::layout::Rect;
use serde::{Deserialize, Serialize};

/// Identifier of one open-to-close cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Result type for modal operations
pub type ModalResult<T> = std::result::Result<T, ModalError>;

/// Modal-specific error types
#[derive(Debug, thiserror::Error)]
pub enum ModalError {
    #[error("No modal provider installed for results of type `{result_type}`")]
    ProviderMissing { result_type: &'static str },

    #[error("A modal is already open ({active})")]
    AlreadyOpen { active: SessionId },

    #[error("Element {0} is not attached to the document")]
    UnknownElement(ElementId),
}

/// Dialog chrome options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromeConfig {
    /// Escape requests dismissal
    pub close_on_escape: bool,
    /// Pointer-down on the backdrop requests dismissal
    pub close_on_backdrop_click: bool,
    /// DOM id of the element naming the dialog
    pub labelled_by: String,
    /// DOM id of the element describing the dialog
    pub described_by: String,
    /// Upper bound on the panel width in columns
    pub max_width: u16,
    /// Upper bound on the panel height as a share of the screen
    pub max_height_percent: u16,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            close_on_escape: true,
            close_on_backdrop_click: false,
            labelled_by: "modal-title".to_string(),
            described_by: "modal-desc".to_string(),
            max_width: 64,
            max_height_percent: 90,
        }
    }
}

impl ChromeConfig {
    pub fn close_on_escape(mut self, enabled: bool) -> Self {
        self.close_on_escape = enabled;
        self
    }

    pub fn close_on_backdrop_click(mut self, enabled: bool) -> Self {
        self.close_on_backdrop_click = enabled;
        self
    }
}

/// What the chrome did with an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeOutcome {
    /// Not a chrome concern; forward to the content
    Ignored,
    /// Consumed by the chrome
    Handled,
    /// Consumed, and the owner should close the session
    RequestClose(DismissSource),
}

/// Where a close originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DismissSource {
    /// `close` called by the content or another caller
    Explicit,
    Escape,
    Backdrop,
}

/// Lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalEvent {
    Opened { session: SessionId },
    Closed { session: SessionId, source: DismissSource },
    Released { session: SessionId },
}

/// Pointer-down aimed at a specific element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerDown {
    pub target: ElementId,
}

/// Caller-supplied UI shown inside the dialog panel
///
/// The core never inspects content beyond these calls. Every call, and the
/// content's drop, happens without the manager lock held, so content may use
/// its [`ModalHandle`] from any of them.
pub trait ModalContent<T>: Send {
    /// Build the content's elements below `panel`
    fn mount(&mut self, tree: &mut ElementTree, panel: ElementId) -> ModalResult<()>;

    /// Handle a key the chrome did not consume; return whether it was used
    fn handle_key_event(
        &mut self,
        key: KeyEvent,
        focused: Option<ElementId>,
        modal: &ModalHandle<T>,
    ) -> Result<bool>;

    /// Handle a mouse event landing inside the panel
    fn handle_mouse_event(&mut self, event: MouseEvent, modal: &ModalHandle<T>) -> Result<bool> {
        let _ = (event, modal);
        Ok(false)
    }

    /// Render into the panel's inner area
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme, focused: Option<ElementId>);

    /// Preferred inner size (width, height)
    fn preferred_size(&self) -> (u16, u16) {
        (48, 12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_defaults() {
        let config = ChromeConfig::default();
        assert!(config.close_on_escape);
        assert!(!config.close_on_backdrop_click);
        assert_eq!(config.labelled_by, "modal-title");
        assert_eq!(config.described_by, "modal-desc");
    }

    #[test]
    fn test_chrome_config_partial_json() {
        let config: ChromeConfig =
            serde_json::from_str(r#"{"close_on_backdrop_click": true}"#).unwrap();
        assert!(config.close_on_backdrop_click);
        assert!(config.close_on_escape);
        assert_eq!(config.max_width, 64);
    }

    #[test]
    fn test_error_messages() {
        let err = ModalError::ProviderMissing { result_type: "u32" };
        assert_eq!(err.to_string(), "No modal provider installed for results of type `u32`");

        let err = ModalError::AlreadyOpen { active: SessionId(3) };
        assert_eq!(err.to_string(), "A modal is already open (session-3)");
    }
}
