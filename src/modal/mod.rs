//! Modal dialog orchestration
//!
//! Callers open caller-defined content in a blocking overlay and await the
//! single value it is closed with. The pieces, leaves first:
//!
//! - [`focus`] resolves the focusable elements of a subtree
//! - [`chrome`] mounts the backdrop and panel, locks page scrolling, traps
//!   focus and turns Escape/backdrop presses into close requests
//! - [`manager`] owns the single session slot and its one-shot result
//! - [`context`] hands the manager to callers and fails fast without one

pub mod chrome;
pub mod context;
pub mod dom;
pub mod focus;
pub mod manager;
pub mod scroll_lock;
pub mod types;

pub use chrome::{ChromeState, DialogChrome};
pub use context::ModalScope;
pub use dom::{Document, Element, ElementId, ElementKind, ElementTree, Overflow, SharedDocument};
pub use focus::{focusable_elements, is_focusable};
pub use manager::{ModalHandle, ModalManager, PendingResult};
pub use scroll_lock::ScrollLock;
pub use types::*;
