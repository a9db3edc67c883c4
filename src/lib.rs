//! Modal dialog orchestration for terminal applications
//!
//! [`modal`] holds the provider, the dialog chrome and the focus resolver;
//! [`tui`] is a ratatui front end that drives them with an application form.

pub mod config;
pub mod modal;
pub mod tui;
