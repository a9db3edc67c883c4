pub mod form;

use crate::tui::{styles::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::layout::Rect;

/// Page identifier type
pub type PageId = String;

/// Base trait for all pages
#[async_trait]
pub trait Page: Send + Sync {
    /// Get the page ID
    fn id(&self) -> &PageId;

    /// Get the page title
    fn title(&self) -> &str;

    /// Handle keyboard input
    async fn handle_key_event(&mut self, event: KeyEvent) -> Result<()>;

    /// Handle mouse input
    async fn handle_mouse_event(&mut self, event: MouseEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    /// Handle periodic updates
    async fn tick(&mut self) -> Result<()> {
        Ok(())
    }

    /// Handle a custom application event; returns whether it was consumed
    async fn handle_custom_event(
        &mut self,
        name: &str,
        payload: serde_json::Value,
    ) -> Result<bool> {
        let _ = (name, payload);
        Ok(false)
    }

    /// Render the page
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme);

    /// Called when the page is resized
    fn on_resize(&mut self, _area: Rect) {}
}
