pub mod form;

use crate::tui::{styles::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::layout::Rect;

/// Base trait for all UI components
#[async_trait]
pub trait Component: Send + Sync {
    /// Handle keyboard input
    async fn handle_key_event(&mut self, event: KeyEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    /// Handle mouse input
    async fn handle_mouse_event(&mut self, event: MouseEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    /// Handle periodic updates
    async fn tick(&mut self) -> Result<()> {
        Ok(())
    }

    /// Render the component
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme);

    /// Get component dimensions
    fn size(&self) -> Rect;

    /// Set component dimensions
    fn set_size(&mut self, size: Rect);

    /// Check if component has focus
    fn has_focus(&self) -> bool {
        false
    }

    /// Check if component is visible
    fn is_visible(&self) -> bool {
        true
    }
}
