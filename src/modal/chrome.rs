//! Dialog chrome: backdrop, panel and the accessibility machinery around them
//!
//! A mounted chrome owns:
//! - the page scroll lock, taken before the first render and released on drop
//! - the Tab/Shift+Tab focus trap, recomputed from the panel on every press
//! - Escape and backdrop dismissal, reported to the owner as close requests
//!
//! Elements are inserted under the document body (the portal target) on mount
//! and removed again when the chrome is dropped, whatever the exit path.

use super::{
    dom::{lock_document, Document, Element, ElementId, Role, SharedDocument},
    focus::focusable_elements,
    scroll_lock::ScrollLock,
    types::{ChromeConfig, ChromeOutcome, DismissSource, ModalResult},
};
use crate::tui::{styles::Theme, Frame};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, Clear},
};
use tracing::{debug, warn};

/// Per-mount state; the transition is one-way
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeState {
    /// Scroll locked, trap active
    Mounted,
    /// A dismissal trigger fired; waiting for the owner to drop the chrome
    RequestingClose,
}

/// Blocking overlay for one modal session
#[derive(Debug)]
pub struct DialogChrome {
    config: ChromeConfig,
    document: SharedDocument,
    backdrop: ElementId,
    panel: ElementId,
    previous_focus: Option<ElementId>,
    state: ChromeState,
    panel_area: Option<Rect>,
    _scroll_lock: ScrollLock,
}

impl DialogChrome {
    /// Insert the overlay at the portal target, lock scrolling and move focus
    /// onto the panel
    pub fn mount(document: &SharedDocument, config: ChromeConfig) -> ModalResult<Self> {
        let scroll_lock = ScrollLock::acquire(document);

        let mut doc = lock_document(document);
        let previous_focus = doc.active_element();
        let body = doc.body();

        let mut backdrop = Element::container();
        backdrop.role = Some(Role::Presentation);
        let backdrop = doc.tree_mut().append_child(body, backdrop)?;

        let mut panel = Element::container().with_tab_index(-1);
        panel.role = Some(Role::Dialog);
        panel.aria_modal = true;
        panel.labelled_by = Some(config.labelled_by.clone());
        panel.described_by = Some(config.described_by.clone());
        let panel = doc.tree_mut().append_child(backdrop, panel)?;
        doc.focus(panel)?;
        drop(doc);

        debug!(%backdrop, %panel, "Mounted dialog chrome");

        Ok(Self {
            config,
            document: document.clone(),
            backdrop,
            panel,
            previous_focus,
            state: ChromeState::Mounted,
            panel_area: None,
            _scroll_lock: scroll_lock,
        })
    }

    pub fn state(&self) -> ChromeState {
        self.state
    }

    /// Overlay element covering the page
    pub fn backdrop(&self) -> ElementId {
        self.backdrop
    }

    /// Dialog element the content is mounted into
    pub fn panel(&self) -> ElementId {
        self.panel
    }

    /// Panel rectangle from the last render
    pub fn panel_area(&self) -> Option<Rect> {
        self.panel_area
    }

    /// Apply Escape dismissal and the focus trap to a key press
    pub fn handle_key(&mut self, key: KeyEvent) -> ChromeOutcome {
        if self.state == ChromeState::RequestingClose {
            return ChromeOutcome::Handled;
        }

        match key.code {
            KeyCode::Esc if self.config.close_on_escape => {
                self.request_close(DismissSource::Escape)
            }
            KeyCode::Tab => self.trap_focus(!key.modifiers.contains(KeyModifiers::SHIFT)),
            KeyCode::BackTab => self.trap_focus(false),
            _ => ChromeOutcome::Ignored,
        }
    }

    /// Pointer-down whose original target is known
    pub fn handle_pointer_down(&mut self, target: ElementId) -> ChromeOutcome {
        if self.state == ChromeState::RequestingClose {
            return ChromeOutcome::Handled;
        }
        if target != self.backdrop {
            return ChromeOutcome::Ignored;
        }
        if self.config.close_on_backdrop_click {
            self.request_close(DismissSource::Backdrop)
        } else {
            ChromeOutcome::Handled
        }
    }

    /// Terminal mouse event, hit-tested against the rendered panel
    pub fn handle_mouse_event(&mut self, event: MouseEvent) -> ChromeOutcome {
        let target = self.hit_test(event.column, event.row);
        match event.kind {
            MouseEventKind::Down(_) => self.handle_pointer_down(target),
            _ if target == self.backdrop => ChromeOutcome::Handled,
            _ => ChromeOutcome::Ignored,
        }
    }

    /// Element under a screen cell: the panel if inside it, otherwise the backdrop
    pub fn hit_test(&self, column: u16, row: u16) -> ElementId {
        match self.panel_area {
            Some(area)
                if column >= area.x
                    && column < area.x + area.width
                    && row >= area.y
                    && row < area.y + area.height =>
            {
                self.panel
            }
            _ => self.backdrop,
        }
    }

    fn request_close(&mut self, source: DismissSource) -> ChromeOutcome {
        debug!(?source, "Dialog chrome requesting close");
        self.state = ChromeState::RequestingClose;
        ChromeOutcome::RequestClose(source)
    }

    fn trap_focus(&mut self, forward: bool) -> ChromeOutcome {
        let mut doc = lock_document(&self.document);
        let focusable = focusable_elements(doc.tree(), self.panel);

        let target = match (focusable.first(), focusable.last()) {
            (Some(&first), Some(&last)) => {
                let active = doc.active_element();
                if forward && active == Some(last) {
                    debug!("Focus wrapped to first element");
                    first
                } else if !forward && active == Some(first) {
                    debug!("Focus wrapped to last element");
                    last
                } else {
                    self.sequential_target(&doc, &focusable, active, forward)
                }
            }
            _ => self.panel,
        };

        if let Err(err) = doc.focus(target) {
            warn!("Focus trap could not move focus: {}", err);
        }
        ChromeOutcome::Handled
    }

    /// Next or previous focusable element relative to `active` within the panel.
    /// Focus on the panel itself or outside it enters at the matching edge.
    fn sequential_target(
        &self,
        doc: &Document,
        focusable: &[ElementId],
        active: Option<ElementId>,
        forward: bool,
    ) -> ElementId {
        let (first, last) = (focusable[0], focusable[focusable.len() - 1]);
        let edge = if forward { first } else { last };

        let Some(active) = active.filter(|id| {
            *id != self.panel && doc.tree().is_inclusive_descendant(self.panel, *id)
        }) else {
            return edge;
        };

        let order = doc.tree().descendants(self.panel);
        let position = |id: ElementId| order.iter().position(|candidate| *candidate == id);
        let Some(current) = position(active) else {
            return edge;
        };

        let next = if forward {
            focusable
                .iter()
                .copied()
                .find(|id| position(*id).is_some_and(|p| p > current))
        } else {
            focusable
                .iter()
                .rev()
                .copied()
                .find(|id| position(*id).is_some_and(|p| p < current))
        };
        next.unwrap_or(edge)
    }

    /// Draw the dimmed page and the empty panel; returns the content area
    pub fn render(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        theme: &Theme,
        preferred: (u16, u16),
    ) -> Rect {
        frame
            .buffer_mut()
            .set_style(area, Style::default().add_modifier(Modifier::DIM));

        let panel_area = self.panel_rect(area, preferred);
        self.panel_area = Some(panel_area);

        let title = lock_document(&self.document)
            .text_of(&self.config.labelled_by)
            .map(str::to_string);

        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.focused_border_style())
            .style(theme.base_style());
        if let Some(title) = title {
            block = block.title(format!(" {} ", title));
        }

        let content_area = block.inner(panel_area);
        frame.render_widget(Clear, panel_area);
        frame.render_widget(block, panel_area);
        content_area
    }

    fn panel_rect(&self, area: Rect, (content_width, content_height): (u16, u16)) -> Rect {
        let max_height_percent = u32::from(self.config.max_height_percent.min(100));
        let max_height = (u32::from(area.height) * max_height_percent / 100) as u16;
        let width = content_width
            .saturating_add(2)
            .min(self.config.max_width)
            .min(area.width);
        let height = content_height.saturating_add(2).min(max_height).min(area.height);

        Rect {
            x: area.x + area.width.saturating_sub(width) / 2,
            y: area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        }
    }
}

impl Drop for DialogChrome {
    fn drop(&mut self) {
        let mut doc = lock_document(&self.document);
        doc.tree_mut().remove(self.backdrop);

        match self.previous_focus.filter(|id| doc.tree().contains(*id)) {
            Some(previous) => {
                if let Err(err) = doc.focus(previous) {
                    warn!("Could not return focus: {}", err);
                }
            }
            None => doc.blur(),
        }
        debug!(backdrop = %self.backdrop, "Unmounted dialog chrome");
    }
}
