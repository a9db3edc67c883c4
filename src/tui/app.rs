use crate::{
    config::Config,
    modal::{Document, DismissSource, ModalEvent, ModalManager, ModalScope, SharedDocument},
    tui::{
        components::Component,
        events::Event,
        keys::KeyMap,
        pages::{form::FormPage, Page},
        styles::Theme,
        Frame,
    },
};
use anyhow::Result;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tokio::sync::mpsc;
use tracing::debug;

/// Main application state and controller
pub struct App {
    /// Whether the application should quit
    pub should_quit: bool,

    /// Current application dimensions
    pub size: Rect,

    /// Key mappings for the application
    pub key_map: KeyMap,

    /// Current theme for styling
    pub theme: Theme,

    /// Status message to display
    pub status_message: Option<String>,

    /// Show help overlay
    pub show_help: bool,

    /// Application configuration
    pub config: Config,

    /// Document the page and dialogs mount into
    document: SharedDocument,

    /// Modal provider for the whole app
    modal: ModalManager,

    /// Lifecycle notifications from the modal provider
    modal_events: mpsc::UnboundedReceiver<ModalEvent>,

    /// The application page
    page: FormPage,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config, event_sender: mpsc::UnboundedSender<Event>) -> Result<Self> {
        let document = Document::new().shared();
        let modal = ModalManager::new(document.clone()).with_chrome_config(config.chrome.clone());
        let (modal_sender, modal_events) = mpsc::unbounded_channel();
        modal.set_event_sender(modal_sender);

        let scope = ModalScope::with_provider(modal.clone());
        let page = FormPage::new(scope, document.clone(), event_sender)?;
        debug!(page = %page.id(), "Page mounted");

        Ok(Self {
            should_quit: false,
            size: Rect::default(),
            key_map: KeyMap::default(),
            theme: Theme::default(),
            status_message: None,
            show_help: false,
            config,
            document,
            modal,
            modal_events,
            page,
        })
    }

    /// Handle incoming events; returns whether the app should exit
    pub async fn handle_event(&mut self, event: Event) -> Result<bool> {
        // Content closed on the previous turn is released before anything else runs
        self.modal.tick().await?;

        match event {
            Event::Key(key_event) => {
                if self.key_map.should_quit(&key_event) {
                    self.should_quit = true;
                    return Ok(true);
                }

                if self.modal.is_open() {
                    self.modal.handle_key_event(key_event).await?;
                } else if self.key_map.should_show_help(&key_event) {
                    self.show_help = !self.show_help;
                } else if self.key_map.should_open_form(&key_event) {
                    self.show_help = false;
                    self.page.open_form()?;
                } else {
                    self.page.handle_key_event(key_event).await?;
                }
            }

            Event::Mouse(mouse_event) => {
                if self.config.mouse_enabled && !self.modal.process_mouse(mouse_event)? {
                    self.page.handle_mouse_event(mouse_event).await?;
                }
            }

            Event::Resize(width, height) => {
                self.size = Rect::new(0, 0, width, height);
                self.page.on_resize(self.size);
                self.modal.set_size(self.size);
            }

            Event::Tick => {
                self.page.tick().await?;
            }

            Event::Custom(name, payload) => {
                if !self.page.handle_custom_event(&name, payload).await? {
                    debug!(%name, "Unhandled custom event");
                }
            }

            Event::StatusMessage(message) => {
                self.status_message = Some(message);
            }

            Event::ClearStatus => {
                self.status_message = None;
            }
        }

        self.drain_modal_events();
        Ok(self.should_quit)
    }

    fn drain_modal_events(&mut self) {
        while let Ok(event) = self.modal_events.try_recv() {
            let message = match event {
                ModalEvent::Opened { .. } => "Form opened: Tab to move, Esc to cancel".to_string(),
                ModalEvent::Closed { source, .. } => match source {
                    DismissSource::Explicit => "Form closed".to_string(),
                    DismissSource::Escape => "Form dismissed with Esc".to_string(),
                    DismissSource::Backdrop => "Form dismissed from the backdrop".to_string(),
                },
                ModalEvent::Released { session } => {
                    debug!(%session, "Modal content released");
                    continue;
                }
            };
            self.status_message = Some(message);
        }
    }

    /// Whether a modal currently owns input
    pub fn modal_open(&self) -> bool {
        self.modal.is_open()
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    /// Render the application UI
    pub fn render(&mut self, frame: &mut Frame) {
        self.size = frame.size();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // Main content
                Constraint::Length(1), // Status bar
            ])
            .split(frame.size());

        self.page.render(frame, chunks[0], &self.theme);
        self.render_status_bar(frame, chunks[1]);

        if self.show_help {
            self.render_help_overlay(frame);
        }

        // Dialogs portal to the top of the whole frame
        let area = frame.size();
        self.modal.render(frame, area, &self.theme);
    }

    /// Render the status bar
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let status_text = match &self.status_message {
            Some(message) => message.clone(),
            None => format!(
                "{} | {} for help | {} to quit",
                self.page.title(),
                self.key_map.help.label(),
                self.key_map.quit.label()
            ),
        };

        let status_paragraph = Paragraph::new(status_text).style(self.theme.status_bar_style());
        frame.render_widget(status_paragraph, area);
    }

    /// Render help overlay
    fn render_help_overlay(&self, frame: &mut Frame) {
        let help_area = centered_rect(60, 50, frame.size());

        let lines: Vec<Line> = self
            .key_map
            .help_lines()
            .into_iter()
            .map(|(key, description)| {
                Line::from(vec![
                    Span::styled(format!("{:<10}", key), self.theme.primary_style()),
                    Span::raw(" "),
                    Span::styled(description.to_string(), self.theme.text_style()),
                ])
            })
            .collect();

        let help_block = Block::default()
            .borders(Borders::ALL)
            .title("Help")
            .border_style(self.theme.focused_border_style())
            .style(self.theme.base_style());

        frame.render_widget(Clear, help_area);
        frame.render_widget(Paragraph::new(lines).block(help_block), help_area);
    }
}

/// Create a centered rectangle with given percentage of the screen
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
