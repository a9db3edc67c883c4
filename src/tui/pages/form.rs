//! Landing page that opens the application form and shows what was submitted

use super::{Page, PageId};
use crate::{
    modal::{
        dom::lock_document, Element, ElementId, ModalError, ModalResult, ModalScope,
        SharedDocument,
    },
    tui::{
        components::form::{FormModal, FormValues},
        events::Event,
        styles::Theme,
        Frame,
    },
};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Name of the custom event carrying a form result
pub const FORM_SUBMITTED: &str = "form_submitted";

pub struct FormPage {
    id: PageId,
    scope: ModalScope,
    document: SharedDocument,
    trigger: ElementId,
    event_sender: mpsc::UnboundedSender<Event>,
    submitted: Option<FormValues>,
    cancelled: usize,
    size: Rect,
}

impl FormPage {
    /// Mount the page's trigger button into `document` and focus it
    pub fn new(
        scope: ModalScope,
        document: SharedDocument,
        event_sender: mpsc::UnboundedSender<Event>,
    ) -> ModalResult<Self> {
        let trigger = {
            let mut doc = lock_document(&document);
            let body = doc.body();
            let page = doc
                .tree_mut()
                .append_child(body, Element::container().with_dom_id("form-page"))?;
            let trigger = doc.tree_mut().append_child(
                page,
                Element::button("Open application form").with_dom_id("open-form"),
            )?;
            doc.focus(trigger)?;
            trigger
        };

        Ok(Self {
            id: "form".to_string(),
            scope,
            document,
            trigger,
            event_sender,
            submitted: None,
            cancelled: 0,
            size: Rect::default(),
        })
    }

    /// Most recent submission
    pub fn submitted(&self) -> Option<&FormValues> {
        self.submitted.as_ref()
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled
    }

    /// Open the form and report its result back as a [`FORM_SUBMITTED`] event
    pub fn open_form(&mut self) -> Result<()> {
        let modal = self.scope.use_modal::<FormValues>()?;
        let pending = match modal.open(FormModal::new()) {
            Ok(pending) => pending,
            Err(ModalError::AlreadyOpen { active }) => {
                debug!(%active, "Form already open");
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        };

        let sender = self.event_sender.clone();
        tokio::spawn(async move {
            let payload = match pending.await {
                Some(values) => serde_json::to_value(&values).unwrap_or_else(|error| {
                    warn!(%error, "Failed to encode form result");
                    serde_json::Value::Null
                }),
                None => serde_json::Value::Null,
            };
            let _ = sender.send(Event::Custom(FORM_SUBMITTED.to_string(), payload));
        });
        Ok(())
    }

    fn trigger_focused(&self) -> bool {
        lock_document(&self.document).active_element() == Some(self.trigger)
    }

    fn summary_lines(&self, theme: &Theme) -> Vec<Line<'static>> {
        let Some(form) = &self.submitted else {
            return vec![Line::from(Span::styled(
                "Nothing submitted yet.",
                theme.placeholder_style(),
            ))];
        };

        let row = |label: &'static str, value: &str| {
            Line::from(vec![
                Span::styled(format!("{:<12}", label), theme.dim_style()),
                Span::styled(value.to_string(), theme.text_style()),
            ])
        };
        vec![
            Line::from(Span::styled("Submitted", theme.success_style())),
            row("Name", &form.name),
            row("Email", &form.email),
            row("Experience", &form.experience),
            row("GitHub", &form.github),
        ]
    }
}

#[async_trait]
impl Page for FormPage {
    fn id(&self) -> &PageId {
        &self.id
    }

    fn title(&self) -> &str {
        "Application"
    }

    async fn handle_key_event(&mut self, event: KeyEvent) -> Result<()> {
        if matches!(event.code, KeyCode::Enter | KeyCode::Char(' ')) && self.trigger_focused() {
            self.open_form()?;
        }
        Ok(())
    }

    async fn handle_custom_event(
        &mut self,
        name: &str,
        payload: serde_json::Value,
    ) -> Result<bool> {
        if name != FORM_SUBMITTED {
            return Ok(false);
        }

        if payload.is_null() {
            self.cancelled += 1;
            info!("Form dismissed without a result");
        } else {
            let values: FormValues = serde_json::from_value(payload)?;
            info!(name = %values.name, experience = %values.experience, "Form submitted");
            self.submitted = Some(values);
        }
        Ok(true)
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let button_style = if self.trigger_focused() {
            theme.primary_style()
        } else {
            theme.border_style()
        };

        let mut lines = vec![
            Line::from(Span::styled("[ Open application form ]", button_style)),
            Line::default(),
        ];
        lines.extend(self.summary_lines(theme));

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .title(self.title().to_string())
                .borders(Borders::ALL)
                .border_style(theme.border_style()),
        );
        frame.render_widget(paragraph, area);
    }

    fn on_resize(&mut self, area: Rect) {
        self.size = area;
    }
}
