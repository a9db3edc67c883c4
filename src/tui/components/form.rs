//! Application form shown inside a modal
//!
//! Collects a name, an email address, an experience level and an optional
//! GitHub link. Enter on the submit button (or inside a field) closes the
//! modal with the collected [`FormValues`]; Enter on cancel closes it empty.

use crate::{
    modal::{Element, ElementId, ElementTree, ModalContent, ModalHandle, ModalResult},
    tui::{styles::Theme, Frame},
};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use serde::{Deserialize, Serialize};

/// Values submitted by the form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormValues {
    pub name: String,
    pub email: String,
    pub experience: String,
    pub github: String,
}

/// Selectable experience levels (value, label)
pub const EXPERIENCE_LEVELS: [(&str, &str); 3] = [
    ("junior", "0-3 years"),
    ("mid", "4-7 years"),
    ("senior", "8+ years"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Email,
    Experience,
    Github,
}

impl Field {
    const ALL: [Field; 4] = [Field::Name, Field::Email, Field::Experience, Field::Github];

    fn dom_id(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Experience => "experience",
            Field::Github => "github",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Field::Name => "Name / nickname *",
            Field::Email => "Email *",
            Field::Experience => "Frontend experience",
            Field::Github => "GitHub link (optional)",
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            Field::Name => "Jane Doe",
            Field::Email => "you@example.com",
            Field::Experience => "choose with ←/→",
            Field::Github => "https://github.com/username",
        }
    }
}

/// Modal content collecting [`FormValues`]
pub struct FormModal {
    values: FormValues,
    fields: Vec<(Field, ElementId)>,
    cancel: Option<ElementId>,
    submit: Option<ElementId>,
    error: Option<String>,
}

impl FormModal {
    pub fn new() -> Self {
        Self {
            values: FormValues::default(),
            fields: Vec::new(),
            cancel: None,
            submit: None,
            error: None,
        }
    }

    /// Values entered so far
    pub fn values(&self) -> &FormValues {
        &self.values
    }

    fn field_at(&self, focused: Option<ElementId>) -> Option<Field> {
        let focused = focused?;
        self.fields
            .iter()
            .find(|(_, id)| *id == focused)
            .map(|(field, _)| *field)
    }

    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Name => Some(&mut self.values.name),
            Field::Email => Some(&mut self.values.email),
            Field::Github => Some(&mut self.values.github),
            Field::Experience => None,
        }
    }

    fn value(&self, field: Field) -> String {
        match field {
            Field::Name => self.values.name.clone(),
            Field::Email => self.values.email.clone(),
            Field::Github => self.values.github.clone(),
            Field::Experience => EXPERIENCE_LEVELS
                .iter()
                .find(|(value, _)| *value == self.values.experience)
                .map(|(_, label)| format!("‹ {} ›", label))
                .unwrap_or_default(),
        }
    }

    fn cycle_experience(&mut self, forward: bool) {
        let count = EXPERIENCE_LEVELS.len();
        let current = EXPERIENCE_LEVELS
            .iter()
            .position(|(value, _)| *value == self.values.experience);
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => count - 1,
            (Some(index), true) => (index + 1) % count,
            (Some(index), false) => (index + count - 1) % count,
        };
        self.values.experience = EXPERIENCE_LEVELS[next].0.to_string();
    }

    fn submit(&mut self, modal: &ModalHandle<FormValues>) {
        if self.values.name.trim().is_empty() || self.values.email.trim().is_empty() {
            self.error = Some("Name and email are required".to_string());
            return;
        }
        self.error = None;
        modal.close(Some(self.values.clone()));
    }

    fn button_span(label: &str, focused: bool, theme: &Theme, primary: bool) -> Span<'static> {
        let style = if focused {
            theme.selection_style()
        } else if primary {
            theme.primary_style()
        } else {
            theme.border_style()
        };
        Span::styled(format!("[ {} ]", label), style)
    }
}

impl Default for FormModal {
    fn default() -> Self {
        Self::new()
    }
}

impl ModalContent<FormValues> for FormModal {
    fn mount(&mut self, tree: &mut ElementTree, panel: ElementId) -> ModalResult<()> {
        let form = tree.append_child(panel, Element::container().with_dom_id("apply-form"))?;
        tree.append_child(form, Element::text("Application form").with_dom_id("modal-title"))?;
        tree.append_child(
            form,
            Element::text("Tell us a little about yourself.").with_dom_id("modal-desc"),
        )?;

        self.fields.clear();
        for field in Field::ALL {
            tree.append_child(form, Element::text(field.label()))?;
            let control = match field {
                Field::Experience => Element::select(),
                _ => Element::input(),
            };
            let id = tree.append_child(form, control.with_dom_id(field.dom_id()))?;
            self.fields.push((field, id));
        }

        self.cancel = Some(tree.append_child(form, Element::button("Cancel"))?);
        self.submit = Some(tree.append_child(form, Element::button("Submit"))?);
        Ok(())
    }

    fn handle_key_event(
        &mut self,
        key: KeyEvent,
        focused: Option<ElementId>,
        modal: &ModalHandle<FormValues>,
    ) -> Result<bool> {
        let field = self.field_at(focused);

        match key.code {
            KeyCode::Enter if focused.is_some() && focused == self.cancel => {
                modal.close(None);
                Ok(true)
            }
            KeyCode::Enter if field.is_some() || (focused.is_some() && focused == self.submit) => {
                self.submit(modal);
                Ok(true)
            }
            KeyCode::Left | KeyCode::Right if field == Some(Field::Experience) => {
                self.cycle_experience(key.code == KeyCode::Right);
                Ok(true)
            }
            KeyCode::Char(c)
                if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                if field == Some(Field::Experience) && c == ' ' {
                    self.cycle_experience(true);
                    return Ok(true);
                }
                match field.and_then(|field| self.text_mut(field)) {
                    Some(text) => {
                        text.push(c);
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            KeyCode::Backspace => match field.and_then(|field| self.text_mut(field)) {
                Some(text) => {
                    text.pop();
                    Ok(true)
                }
                None => Ok(false),
            },
            _ => Ok(false),
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme, focused: Option<ElementId>) {
        let focused_field = self.field_at(focused);

        let mut lines = vec![
            Line::from(Span::styled("Tell us a little about yourself.", theme.dim_style())),
            Line::default(),
        ];

        for (field, _) in &self.fields {
            let is_focused = focused_field == Some(*field);
            lines.push(Line::from(Span::styled(field.label(), theme.dim_style())));

            let value = self.value(*field);
            let marker = if is_focused { "› " } else { "  " };
            let (text, style) = if value.is_empty() {
                (field.placeholder().to_string(), theme.placeholder_style())
            } else {
                (value, theme.text_style())
            };
            let style = if is_focused {
                style.patch(theme.selection_style())
            } else {
                style
            };
            lines.push(Line::from(vec![
                Span::raw(marker),
                Span::styled(text, style),
            ]));
        }

        lines.push(Line::default());
        lines.push(Line::from(vec![
            Self::button_span("Cancel", focused.is_some() && focused == self.cancel, theme, false),
            Span::raw("  "),
            Self::button_span("Submit", focused.is_some() && focused == self.submit, theme, true),
        ]));

        if let Some(error) = &self.error {
            lines.push(Line::from(Span::styled(error.clone(), theme.error_style())));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn preferred_size(&self) -> (u16, u16) {
        (52, 14)
    }
}
