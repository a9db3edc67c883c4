use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Key binding configuration
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
    pub description: String,
}

impl KeyBinding {
    pub fn new(key: KeyCode, modifiers: KeyModifiers, description: &str) -> Self {
        Self {
            key,
            modifiers,
            description: description.to_string(),
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key == event.code && self.modifiers == event.modifiers
    }

    /// Short label such as `Ctrl+C` or `o`
    pub fn label(&self) -> String {
        let key = match self.key {
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Enter => "Enter".to_string(),
            KeyCode::Esc => "Esc".to_string(),
            other => format!("{:?}", other),
        };
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            format!("Ctrl+{}", key.to_uppercase())
        } else {
            key
        }
    }
}

/// Application key mappings
#[derive(Debug, Clone)]
pub struct KeyMap {
    /// Quit application
    pub quit: KeyBinding,

    /// Open the application form
    pub open_form: KeyBinding,

    /// Show help
    pub help: KeyBinding,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            quit: KeyBinding::new(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL,
                "Quit application",
            ),
            open_form: KeyBinding::new(
                KeyCode::Char('o'),
                KeyModifiers::NONE,
                "Open application form",
            ),
            help: KeyBinding::new(
                KeyCode::Char('g'),
                KeyModifiers::CONTROL,
                "Show/hide help",
            ),
        }
    }
}

impl KeyMap {
    /// Check if the event should quit the application
    pub fn should_quit(&self, event: &KeyEvent) -> bool {
        self.quit.matches(event)
    }

    /// Check if the event should open the form
    pub fn should_open_form(&self, event: &KeyEvent) -> bool {
        self.open_form.matches(event)
    }

    /// Check if the event should show help
    pub fn should_show_help(&self, event: &KeyEvent) -> bool {
        self.help.matches(event)
    }

    /// Help lines for all key bindings
    pub fn help_lines(&self) -> Vec<(String, &str)> {
        [&self.open_form, &self.help, &self.quit]
            .into_iter()
            .map(|binding| (binding.label(), binding.description.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let keys = KeyMap::default();
        assert!(keys.should_quit(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!keys.should_quit(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(keys.should_open_form(&KeyEvent::new(KeyCode::Char('o'), KeyModifiers::NONE)));
        assert_eq!(keys.quit.label(), "Ctrl+C");
        assert_eq!(keys.help_lines().len(), 3);
    }
}
