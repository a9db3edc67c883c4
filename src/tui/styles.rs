use ratatui::style::{Color, Modifier, Style};

/// Application theme configuration
#[derive(Debug, Clone)]
pub struct Theme {
    /// Primary colors
    pub primary: Color,

    /// Text colors
    pub text: Color,
    pub text_dim: Color,
    pub text_bright: Color,

    /// Background colors
    pub background: Color,
    pub background_alt: Color,

    /// Border colors
    pub border: Color,
    pub border_focused: Color,

    /// Status colors
    pub success: Color,
    pub error: Color,

    /// Special colors
    pub placeholder: Color,
    pub selection: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Create a dark theme
    pub fn dark() -> Self {
        Self {
            primary: Color::Rgb(79, 70, 229),     // Indigo-600

            text: Color::Rgb(248, 250, 252),      // Slate-50
            text_dim: Color::Rgb(148, 163, 184),  // Slate-400
            text_bright: Color::Rgb(255, 255, 255),

            background: Color::Rgb(15, 23, 42),   // Slate-900
            background_alt: Color::Rgb(30, 41, 59), // Slate-800

            border: Color::Rgb(71, 85, 105),      // Slate-600
            border_focused: Color::Rgb(99, 102, 241), // Indigo-500

            success: Color::Rgb(34, 197, 94),     // Green-500
            error: Color::Rgb(239, 68, 68),       // Red-500

            placeholder: Color::Rgb(100, 116, 139), // Slate-500
            selection: Color::Rgb(30, 58, 138),   // Blue-900
        }
    }

    /// Base style for normal elements
    pub fn base_style(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    /// Style for text content
    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text)
    }

    /// Style for labels and secondary text
    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.text_dim)
    }

    /// Style for borders
    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    /// Style for focused borders
    pub fn focused_border_style(&self) -> Style {
        Style::default()
            .fg(self.border_focused)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for the focused field or button
    pub fn selection_style(&self) -> Style {
        Style::default()
            .bg(self.selection)
            .fg(self.text_bright)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for the primary action
    pub fn primary_style(&self) -> Style {
        Style::default()
            .bg(self.primary)
            .fg(self.text_bright)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for the status bar
    pub fn status_bar_style(&self) -> Style {
        Style::default().fg(self.text).bg(self.background_alt)
    }

    /// Style for placeholder text
    pub fn placeholder_style(&self) -> Style {
        Style::default()
            .fg(self.placeholder)
            .add_modifier(Modifier::ITALIC)
    }

    /// Style for validation messages
    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error).add_modifier(Modifier::BOLD)
    }

    /// Style for confirmations
    pub fn success_style(&self) -> Style {
        Style::default().fg(self.success)
    }
}
