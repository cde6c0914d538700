use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub key: Style,
    pub relation: Style,
    pub dim: Style,
    pub null: Style,
}

impl Theme {
    /// Colors on a terminal, plain text when piped.
    pub fn detect() -> Self {
        if !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            key: Style::new().yellow(),
            relation: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
            null: Style::new().bright_black().italic(),
        }
    }

    pub fn plain() -> Self {
        let style = Style::new();
        Self {
            header: style,
            success: style,
            key: style,
            relation: style,
            dim: style,
            null: style,
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
