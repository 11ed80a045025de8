use ratatui::{style::Style, text::Span};

use crate::{app::Field, ui::theme::Theme};

/// A keyboard hint consisting of a key and its action.
#[derive(Debug, Clone)]
pub struct KeyHint {
    pub key: String,
    pub action: String,
}

impl KeyHint {
    pub fn new(key: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            action: action.into(),
        }
    }
}

/// Converts a list of key hints into styled spans for rendering.
pub fn hints_to_spans(hints: &[KeyHint], theme: &Theme) -> Vec<Span<'static>> {
    let mut spans = Vec::new();

    for (i, hint) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(
            hint.key.clone(),
            Style::default().fg(theme.accent),
        ));
        spans.push(Span::raw(format!(" {}", hint.action)));
    }

    spans
}

/// Creates a separator span for dividing hint groups.
pub fn hint_separator(theme: &Theme) -> Span<'static> {
    Span::styled("  │  ", Style::default().fg(theme.border))
}

/// Hints for the focused field.
pub fn field_hints(field: Field) -> Vec<KeyHint> {
    match field {
        Field::Date => vec![
            KeyHint::new("←→", "day"),
            KeyHint::new("Enter", "load"),
            KeyHint::new("Esc", "reset"),
        ],
        Field::Amount(_) => vec![
            KeyHint::new("0-9", "amount"),
            KeyHint::new("Esc", "reset"),
        ],
        Field::Category(_) => vec![KeyHint::new("←→/Space", "category")],
        Field::Notes(_) => vec![KeyHint::new("type", "notes")],
    }
}

/// Hints valid everywhere.
pub fn global_hints() -> Vec<KeyHint> {
    vec![
        KeyHint::new("Tab", "next"),
        KeyHint::new("↑↓", "row"),
        KeyHint::new("Ctrl+S", "submit"),
        KeyHint::new("Ctrl+R", "reload"),
        KeyHint::new("Ctrl+Q", "quit"),
    ]
}
