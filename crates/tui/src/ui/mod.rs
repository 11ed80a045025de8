pub mod components;
pub mod keymap;
pub mod screens;

mod terminal;
mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::{app::AppState, config::DATE_FORMAT};

pub use terminal::{AppTerminal as Terminal, restore_terminal, setup_terminal};
pub use theme::Theme;

pub fn render(frame: &mut Frame<'_>, state: &AppState) {
    let area = frame.area();
    let theme = Theme::default();

    // Info bar, content, bottom bar
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_info_bar(frame, layout[0], state, &theme);
    screens::expenses::render(frame, layout[1], state);
    render_bottom_bar(frame, layout[2], state, &theme);
}

fn render_info_bar(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let loaded = state
        .form
        .loaded()
        .map(|selection| selection.date.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string());
    let (status, status_style) = if state.form.needs_load() {
        ("LOADING", Style::default().fg(theme.dim))
    } else {
        ("OK", Style::default().fg(theme.positive))
    };

    let line = Line::from(vec![
        Span::styled("Server", Style::default().fg(theme.dim)),
        Span::raw(format!(": {}  ", state.base_url)),
        Span::styled("Loaded", Style::default().fg(theme.dim)),
        Span::raw(format!(": {loaded}  ")),
        Span::styled(status, status_style),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

fn render_bottom_bar(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let mut parts = components::hints::hints_to_spans(
        &components::hints::field_hints(state.focus),
        theme,
    );
    parts.push(components::hints::hint_separator(theme));
    parts.extend(components::hints::hints_to_spans(
        &components::hints::global_hints(),
        theme,
    ));

    frame.render_widget(Paragraph::new(Line::from(parts)), area);
}
