use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table},
};

use crate::{
    app::{AppState, Field},
    form::{MessageLevel, SLOTS},
    ui::theme::Theme,
};

const CURSOR: &str = "│";

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState) {
    let theme = Theme::default();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                 // Date
            Constraint::Length(SLOTS as u16 + 4), // Table (borders, header, footer)
            Constraint::Length(1),                 // Message
            Constraint::Min(0),
        ])
        .split(area);

    render_date(frame, layout[0], state, &theme);
    render_table(frame, layout[1], state, &theme);
    render_message(frame, layout[2], state, &theme);
}

fn focus_style(focused: bool, theme: &Theme) -> Style {
    if focused {
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    }
}

fn render_date(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let focused = state.focus == Field::Date;
    let cursor = if focused { CURSOR } else { "" };
    let weekday = state.form.selected_date().format("%A").to_string();

    let line = Line::from(vec![
        Span::styled(
            format!("{}{cursor}", state.date_input),
            focus_style(focused, theme),
        ),
        Span::raw("  "),
        Span::styled(weekday, Style::default().fg(theme.dim)),
    ]);

    let block = Block::default()
        .title(" date ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_table(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let header = Row::new(["#", "Amount", "Category", "Notes"])
        .style(Style::default().fg(theme.dim));

    let rows = state
        .form
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let amount_focused = state.focus == Field::Amount(i);
            let category_focused = state.focus == Field::Category(i);
            let notes_focused = state.focus == Field::Notes(i);

            let amount = if amount_focused {
                format!("{}{CURSOR}", state.amount_input)
            } else {
                format!("{:.2}", row.amount)
            };
            let category = if category_focused {
                format!("‹ {} ›", row.category)
            } else {
                row.category.to_string()
            };
            let notes_cursor = if notes_focused { CURSOR } else { "" };

            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(theme.dim)),
                Cell::from(amount).style(focus_style(amount_focused, theme)),
                Cell::from(category).style(focus_style(category_focused, theme)),
                Cell::from(format!("{}{notes_cursor}", row.notes))
                    .style(focus_style(notes_focused, theme)),
            ])
        })
        .collect::<Vec<_>>();

    let total: f64 = state.form.rows().iter().map(|row| row.amount).sum();
    let footer = Row::new(vec![
        Cell::from(""),
        Cell::from(format!("{total:.2}")),
        Cell::from("total"),
        Cell::from(""),
    ])
    .style(Style::default().fg(theme.dim));

    let block = Block::default()
        .title(" expenses ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border));

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Length(12),
            Constraint::Length(17),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .footer(footer)
    .block(block);

    frame.render_widget(table, area);
}

fn render_message(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let Some(message) = &state.form.message else {
        return;
    };
    let style = match message.level {
        MessageLevel::Success => Style::default().fg(theme.positive),
        MessageLevel::Error => Style::default().fg(theme.error),
    };
    frame.render_widget(
        Paragraph::new(Span::styled(message.text.as_str(), style)),
        area,
    );
}
