use std::time::Duration;

use chrono::{Days, NaiveDate};
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};

use crate::{
    client::{Client, ExpensesApi},
    config::{AppConfig, DATE_FORMAT, parse_date},
    error::{AppError, Result},
    form::{FormError, FormState, Message, SLOTS, parse_amount},
    ui::{
        self,
        keymap::{AppAction, map_key},
    },
};

/// Longest text accepted by the date field (`YYYY-MM-DD`).
const DATE_INPUT_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    Amount(usize),
    Category(usize),
    Notes(usize),
}

impl Field {
    pub fn row(self) -> Option<usize> {
        match self {
            Self::Date => None,
            Self::Amount(row) | Self::Category(row) | Self::Notes(row) => Some(row),
        }
    }

    fn column(self) -> usize {
        match self {
            Self::Date | Self::Amount(_) => 0,
            Self::Category(_) => 1,
            Self::Notes(_) => 2,
        }
    }

    fn at(row: usize, column: usize) -> Self {
        match column {
            0 => Self::Amount(row),
            1 => Self::Category(row),
            _ => Self::Notes(row),
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Date => Self::Amount(0),
            Self::Amount(row) => Self::Category(row),
            Self::Category(row) => Self::Notes(row),
            Self::Notes(row) if row + 1 < SLOTS => Self::Amount(row + 1),
            Self::Notes(_) => Self::Date,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Date => Self::Notes(SLOTS - 1),
            Self::Amount(0) => Self::Date,
            Self::Amount(row) => Self::Notes(row - 1),
            Self::Category(row) => Self::Amount(row),
            Self::Notes(row) => Self::Category(row),
        }
    }

    fn down(self) -> Self {
        match self.row() {
            None => Self::Amount(0),
            Some(row) if row + 1 < SLOTS => Self::at(row + 1, self.column()),
            Some(_) => self,
        }
    }

    fn up(self) -> Self {
        match self.row() {
            None | Some(0) => Self::Date,
            Some(row) => Self::at(row - 1, self.column()),
        }
    }
}

#[derive(Debug)]
pub struct AppState {
    pub form: FormState,
    pub focus: Field,
    /// Text of the date field, applied on Enter.
    pub date_input: String,
    /// Text of the focused amount cell.
    pub amount_input: String,
    pub base_url: String,
}

pub struct App<A = Client> {
    api: A,
    pub state: AppState,
    should_quit: bool,
}

impl App<Client> {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::new(&config.base_url)?;
        let date = config.start_date()?;
        let base_url = client.base_url().to_string();
        Ok(Self::with_api(client, date, base_url))
    }
}

impl<A: ExpensesApi> App<A> {
    pub fn with_api(api: A, date: NaiveDate, base_url: String) -> Self {
        Self {
            api,
            state: AppState {
                form: FormState::new(date),
                focus: Field::Date,
                date_input: date.format(DATE_FORMAT).to_string(),
                amount_input: String::new(),
                base_url,
            },
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut terminal = ui::setup_terminal()?;
        let result = self.event_loop(&mut terminal).await;
        ui::restore_terminal(&mut terminal)?;
        result
    }

    async fn event_loop(&mut self, terminal: &mut ui::Terminal) -> Result<()> {
        let tick_rate = Duration::from_millis(200);
        self.sync().await;

        while !self.should_quit() {
            terminal
                .draw(|frame| ui::render(frame, &self.state))
                .map_err(|err| AppError::Terminal(err.to_string()))?;

            if event::poll(tick_rate)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key).await;
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        self.handle_action(map_key(key)).await;
    }

    /// Applies one user action, then reloads the day if it went stale.
    ///
    /// Messages live for a single interaction.
    pub async fn handle_action(&mut self, action: AppAction) {
        self.state.form.message = None;

        match action {
            AppAction::Quit => self.should_quit = true,
            AppAction::Cancel => self.reset_inputs(),
            AppAction::NextField => self.focus(self.state.focus.next()),
            AppAction::PrevField => self.focus(self.state.focus.prev()),
            AppAction::Up => self.focus(self.state.focus.up()),
            AppAction::Down => self.focus(self.state.focus.down()),
            AppAction::Submit if self.state.focus == Field::Date => self.apply_date_input(),
            AppAction::Submit | AppAction::Save => self.submit().await,
            AppAction::Reload => {
                tracing::debug!("reload requested");
                self.state.form.invalidate();
            }
            AppAction::Backspace => self.backspace(),
            AppAction::Left => self.step(false),
            AppAction::Right => self.step(true),
            AppAction::Input(ch) => self.input(ch),
            AppAction::None => {}
        }

        self.sync().await;
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    async fn sync(&mut self) {
        if !self.state.form.needs_load() {
            return;
        }
        if let Err(err) = self.state.form.sync(&self.api).await {
            tracing::debug!("sync failed: {err}");
        }
        self.reset_inputs();
    }

    async fn submit(&mut self) {
        match self.state.form.submit(&self.api).await {
            Ok(()) | Err(FormError::SubmitFailed(_)) => {}
            Err(err) => self.report(err),
        }
    }

    fn focus(&mut self, field: Field) {
        self.state.focus = field;
        self.reset_inputs();
    }

    /// Drops pending text and shows the stored values again.
    fn reset_inputs(&mut self) {
        self.state.date_input = self
            .state
            .form
            .selected_date()
            .format(DATE_FORMAT)
            .to_string();
        self.state.amount_input = match self.state.focus {
            Field::Amount(row) => amount_text(self.state.form.rows()[row].amount),
            _ => String::new(),
        };
    }

    fn report(&mut self, err: FormError) {
        self.state.form.message = Some(Message::error(err.to_string()));
    }

    fn apply_date_input(&mut self) {
        match parse_date(&self.state.date_input) {
            Ok(date) => {
                self.state.form.select_date(date);
                self.reset_inputs();
            }
            Err(err) => self.state.form.message = Some(Message::error(err.to_string())),
        }
    }

    fn apply_amount(&mut self, row: usize) {
        let result = parse_amount(&self.state.amount_input)
            .and_then(|amount| self.state.form.set_amount(row, amount));
        if let Err(err) = result {
            self.report(err);
        }
    }

    fn backspace(&mut self) {
        match self.state.focus {
            Field::Date => {
                self.state.date_input.pop();
            }
            Field::Amount(row) => {
                self.state.amount_input.pop();
                self.apply_amount(row);
            }
            Field::Notes(row) => self.edit_notes(row, |notes| {
                notes.pop();
            }),
            Field::Category(_) => {}
        }
    }

    fn step(&mut self, forward: bool) {
        match self.state.focus {
            Field::Date => {
                let current = self.state.form.selected_date();
                let next = if forward {
                    current.checked_add_days(Days::new(1))
                } else {
                    current.checked_sub_days(Days::new(1))
                };
                if let Some(date) = next {
                    self.state.form.select_date(date);
                    self.reset_inputs();
                }
            }
            Field::Category(row) => self.cycle_category(row, forward),
            Field::Amount(_) | Field::Notes(_) => {}
        }
    }

    fn input(&mut self, ch: char) {
        match self.state.focus {
            Field::Date => {
                if (ch.is_ascii_digit() || ch == '-')
                    && self.state.date_input.len() < DATE_INPUT_LEN
                {
                    self.state.date_input.push(ch);
                }
            }
            Field::Amount(row) => {
                if ch.is_ascii_digit() || ch == '.' || ch == ',' {
                    self.state.amount_input.push(ch);
                    self.apply_amount(row);
                }
            }
            Field::Category(row) => {
                if ch == ' ' {
                    self.cycle_category(row, true);
                }
            }
            Field::Notes(row) => self.edit_notes(row, |notes| notes.push(ch)),
        }
    }

    fn cycle_category(&mut self, row: usize, forward: bool) {
        let current = self.state.form.rows()[row].category;
        let category = if forward {
            current.next()
        } else {
            current.prev()
        };
        if let Err(err) = self.state.form.set_category(row, category) {
            self.report(err);
        }
    }

    fn edit_notes(&mut self, row: usize, edit: impl FnOnce(&mut String)) {
        let mut notes = self.state.form.rows()[row].notes.clone();
        edit(&mut notes);
        if let Err(err) = self.state.form.set_notes(row, notes) {
            self.report(err);
        }
    }
}

/// Editable text for a stored amount. Zero shows as an empty cell.
pub fn amount_text(amount: f64) -> String {
    if amount == 0.0 {
        String::new()
    } else {
        amount.to_string()
    }
}
