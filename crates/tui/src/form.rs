//! Editable state of the expenses of one day.
//!
//! [`FormState`] keeps the selected date apart from the date whose entries
//! are loaded. [`FormState::sync`] reconciles the two with a single fetch, and
//! [`FormState::invalidate`] forces the next sync to fetch again.

use api_types::expense::{Category, ExpenseEntry};
use chrono::NaiveDate;
use thiserror::Error;

use crate::client::{ClientError, ExpensesApi};

/// Number of editable rows per day.
pub const SLOTS: usize = 5;

pub const FETCH_FAILED: &str = "Failed to retrieve expenses for selected date.";
pub const SUBMIT_FAILED: &str = "Failed to update expenses.";
pub const SUBMIT_OK: &str = "Expenses updated successfully!";

#[derive(Debug, Error)]
pub enum FormError {
    #[error("fetch failed: {0}")]
    FetchFailed(ClientError),
    #[error("submit failed: {0}")]
    SubmitFailed(ClientError),
    #[error("no expenses loaded for the selected date")]
    NotLoaded,
    #[error("amount must not be negative")]
    NegativeAmount,
    #[error("amount is not a number")]
    InvalidAmount,
    #[error("no such row: {0}")]
    NoSuchSlot(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseRow {
    pub amount: f64,
    pub category: Category,
    pub notes: String,
}

impl Default for ExpenseRow {
    fn default() -> Self {
        Self {
            amount: 0.0,
            category: Category::Shopping,
            notes: String::new(),
        }
    }
}

impl ExpenseRow {
    fn from_entry(entry: ExpenseEntry) -> Self {
        let category = Category::from_label(&entry.category).unwrap_or_else(|| {
            tracing::debug!("unknown category {:?}, using first", entry.category);
            Category::ALL[0]
        });
        let amount = if entry.amount.is_finite() && entry.amount > 0.0 {
            entry.amount
        } else {
            0.0
        };
        Self {
            amount,
            category,
            notes: entry.notes,
        }
    }

    fn to_entry(&self) -> ExpenseEntry {
        ExpenseEntry::new(self.amount, self.category, self.notes.clone())
    }
}

/// Entries loaded for one date.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySelection {
    pub date: NaiveDate,
    pub rows: [ExpenseRow; SLOTS],
    /// Entries past the last slot. Not editable, sent back unchanged.
    pub overflow: Vec<ExpenseEntry>,
}

impl DaySelection {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            rows: Default::default(),
            overflow: Vec::new(),
        }
    }

    /// Pads `entries` with default rows up to [`SLOTS`].
    pub fn from_entries(date: NaiveDate, entries: Vec<ExpenseEntry>) -> Self {
        let mut selection = Self::empty(date);
        let mut entries = entries.into_iter();
        for (slot, entry) in selection.rows.iter_mut().zip(entries.by_ref()) {
            *slot = ExpenseRow::from_entry(entry);
        }
        selection.overflow = entries.collect();
        if !selection.overflow.is_empty() {
            tracing::debug!(
                "{date}: {} entries past the editable rows",
                selection.overflow.len()
            );
        }
        selection
    }

    /// Entries worth sending: rows and overflow with a positive amount.
    pub fn payload(&self) -> Vec<ExpenseEntry> {
        self.rows
            .iter()
            .filter(|row| row.amount > 0.0)
            .map(ExpenseRow::to_entry)
            .chain(
                self.overflow
                    .iter()
                    .filter(|entry| entry.amount > 0.0)
                    .cloned(),
            )
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
}

impl Message {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            text: text.into(),
        }
    }
}

#[derive(Debug)]
pub struct FormState {
    selected: NaiveDate,
    loaded: Option<DaySelection>,
    pub message: Option<Message>,
}

impl FormState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            selected: date,
            loaded: None,
            message: None,
        }
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected = date;
    }

    pub fn loaded(&self) -> Option<&DaySelection> {
        self.loaded.as_ref()
    }

    pub fn needs_load(&self) -> bool {
        self.loaded
            .as_ref()
            .is_none_or(|selection| selection.date != self.selected)
    }

    pub fn invalidate(&mut self) {
        self.loaded = None;
    }

    /// Loads the selected date if it is not the loaded one.
    ///
    /// A failed fetch still counts as loaded: the form shows empty rows and
    /// the next fetch happens only after a date change or [`Self::invalidate`].
    pub async fn sync<A: ExpensesApi>(&mut self, api: &A) -> Result<(), FormError> {
        if !self.needs_load() {
            return Ok(());
        }

        let date = self.selected;
        match api.fetch_expenses(date).await {
            Ok(entries) => {
                tracing::info!("loaded {} expenses for {date}", entries.len());
                self.loaded = Some(DaySelection::from_entries(date, entries));
                Ok(())
            }
            Err(err) => {
                tracing::warn!("fetch for {date} failed: {err}");
                self.loaded = Some(DaySelection::empty(date));
                self.message = Some(failure_message(&err, FETCH_FAILED, "fetching"));
                Err(FormError::FetchFailed(err))
            }
        }
    }

    /// The editable rows. Default rows until a sync has happened.
    pub fn rows(&self) -> &[ExpenseRow; SLOTS] {
        static EMPTY: [ExpenseRow; SLOTS] = [const {
            ExpenseRow {
                amount: 0.0,
                category: Category::Shopping,
                notes: String::new(),
            }
        }; SLOTS];
        self.loaded
            .as_ref()
            .map(|selection| &selection.rows)
            .unwrap_or(&EMPTY)
    }

    fn row_mut(&mut self, slot: usize) -> Result<&mut ExpenseRow, FormError> {
        if slot >= SLOTS {
            return Err(FormError::NoSuchSlot(slot));
        }
        let selected = self.selected;
        match self.loaded.as_mut() {
            Some(selection) if selection.date == selected => Ok(&mut selection.rows[slot]),
            _ => Err(FormError::NotLoaded),
        }
    }

    pub fn set_amount(&mut self, slot: usize, amount: f64) -> Result<(), FormError> {
        if !amount.is_finite() {
            return Err(FormError::InvalidAmount);
        }
        if amount < 0.0 {
            return Err(FormError::NegativeAmount);
        }
        self.row_mut(slot)?.amount = amount;
        Ok(())
    }

    pub fn set_category(&mut self, slot: usize, category: Category) -> Result<(), FormError> {
        self.row_mut(slot)?.category = category;
        Ok(())
    }

    pub fn set_notes(&mut self, slot: usize, notes: impl Into<String>) -> Result<(), FormError> {
        self.row_mut(slot)?.notes = notes.into();
        Ok(())
    }

    pub fn payload(&self) -> Vec<ExpenseEntry> {
        self.loaded
            .as_ref()
            .map(DaySelection::payload)
            .unwrap_or_default()
    }

    /// Replaces the server list with [`Self::payload`].
    ///
    /// On success the state is invalidated so the next sync reloads the day.
    /// On failure the rows stay as they are.
    pub async fn submit<A: ExpensesApi>(&mut self, api: &A) -> Result<(), FormError> {
        if self.needs_load() {
            return Err(FormError::NotLoaded);
        }
        let date = self.selected;
        let payload = self.payload();

        match api.replace_expenses(date, &payload).await {
            Ok(()) => {
                tracing::info!("replaced expenses for {date} with {} entries", payload.len());
                self.message = Some(Message::success(SUBMIT_OK));
                self.invalidate();
                Ok(())
            }
            Err(err) => {
                tracing::warn!("submit for {date} failed: {err}");
                self.message = Some(failure_message(&err, SUBMIT_FAILED, "updating"));
                Err(FormError::SubmitFailed(err))
            }
        }
    }
}

/// A status error shows the fixed `text`; any other failure shows its cause.
fn failure_message(err: &ClientError, text: &str, action: &str) -> Message {
    match err {
        ClientError::Status { .. } => Message::error(text),
        _ => Message::error(format!("Error {action} expenses: {err}")),
    }
}

/// Parses the text typed in an amount cell.
///
/// Empty input is zero; `,` is accepted as decimal separator.
pub fn parse_amount(input: &str) -> Result<f64, FormError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    let amount: f64 = trimmed
        .replace(',', ".")
        .parse()
        .map_err(|_| FormError::InvalidAmount)?;
    if !amount.is_finite() {
        return Err(FormError::InvalidAmount);
    }
    if amount < 0.0 {
        return Err(FormError::NegativeAmount);
    }
    Ok(amount)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        cell::RefCell,
        collections::{HashMap, VecDeque},
    };

    use reqwest::StatusCode;

    use super::*;

    /// In-memory [`ExpensesApi`] recording every call.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub days: RefCell<HashMap<NaiveDate, Vec<ExpenseEntry>>>,
        pub fetches: RefCell<Vec<NaiveDate>>,
        pub posts: RefCell<Vec<(NaiveDate, Vec<ExpenseEntry>)>>,
        /// Errors returned, in order, instead of succeeding.
        pub failures: RefCell<VecDeque<ClientError>>,
    }

    impl FakeApi {
        pub(crate) fn with_day(date: NaiveDate, entries: Vec<ExpenseEntry>) -> Self {
            let api = Self::default();
            api.days.borrow_mut().insert(date, entries);
            api
        }

        pub(crate) fn fail_next(&self, status: StatusCode) {
            self.failures.borrow_mut().push_back(ClientError::Status {
                status,
                message: "boom".to_string(),
            });
        }

        /// Fails the next call as if the request never got an answer.
        pub(crate) fn break_next(&self, cause: &str) {
            self.failures
                .borrow_mut()
                .push_back(ClientError::InvalidUrl(cause.to_string()));
        }

        fn take_failure(&self) -> Result<(), ClientError> {
            match self.failures.borrow_mut().pop_front() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    impl ExpensesApi for FakeApi {
        async fn fetch_expenses(&self, date: NaiveDate) -> Result<Vec<ExpenseEntry>, ClientError> {
            self.fetches.borrow_mut().push(date);
            self.take_failure()?;
            Ok(self.days.borrow().get(&date).cloned().unwrap_or_default())
        }

        async fn replace_expenses(
            &self,
            date: NaiveDate,
            entries: &[ExpenseEntry],
        ) -> Result<(), ClientError> {
            self.posts.borrow_mut().push((date, entries.to_vec()));
            self.take_failure()?;
            self.days.borrow_mut().insert(date, entries.to_vec());
            Ok(())
        }
    }

    pub(crate) fn oct(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, day).unwrap()
    }

    #[tokio::test]
    async fn pads_loaded_entries_to_five_rows() {
        for count in [0usize, 1, 4, 5, 7] {
            let entries = (0..count)
                .map(|i| ExpenseEntry::new(i as f64 + 1.0, Category::Food, format!("#{i}")))
                .collect();
            let api = FakeApi::with_day(oct(1), entries);
            let mut form = FormState::new(oct(1));
            form.sync(&api).await.unwrap();
            assert_eq!(form.rows().len(), SLOTS);
            for (i, row) in form.rows().iter().enumerate() {
                if i < count {
                    assert_eq!(row.amount, i as f64 + 1.0);
                } else {
                    assert_eq!(row, &ExpenseRow::default());
                }
            }
        }
    }

    #[tokio::test]
    async fn loads_example_day_and_posts_filtered_rows() {
        let api = FakeApi::with_day(
            oct(1),
            vec![ExpenseEntry {
                amount: 12.5,
                category: "Food".to_string(),
                notes: "lunch".to_string(),
            }],
        );
        let mut form = FormState::new(oct(1));
        form.sync(&api).await.unwrap();

        let rows = form.rows();
        assert_eq!(rows[0].amount, 12.5);
        assert_eq!(rows[0].category, Category::Food);
        assert_eq!(rows[0].notes, "lunch");
        for row in &rows[1..] {
            assert_eq!(row.amount, 0.0);
            assert_eq!(row.category, Category::Shopping);
            assert_eq!(row.notes, "");
        }

        form.set_amount(2, 9.0).unwrap();
        form.submit(&api).await.unwrap();

        let posts = api.posts.borrow();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, oct(1));
        assert_eq!(
            serde_json::to_value(&posts[0].1).unwrap(),
            serde_json::json!([
                {"amount": 12.5, "category": "Food", "notes": "lunch"},
                {"amount": 9.0, "category": "Shopping", "notes": ""}
            ])
        );
    }

    #[tokio::test]
    async fn unknown_category_falls_back_to_first() {
        let api = FakeApi::with_day(
            oct(1),
            vec![ExpenseEntry {
                amount: 5.0,
                category: "Travel".to_string(),
                notes: String::new(),
            }],
        );
        let mut form = FormState::new(oct(1));
        form.sync(&api).await.unwrap();
        assert_eq!(form.rows()[0].category, Category::Rent);
    }

    #[tokio::test]
    async fn date_change_fetches_once() {
        let api = FakeApi::default();
        let mut form = FormState::new(oct(1));

        form.sync(&api).await.unwrap();
        form.sync(&api).await.unwrap();
        assert_eq!(*api.fetches.borrow(), vec![oct(1)]);

        form.select_date(oct(2));
        assert!(form.needs_load());
        form.sync(&api).await.unwrap();
        form.sync(&api).await.unwrap();
        assert_eq!(*api.fetches.borrow(), vec![oct(1), oct(2)]);

        form.select_date(oct(2));
        form.sync(&api).await.unwrap();
        assert_eq!(api.fetches.borrow().len(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_shows_empty_rows_without_retry() {
        let api = FakeApi::with_day(oct(1), vec![ExpenseEntry::new(3.0, Category::Rent, "")]);
        api.fail_next(StatusCode::INTERNAL_SERVER_ERROR);
        let mut form = FormState::new(oct(1));

        let err = form.sync(&api).await;
        assert!(matches!(err, Err(FormError::FetchFailed(_))));
        assert!(form.rows().iter().all(|row| *row == ExpenseRow::default()));
        assert_eq!(
            form.message,
            Some(Message {
                level: MessageLevel::Error,
                text: FETCH_FAILED.to_string(),
            })
        );

        form.sync(&api).await.unwrap();
        assert_eq!(api.fetches.borrow().len(), 1);
    }

    #[tokio::test]
    async fn null_fields_from_server_keep_the_day() {
        let entries: Vec<ExpenseEntry> = serde_json::from_str(
            r#"[{"amount":40.0,"category":"Rent","notes":null},{"amount":12.5,"category":null,"notes":"lunch"}]"#,
        )
        .unwrap();
        let api = FakeApi::with_day(oct(1), entries);
        let mut form = FormState::new(oct(1));
        form.sync(&api).await.unwrap();

        assert_eq!(form.rows()[0].amount, 40.0);
        assert_eq!(form.rows()[0].notes, "");
        assert_eq!(form.rows()[1].category, Category::Rent);
        assert_eq!(form.rows()[1].notes, "lunch");

        form.set_amount(2, 5.0).unwrap();
        form.submit(&api).await.unwrap();
        assert_eq!(
            api.posts.borrow()[0].1,
            vec![
                ExpenseEntry::new(40.0, Category::Rent, ""),
                ExpenseEntry::new(12.5, Category::Rent, "lunch"),
                ExpenseEntry::new(5.0, Category::Shopping, ""),
            ]
        );
    }

    #[tokio::test]
    async fn unanswered_requests_show_their_cause() {
        let api = FakeApi::default();
        api.break_next("connection refused");
        let mut form = FormState::new(oct(1));

        assert!(matches!(form.sync(&api).await, Err(FormError::FetchFailed(_))));
        let message = form.message.clone().unwrap();
        assert_eq!(message.level, MessageLevel::Error);
        assert!(message.text.starts_with("Error fetching expenses: "));
        assert!(message.text.contains("connection refused"));

        form.set_amount(0, 3.0).unwrap();
        api.break_next("connection reset");
        assert!(matches!(form.submit(&api).await, Err(FormError::SubmitFailed(_))));
        let message = form.message.clone().unwrap();
        assert!(message.text.starts_with("Error updating expenses: "));
        assert!(message.text.contains("connection reset"));
        assert_eq!(form.rows()[0].amount, 3.0);
    }

    #[tokio::test]
    async fn unreachable_server_message_names_the_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = crate::client::Client::new(&format!("http://{addr}")).unwrap();
        let mut form = FormState::new(oct(1));

        let err = form.sync(&client).await.unwrap_err();
        assert!(matches!(err, FormError::FetchFailed(ClientError::Transport(_))));
        let text = form.message.map(|m| m.text).unwrap_or_default();
        assert!(text.starts_with("Error fetching expenses: server unreachable"));
    }

    #[tokio::test]
    async fn zero_rows_are_not_submitted() {
        let api = FakeApi::default();
        let mut form = FormState::new(oct(3));
        form.sync(&api).await.unwrap();
        form.set_notes(1, "ignored").unwrap();
        form.set_amount(4, 0.01).unwrap();

        form.submit(&api).await.unwrap();
        let posts = api.posts.borrow();
        assert_eq!(posts[0].1, vec![ExpenseEntry::new(0.01, Category::Shopping, "")]);
    }

    #[tokio::test]
    async fn successful_submit_forces_reload() {
        let api = FakeApi::default();
        let mut form = FormState::new(oct(1));
        form.sync(&api).await.unwrap();
        form.set_amount(0, 20.0).unwrap();
        form.set_category(0, Category::Entertainment).unwrap();

        form.submit(&api).await.unwrap();
        assert!(form.needs_load());
        assert_eq!(form.message.as_ref().map(|m| m.level), Some(MessageLevel::Success));

        form.sync(&api).await.unwrap();
        assert_eq!(*api.fetches.borrow(), vec![oct(1), oct(1)]);
        assert_eq!(form.rows()[0].category, Category::Entertainment);
    }

    #[tokio::test]
    async fn failed_submit_keeps_rows() {
        let api = FakeApi::default();
        let mut form = FormState::new(oct(1));
        form.sync(&api).await.unwrap();
        form.set_amount(1, 7.5).unwrap();
        form.set_notes(1, "taxi").unwrap();
        api.fail_next(StatusCode::BAD_GATEWAY);

        let err = form.submit(&api).await.unwrap_err();
        assert!(matches!(err, FormError::SubmitFailed(_)));
        assert!(!form.needs_load());
        assert_eq!(form.rows()[1].amount, 7.5);
        assert_eq!(form.rows()[1].notes, "taxi");
        assert_eq!(form.message.as_ref().map(|m| m.text.as_str()), Some(SUBMIT_FAILED));
    }

    #[tokio::test]
    async fn overflow_entries_are_sent_back() {
        let entries = (1..=7)
            .map(|i| ExpenseEntry::new(i as f64, Category::Other, ""))
            .collect::<Vec<_>>();
        let api = FakeApi::with_day(oct(1), entries.clone());
        let mut form = FormState::new(oct(1));
        form.sync(&api).await.unwrap();

        assert_eq!(form.loaded().unwrap().overflow.len(), 2);
        form.set_amount(0, 0.0).unwrap();
        form.submit(&api).await.unwrap();
        assert_eq!(api.posts.borrow()[0].1, entries[1..].to_vec());
    }

    #[tokio::test]
    async fn edits_require_loaded_day() {
        let api = FakeApi::default();
        let mut form = FormState::new(oct(1));
        assert!(matches!(form.set_amount(0, 1.0), Err(FormError::NotLoaded)));

        form.sync(&api).await.unwrap();
        form.set_amount(0, 1.0).unwrap();

        form.select_date(oct(2));
        assert!(matches!(form.set_notes(0, "x"), Err(FormError::NotLoaded)));
        assert!(matches!(form.submit(&api).await, Err(FormError::NotLoaded)));
        assert!(api.posts.borrow().is_empty());
    }

    #[tokio::test]
    async fn edits_validate_amount_and_slot() {
        let api = FakeApi::default();
        let mut form = FormState::new(oct(1));
        form.sync(&api).await.unwrap();
        assert!(matches!(form.set_amount(0, -1.0), Err(FormError::NegativeAmount)));
        assert!(matches!(form.set_amount(0, f64::NAN), Err(FormError::InvalidAmount)));
        assert!(matches!(form.set_amount(SLOTS, 1.0), Err(FormError::NoSuchSlot(5))));
        assert_eq!(form.rows()[0].amount, 0.0);

        assert!(matches!(
            form.set_category(SLOTS, Category::Food),
            Err(FormError::NoSuchSlot(5))
        ));
        form.set_category(0, Category::Other).unwrap();
        form.set_notes(0, "ab").unwrap();
        assert_eq!(form.rows()[0].category, Category::Other);
        assert_eq!(form.rows()[0].notes, "ab");
    }

    #[test]
    fn negative_loaded_amount_is_clamped() {
        let selection = DaySelection::from_entries(
            oct(1),
            vec![ExpenseEntry::new(-4.0, Category::Food, "refund")],
        );
        assert_eq!(selection.rows[0].amount, 0.0);
        assert!(selection.payload().is_empty());
    }

    #[test]
    fn parse_amount_accepts_comma_and_empty() {
        assert_eq!(parse_amount("").unwrap(), 0.0);
        assert_eq!(parse_amount("12,5").unwrap(), 12.5);
        assert_eq!(parse_amount(" 9 ").unwrap(), 9.0);
        assert!(matches!(parse_amount("-2"), Err(FormError::NegativeAmount)));
        assert!(matches!(parse_amount("abc"), Err(FormError::InvalidAmount)));
        assert!(matches!(parse_amount("inf"), Err(FormError::InvalidAmount)));
    }
}
