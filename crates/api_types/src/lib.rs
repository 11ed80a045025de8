use serde::{Deserialize, Deserializer, Serialize};

pub mod expense {
    use super::*;

    /// Spending category offered by the form.
    ///
    /// The order of [`Category::ALL`] is the order shown to the user; the
    /// first entry is the fallback for labels the client does not know.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum Category {
        Rent,
        Food,
        Shopping,
        Entertainment,
        Other,
    }

    impl Category {
        pub const ALL: [Category; 5] = [
            Self::Rent,
            Self::Food,
            Self::Shopping,
            Self::Entertainment,
            Self::Other,
        ];

        /// Returns the label used on the wire.
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Rent => "Rent",
                Self::Food => "Food",
                Self::Shopping => "Shopping",
                Self::Entertainment => "Entertainment",
                Self::Other => "Other",
            }
        }

        /// Parses a wire label. Matching is exact.
        pub fn from_label(label: &str) -> Option<Self> {
            Self::ALL.into_iter().find(|c| c.as_str() == label)
        }

        pub fn index(self) -> usize {
            Self::ALL
                .iter()
                .position(|c| *c == self)
                .unwrap_or_default()
        }

        pub fn next(self) -> Self {
            Self::ALL[(self.index() + 1) % Self::ALL.len()]
        }

        pub fn prev(self) -> Self {
            Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
        }
    }

    impl std::fmt::Display for Category {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.as_str())
        }
    }

    /// One expense as stored by the server for a given day.
    ///
    /// `category` is kept as a plain string so that values outside
    /// [`Category::ALL`] still deserialize. Missing and `null` fields both
    /// read as the default.
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    pub struct ExpenseEntry {
        #[serde(default, deserialize_with = "null_as_default")]
        pub amount: f64,
        #[serde(default, deserialize_with = "null_as_default")]
        pub category: String,
        #[serde(default, deserialize_with = "null_as_default")]
        pub notes: String,
    }

    fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
    }

    impl ExpenseEntry {
        pub fn new(amount: f64, category: Category, notes: impl Into<String>) -> Self {
            Self {
                amount,
                category: category.as_str().to_string(),
                notes: notes.into(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::expense::*;

    #[test]
    fn category_labels_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.as_str()), Some(category));
        }
        assert_eq!(Category::from_label("food"), None);
        assert_eq!(Category::from_label("Travel"), None);
    }

    #[test]
    fn category_cycle_wraps() {
        assert_eq!(Category::Other.next(), Category::Rent);
        assert_eq!(Category::Rent.prev(), Category::Other);
        assert_eq!(Category::Food.next(), Category::Shopping);
    }

    #[test]
    fn entry_missing_fields_use_defaults() {
        let entry: ExpenseEntry = serde_json::from_str(r#"{"amount": 3}"#).unwrap();
        assert_eq!(entry.amount, 3.0);
        assert_eq!(entry.category, "");
        assert_eq!(entry.notes, "");
    }

    #[test]
    fn entry_null_fields_use_defaults() {
        let entries: Vec<ExpenseEntry> = serde_json::from_str(
            r#"[
                {"amount": 40.0, "category": "Rent", "notes": null},
                {"amount": 12.5, "category": null, "notes": "lunch"},
                {"amount": null, "category": "Food", "notes": "x"}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries[0], ExpenseEntry::new(40.0, Category::Rent, ""));
        assert_eq!(entries[1].category, "");
        assert_eq!(entries[1].notes, "lunch");
        assert_eq!(entries[2].amount, 0.0);
    }

    #[test]
    fn entry_serializes_wire_shape() {
        let entry = ExpenseEntry::new(12.5, Category::Food, "lunch");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"amount": 12.5, "category": "Food", "notes": "lunch"})
        );
    }
}
