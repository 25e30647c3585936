// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::catalog::ValueCatalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Filter on a single column. A column without an entry is unfiltered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterEntry {
    /// Checked values. For numeric columns these are the typed tokens.
    Categorical { selected: BTreeSet<String> },
    NumericRange { min: f64, max: f64 },
    Text { substring: String },
}

impl FilterEntry {
    pub fn categorical<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Categorical {
            selected: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Range with its bounds put in order.
    pub fn numeric_range(min: f64, max: f64) -> Self {
        if min <= max {
            Self::NumericRange { min, max }
        } else {
            Self::NumericRange { min: max, max: min }
        }
    }

    pub fn text(substring: impl Into<String>) -> Self {
        Self::Text {
            substring: substring.into(),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Categorical { selected } if selected.is_empty() => "none".to_owned(),
            Self::Categorical { selected } if selected.len() == 1 => selected
                .iter()
                .next()
                .cloned()
                .unwrap_or_default(),
            Self::Categorical { selected } => format!("{} values", selected.len()),
            Self::NumericRange { min, max } => format!("{min}..{max}"),
            Self::Text { substring } => format!("~{substring}"),
        }
    }

    fn is_vacuous(&self) -> bool {
        match self {
            Self::Categorical { .. } => false,
            Self::NumericRange { min, max } => min.is_nan() || max.is_nan(),
            Self::Text { substring } => substring.trim().is_empty(),
        }
    }
}

/// Outcome of committing a filter popup.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    Set(FilterEntry),
    Clear,
}

impl From<FilterEntry> for FilterChange {
    fn from(entry: FilterEntry) -> Self {
        Self::Set(entry)
    }
}

/// Active filters of one screen, keyed by column key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterState {
    entries: BTreeMap<String, FilterEntry>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `entry` for `key`. Blank text and NaN ranges clear the column
    /// instead. Returns whether anything changed.
    pub fn apply(&mut self, key: &str, entry: FilterEntry) -> bool {
        if entry.is_vacuous() {
            return self.clear(key);
        }
        if self.entries.get(key) == Some(&entry) {
            return false;
        }
        self.entries.insert(key.to_owned(), entry);
        true
    }

    /// Stores a checkbox selection, normalizing "everything checked" to no
    /// filter at all.
    pub fn apply_categorical(
        &mut self,
        key: &str,
        selected: BTreeSet<String>,
        catalog: &ValueCatalog,
    ) -> bool {
        if catalog.is_full_selection(&selected) {
            return self.clear(key);
        }
        self.apply(key, FilterEntry::Categorical { selected })
    }

    pub fn apply_change(
        &mut self,
        key: &str,
        change: FilterChange,
        catalog: Option<&ValueCatalog>,
    ) -> bool {
        match (change, catalog) {
            (FilterChange::Clear, _) => self.clear(key),
            (FilterChange::Set(FilterEntry::Categorical { selected }), Some(catalog)) => {
                self.apply_categorical(key, selected, catalog)
            }
            (FilterChange::Set(entry), _) => self.apply(key, entry),
        }
    }

    pub fn clear(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear_all(&mut self) -> bool {
        let changed = !self.entries.is_empty();
        self.entries.clear();
        changed
    }

    pub fn get(&self, key: &str) -> Option<&FilterEntry> {
        self.entries.get(key)
    }

    pub fn is_filtered(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Splits numeric filter input such as `"100, 101 105"` into raw tokens.
/// Tokens are kept as typed; numeric parsing happens at query time.
pub fn parse_numeric_input(input: &str) -> BTreeSet<String> {
    input
        .split(|ch: char| ch == ',' || ch == ';' || ch.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Numeric values of `tokens`; anything that does not parse is dropped.
pub fn numeric_tokens<'a>(tokens: impl IntoIterator<Item = &'a String>) -> Vec<f64> {
    tokens
        .into_iter()
        .filter_map(|token| token.replace(['$', '_'], "").parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{FilterChange, FilterEntry, FilterState, numeric_tokens, parse_numeric_input};
    use crate::catalog::ValueCatalog;
    use crate::model::DataType;
    use std::collections::BTreeSet;

    fn statuses() -> ValueCatalog {
        ValueCatalog::from_values(
            ["Open", "Pending", "Paid"].map(str::to_owned),
            DataType::String,
        )
    }

    #[test]
    fn full_selection_is_normalized_away() {
        let mut filters = FilterState::new();
        assert!(!filters.apply_categorical("claStatus", statuses().to_set(), &statuses()));
        assert!(filters.is_empty());

        let mut partial = statuses().to_set();
        partial.remove("Paid");
        assert!(filters.apply_categorical("claStatus", partial.clone(), &statuses()));
        assert_eq!(
            filters.get("claStatus"),
            Some(&FilterEntry::Categorical { selected: partial })
        );

        assert!(filters.apply_categorical("claStatus", statuses().to_set(), &statuses()));
        assert!(!filters.is_filtered("claStatus"));
    }

    #[test]
    fn empty_selection_is_stored() {
        let mut filters = FilterState::new();
        assert!(filters.apply_categorical("claStatus", BTreeSet::new(), &statuses()));
        assert_eq!(filters.get("claStatus").map(FilterEntry::summary).as_deref(), Some("none"));
    }

    #[test]
    fn blank_text_clears_instead_of_storing() {
        let mut filters = FilterState::new();
        assert!(filters.apply("claNote", FilterEntry::text("denial")));
        assert!(filters.apply("claNote", FilterEntry::text("   ")));
        assert!(filters.is_empty());
        assert!(!filters.apply("claNote", FilterEntry::text("")));
    }

    #[test]
    fn reapplying_identical_entry_reports_no_change() {
        let mut filters = FilterState::new();
        assert!(filters.apply("claAmount", FilterEntry::numeric_range(5.0, 1.0)));
        assert_eq!(
            filters.get("claAmount"),
            Some(&FilterEntry::NumericRange { min: 1.0, max: 5.0 })
        );
        assert!(!filters.apply("claAmount", FilterEntry::numeric_range(1.0, 5.0)));
    }

    #[test]
    fn apply_change_routes_clear_and_categorical() {
        let mut filters = FilterState::new();
        let catalog = statuses();
        assert!(filters.apply_change(
            "claStatus",
            FilterChange::Set(FilterEntry::categorical(["Open"])),
            Some(&catalog),
        ));
        assert!(filters.apply_change("claStatus", FilterChange::Clear, Some(&catalog)));
        assert!(!filters.apply_change("claStatus", FilterChange::Clear, None));
        assert!(!filters.clear_all());
    }

    #[test]
    fn numeric_input_splits_on_commas_and_whitespace() {
        let tokens = parse_numeric_input(" 100, 101 ,105;abc  ");
        assert_eq!(
            tokens.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["100", "101", "105", "abc"]
        );
        let mut values = numeric_tokens(&tokens);
        values.sort_by(f64::total_cmp);
        assert_eq!(values, vec![100.0, 101.0, 105.0]);
        assert!(parse_numeric_input(" , ").is_empty());
    }

    #[test]
    fn summaries_are_short() {
        assert_eq!(FilterEntry::categorical(["Open"]).summary(), "Open");
        assert_eq!(FilterEntry::categorical(["Open", "Paid"]).summary(), "2 values");
        assert_eq!(FilterEntry::numeric_range(1.0, 2.5).summary(), "1..2.5");
        assert_eq!(FilterEntry::text("x").summary(), "~x");
    }
}
