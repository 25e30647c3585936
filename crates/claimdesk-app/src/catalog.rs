// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::{ColumnDefinition, DataType, Row};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::iter::Peekable;
use std::str::Chars;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

/// Display text standing in for an empty or null cell.
pub const BLANK: &str = "(Blank)";

/// Sorted distinct display values of one column over the loaded page.
///
/// Only the current page is scanned; the catalog never claims to cover the
/// full server-side domain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueCatalog {
    values: Vec<String>,
}

impl ValueCatalog {
    pub fn from_rows(rows: &[Row], column: &ColumnDefinition) -> Self {
        Self::from_values(
            rows.iter()
                .map(|row| display_cell(row.cell(column), column.data_type)),
            column.data_type,
        )
    }

    pub fn from_values(values: impl IntoIterator<Item = String>, data_type: DataType) -> Self {
        let distinct: BTreeSet<String> = values
            .into_iter()
            .map(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    BLANK.to_owned()
                } else {
                    trimmed.to_owned()
                }
            })
            .collect();
        let mut values: Vec<String> = distinct.into_iter().collect();
        values.sort_by(|left, right| compare_values(data_type, left, right));
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|candidate| candidate == value)
    }

    pub fn to_set(&self) -> BTreeSet<String> {
        self.values.iter().cloned().collect()
    }

    /// True when `selected` is exactly the catalog, i.e. selecting it filters nothing.
    pub fn is_full_selection(&self, selected: &BTreeSet<String>) -> bool {
        selected.len() == self.values.len() && self.values.iter().all(|value| selected.contains(value))
    }

    /// Candidates containing `query`, ignoring case. Display-only narrowing.
    pub fn matching(&self, query: &str) -> Vec<&str> {
        let needle = query.trim().to_lowercase();
        self.values
            .iter()
            .filter(|value| needle.is_empty() || value.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }
}

/// Trimmed display text of a cell; empty and null cells become [`BLANK`].
pub fn display_cell(value: Option<&Value>, data_type: DataType) -> String {
    let text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(raw)) => format_text_cell(raw.trim(), data_type),
        Some(Value::Bool(true)) => "Yes".to_owned(),
        Some(Value::Bool(false)) => "No".to_owned(),
        Some(Value::Number(number)) => match (data_type, number.as_f64()) {
            (DataType::Currency, Some(amount)) => format!("{amount:.2}"),
            _ => number.to_string(),
        },
        Some(other) => other.to_string(),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        BLANK.to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn format_text_cell(raw: &str, data_type: DataType) -> String {
    match data_type {
        DataType::Date => match OffsetDateTime::parse(raw, &Rfc3339) {
            Ok(parsed) => parsed.date().to_string(),
            Err(_) => raw.to_owned(),
        },
        DataType::Datetime => OffsetDateTime::parse(raw, &Rfc3339)
            .ok()
            .and_then(|parsed| {
                parsed
                    .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
                    .ok()
            })
            .unwrap_or_else(|| raw.to_owned()),
        DataType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "y" | "yes" => "Yes".to_owned(),
            "false" | "0" | "n" | "no" => "No".to_owned(),
            _ => raw.to_owned(),
        },
        _ => raw.to_owned(),
    }
}

/// Catalog ordering. Numeric columns rank [`BLANK`] first, then values that
/// parse as numbers by value, then the rest; ties fall back to [`natural_cmp`].
pub fn compare_values(data_type: DataType, left: &str, right: &str) -> Ordering {
    if data_type.is_numeric() {
        let ordering = match (numeric_key(left), numeric_key(right)) {
            (NumericKey::Number(left_number), NumericKey::Number(right_number)) => {
                left_number.total_cmp(&right_number)
            }
            (left_key, right_key) => left_key.rank().cmp(&right_key.rank()),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    natural_cmp(left, right)
}

#[derive(Debug, Clone, Copy)]
enum NumericKey {
    Blank,
    Number(f64),
    Text,
}

impl NumericKey {
    const fn rank(self) -> u8 {
        match self {
            Self::Blank => 0,
            Self::Number(_) => 1,
            Self::Text => 2,
        }
    }
}

fn numeric_key(value: &str) -> NumericKey {
    if value == BLANK {
        return NumericKey::Blank;
    }
    value
        .parse::<f64>()
        .map_or(NumericKey::Text, NumericKey::Number)
}

/// Case-insensitive comparison that orders digit runs by numeric value, so
/// "9" sorts before "10". Ties break on the raw text, making the order total.
pub fn natural_cmp(left: &str, right: &str) -> Ordering {
    let mut left_chars = left.chars().peekable();
    let mut right_chars = right.chars().peekable();

    loop {
        match (left_chars.peek().copied(), right_chars.peek().copied()) {
            (None, None) => return left.cmp(right),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let left_run = take_digits(&mut left_chars);
                let right_run = take_digits(&mut right_chars);
                let ordering = compare_digit_runs(&left_run, &right_run);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                let ordering = fold_case(l).cmp(&fold_case(r));
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left_chars.next();
                right_chars.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(ch) = chars.peek().copied()
        && ch.is_ascii_digit()
    {
        run.push(ch);
        chars.next();
    }
    run
}

fn compare_digit_runs(left: &str, right: &str) -> Ordering {
    let left_significant = left.trim_start_matches('0');
    let right_significant = right.trim_start_matches('0');
    left_significant
        .len()
        .cmp(&right_significant.len())
        .then_with(|| left_significant.cmp(right_significant))
        .then_with(|| left.len().cmp(&right.len()))
}

fn fold_case(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}
