// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Per-column filter popup as an explicit `Closed -> Open -> Closed` machine.
//!
//! The host translates raw input into [`PopupCommand`]s; the popup never
//! touches [`FilterState`](crate::filter::FilterState) itself. Committing
//! yields a [`FilterChange`] for the owning screen to apply.

use crate::catalog::ValueCatalog;
use crate::filter::{FilterChange, FilterEntry, parse_numeric_input};
use crate::model::{ColumnDefinition, DataType};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupMode {
    /// Checkbox list over the value catalog.
    Values,
    /// Typed numbers such as `100, 101, 105`.
    Numeric,
    /// Free-text substring.
    Contains,
}

impl PopupMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Values => "values",
            Self::Numeric => "numbers",
            Self::Contains => "contains",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupCommand {
    Toggle(String),
    SelectAll,
    SelectNone,
    SetSearch(String),
    SetText(String),
    ToggleMode,
    Apply,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPopup {
    column: String,
    data_type: DataType,
    mode: PopupMode,
    candidates: ValueCatalog,
    checked: BTreeSet<String>,
    search: String,
    text: String,
    dirty: bool,
}

impl OpenPopup {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub const fn mode(&self) -> PopupMode {
        self.mode
    }

    pub fn candidates(&self) -> &ValueCatalog {
        &self.candidates
    }

    /// Candidates narrowed by the search box. Never affects the selection.
    pub fn visible_candidates(&self) -> Vec<&str> {
        self.candidates.matching(&self.search)
    }

    pub fn is_checked(&self, value: &str) -> bool {
        self.checked.contains(value)
    }

    pub fn checked_count(&self) -> usize {
        self.checked.len()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn commit(&self) -> FilterChange {
        match self.mode {
            PopupMode::Values if self.candidates.is_full_selection(&self.checked) => {
                FilterChange::Clear
            }
            PopupMode::Values => FilterChange::Set(FilterEntry::Categorical {
                selected: self.checked.clone(),
            }),
            PopupMode::Numeric => {
                let tokens = parse_numeric_input(&self.text);
                if tokens.is_empty() {
                    FilterChange::Clear
                } else {
                    FilterChange::Set(FilterEntry::Categorical { selected: tokens })
                }
            }
            PopupMode::Contains if self.text.trim().is_empty() => FilterChange::Clear,
            PopupMode::Contains => FilterChange::Set(FilterEntry::text(self.text.trim())),
        }
    }
}

/// Change committed by `Apply`, addressed to one column.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupCommit {
    pub column: String,
    pub change: FilterChange,
    pub candidates: ValueCatalog,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterPopup {
    #[default]
    Closed,
    Open(OpenPopup),
}

impl FilterPopup {
    /// Opens over `catalog`. Without an existing entry every value starts
    /// checked; otherwise exactly the entry's members are.
    pub fn open(
        column: &ColumnDefinition,
        catalog: ValueCatalog,
        existing: Option<&FilterEntry>,
    ) -> Self {
        let numeric = column.data_type.is_numeric();
        let mut mode = if numeric {
            PopupMode::Numeric
        } else {
            PopupMode::Values
        };
        let mut text = String::new();
        let mut candidates = catalog;
        let mut checked = candidates.to_set();

        match existing {
            None => {}
            Some(FilterEntry::Categorical { selected }) if numeric => {
                text = selected.iter().cloned().collect::<Vec<_>>().join(", ");
            }
            Some(FilterEntry::Categorical { selected }) => {
                // Keep members that are not on the loaded page selectable.
                candidates = ValueCatalog::from_values(
                    candidates.values().iter().chain(selected).cloned(),
                    column.data_type,
                );
                checked = selected.clone();
            }
            Some(FilterEntry::NumericRange { min, max }) => {
                text = format!("{min}, {max}");
            }
            Some(FilterEntry::Text { substring }) => {
                mode = PopupMode::Contains;
                text = substring.clone();
            }
        }

        Self::Open(OpenPopup {
            column: column.key.clone(),
            data_type: column.data_type,
            mode,
            candidates,
            checked,
            search: String::new(),
            text,
            dirty: false,
        })
    }

    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    pub fn as_open(&self) -> Option<&OpenPopup> {
        match self {
            Self::Open(popup) => Some(popup),
            Self::Closed => None,
        }
    }

    /// Applies one command. Returns the commit when `Apply` changed
    /// something; `Apply` on an untouched popup closes it like `Cancel`.
    pub fn handle(&mut self, command: PopupCommand) -> Option<PopupCommit> {
        let Self::Open(popup) = self else {
            return None;
        };
        match command {
            PopupCommand::Toggle(value) => {
                if popup.mode == PopupMode::Values && popup.candidates.contains(&value) {
                    if !popup.checked.remove(&value) {
                        popup.checked.insert(value);
                    }
                    popup.dirty = true;
                }
                None
            }
            PopupCommand::SelectAll => {
                popup.checked = popup.candidates.to_set();
                popup.dirty = true;
                None
            }
            PopupCommand::SelectNone => {
                popup.checked.clear();
                popup.dirty = true;
                None
            }
            PopupCommand::SetSearch(search) => {
                popup.search = search;
                None
            }
            PopupCommand::SetText(text) => {
                popup.text = text;
                popup.dirty = true;
                None
            }
            PopupCommand::ToggleMode => {
                popup.mode = match (popup.mode, popup.data_type.is_numeric()) {
                    (PopupMode::Values, _) => PopupMode::Contains,
                    (PopupMode::Contains, false) => PopupMode::Values,
                    (PopupMode::Contains, true) => PopupMode::Numeric,
                    (PopupMode::Numeric, _) => PopupMode::Contains,
                };
                popup.dirty = true;
                None
            }
            PopupCommand::Apply => {
                let commit = popup.dirty.then(|| PopupCommit {
                    column: popup.column.clone(),
                    change: popup.commit(),
                    candidates: popup.candidates.clone(),
                });
                *self = Self::Closed;
                commit
            }
            PopupCommand::Cancel => {
                *self = Self::Closed;
                None
            }
        }
    }
}
