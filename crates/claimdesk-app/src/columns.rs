// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::ColumnDefinition;

/// Ordered column catalog of one browse screen.
///
/// Every mutation is a reducer returning a new registry; the receiver is left
/// untouched. Operations naming an absent key return an unchanged copy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnRegistry {
    columns: Vec<ColumnDefinition>,
}

impl ColumnRegistry {
    /// Builds a registry from seed columns. Later duplicates of a key are dropped.
    pub fn new(columns: impl IntoIterator<Item = ColumnDefinition>) -> Self {
        columns
            .into_iter()
            .fold(Self::default(), |registry, column| registry.add_column(column))
    }

    #[must_use]
    pub fn add_column(&self, column: ColumnDefinition) -> Self {
        if self.contains(&column.key) {
            return self.clone();
        }
        let mut columns = self.columns.clone();
        columns.push(column);
        Self { columns }
    }

    #[must_use]
    pub fn remove_column(&self, key: &str) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .filter(|column| column.key != key)
                .cloned()
                .collect(),
        }
    }

    #[must_use]
    pub fn set_visible(&self, key: &str, visible: bool) -> Self {
        self.map_column(key, |column| column.visible = visible)
    }

    #[must_use]
    pub fn toggle_visible(&self, key: &str) -> Self {
        self.map_column(key, |column| column.visible = !column.visible)
    }

    #[must_use]
    pub fn show_all(&self) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .cloned()
                .map(|mut column| {
                    column.visible = true;
                    column
                })
                .collect(),
        }
    }

    fn map_column(&self, key: &str, update: impl FnOnce(&mut ColumnDefinition)) -> Self {
        let mut next = self.clone();
        if let Some(column) = next.columns.iter_mut().find(|column| column.key == key) {
            update(column);
        }
        next
    }

    pub fn get(&self, key: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|column| column.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn visible_columns(&self) -> Vec<&ColumnDefinition> {
        self.columns.iter().filter(|column| column.visible).collect()
    }

    /// Keys of joined columns in registry order; this is the row shape the
    /// server must be asked for.
    pub fn joined_keys(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|column| column.is_joined())
            .map(|column| column.key.as_str())
            .collect()
    }

    /// Columns whose key or label contains `text`, ignoring case. Blank text
    /// matches everything.
    pub fn search(&self, text: &str) -> Vec<&ColumnDefinition> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return self.columns.iter().collect();
        }
        self.columns
            .iter()
            .filter(|column| {
                column.key.to_lowercase().contains(&needle)
                    || column.label.to_lowercase().contains(&needle)
            })
            .collect()
    }
}
