// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::columns::ColumnRegistry;
use crate::model::{ColumnDefinition, RelatedColumnSpec};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Tracks which schema-advertised joined columns a screen has selected.
///
/// The catalog of specs comes from a schema collaborator; selection state is
/// the registry itself, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelatedColumnManager {
    specs: Vec<RelatedColumnSpec>,
}

impl RelatedColumnManager {
    pub fn new(specs: impl IntoIterator<Item = RelatedColumnSpec>) -> Self {
        let mut specs = specs.into_iter().collect::<Vec<_>>();
        let mut seen = BTreeSet::new();
        specs.retain(|spec| seen.insert(spec.key.clone()));
        Self { specs }
    }

    pub fn specs(&self) -> &[RelatedColumnSpec] {
        &self.specs
    }

    pub fn spec(&self, key: &str) -> Option<&RelatedColumnSpec> {
        self.specs.iter().find(|spec| spec.key == key)
    }

    /// Specs not yet in `registry`, grouped by source table.
    pub fn available_grouped(
        &self,
        registry: &ColumnRegistry,
    ) -> BTreeMap<String, Vec<&RelatedColumnSpec>> {
        let mut grouped: BTreeMap<String, Vec<&RelatedColumnSpec>> = BTreeMap::new();
        for spec in self
            .specs
            .iter()
            .filter(|spec| !registry.contains(&spec.key))
        {
            grouped.entry(spec.table.clone()).or_default().push(spec);
        }
        grouped
    }

    /// Joined columns currently in `registry`.
    pub fn selected(registry: &ColumnRegistry) -> Vec<&ColumnDefinition> {
        registry.iter().filter(|column| column.is_joined()).collect()
    }

    /// Returns the grown registry, or `None` when `key` is already taken.
    pub fn add_related(
        &self,
        registry: &ColumnRegistry,
        key: &str,
        label: &str,
        table: &str,
    ) -> Option<ColumnRegistry> {
        if registry.contains(key) {
            return None;
        }
        let path = self
            .spec(key)
            .map(|spec| spec.path.as_str())
            .unwrap_or_default();
        info!(key, table, "added related column");
        Some(registry.add_column(ColumnDefinition::joined(key, label, table, path)))
    }

    /// Convenience over [`Self::add_related`] for a spec from the catalog.
    pub fn add_spec(&self, registry: &ColumnRegistry, key: &str) -> Option<ColumnRegistry> {
        let spec = self.spec(key)?;
        self.add_related(registry, &spec.key, &spec.label, &spec.table)
    }

    /// Returns the shrunk registry, or `None` when `key` is not a joined
    /// column. Native columns are never removed here.
    pub fn remove_related(&self, registry: &ColumnRegistry, key: &str) -> Option<ColumnRegistry> {
        let column = registry.get(key)?;
        if !column.is_joined() {
            return None;
        }
        info!(key, "removed related column");
        Some(registry.remove_column(key))
    }
}
