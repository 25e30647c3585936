// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Translation of screen filter state into a server query.
//!
//! The builder is a pure function of the registry, the filter state, the
//! entity mapping table and the free-text input. Server parameter names are
//! typed per entity through [`ServerParam`], so a mapping table can only
//! name parameters its entity actually declares.

use crate::catalog::BLANK;
use crate::columns::ColumnRegistry;
use crate::filter::{FilterEntry, FilterState, numeric_tokens};
use crate::model::ColumnDefinition;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Wire names the descriptor itself owns; entity parameters must not reuse them.
pub const RESERVED_PARAMS: [&str; 4] = ["page", "pageSize", "searchText", "additionalColumns"];

/// One entity-specific server query parameter.
pub trait ServerParam: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    fn name(self) -> &'static str;
}

/// Declares a per-entity parameter enum and its wire names.
#[macro_export]
macro_rules! server_params {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];
        }

        impl $crate::query::ServerParam for $name {
            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl ParamValue {
    pub fn to_query_value(&self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Text(value) => value.clone(),
            Self::List(values) => values.join(","),
        }
    }
}

/// What a list parameter does when the selection ends up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyListPolicy {
    /// Leave the parameter out; the server returns the column unfiltered.
    #[default]
    Omit,
    /// Send an empty list, which the server reads as "match nothing".
    SendEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRule<P> {
    List { param: P, on_empty: EmptyListPolicy },
    Range { min: P, max: P },
    Text { param: P },
}

impl<P> ServerRule<P> {
    pub const fn list(param: P) -> Self {
        Self::List {
            param,
            on_empty: EmptyListPolicy::Omit,
        }
    }

    pub const fn list_or_empty(param: P) -> Self {
        Self::List {
            param,
            on_empty: EmptyListPolicy::SendEmpty,
        }
    }

    pub const fn range(min: P, max: P) -> Self {
        Self::Range { min, max }
    }

    pub const fn text(param: P) -> Self {
        Self::Text { param }
    }
}

/// Column key to server rule, supplied per entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable<P> {
    rules: BTreeMap<String, ServerRule<P>>,
}

impl<P> Default for MappingTable<P> {
    fn default() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }
}

impl<P: ServerParam> MappingTable<P> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, column: impl Into<String>, rule: ServerRule<P>) -> Self {
        self.rules.insert(column.into(), rule);
        self
    }

    pub fn rule(&self, column: &str) -> Option<&ServerRule<P>> {
        self.rules.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn params(&self) -> Vec<P> {
        let mut params = self
            .rules
            .values()
            .flat_map(|rule| match *rule {
                ServerRule::List { param, .. } | ServerRule::Text { param } => vec![param],
                ServerRule::Range { min, max } => vec![min, max],
            })
            .collect::<Vec<_>>();
        params.sort();
        params.dedup();
        params
    }
}

/// Transport-agnostic request for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor<P> {
    pub page: u32,
    pub page_size: u32,
    pub search_text: Option<String>,
    pub additional_columns: Vec<String>,
    pub server_params: BTreeMap<P, ParamValue>,
}

impl<P: ServerParam> QueryDescriptor<P> {
    pub fn param(&self, param: P) -> Option<&ParamValue> {
        self.server_params.get(&param)
    }

    /// Flat key/value pairs in a stable order: paging, search text, joined
    /// columns, then entity parameters sorted by declaration.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_owned(), self.page.to_string()),
            ("pageSize".to_owned(), self.page_size.to_string()),
        ];
        if let Some(search_text) = &self.search_text {
            pairs.push(("searchText".to_owned(), search_text.clone()));
        }
        if !self.additional_columns.is_empty() {
            pairs.push((
                "additionalColumns".to_owned(),
                self.additional_columns.join(","),
            ));
        }
        for (param, value) in &self.server_params {
            pairs.push((param.name().to_owned(), value.to_query_value()));
        }
        pairs
    }
}

impl<P: ServerParam> Serialize for QueryDescriptor<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("page", &self.page)?;
        map.serialize_entry("pageSize", &self.page_size)?;
        if let Some(search_text) = &self.search_text {
            map.serialize_entry("searchText", search_text)?;
        }
        if !self.additional_columns.is_empty() {
            map.serialize_entry("additionalColumns", &self.additional_columns)?;
        }
        for (param, value) in &self.server_params {
            map.serialize_entry(param.name(), value)?;
        }
        map.end()
    }
}

/// Why a query is being built. Filter and page-size changes restart at page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTrigger {
    Initial,
    FilterChanged,
    PageChanged,
    PageSizeChanged,
    ColumnsChanged,
    Refresh,
}

impl QueryTrigger {
    pub const fn resets_page(self) -> bool {
        matches!(self, Self::FilterChanged | Self::PageSizeChanged)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::FilterChanged => "filter",
            Self::PageChanged => "page",
            Self::PageSizeChanged => "page_size",
            Self::ColumnsChanged => "columns",
            Self::Refresh => "refresh",
        }
    }
}

pub struct QueryInputs<'a, P> {
    pub registry: &'a ColumnRegistry,
    pub filters: &'a FilterState,
    pub mappings: &'a MappingTable<P>,
    pub search_text: &'a str,
    pub page: u32,
    pub page_size: u32,
}

/// Active filter that the server will not enforce as the user sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGap {
    pub column: String,
    pub reason: GapReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapReason {
    /// Checkbox selection on a column the server cannot filter.
    NoServerMapping,
    /// Numeric selection without a range mapping.
    NoNumericMapping,
    /// None of the typed tokens parsed as numbers.
    NoNumericValues,
    /// Every value unchecked, and the mapping omits empty lists.
    EmptySelectionOmitted,
    /// `(Blank)` was checked but the server cannot match empty cells.
    BlankNotSent,
    /// Filter kind does not fit the column's rule.
    RuleMismatch,
}

impl GapReason {
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoServerMapping => "not filterable on the server",
            Self::NoNumericMapping => "no numeric range on the server",
            Self::NoNumericValues => "no numeric values entered",
            Self::EmptySelectionOmitted => "nothing selected; column left unfiltered",
            Self::BlankNotSent => "(Blank) cannot be sent to the server",
            Self::RuleMismatch => "filter kind not supported for this column",
        }
    }
}

enum Translation<P> {
    Params(Vec<(P, ParamValue)>),
    SearchToken(String),
    Gap(GapReason),
}

pub fn build_query<P: ServerParam>(
    inputs: &QueryInputs<'_, P>,
    trigger: QueryTrigger,
) -> QueryDescriptor<P> {
    let mut server_params = BTreeMap::new();
    let mut search_tokens = Vec::new();
    let global = inputs.search_text.trim();
    if !global.is_empty() {
        search_tokens.push(global.to_owned());
    }

    for (column, entry) in active_filters(inputs) {
        match translate(column, entry, inputs.mappings.rule(&column.key)) {
            Translation::Params(params) => server_params.extend(params),
            Translation::SearchToken(token) => search_tokens.push(token),
            Translation::Gap(_) => {}
        }
    }

    let search_text = search_tokens.join(" ");
    let descriptor = QueryDescriptor {
        page: if trigger.resets_page() {
            1
        } else {
            inputs.page.max(1)
        },
        page_size: inputs.page_size,
        search_text: (!search_text.is_empty()).then_some(search_text),
        additional_columns: inputs
            .registry
            .joined_keys()
            .into_iter()
            .map(str::to_owned)
            .collect(),
        server_params,
    };
    debug!(
        trigger = trigger.as_str(),
        page = descriptor.page,
        page_size = descriptor.page_size,
        params = descriptor.server_params.len(),
        joined = descriptor.additional_columns.len(),
        "built query"
    );
    descriptor
}

/// Active filters the built query cannot honor as displayed.
pub fn filter_gaps<P: ServerParam>(inputs: &QueryInputs<'_, P>) -> Vec<FilterGap> {
    let mut gaps = Vec::new();
    for (column, entry) in active_filters(inputs) {
        let rule = inputs.mappings.rule(&column.key);
        if let Translation::Gap(reason) = translate(column, entry, rule) {
            gaps.push(FilterGap {
                column: column.key.clone(),
                reason,
            });
        } else if let (FilterEntry::Categorical { selected }, Some(ServerRule::List { .. })) =
            (entry, rule)
            && selected.contains(BLANK)
        {
            gaps.push(FilterGap {
                column: column.key.clone(),
                reason: GapReason::BlankNotSent,
            });
        }
    }
    gaps
}

fn active_filters<'a, P>(
    inputs: &'a QueryInputs<'_, P>,
) -> impl Iterator<Item = (&'a ColumnDefinition, &'a FilterEntry)> {
    inputs
        .registry
        .iter()
        .filter_map(|column| inputs.filters.get(&column.key).map(|entry| (column, entry)))
}

fn translate<P: ServerParam>(
    column: &ColumnDefinition,
    entry: &FilterEntry,
    rule: Option<&ServerRule<P>>,
) -> Translation<P> {
    match (entry, rule) {
        (FilterEntry::Categorical { selected }, Some(&ServerRule::Range { min, max })) => {
            let values = numeric_tokens(selected);
            let low = values.iter().copied().reduce(f64::min);
            let high = values.iter().copied().reduce(f64::max);
            match (low, high) {
                (Some(low), Some(high)) => Translation::Params(vec![
                    (min, ParamValue::Number(low)),
                    (max, ParamValue::Number(high)),
                ]),
                _ => Translation::Gap(GapReason::NoNumericValues),
            }
        }
        (FilterEntry::Categorical { selected }, Some(&ServerRule::List { param, on_empty })) => {
            let values = selected
                .iter()
                .filter(|value| value.as_str() != BLANK)
                .cloned()
                .collect::<Vec<_>>();
            match (values.is_empty(), on_empty) {
                (false, _) => Translation::Params(vec![(param, ParamValue::List(values))]),
                (true, EmptyListPolicy::SendEmpty) => {
                    Translation::Params(vec![(param, ParamValue::List(Vec::new()))])
                }
                (true, EmptyListPolicy::Omit) => {
                    Translation::Gap(GapReason::EmptySelectionOmitted)
                }
            }
        }
        (FilterEntry::Categorical { .. }, _) if column.data_type.is_numeric() => {
            Translation::Gap(GapReason::NoNumericMapping)
        }
        (FilterEntry::Categorical { .. }, Some(ServerRule::Text { .. })) => {
            Translation::Gap(GapReason::RuleMismatch)
        }
        (FilterEntry::Categorical { .. }, None) => Translation::Gap(GapReason::NoServerMapping),
        (FilterEntry::NumericRange { min: low, max: high }, Some(&ServerRule::Range { min, max })) => {
            Translation::Params(vec![
                (min, ParamValue::Number(*low)),
                (max, ParamValue::Number(*high)),
            ])
        }
        (FilterEntry::NumericRange { .. }, None) => Translation::Gap(GapReason::NoNumericMapping),
        (FilterEntry::NumericRange { .. }, Some(_)) => Translation::Gap(GapReason::RuleMismatch),
        (FilterEntry::Text { substring }, Some(&ServerRule::Text { param })) => {
            Translation::Params(vec![(param, ParamValue::Text(substring.trim().to_owned()))])
        }
        (FilterEntry::Text { substring }, _) => {
            Translation::SearchToken(substring.trim().to_owned())
        }
    }
}
