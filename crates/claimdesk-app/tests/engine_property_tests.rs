// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use claimdesk_app::{
    BLANK, ClaimParam, ColumnDefinition, ColumnRegistry, DataType, EntityParams, FilterEntry,
    FilterState, PageController, PageMeta, ParamValue, QueryInputs, QueryTrigger, ResponseOutcome,
    ResultPage, Row, ValueCatalog, build_query, compare_values, natural_cmp,
};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::cmp::Ordering;

fn claims_registry() -> ColumnRegistry {
    ColumnRegistry::new(ClaimParam::preset().columns)
}

fn query_for(
    registry: &ColumnRegistry,
    filters: &FilterState,
    page: u32,
    page_size: u32,
    trigger: QueryTrigger,
) -> claimdesk_app::QueryDescriptor<ClaimParam> {
    let mappings = ClaimParam::preset().mappings;
    build_query(
        &QueryInputs {
            registry,
            filters,
            mappings: &mappings,
            search_text: "",
            page,
            page_size,
        },
        trigger,
    )
}

fn rows_with(key: &str, values: &[Option<String>]) -> Vec<Row> {
    values
        .iter()
        .map(|value| {
            let cell = value.as_ref().map_or(Value::Null, |text| json!(text));
            serde_json::from_value(json!({ key: cell })).expect("row")
        })
        .collect()
}

fn status_value() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Open".to_owned()),
        Just("Pending".to_owned()),
        Just("Denied".to_owned()),
        Just("Paid".to_owned()),
        Just("claim 9".to_owned()),
        Just("claim 10".to_owned()),
        Just("  ".to_owned()),
    ]
}

fn numeric_column_cell() -> impl Strategy<Value = String> {
    prop_oneof![
        (-500i64..500).prop_map(|value| value.to_string()),
        (-50_000i64..50_000).prop_map(|cents| format!("{:.2}", cents as f64 / 100.0)),
        "-?[0-9]{1,3}(\\.[0-9]{1,2})?[a-z ]{1,5}[A-Z]{0,3}",
        "[a-z]{1,4}",
        Just("  ".to_owned()),
    ]
}

proptest! {
    #[test]
    fn selecting_every_value_equals_no_filter(
        column in prop_oneof![Just("claStatus"), Just("claClassification"), Just("claPatientName")],
        values in prop::collection::vec(status_value(), 1..20),
    ) {
        let registry = claims_registry();
        let catalog = ValueCatalog::from_values(values, DataType::String);
        let mut filtered = FilterState::new();
        filtered.apply_categorical(column, catalog.to_set(), &catalog);

        let unfiltered = FilterState::new();
        prop_assert_eq!(
            query_for(&registry, &filtered, 2, 25, QueryTrigger::FilterChanged),
            query_for(&registry, &unfiltered, 2, 25, QueryTrigger::FilterChanged)
        );
    }

    #[test]
    fn numeric_selection_collapses_to_enclosing_range(
        ids in prop::collection::vec(-5_000i64..5_000, 1..8),
        noise in prop::collection::vec("[a-z]{1,4}", 0..3),
    ) {
        let registry = claims_registry();
        let mut filters = FilterState::new();
        let tokens = ids
            .iter()
            .map(ToString::to_string)
            .chain(noise)
            .collect::<Vec<_>>();
        filters.apply("claID", FilterEntry::categorical(tokens));

        let query = query_for(&registry, &filters, 1, 25, QueryTrigger::FilterChanged);
        let low = *ids.iter().min().expect("non-empty") as f64;
        let high = *ids.iter().max().expect("non-empty") as f64;
        prop_assert_eq!(query.param(ClaimParam::MinClaimId), Some(&ParamValue::Number(low)));
        prop_assert_eq!(query.param(ClaimParam::MaxClaimId), Some(&ParamValue::Number(high)));
    }

    #[test]
    fn building_twice_is_byte_identical(
        statuses in prop::collection::btree_set(status_value(), 0..5),
        search in "[a-z ]{0,12}",
        page in 1u32..50,
    ) {
        let registry = claims_registry();
        let mut filters = FilterState::new();
        filters.apply("claStatus", FilterEntry::Categorical { selected: statuses });
        filters.apply("claClassification", FilterEntry::text(search));

        let first = query_for(&registry, &filters, page, 25, QueryTrigger::PageChanged);
        let second = query_for(&registry, &filters, page, 25, QueryTrigger::PageChanged);
        prop_assert_eq!(
            serde_json::to_vec(&first).expect("json"),
            serde_json::to_vec(&second).expect("json")
        );
        prop_assert_eq!(first.to_query_pairs(), second.to_query_pairs());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn catalog_is_strictly_sorted_and_bounded(
        values in prop::collection::vec(prop::option::of(status_value()), 0..30),
    ) {
        let rows = rows_with("claStatus", &values);
        let column = ColumnDefinition::native("claStatus", "Status", DataType::String);
        let catalog = ValueCatalog::from_rows(&rows, &column);

        prop_assert!(catalog.len() <= rows.len());
        for pair in catalog.values().windows(2) {
            prop_assert_eq!(natural_cmp(&pair[0], &pair[1]), Ordering::Less);
        }
        let has_blank_cell = values
            .iter()
            .any(|value| value.as_deref().is_none_or(|text| text.trim().is_empty()));
        prop_assert_eq!(catalog.contains(BLANK), has_blank_cell);
        prop_assert!(catalog.values().iter().all(|value| !value.trim().is_empty()));
    }

    #[test]
    fn numeric_catalog_order_is_total_over_mixed_cells(
        data_type in prop_oneof![Just(DataType::Number), Just(DataType::Currency)],
        values in prop::collection::vec(prop::option::of(numeric_column_cell()), 0..60),
    ) {
        let rows = rows_with("claBilledAmount", &values);
        let column = ColumnDefinition::native("claBilledAmount", "Billed", data_type);
        let catalog = ValueCatalog::from_rows(&rows, &column);

        prop_assert!(catalog.len() <= rows.len());
        for pair in catalog.values().windows(2) {
            prop_assert_eq!(compare_values(data_type, &pair[0], &pair[1]), Ordering::Less);
        }
        for left in catalog.values() {
            for right in catalog.values() {
                prop_assert_eq!(
                    compare_values(data_type, left, right),
                    compare_values(data_type, right, left).reverse()
                );
            }
        }
        let first_text = catalog
            .values()
            .iter()
            .position(|value| value != BLANK && value.parse::<f64>().is_err())
            .unwrap_or(catalog.len());
        prop_assert!(
            catalog.values()[first_text..]
                .iter()
                .all(|value| value.parse::<f64>().is_err())
        );
    }

    #[test]
    fn add_then_remove_joined_column_restores_registry(
        key in "rel[A-Z][a-z]{2,6}",
        hidden in prop::collection::btree_set(0usize..7, 0..3),
    ) {
        let mut registry = claims_registry();
        for index in hidden {
            let key = registry.iter().nth(index).map(|column| column.key.clone());
            if let Some(key) = key {
                registry = registry.set_visible(&key, false);
            }
        }
        let before = registry.visible_columns().into_iter().cloned().collect::<Vec<_>>();

        let added = registry.add_column(ColumnDefinition::joined(key.as_str(), "Joined", "other", ""));
        let removed = added.remove_column(&key);
        let after = removed.visible_columns().into_iter().cloned().collect::<Vec<_>>();
        prop_assert_eq!(before, after);

        let query = query_for(&removed, &FilterState::new(), 1, 25, QueryTrigger::ColumnsChanged);
        prop_assert!(!query.additional_columns.contains(&key));
    }

    #[test]
    fn page_size_change_always_restarts_at_page_one(
        page in 1u32..500,
        page_size in 1u32..=500,
    ) {
        let mut controller = PageController::new(25);
        controller.set_page(page);
        controller.set_page_size(page_size);
        prop_assert_eq!(controller.page(), 1);

        let registry = claims_registry();
        let query = query_for(&registry, &FilterState::new(), page, page_size, QueryTrigger::PageSizeChanged);
        prop_assert_eq!(query.page, 1);
        prop_assert_eq!(query.page_size, page_size);
    }

    #[test]
    fn late_response_never_overwrites_newer_one(extra in 1usize..5) {
        let mut controller = PageController::default();
        let tokens = (0..=extra).map(|_| controller.begin()).collect::<Vec<_>>();
        let latest = *tokens.last().expect("at least one token");

        let page = |id: usize| ResultPage {
            rows: rows_with("claID", &[Some(id.to_string())]),
            meta: PageMeta { page: 1, page_size: 25, total_count: 1 },
        };
        prop_assert_eq!(controller.complete(latest, Ok(page(999))), ResponseOutcome::Applied);
        for (index, token) in tokens.iter().take(extra).enumerate() {
            prop_assert_eq!(controller.complete(*token, Ok(page(index))), ResponseOutcome::Stale);
        }
        prop_assert_eq!(&controller.rows()[0].fields["claID"], &json!("999"));
    }
}
