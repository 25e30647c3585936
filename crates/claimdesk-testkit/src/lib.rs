// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use claimdesk_app::{
    DataSource, FetchError, PageMeta, QueryDescriptor, RelatedColumnSpec, ResultPage, Row,
    SchemaService, ServerParam,
};
use serde_json::{Map, Value, json};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use time::{Date, Duration, Month, OffsetDateTime, Time};

const CLAIM_STATUSES: [&str; 5] = ["Open", "Pending", "Denied", "Paid", "Appealed"];

const CLASSIFICATIONS: [&str; 4] = ["Inpatient", "Outpatient", "Emergency", ""];

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];

const PAYERS: [&str; 6] = [
    "Blue Summit Health",
    "Heritage Mutual",
    "Apex Care",
    "Greenleaf Benefits",
    "Medicare",
    "Self-pay",
];

const REFERENCE_YEAR: i32 = 2025;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Deterministic claim rows shaped like the claims endpoint returns them.
#[derive(Debug, Clone)]
pub struct ClaimFaker {
    rng: DeterministicRng,
}

impl ClaimFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn claim_row(&mut self, claim_id: u64) -> Row {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let status = self.pick(&CLAIM_STATUSES);
        let classification = self.pick(&CLASSIFICATIONS);
        let cents = 2_500 + self.rng.int_n(500_000) as u64;
        let service_day = self.rng.int_n(365) as i64;
        let payer = self.pick(&PAYERS);

        let mut fields = Map::new();
        fields.insert("claID".to_owned(), json!(claim_id));
        fields.insert("claStatus".to_owned(), json!(status));
        fields.insert(
            "claClassification".to_owned(),
            if classification.is_empty() {
                Value::Null
            } else {
                json!(classification)
            },
        );
        fields.insert("claPatientName".to_owned(), json!(format!("{last}, {first}")));
        fields.insert(
            "claDateOfService".to_owned(),
            json!(format_datetime(reference_start() + Duration::days(service_day))),
        );
        fields.insert("claBilledAmount".to_owned(), json!(cents as f64 / 100.0));

        let mut additional_columns = Map::new();
        additional_columns.insert("patName".to_owned(), json!(format!("{first} {last}")));
        additional_columns.insert("pyrName".to_owned(), json!(payer));

        Row {
            additional_columns,
            fields,
        }
    }

    /// Rows with consecutive ids starting at `first_id`.
    pub fn claim_rows(&mut self, first_id: u64, count: usize) -> Vec<Row> {
        (0..count as u64)
            .map(|offset| self.claim_row(first_id + offset))
            .collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

/// Joined columns the claims schema advertises.
pub fn claim_related_columns() -> Vec<RelatedColumnSpec> {
    [
        ("patients", "patName", "Patient name", "claims.patID -> patients.patID"),
        ("patients", "patDateOfBirth", "Patient birth date", "claims.patID -> patients.patID"),
        ("payers", "pyrName", "Payer", "claims.pyrID -> payers.pyrID"),
        ("payers", "pyrType", "Payer type", "claims.pyrID -> payers.pyrID"),
        ("physicians", "phyLastName", "Rendering physician", "claims.phyID -> physicians.phyID"),
    ]
    .into_iter()
    .map(|(table, key, label, path)| RelatedColumnSpec {
        table: table.to_owned(),
        key: key.to_owned(),
        label: label.to_owned(),
        path: path.to_owned(),
    })
    .collect()
}

pub fn claim_statuses() -> &'static [&'static str] {
    &CLAIM_STATUSES
}

/// In-memory data source that records every query it is asked for and
/// pages through a fixed row set. Queued failures are returned first.
#[derive(Debug)]
pub struct RecordingSource<P> {
    rows: Vec<Row>,
    queries: RefCell<Vec<QueryDescriptor<P>>>,
    failures: RefCell<VecDeque<FetchError>>,
}

impl<P: ServerParam> RecordingSource<P> {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            queries: RefCell::new(Vec::new()),
            failures: RefCell::new(VecDeque::new()),
        }
    }

    pub fn fail_next(&self, error: FetchError) {
        self.failures.borrow_mut().push_back(error);
    }

    pub fn queries(&self) -> Vec<QueryDescriptor<P>> {
        self.queries.borrow().clone()
    }

    pub fn last_query(&self) -> Option<QueryDescriptor<P>> {
        self.queries.borrow().last().cloned()
    }
}

impl<P: ServerParam> DataSource<P> for RecordingSource<P> {
    fn fetch_page(&self, query: &QueryDescriptor<P>) -> Result<ResultPage, FetchError> {
        self.queries.borrow_mut().push(query.clone());
        if let Some(error) = self.failures.borrow_mut().pop_front() {
            return Err(error);
        }
        let page_size = query.page_size.max(1) as usize;
        let start = (query.page.max(1) as usize - 1).saturating_mul(page_size);
        let rows = self
            .rows
            .iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect();
        Ok(ResultPage {
            rows,
            meta: PageMeta {
                page: query.page,
                page_size: query.page_size,
                total_count: self.rows.len() as u64,
            },
        })
    }
}

/// Schema service answering from a fixed catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    pub specs: Vec<RelatedColumnSpec>,
}

impl SchemaService for StaticSchema {
    fn list_related_columns(&self, _entity: &str) -> Result<Vec<RelatedColumnSpec>> {
        Ok(self.specs.clone())
    }
}

pub fn temp_config_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let config_path = dir.path().join("config.toml");
    Ok((dir, config_path))
}

pub fn fixture_datetime() -> &'static str {
    "2025-03-05T10:15:00Z"
}

fn reference_start() -> OffsetDateTime {
    let date = Date::from_calendar_date(REFERENCE_YEAR, Month::January, 1)
        .expect("valid calendar date");
    date.with_time(Time::MIDNIGHT).assume_utc()
}

fn format_datetime(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).expect("rfc3339 formatting")
}
