// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use claimdesk_app::{
    BrowseCommand, BrowseEvent, BrowseScreen, ClaimParam, DataSource, EntityParams, FetchError,
    FilterEntry, GapReason, LoadState, ParamValue, PopupCommand, ResponseOutcome, SchemaService,
};
use claimdesk_testkit::{ClaimFaker, RecordingSource, StaticSchema, claim_related_columns};

/// Runs every requested reload through `source` and hands the results back.
fn drive(
    screen: &mut BrowseScreen<ClaimParam>,
    source: &RecordingSource<ClaimParam>,
    events: Vec<BrowseEvent<ClaimParam>>,
) -> Vec<ResponseOutcome> {
    events
        .into_iter()
        .filter_map(|event| match event {
            BrowseEvent::ReloadRequested(request) => Some(request),
            _ => None,
        })
        .map(|request| {
            let result = source.fetch_page(&request.query);
            screen.receive(request.token, result)
        })
        .collect()
}

fn loaded_screen(source: &RecordingSource<ClaimParam>) -> BrowseScreen<ClaimParam> {
    let mut screen = BrowseScreen::new(ClaimParam::preset(), 25);
    let events = screen.dispatch(BrowseCommand::Load);
    assert_eq!(drive(&mut screen, source, events), vec![ResponseOutcome::Applied]);
    screen
}

#[test]
fn claims_scenario_translates_each_filter_kind() {
    let source = RecordingSource::new(ClaimFaker::new(11).claim_rows(100, 60));
    let mut screen = loaded_screen(&source);

    // Numbers typed into the claim id filter collapse to a range.
    screen.dispatch(BrowseCommand::OpenFilter("claID".to_owned()));
    screen.dispatch(BrowseCommand::Popup(PopupCommand::SetText(
        "100, 101, 105".to_owned(),
    )));
    let events = screen.dispatch(BrowseCommand::Popup(PopupCommand::Apply));
    drive(&mut screen, &source, events);
    let query = source.last_query().expect("query should be recorded");
    assert_eq!(query.param(ClaimParam::MinClaimId), Some(&ParamValue::Number(100.0)));
    assert_eq!(query.param(ClaimParam::MaxClaimId), Some(&ParamValue::Number(105.0)));

    // Unchecking one status sends the remaining ones.
    let statuses = screen
        .catalog("claStatus")
        .expect("status column exists")
        .values()
        .to_vec();
    screen.dispatch(BrowseCommand::OpenFilter("claStatus".to_owned()));
    screen.dispatch(BrowseCommand::Popup(PopupCommand::Toggle(statuses[0].clone())));
    let events = screen.dispatch(BrowseCommand::Popup(PopupCommand::Apply));
    drive(&mut screen, &source, events);
    let query = source.last_query().expect("query should be recorded");
    let expected = statuses[1..].to_vec();
    let mut sent = match query.param(ClaimParam::StatusList) {
        Some(ParamValue::List(values)) => values.clone(),
        other => panic!("expected status list, got {other:?}"),
    };
    sent.sort();
    let mut expected_sorted = expected;
    expected_sorted.sort();
    assert_eq!(sent, expected_sorted);

    // Unchecking every classification reaches the server as nothing at all.
    screen.dispatch(BrowseCommand::OpenFilter("claClassification".to_owned()));
    screen.dispatch(BrowseCommand::Popup(PopupCommand::SelectNone));
    let events = screen.dispatch(BrowseCommand::Popup(PopupCommand::Apply));
    drive(&mut screen, &source, events);
    let query = source.last_query().expect("query should be recorded");
    assert_eq!(query.server_params.len(), 3);
    assert!(
        query
            .to_query_pairs()
            .iter()
            .all(|(name, _)| !name.to_ascii_lowercase().contains("classification"))
    );
    assert_eq!(query.search_text, None);
    assert!(
        screen
            .gaps()
            .iter()
            .any(|gap| gap.column == "claClassification" && gap.reason == GapReason::NoServerMapping)
    );
}

#[test]
fn related_column_round_trip_updates_requested_shape() {
    let source = RecordingSource::new(ClaimFaker::new(3).claim_rows(1, 10));
    let schema = StaticSchema {
        specs: claim_related_columns(),
    };
    let mut screen = loaded_screen(&source);
    screen.set_related_catalog(
        schema
            .list_related_columns(screen.entity().as_str())
            .expect("catalog should load"),
    );
    let visible_before = screen
        .registry()
        .visible_columns()
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();

    let spec = screen
        .related()
        .spec("patName")
        .cloned()
        .expect("patient name should be advertised");
    let events = screen.dispatch(BrowseCommand::AddRelated {
        key: spec.key.clone(),
        label: spec.label.clone(),
        table: spec.table.clone(),
    });
    drive(&mut screen, &source, events);
    assert_eq!(
        source.last_query().map(|query| query.additional_columns),
        Some(vec!["patName".to_owned()])
    );
    let catalog = screen.catalog("patName").expect("joined column exists");
    assert!(!catalog.is_empty());
    assert!(!catalog.contains(claimdesk_app::BLANK));

    let events = screen.dispatch(BrowseCommand::RemoveRelated("patName".to_owned()));
    drive(&mut screen, &source, events);
    assert_eq!(
        source.last_query().map(|query| query.additional_columns),
        Some(Vec::new())
    );
    let visible_after = screen
        .registry()
        .visible_columns()
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(visible_before, visible_after);
}

#[test]
fn failed_reload_keeps_rows_and_next_success_recovers() {
    let source = RecordingSource::new(ClaimFaker::new(5).claim_rows(1, 30));
    let mut screen = loaded_screen(&source);
    assert_eq!(screen.pages().rows().len(), 25);

    source.fail_next(FetchError::failed("server returned 503"));
    let events = screen.dispatch(BrowseCommand::NextPage);
    assert_eq!(drive(&mut screen, &source, events), vec![ResponseOutcome::Failed]);
    assert_eq!(screen.pages().rows().len(), 25);
    assert_eq!(
        screen.pages().state(),
        &LoadState::Failed("server returned 503".to_owned())
    );

    let events = screen.dispatch(BrowseCommand::Reload);
    assert_eq!(drive(&mut screen, &source, events), vec![ResponseOutcome::Applied]);
    assert_eq!(screen.pages().rows().len(), 5);
    assert_eq!(screen.status_line(), None);
}

#[test]
fn superseded_filter_response_is_discarded() {
    let source = RecordingSource::new(ClaimFaker::new(9).claim_rows(1, 40));
    let mut screen = loaded_screen(&source);

    let first = screen.dispatch(BrowseCommand::SetFilter {
        column: "claPatientName".to_owned(),
        change: FilterEntry::text("walker").into(),
    });
    let second = screen.dispatch(BrowseCommand::SetPageSize(10));

    assert_eq!(drive(&mut screen, &source, second), vec![ResponseOutcome::Applied]);
    assert_eq!(drive(&mut screen, &source, first), vec![ResponseOutcome::Stale]);
    assert_eq!(screen.pages().rows().len(), 10);
    assert_eq!(screen.pages().page_size(), 10);
}

#[test]
fn aborted_request_leaves_screen_loading_and_disposal_drops_late_results() {
    let source = RecordingSource::new(ClaimFaker::new(2).claim_rows(1, 5));
    let mut screen = loaded_screen(&source);

    source.fail_next(FetchError::Aborted);
    let events = screen.dispatch(BrowseCommand::Reload);
    assert_eq!(drive(&mut screen, &source, events), vec![ResponseOutcome::Aborted]);
    assert!(screen.pages().is_loading());
    assert_eq!(screen.status_line(), None);

    let pending = screen.dispatch(BrowseCommand::Reload);
    screen.dispose();
    assert_eq!(drive(&mut screen, &source, pending), vec![ResponseOutcome::Disposed]);
    assert!(screen.dispatch(BrowseCommand::NextPage).is_empty());
}

#[test]
fn typed_ids_matching_the_loaded_page_still_send_a_range() {
    let source = RecordingSource::new(ClaimFaker::new(5).claim_rows(100, 1));
    let mut screen = loaded_screen(&source);

    screen.dispatch(BrowseCommand::OpenFilter("claID".to_owned()));
    screen.dispatch(BrowseCommand::Popup(PopupCommand::SetText("100".to_owned())));
    let events = screen.dispatch(BrowseCommand::Popup(PopupCommand::Apply));
    assert!(
        events
            .iter()
            .any(|event| matches!(event, BrowseEvent::ReloadRequested(_)))
    );
    assert_eq!(drive(&mut screen, &source, events), vec![ResponseOutcome::Applied]);
    let query = source.last_query().expect("query should be recorded");
    assert_eq!(query.param(ClaimParam::MinClaimId), Some(&ParamValue::Number(100.0)));
    assert_eq!(query.param(ClaimParam::MaxClaimId), Some(&ParamValue::Number(100.0)));

    let source = RecordingSource::new(ClaimFaker::new(5).claim_rows(100, 3));
    let mut screen = loaded_screen(&source);
    let events = screen.dispatch(BrowseCommand::SetFilter {
        column: "claID".to_owned(),
        change: FilterEntry::categorical(["100", "101", "102"]).into(),
    });
    assert_eq!(drive(&mut screen, &source, events), vec![ResponseOutcome::Applied]);
    assert!(screen.filters().is_filtered("claID"));
    let query = source.last_query().expect("query should be recorded");
    assert_eq!(query.param(ClaimParam::MinClaimId), Some(&ParamValue::Number(100.0)));
    assert_eq!(query.param(ClaimParam::MaxClaimId), Some(&ParamValue::Number(102.0)));
}

#[test]
fn checking_every_status_on_the_page_still_clears_the_filter() {
    let source = RecordingSource::new(ClaimFaker::new(5).claim_rows(100, 20));
    let mut screen = loaded_screen(&source);
    let statuses = screen
        .catalog("claStatus")
        .expect("status column exists")
        .values()
        .to_vec();

    let events = screen.dispatch(BrowseCommand::SetFilter {
        column: "claStatus".to_owned(),
        change: FilterEntry::categorical(statuses).into(),
    });
    assert!(events.is_empty());
    assert!(!screen.filters().is_filtered("claStatus"));
}
