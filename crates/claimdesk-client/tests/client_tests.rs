// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use claimdesk_app::{
    BrowseCommand, BrowseEvent, BrowseScreen, ClaimParam, DataSource, EntityKind, EntityParams,
    FetchError, FilterEntry, ResponseOutcome, SchemaService,
};
use claimdesk_client::{Client, HttpDataSource};
use claimdesk_testkit::{ClaimFaker, claim_related_columns};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

fn json_response(body: String, status: u16) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

#[test]
fn unreachable_server_error_is_actionable() {
    let client = Client::new("http://127.0.0.1:1/api", Duration::from_millis(50))
        .expect("client should initialize");
    let source = HttpDataSource::new(client, EntityKind::Claims);
    let query = BrowseScreen::new(ClaimParam::preset(), 25).query();

    let error = source
        .fetch_page(&query)
        .expect_err("fetch should fail for unreachable endpoint");
    match error {
        FetchError::Failed { message } => {
            assert!(message.contains("[server].base_url") || message.contains("[server].timeout"));
        }
        FetchError::Aborted => panic!("unreachable server is a failure, not an abort"),
    }
}

#[test]
fn screen_reload_round_trips_through_mock_server() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());

    let rows = ClaimFaker::new(4).claim_rows(100, 3);
    let body = serde_json::json!({
        "data": rows,
        "meta": {"page": 1, "pageSize": 25, "totalCount": 3},
    })
    .to_string();

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let url = request.url().to_owned();
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
        url
    });

    let client = Client::new(&addr, Duration::from_secs(2))?;
    let source = HttpDataSource::new(client, EntityKind::Claims);
    let mut screen = BrowseScreen::new(ClaimParam::preset(), 25);
    screen.dispatch(BrowseCommand::SetFilter {
        column: "claID".to_owned(),
        change: FilterEntry::categorical(["100", "105"]).into(),
    });
    let events = screen.dispatch(BrowseCommand::Reload);
    let request = events
        .into_iter()
        .find_map(|event| match event {
            BrowseEvent::ReloadRequested(request) => Some(request),
            _ => None,
        })
        .ok_or_else(|| anyhow!("reload should be requested"))?;

    let result = source.fetch_page(&request.query);
    assert_eq!(
        screen.receive(request.token, result),
        ResponseOutcome::Applied
    );
    assert_eq!(screen.pages().rows().len(), 3);

    let url = handle
        .join()
        .map_err(|_| anyhow!("server thread should join"))?;
    assert!(url.starts_with("/api/claims?page=1&pageSize=25"), "{url}");
    assert!(url.contains("minClaimId=100"), "{url}");
    assert!(url.contains("maxClaimId=105"), "{url}");
    Ok(())
}

#[test]
fn server_error_body_becomes_failure_message() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let body = r#"{"error":{"message":"statusList contains unknown value"}}"#.to_owned();
        request
            .respond(json_response(body, 400))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(2))?;
    let query = BrowseScreen::new(ClaimParam::preset(), 25).query();
    let error = client
        .fetch_page(EntityKind::Claims, &query)
        .expect_err("400 should fail");
    assert_eq!(
        error,
        FetchError::failed("server error (400): statusList contains unknown value")
    );

    handle
        .join()
        .map_err(|_| anyhow!("server thread should join"))?;
    Ok(())
}

#[test]
fn malformed_page_is_a_decode_failure() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(r#"{"rows":[]}"#.to_owned(), 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(2))?;
    let query = BrowseScreen::new(ClaimParam::preset(), 25).query();
    match client.fetch_page(EntityKind::Claims, &query) {
        Err(FetchError::Failed { message }) => assert!(message.starts_with("decode claims page")),
        other => panic!("expected decode failure, got {other:?}"),
    }

    handle
        .join()
        .map_err(|_| anyhow!("server thread should join"))?;
    Ok(())
}

#[test]
fn related_columns_load_from_schema_endpoint() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());
    let body = serde_json::to_string(&claim_related_columns())?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/schema/claims/related-columns");
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(2))?;
    let specs = SchemaService::list_related_columns(&client, "claims")?;
    assert_eq!(specs, claim_related_columns());

    handle
        .join()
        .map_err(|_| anyhow!("server thread should join"))?;
    Ok(())
}
