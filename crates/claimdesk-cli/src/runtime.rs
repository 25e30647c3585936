// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use claimdesk_app::{
    DataSource, EntityKind, FetchError, QueryDescriptor, RelatedColumnSpec, RequestToken,
    ResultPage, SchemaService, ServerParam,
};
use claimdesk_client::{Client, HttpDataSource};
use claimdesk_tui::{BrowseRuntime, InternalEvent};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::debug;

/// Browse runtime backed by the REST client. Fetches run on their own
/// thread and report back over the TUI's event channel.
pub struct ClientRuntime {
    source: HttpDataSource,
}

impl ClientRuntime {
    pub fn new(client: Client, entity: EntityKind) -> Self {
        Self {
            source: HttpDataSource::new(client, entity),
        }
    }
}

impl<P: ServerParam> BrowseRuntime<P> for ClientRuntime {
    fn fetch_page(&mut self, query: &QueryDescriptor<P>) -> Result<ResultPage, FetchError> {
        self.source.fetch_page(query)
    }

    fn list_related_columns(&mut self, entity: EntityKind) -> Result<Vec<RelatedColumnSpec>> {
        SchemaService::list_related_columns(self.source.client(), entity.as_str())
    }

    fn spawn_fetch(
        &mut self,
        token: RequestToken,
        query: QueryDescriptor<P>,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let source = self.source.clone();
        thread::Builder::new()
            .name(format!("fetch-{token}"))
            .spawn(move || {
                let result = source.fetch_page(&query);
                if tx.send(InternalEvent::PageLoaded { token, result }).is_err() {
                    debug!(%token, "browse screen closed before page arrived");
                }
            })
            .context("spawn page fetch thread")?;
        Ok(())
    }
}
