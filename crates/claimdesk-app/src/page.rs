// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ids::RequestToken;
use crate::model::{PageMeta, ResultPage, Row};
use crate::source::FetchError;
use tracing::{debug, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading(RequestToken),
    Loaded,
    Failed(String),
}

/// What happened to a response handed to [`PageController::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    Applied,
    Failed,
    /// Superseded by a later request; dropped without a trace.
    Stale,
    /// Transport gave up; state stays `Loading`.
    Aborted,
    /// Screen already torn down.
    Disposed,
}

/// Paging position, the latest loaded rows, and request sequencing.
#[derive(Debug, Clone, PartialEq)]
pub struct PageController {
    page: u32,
    page_size: u32,
    rows: Vec<Row>,
    meta: Option<PageMeta>,
    state: LoadState,
    last_token: RequestToken,
    disposed: bool,
}

impl Default for PageController {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageController {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            rows: Vec::new(),
            meta: None,
            state: LoadState::Idle,
            last_token: RequestToken::new(0),
            disposed: false,
        }
    }

    pub const fn page(&self) -> u32 {
        self.page
    }

    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub const fn meta(&self) -> Option<PageMeta> {
        self.meta
    }

    pub const fn state(&self) -> &LoadState {
        &self.state
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading(_))
    }

    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub const fn latest_token(&self) -> RequestToken {
        self.last_token
    }

    /// Total pages per the last loaded meta; 1 before anything loaded.
    pub fn total_pages(&self) -> u32 {
        self.meta.map_or(1, |meta| meta.total_pages())
    }

    /// Moves to `page`, clamped to at least 1. Returns whether it changed.
    pub fn set_page(&mut self, page: u32) -> bool {
        let page = page.max(1);
        let changed = self.page != page;
        self.page = page;
        changed
    }

    /// Changes the page size and resets to the first page.
    pub fn set_page_size(&mut self, page_size: u32) -> bool {
        let page_size = page_size.max(1);
        let changed = self.page_size != page_size || self.page != 1;
        self.page_size = page_size;
        self.page = 1;
        changed
    }

    pub fn next_page(&mut self) -> bool {
        if self.page >= self.total_pages() {
            return false;
        }
        self.set_page(self.page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }
        self.set_page(self.page - 1)
    }

    /// Mints the token for a new request and enters `Loading`.
    pub fn begin(&mut self) -> RequestToken {
        self.last_token = self.last_token.next();
        self.state = LoadState::Loading(self.last_token);
        debug!(token = %self.last_token, page = self.page, "issued page request");
        self.last_token
    }

    /// Applies a response if `token` is the latest one issued.
    pub fn complete(
        &mut self,
        token: RequestToken,
        result: Result<ResultPage, FetchError>,
    ) -> ResponseOutcome {
        if self.disposed {
            debug!(token = %token, "dropped response for disposed screen");
            return ResponseOutcome::Disposed;
        }
        if token != self.last_token || !self.is_loading() {
            debug!(token = %token, latest = %self.last_token, "dropped stale response");
            return ResponseOutcome::Stale;
        }
        match result {
            Ok(page) => {
                if page.meta.page >= 1 {
                    self.page = page.meta.page;
                }
                self.rows = page.rows;
                self.meta = Some(page.meta);
                self.state = LoadState::Loaded;
                ResponseOutcome::Applied
            }
            Err(FetchError::Aborted) => {
                debug!(token = %token, "request aborted");
                ResponseOutcome::Aborted
            }
            Err(FetchError::Failed { message }) => {
                warn!(token = %token, error = %message, "page load failed");
                self.state = LoadState::Failed(message);
                ResponseOutcome::Failed
            }
        }
    }

    /// Tears down; nothing mutates the controller afterwards.
    pub fn dispose(&mut self) {
        self.disposed = true;
    }
}
