// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::{RelatedColumnSpec, ResultPage};
use crate::query::{QueryDescriptor, ServerParam};
use anyhow::Result;
use thiserror::Error;

/// Why a page fetch produced no rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request was abandoned before completing; never shown to the user.
    #[error("request aborted")]
    Aborted,
    #[error("{message}")]
    Failed { message: String },
}

impl FetchError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Fetches one page of an entity for a built query.
pub trait DataSource<P: ServerParam> {
    fn fetch_page(&self, query: &QueryDescriptor<P>) -> Result<ResultPage, FetchError>;
}

/// Lists the joined columns an entity can request.
pub trait SchemaService {
    fn list_related_columns(&self, entity: &str) -> Result<Vec<RelatedColumnSpec>>;
}

impl<P: ServerParam, T: DataSource<P> + ?Sized> DataSource<P> for &T {
    fn fetch_page(&self, query: &QueryDescriptor<P>) -> Result<ResultPage, FetchError> {
        (**self).fetch_page(query)
    }
}

impl<T: SchemaService + ?Sized> SchemaService for &T {
    fn list_related_columns(&self, entity: &str) -> Result<Vec<RelatedColumnSpec>> {
        (**self).list_related_columns(entity)
    }
}
