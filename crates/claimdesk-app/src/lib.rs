// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod catalog;
pub mod columns;
pub mod entities;
pub mod filter;
pub mod ids;
pub mod model;
pub mod page;
pub mod popup;
pub mod presets;
pub mod query;
pub mod related;
pub mod source;
pub mod state;

pub use catalog::*;
pub use columns::*;
pub use entities::*;
pub use filter::*;
pub use ids::*;
pub use model::*;
pub use page::*;
pub use popup::*;
pub use presets::*;
pub use query::*;
pub use related::*;
pub use source::*;
pub use state::*;
