//! Client side of the real-time weather API

pub mod dispatch;
pub mod endpoints;
pub mod pagination;
pub mod session;
pub mod types;

pub use dispatch::{dispatch, fetch_parameter, Parameter, Route};
pub use pagination::{PageMerger, PageOutcome, PaginatedFetcher, PaginationState, RetryPolicy};
pub use session::{with_session, IngestionSession};
pub use types::ApiEnvelope;
