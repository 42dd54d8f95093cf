pub mod client;
pub mod endpoints;

pub use client::{EndpointResolver, SentimentService, DEFAULT_REQUEST_TIMEOUT};
pub use endpoints::{EndpointList, DEFAULT_ENDPOINTS, PRODUCTION_ENDPOINT};
