pub mod fetcher;
pub mod metrics;
pub mod query;
pub mod service;
pub mod transport;

pub use fetcher::{BatchFetcher, ItemFetcher, SharedFetcher, BATCH_SIZE};
pub use query::{QueryTemplate, ServerVersion};
pub use service::{EnrichReport, IssueEnricher};
pub use transport::{GithubApiError, GraphqlTransport, HttpGraphqlTransport};
