//! Upstream-request mediation for the cwquery harness.
//!
//! Everything between a validated caller request and the exchange lives
//! here: the mutual-TLS transport, the single-attempt request executor with
//! its hard timeout, response normalization (JSON, raw-text fallback,
//! Binary envelopes), the destination allow-list guard, and the pure
//! builders for query URLs and patient registration documents.

pub mod audit;
pub mod error;
pub mod executor;
pub mod guard;
pub mod normalize;
pub mod patient;
pub mod query;
pub mod transport;

pub use error::ClientError;
pub use reqwest::Method;
pub use executor::{UpstreamExecutor, UpstreamRequest, UpstreamResponse};
pub use normalize::{BinaryPayload, NormalizedBody};
pub use query::{DocumentStatus, QueryParameters};
pub use transport::TransportConfig;
