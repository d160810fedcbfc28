//! Request/response normalization layer.
//!
//! # Data Flow
//! ```text
//! caller input + FetchInit
//!     → compose.rs (merge query object into URL, extract protocol)
//!     → request.rs (RequestRecord: method, headers, query, body)
//!         → body.rs (encode for the wire, decode a structured view)
//!         → query.rs (nested query-string codec)
//!     → response.rs (ResponseRecord for middlewares, FetchResponse out)
//! ```

pub mod body;
pub mod compose;
pub mod query;
pub mod request;
pub mod response;

pub use body::{FormParams, Payload, RequestBody};
pub use compose::compose;
pub use request::{FetchInit, FetchInput, RequestDefaults, RequestRecord};
pub use response::{Chunk, FetchResponse, ResponseRecord, ResponseSource};
