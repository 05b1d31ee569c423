//! HTTP execution pipeline: transport, retry/backoff, status classification
//! and log redaction.

mod classify;
mod client;
mod headers;
mod query;
mod redact;
mod retry;
mod transport;

pub use classify::classify_failure;
pub use client::{HttpExecutor, JsonObject, REQUEST_ID_HEADER};
pub use headers::Headers;
pub use query::{Primitive, QueryParams, QueryValue};
pub use redact::{REDACTED, redact_headers, redact_params};
pub use retry::{
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_STATUSES, RetryPolicy, Sleeper, ThreadSleeper,
    parse_retry_after,
};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError,
    TransportErrorKind,
};
