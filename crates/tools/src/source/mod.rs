//! Data-source adapters.
//!
//! Tools never talk to the network or spawn processes directly; they go
//! through these two traits so a dispatcher can be wired to fakes in tests.

pub mod http;
pub mod python;

use async_trait::async_trait;
use finmcp_core::AdapterFailure;
use serde_json::{Map, Value};

pub use http::ReqwestHttpSource;
pub use python::PythonLibrarySource;

/// Outcome of one data-source call. A success payload is already cleaned
/// (non-finite numbers nulled, date-times in ISO-8601).
pub type AdapterResult = std::result::Result<Value, AdapterFailure>;

/// Plain HTTP GET against a finance endpoint.
#[async_trait]
pub trait HttpSource: Send + Sync {
    /// Returns parsed JSON when the body is JSON, otherwise the body text as
    /// a JSON string.
    async fn get(&self, endpoint: &str, query: &[(String, String)]) -> AdapterResult;
}

/// Named function of an out-of-process data library, called with keyword
/// arguments.
#[async_trait]
pub trait LibrarySource: Send + Sync {
    async fn invoke(&self, function: &str, kwargs: &Map<String, Value>) -> AdapterResult;
}
