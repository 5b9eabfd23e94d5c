pub mod config;
pub mod error;
pub mod paths;

pub use config::Config;
pub use error::{join_failures, AdapterFailure, Error, FailureKind, Result, ValidationError};
pub use paths::Paths;
