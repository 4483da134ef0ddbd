pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, Weights};
pub use error::{StudyHubError, StudyHubResult};
pub use types::*;
