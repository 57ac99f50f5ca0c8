pub mod deriver;
pub mod llm;
pub mod parser;
pub mod prompt;

use std::time::Duration;

use thiserror::Error;

pub use deriver::PackageDeriver;
pub use llm::{collect_response, GenerationRequest, LlmClient, StreamEvent};
pub use parser::{parse_package, ParseError};
pub use prompt::build_derivation_prompt;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeriveError {
    #[error("model stream failed: {0}")]
    Stream(String),
    #[error("no terminal streaming signal within {0:?} and no partial output")]
    Timeout(Duration),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("derived package failed validation: {0}")]
    Invalid(#[from] conclave_core::DomainError),
}
