pub mod error;
pub mod gateway;
pub mod response_parser;

pub use error::LlmError;
pub use gateway::LlmGateway;
