pub mod error;
pub mod extract;
pub mod idempotency;
pub mod pipeline;
pub mod stage;
pub mod validation;

pub use error::PipelineError;
pub use pipeline::DocumentPipeline;
pub use stage::{Outcome, Stage};
