//! Three-stage story transformation.
//!
//! A [`Transformer`] extracts the essence of a source story, maps it onto a
//! target world, and writes the new story in the requested style. Each stage
//! is validated before the next one starts; a stage that cannot produce valid
//! output ends the run with a [`StageFailure`].

pub mod config;
pub mod error;
pub mod metrics;
pub mod request;
pub mod result;
pub mod sink;
pub mod transformer;

pub use config::{Credential, ModelConfig, PipelineConfig, RetryConfig};
pub use error::{ConfigurationError, ErrorKind, FailureCause, Stage, StageFailure};
pub use metrics::{StageReport, StageTally, TimedOperation};
pub use request::TransformationRequest;
pub use result::PipelineResult;
pub use sink::{FileSink, OutputSink, SinkError, StoredOutput, safe_title};
pub use transformer::Transformer;
