//! Generation pipeline: registry selection → template rendering → verified
//! artifacts on disk → manifest.

pub mod error;
pub mod generator;
pub mod integrity;
pub mod manifest;
pub mod orchestrator;
pub mod pool;
pub mod types;

pub use error::{GenerationError, IntegrityError, ManifestError, PipelineError};
pub use generator::{AssetGenerator, TemplateGenerator};
pub use manifest::{Manifest, ManifestEntry};
pub use orchestrator::{plan, target_for, GenerationJob, GenerationPlan, Orchestrator};
pub use pool::BoundedPool;
pub use types::*;
