//! SDO Core - Section Drafting Orchestrator
//!
//! Coordinates, for a multi-section document, the repeated cycle of:
//! - choosing the next section the dependency graph allows
//! - drafting it through a `ContentGenerator`
//! - critiquing the draft through a `Critic`
//! - revising automatically up to a bounded number of times
//! - escalating to a human, then resuming with their guidance
//!
//! # Example
//!
//! ```rust
//! use sdo_core::prelude::*;
//! use sdo_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), OrchestratorError> {
//! let orchestrator = Orchestrator::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(OfflineGenerator::new()),
//!     Arc::new(KeywordCritic::new()),
//! )
//! .with_templates(business_continuity_templates());
//!
//! let context = DraftContext::new("Test Manufacturing Co.", "Wakayama", "Ten staff, metal parts.");
//! let id = orchestrator
//!     .create_session(NewSession::new(context, business_continuity_plan()))
//!     .await?;
//!
//! let state = orchestrator.run_until_suspended(&id, &orchestrator.call_options()).await?;
//! assert_eq!(state.status, WorkflowStatus::Completed);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod collaborators;
pub mod compliance;
pub mod config;
pub mod error;
pub mod llm;
pub mod offline;
pub mod orchestrator;
pub mod presets;
pub mod prompts;
pub mod reviewer;
pub mod templates;
pub mod writer;

pub use collaborators::{CallOptions, ContentGenerator, Critic, GenerationRequest, ReviewRequest};
pub use compliance::KeywordCritic;
pub use config::{ConfigError, ModelsConfig, OrchestratorConfig, StoreConfig, StoreKind};
pub use error::{GenerationError, OrchestratorError};
pub use offline::OfflineGenerator;
pub use orchestrator::{NewSession, Orchestrator};
pub use reviewer::{classify, ReviewerStep, Verdict};
pub use templates::{SectionTemplate, TemplateRegistry};
pub use writer::WriterStep;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::presets::{business_continuity_plan, business_continuity_templates};
    pub use crate::{
        CallOptions, ContentGenerator, Critic, GenerationError, GenerationRequest, KeywordCritic,
        NewSession, OfflineGenerator, Orchestrator, OrchestratorConfig, OrchestratorError,
        ReviewRequest, SectionTemplate, TemplateRegistry, Verdict,
    };
    pub use sdo_kernel::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
