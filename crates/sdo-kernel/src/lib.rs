//! SDO Kernel (sdo-kernel)
//!
//! The pure, synchronous half of the section drafting orchestrator:
//! - `WorkflowState` and its supporting types
//! - Dependency graph validation (cycles, unknown ids)
//! - Deterministic planner
//! - Workflow status transition table
//! - Hash-chained transition log
//!
//! # Quick Start
//!
//! ```rust
//! use sdo_kernel::prelude::*;
//! use std::collections::BTreeMap;
//!
//! let plan = WorkflowPlan::new(["disaster_assumption", "business_impact"])
//!     .with_dependency("business_impact", "disaster_assumption");
//! let graph = DependencyGraph::new(&plan).unwrap();
//!
//! let next = select_next(&BTreeMap::new(), &graph, SkipPolicy::Blocks);
//! assert_eq!(next, Some(SectionId::from("disaster_assumption")));
//! ```

pub mod dag;
pub mod error;
pub mod logging;
pub mod planner;
pub mod state_machine;
pub mod types;

pub use error::*;
pub use types::*;

pub mod prelude {
    pub use crate::dag::DependencyGraph;
    pub use crate::error::{GraphError, InvariantViolation, StateMachineError};
    pub use crate::logging::{TransitionEvent, TransitionLog};
    pub use crate::planner::{assess, select_next, PlanOutcome, Planner};
    pub use crate::state_machine::{allowed_transitions, validate_transition};
    pub use crate::types::{
        CritiqueItem, DraftContext, RevisionPolicy, SectionId, SectionStatus, SessionPolicy,
        SkipPolicy, WorkflowPlan, WorkflowState, WorkflowStatus,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
