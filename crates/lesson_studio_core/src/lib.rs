pub mod domain;
pub mod example;
pub mod outline;
pub mod ports;
pub mod prompt;
pub mod readiness;
pub mod subscription;
pub mod workflow;

pub use domain::{
    ContentState, FormState, RawEntry, RawSection, Section, SectionLayout, SubscriptionState,
    UiState, UsageLimits,
};
pub use ports::{
    DocumentGenerationService, HistoryService, OutlineGenerationService, PortError, PortResult,
};
pub use workflow::{Workflow, WorkflowError, WorkflowPhase, MAX_REGENERATION_ATTEMPTS};
