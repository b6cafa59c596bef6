mod cycles;
mod orchestrator;
mod sweeper;

pub use cycles::{CycleService, EventInterpretationView};
pub(crate) use cycles::validate_owner;
pub use orchestrator::{GenerationOrchestrator, OrchestratorConfig, ReconcileRequest};
pub use sweeper::SweepManager;
