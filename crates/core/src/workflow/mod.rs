pub mod engine;
pub mod states;

pub use engine::AcceptanceWorkflow;
pub use states::{AcceptanceAction, AcceptanceEvent, TransitionOutcome, WorkflowContext};
