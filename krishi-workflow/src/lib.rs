pub mod controller;
pub mod gating;
pub mod presentation;
pub mod subsystems;

pub use controller::{WorkflowController, WorkflowKind};
pub use gating::{EnrichmentStage, Gate, Stage};
pub use presentation::WorkflowView;
pub use subsystems::deadlines::{AutoConfirm, Confirm, DeadlineTracker, DeleteOutcome, UpcomingDeadline};
pub use subsystems::enrichment::{FixedLocation, Locate};
