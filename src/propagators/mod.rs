//! Adaptive integration (`spec.md` component E).

/// Error-control strategies (RSS/largest-error family), generic over state
/// dimension; unchanged from the teacher's implementation since its
/// `DimName`-generic design already covers this crate's fixed-size state.
pub mod error_ctrl;

/// The 5(4) Dormand-Prince pair with PI step control.
pub mod dormand_prince;

/// Terminal-event predicate and surface backtracking.
pub mod events;

pub use dormand_prince::{integrate, AcceptedStep, IntegratorProfile, StepCommand};
pub use events::{backtrack_to_surface, check_termination, TerminationReason};
