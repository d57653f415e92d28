//! A meteoroid dark-flight propagator: given a terminal luminous-phase
//! state (position, velocity, mass, bulk density, shape, mass-loss
//! coefficient), integrates the atmospheric descent to impact or full
//! ablation, and drives Monte-Carlo ensembles of such propagations across
//! worker threads.

/// Frame & geodesy utilities: ECI/ECEF/ENU/LLH conversions, Earth radius,
/// central-body gravity.
pub mod frames;

/// Atmosphere sampling: 1-D sounding, 4-D gridded forecast, reference model,
/// unified behind a single priority-ordered `sample` contract.
pub mod atmosphere;

/// Drag/lift/mass-loss model and the dark-flight equations of motion.
pub mod dynamics;

/// Adaptive 5(4) Dormand-Prince integrator, generic error control, and the
/// terminal-event predicate.
pub mod propagators;

/// Ground-height sources and impact-surface backtracking.
pub mod terrain;

/// Initial-ensemble construction from the three input modes, plus shared
/// Monte-Carlo jitter primitives.
pub mod ensemble;

/// Data-parallel ensemble runner.
pub mod parallel;

/// Tabular output row assembly.
pub mod result;

/// Event-file/wind-file/output adapters and the data types they produce.
pub mod io;

/// ISO datetime <-> Julian date conversions.
pub mod time;

/// The crate's error type and CLI exit-code mapping.
pub mod errors;
