use std::error::Error;
use std::fmt;

/// Top-level error type for the dark-flight propagator.
///
/// Variants are grouped the way `spec.md` §7 groups failure modes: malformed
/// input, invalid arguments, and internal numerical failure. Environment
/// degradation (SRTM void, out-of-range wind time) is *not* represented here
/// because it is tolerated, not propagated — see `log::warn!` call sites in
/// `terrain` and `atmosphere`.
#[derive(Debug)]
pub enum DarkflightError {
    /// A required column or metadata key was missing from an input table.
    InputMalformed(String),
    /// An unknown velocity model, file type, or missing wind file was requested.
    ArgumentInvalid(String),
    /// The integrator's right-hand side evaluated to a non-finite value.
    NonFiniteState,
    /// The adaptive step size fell below the minimum representable step without
    /// the error estimate converging.
    StepSizeUnderflow,
    /// A particle was requested with no atmosphere and no terrain source.
    ObjectNotFound(String),
}

impl fmt::Display for DarkflightError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InputMalformed(msg) => write!(f, "malformed input: {}", msg),
            Self::ArgumentInvalid(msg) => write!(f, "invalid argument: {}", msg),
            Self::NonFiniteState => write!(f, "dynamics produced a non-finite state"),
            Self::StepSizeUnderflow => write!(f, "integrator step size underflowed"),
            Self::ObjectNotFound(what) => write!(f, "not found: {}", what),
        }
    }
}

impl Error for DarkflightError {}

/// Exit code mapping used by the CLI binary, per `spec.md` §6.
impl DarkflightError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InputMalformed(_) => 2,
            Self::ArgumentInvalid(_) | Self::ObjectNotFound(_) => 1,
            Self::NonFiniteState | Self::StepSizeUnderflow => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, DarkflightError>;
