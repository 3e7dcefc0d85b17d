//! Candidate normalisation and consensus.

pub mod median;
pub mod normalizer;
pub mod validator;

pub use normalizer::attach_usd;
pub use validator::{enforce_range, normalize_candidates, ConsensusOutcome};
