//! Reference resolution.
//!
//! A raw reference (`freya`, `[[people/freya#bio]]`, `today`, `The Queen`) is
//! matched against the index through ordered strategies. The first strategy
//! that produces any candidate decides the result; more than one candidate
//! makes the reference ambiguous.

mod resolve;
pub mod types;

pub use resolve::{Resolver, ResolverTables};
pub use types::{
    CandidateSet, MatchCandidate, MatchSource, ResolveError, ResolveResult, ResolverOptions,
};
