//! Login execution -- the two-step flow and the success verdict.

pub mod flow;
pub mod verdict;
