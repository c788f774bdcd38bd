//! Captured sessions -- the in-memory store and cookie-replay fetching.

pub mod fetch;
pub mod store;
