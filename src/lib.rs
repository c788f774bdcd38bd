//! Sesame -- form-login automation over plain HTTP.
//!
//! Sesame fetches a login page, finds its form, maps credentials onto the
//! fields by name, submits, and captures the cookies into an in-memory
//! session. Captured sessions can then fetch pages behind the login, with
//! resource extraction and raw HTML download. No browser is involved; the
//! whole flow is two HTTP round-trips.
//!
//! The pieces layer cleanly: [`analyze`] is pure HTML work, [`login`] drives
//! the two-step flow over [`client`], [`session`] stores and replays what the
//! flow captured, and [`server`] exposes the JSON API.

pub mod analyze;
pub mod client;
pub mod config;
pub mod login;
pub mod server;
pub mod session;
