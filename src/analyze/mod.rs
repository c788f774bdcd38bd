//! Page analysis -- login-form discovery, credential mapping, resource extraction.

pub mod form;
pub mod mapping;
pub mod resources;
