//! # rollbar-wp API
//!
//! HTTP surface for the plugin's REST routes.

mod error;
pub mod rest;

pub use error::ApiError;
pub use rest::{router, serve};
