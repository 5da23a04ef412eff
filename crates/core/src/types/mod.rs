//! Caller-visible response types

mod response;

pub use response::{Origin, Response};
