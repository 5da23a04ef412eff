//! Shared vocabulary for the Rampart resilience layer
//!
//! Every other crate in the workspace builds on the types defined here:
//! - [`Classification`] and the [`Classify`] trait, used by each crate's error
//!   enum so callers branch on retryable / degraded / fatal instead of
//!   matching on error text
//! - [`Origin`] and [`Response`], the caller-visible envelope that marks
//!   whether data is live, served from cache, or substituted from a snapshot
//! - [`Clock`], the time source injected into every time-dependent component

pub mod clock;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Classification, Classify};
pub use types::{Origin, Response};
