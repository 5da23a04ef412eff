// crates/database/src/session.rs
//! Session acquisition seam
//!
//! The unit-of-work executor only needs to open a session, hand it to the
//! caller's work, and close it again. Anything that can do that (a real
//! connection pool, a scripted fake in tests) plugs in here.

use crate::error::DbResult;

/// A live session handed to a unit of work
pub trait Session {
    /// Releases the session
    fn close(self) -> DbResult<()>;
}

/// Opens fresh sessions
pub trait SessionSource {
    type Session: Session;

    /// Acquires a session for one attempt
    fn acquire(&self) -> DbResult<Self::Session>;
}

impl<S: SessionSource + ?Sized> SessionSource for &S {
    type Session = S::Session;

    fn acquire(&self) -> DbResult<Self::Session> {
        (**self).acquire()
    }
}
