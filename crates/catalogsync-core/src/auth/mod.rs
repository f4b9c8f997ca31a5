//! Session identity forwarded with every backend request.
//!
//! The cache layer never inspects or refreshes the session; it only reads
//! the two identity fields and attaches them to request bodies.

pub mod session;

pub use session::{FileSession, SessionContext, SessionIdentity, StaticSession};
