//! # PeerLearn Shared Library
//!
//! Types and business logic shared by the PeerLearn API server and the
//! reminder worker.
//!
//! ## Module Organization
//!
//! - `models`: Database models, one module per table
//! - `auth`: Passwords, JWTs, request authentication and role checks
//! - `db`: Connection pool and embedded migrations
//! - `realtime`: In-process fan-out of notifications and chat messages
//! - `notify`: Notification creation plus realtime publishing
//! - `billing`: Subject subscriptions paid with points
//! - `wallet`: Teacher balance and withdrawal requests
//! - `grading`: Quiz grading and attempt submission
//! - `scheduling`: Session enrollment
//! - `reminders`: Due-reminder dispatch
//! - `storage`: Bucketed object storage

pub mod auth;
pub mod billing;
pub mod db;
pub mod grading;
pub mod models;
pub mod notify;
pub mod realtime;
pub mod reminders;
pub mod scheduling;
pub mod storage;
pub mod wallet;

/// Current version of the PeerLearn shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
