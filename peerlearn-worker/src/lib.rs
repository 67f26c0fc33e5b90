//! # PeerLearn Worker Library
//!
//! Background jobs for PeerLearn. Today that is the reminder dispatcher,
//! which turns due session reminders into notifications on a schedule.
//!
//! ## Modules
//!
//! - `dispatcher`: worker configuration and the reminder polling loop

pub mod dispatcher;
