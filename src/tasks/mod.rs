//! Background Tasks Module
//!
//! Long-running tasks owned by cache backends.

mod expiration;

pub use expiration::spawn_expiration_scan;
