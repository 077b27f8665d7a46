//! Shared domain types for the scrapedeck client.
//!
//! Pure data, no I/O: the job lifecycle model, log events and their
//! bounded display buffer, health samples, and normalization of the
//! service's ad-hoc error payloads.

pub mod health;
pub mod job;
pub mod log;
pub mod remote_error;
pub mod types;
