//! Domain records for cold storage.
//!
//! # Responsibility
//! - Define the records the repository layer translates to and from rows.
//! - Keep the sample/tray link explicit through `Place::sample_id`.
//!
//! # Invariants
//! - A place's `sample_id` is the only mutable link between samples and trays.
//! - A sample occupies at most one place at a time.

pub mod sample;
pub mod tray;
