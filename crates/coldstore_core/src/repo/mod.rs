//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Translate between `samplekind`/`sample`/`tray`/`place` rows and
//!   domain records.
//! - Isolate SQLite query details from the allocation service.
//!
//! # Invariants
//! - Every value reaches SQL through positional parameter binding.
//! - Repositories never open or commit transactions; callers own the
//!   transaction boundary and hand in `&Transaction` (via deref) or
//!   `&Connection`.
//! - Repository APIs return semantic errors (`SampleNotFound`) in addition to
//!   DB transport errors.

pub mod error;
pub mod sample_repo;
pub mod tray_repo;
