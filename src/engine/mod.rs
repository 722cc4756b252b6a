//! Request policy & prioritization engine.
//!
//! Pure functions over already-fetched collections: nothing here performs I/O.

pub mod catalog;
pub mod classifier;
pub mod ordering;
pub mod policy;
pub mod stats;
pub mod validator;

pub use classifier::{classify, Classification, Severity};
pub use ordering::{filter_and_sort, RequestFilter};
pub use policy::{resolve_policy, PolicySource, ResolvedPolicy};
pub use validator::{validate, RequestDraft, ValidationOutcome};
