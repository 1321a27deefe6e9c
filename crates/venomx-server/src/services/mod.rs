//! Request orchestration shared by the HTTP handlers.

pub mod finder;
pub mod identify;
