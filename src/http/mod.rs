//! C5: HTTP pattern rewriters (spec.md §4.5), one module per recognizer.
//! Stateless: each takes the edit list and syntax it needs and returns
//! whether it fired. [`crate::tracing_engine`] and [`crate::driver`] decide
//! when each one runs.

pub mod client;
pub mod handler;
pub mod outbound;
pub mod registration;
pub mod uninstrumentable;
