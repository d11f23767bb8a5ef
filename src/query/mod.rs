//! Translation of grid state into parameterized queries.
//! Used by: executor, store, export, handlers.

pub mod builder;
pub mod columns;
pub mod escape;
pub mod params;
pub mod request;
