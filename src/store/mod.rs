//! Backing-store access for the device data view.
//! Used by: state, executor.

pub mod registry;
pub mod sqlite;
