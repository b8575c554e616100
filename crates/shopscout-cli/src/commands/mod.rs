//! Command implementations

pub mod recommend;
pub mod research;
pub mod status;
