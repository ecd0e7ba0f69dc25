//! The overarching module for all particular commands implemented by
//! task-loop.

pub mod clean;
pub mod list;
pub mod run;
