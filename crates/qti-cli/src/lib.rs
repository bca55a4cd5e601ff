//! Library components of the `qti-export` command.

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod storage;
