//! Command-line driver for freerecall-algo: reads an event file, writes the
//! scored tables as JSON.

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
