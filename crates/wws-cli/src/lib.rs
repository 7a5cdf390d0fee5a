//! Library components of the `wws` command-line tool.

pub mod logging;
pub mod output;
pub mod progress;
