//! Library half of `pacct-cli`, split out so the commands can be tested
//! without spawning the binary.

pub mod config;
pub mod generate;
pub mod report;
