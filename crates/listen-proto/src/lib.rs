//! Wire types and plain data shared by the `listen` client.
//!
//! Nothing in here performs I/O beyond reading and writing the config file;
//! the networking, process and terminal plumbing lives in `listen-tui`.

pub mod config;
pub mod gateway;
pub mod platform;
pub mod playback;
pub mod track;
