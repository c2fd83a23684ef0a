//! Configuration sources layered by the loader, lowest precedence first.

pub mod environment;
pub mod file;
