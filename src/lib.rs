#![forbid(unsafe_code)]

//! `minecloud-wrapper`: supervises a Minecraft server process.
//!
//! The [`supervisor::Supervisor`] owns the server console: it routes every
//! output line to at most one [`supervisor::task::Task`] at a time and
//! serializes writes to the server's stdin. The [`http`] module exposes the
//! supervisor to the control plane.

pub mod config;
pub mod console;
pub mod errors;
pub mod http;
pub mod launch;
pub mod models;
pub mod supervisor;
pub mod tasks;

pub use config::WrapperConfig;
pub use errors::{AppError, Result};
pub use supervisor::Supervisor;
