//! Server process launch.
//!
//! - `memory`: heap sizing from available system memory.
//! - `java`: the fixed JVM and server command line.
//! - `spawner`: process spawning with piped stdio and the exit monitor.

pub mod java;
pub mod memory;
pub mod spawner;

pub use java::{java_launch_spec, LaunchSpec};
