//! HTTP control surface.
//!
//! Thin request/response wrappers over [`Supervisor`](crate::Supervisor)
//! operations; no state of their own.

pub mod server;

pub use server::{bind, router, serve};
