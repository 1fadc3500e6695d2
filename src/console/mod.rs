//! Server console plumbing.
//!
//! The server's stdout and stderr are each drained by a reader task that
//! splits the bytes into lines and forwards them onto one shared unbounded
//! channel. Its stdin is owned by a single writer task that applies commands
//! in submission order and reports each write's outcome to its submitter.
//!
//! - `codec`: line framing for console output.
//! - `reader`: console output reader tasks.
//! - `writer`: the stdin writer task and the [`Console`](writer::Console) handle.

pub mod codec;
pub mod reader;
pub mod writer;

pub use writer::Console;
