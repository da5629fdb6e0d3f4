//! Transport-agnostic control protocol.
//!
//! A connection starts in command mode: each line is looked up in the
//! one-shot table (`pause`, `start`, `stop`, `outputs`, `sensors`,
//! `readSensor <name>`, `setOutput <name>:<state>`, `console`), executed,
//! and answered with newline-terminated text. `console` switches that
//! connection, and only that one, to an interactive session that honors
//! dot-prefixed meta-commands until `.logout` closes it.
//!
//! The transport (a Unix socket in `turnipd`) only moves lines in and
//! [`Reply`] text out; every decision lives in [`Session`].

pub mod command;
pub mod session;

pub use command::{Command, CommandError, ConsoleCommand, Operation};
pub use session::{Mode, PROMPT, Reply, Session};
