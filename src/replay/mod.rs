//! Log replay.
//!
//! Turns a kernel log into calls on a [`BufferPool`](crate::BufferPool):
//! - [`LineReader`] - numbered, length-bounded lines
//! - [`parse_line`] - decodes `@@@` command lines
//! - [`Replayer`] - executes commands and collects diagnostics

mod command;
mod interpreter;
mod reader;

pub use command::{parse_line, parse_timestamp, Command, LogCommand};
pub use interpreter::{replay_file, replay_reader, Diagnostic, ReplayReport, Replayer};
pub use reader::LineReader;
