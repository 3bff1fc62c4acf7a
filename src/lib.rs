//! A small interactive shell built around a pipeline executor.
//!
//! Every input line is parsed into a [`Pipeline`](parser::Pipeline) of commands
//! separated by `|`. A single command may be one of the builtins (`cd`, `exit`,
//! `history`) executed in-process; anything else is an external program found
//! through `PATH`. The stages of a longer pipeline run as concurrent processes
//! connected by OS pipes.
//!
//! Ctrl-C interrupts the running pipeline, not the shell: each pipeline gets its
//! own [`CancellationToken`](cancel::CancellationToken) subscribed to the interrupt
//! signal only while the pipeline runs.
//!
//! The main entry point is [`Interpreter`]. The public modules expose the
//! parser, executor and session so lines can also be run without the REPL.

pub mod builtin;
pub mod cancel;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod history;
mod interpreter;
pub mod parser;
pub mod process;
pub mod session;

pub use config::Config;
pub use error::ShellError;
pub use interpreter::Interpreter;
