//! Command surface for the BMS dashboard.
//!
//! Holds the command vocabulary shared by the view model and the terminal
//! client, a line parser for typed commands, and the fire-and-forget
//! dispatcher that forwards operator intent to the control endpoint.

pub mod command_text;
pub mod commands;
pub mod dispatch;

pub use command_text::{parse_command_line, CommandParseError};
pub use commands::{switch_command_name, BulkCommand, CommandError, CommandRequest};
pub use dispatch::{
    CommandDispatcher, CommandTransport, DispatchError, DispatchOutcome, HttpCommandTransport,
};
