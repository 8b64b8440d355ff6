//! An interactive terminal for the tcpterm endpoint.
//!
//! Reads commands line by line and drives a [`tcpterm::Endpoint`] on a TUN interface.
pub mod command;
pub mod config;

pub use command::{Command, InvalidCommand, MANUAL};
