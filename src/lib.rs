//! Vision: classroom device-control core
//!
//! Propagates control commands from one administrator context to many
//! student contexts and keeps each student's lock state and block list
//! reconciled with the shared store, including students that start after
//! a command was sent.

pub mod admin;
pub mod bus;
pub mod classroom;
pub mod cli;
pub mod config;
pub mod error;
pub mod hostname;
pub mod logging;
pub mod protocol;
pub mod store;
pub mod student;
pub mod types;
