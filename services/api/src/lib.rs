//! Receptionist API Library Crate
//!
//! The backend the voice client talks to: it issues ephemeral realtime
//! credentials with the persona's session configuration, executes tool calls,
//! and exposes the business catalog and booked appointments. The binaries in
//! `bin/` are thin wrappers around this library.

pub mod broker;
pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
