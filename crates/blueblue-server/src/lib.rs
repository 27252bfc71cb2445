//! # blueblue-server
//!
//! HTTP server library for blueblue, a Bluetooth Low Energy presence scanner.
//!
//! This library provides the routes, page rendering, command line and logging setup
//! used by the `blueblue` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod cli;
pub mod logging;
pub mod render;
pub mod state;
