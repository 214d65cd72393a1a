//! Wire formats: serial command frames, telemetry lines, remote feed
//! requests and the HTTP datastreams interface.
//!
//! Everything here is pure formatting/parsing over byte slices and
//! `core::fmt::Write`; the adapters own the actual sockets and UART.

pub mod feed;
pub mod http;
pub mod parser;
pub mod telemetry;
pub mod transport;
