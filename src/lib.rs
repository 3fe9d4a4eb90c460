//! quote-stream: near-real-time price ingestion
//!
//! This library provides the core components for:
//! - A single-writer price store with bounded per-symbol history
//! - Decoding of trade stream frames
//! - A streaming WebSocket client with a reconnect supervisor
//! - Concurrent REST bootstrap of initial quotes
//! - Structured logging and Prometheus metrics

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod feed;
pub mod store;
pub mod telemetry;
pub mod ws;
