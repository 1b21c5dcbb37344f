//! EnzoWorks site service
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod llm;
pub mod chat;
pub mod sandbox;
pub mod server;
pub mod storage;
