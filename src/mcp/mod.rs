//! Prompt protocol handling and JSON-RPC envelopes
//!
//! Decodes requests into typed methods, routes them to the prompt registry and
//! shapes the `result` / `error` replies.

pub mod rpc;
pub mod server;
