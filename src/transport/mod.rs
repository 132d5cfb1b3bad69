//! Line-oriented transport for the prompt protocol
//!
//! Serves one JSON request per line from a reader and writes one JSON reply per
//! line to a writer; the binary wires it to stdin and stdout.

pub mod stdio;
