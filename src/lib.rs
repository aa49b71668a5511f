//! Purpose: Library crate behind the `jsonus` host extension and CLI.
//! Exports: `api` (stable surface), `abi` (C bridge), `extension`, `config`, `core`.
//! Role: Handle-based JSON documents for scripting hosts; the CLI and C ABI share it.
//! Invariants: Bindings go through `api` or `abi`; `core` layout may change between releases.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod abi;
pub mod api;
pub mod config;
pub mod core;
pub mod extension;
