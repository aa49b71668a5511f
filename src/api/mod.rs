//! Purpose: Define the stable public Rust API boundary for jsonus.
//! Exports: Core types and operations needed by bindings and the CLI.
//! Role: Public, additive-only surface; hides internal module layout.
//! Invariants: This module is the only supported public path to core types.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::config::{BASE_DIR_ENV, Config};
pub use crate::core::document::Document;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::handles::{Handle, HandleTable};
pub use crate::core::kind::JsonType;
pub use crate::core::print::{colorize, render};
pub use crate::extension::{Extension, ExtResult};
