// Core modules implementing documents, handles, formatting, and error modeling.
pub mod document;
pub mod error;
pub mod handles;
pub mod kind;
pub mod print;
