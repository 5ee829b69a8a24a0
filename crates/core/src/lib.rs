//! Core types, traits, and error definitions for the document agent.
//!
//! This crate provides the building blocks shared by the gateway, the
//! controller, the skill layer and the stores.

pub mod config;
pub mod error;
pub mod mocks;
pub mod template;
pub mod text;
pub mod traits;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use traits::*;
pub use types::*;
