//! Core type definitions for the document agent.
//!
//! Requests, intents, handler results and the response envelope are shared by
//! every layer; tool and knowledge types describe the outbound collaborators.

pub mod intent;
pub mod knowledge;
pub mod request;
pub mod result;
pub mod tool;

pub use intent::*;
pub use knowledge::*;
pub use request::*;
pub use result::*;
pub use tool::*;
