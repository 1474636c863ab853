//! Shared types for the Epic account link service

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
