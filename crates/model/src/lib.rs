//! A provider-neutral protocol between the agent and language models.
//!
//! This crate defines the messages replayed to a model, the tools a model
//! may call, and the streaming events a model produces in response. The
//! agent only talks to models through these types, so any provider that
//! implements [`ModelProvider`] can drive it.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
