//! # Headlock Server Library
//!
//! Inspects the message at the head of an Azure Service Bus queue and decides
//! whether to delete it, release it, or requeue it with backoff.
//!
//! ## Modules
//!
//! - [`auth`] - SAS token signing
//! - [`transport`] - Queue transport trait and the Service Bus REST client
//! - [`model`] - Peeked message and broker properties
//! - [`disposition`] - Decision engine and message processor
//! - [`config`] - Worker configuration read from the environment
//! - [`common`] - Error types
//! - [`utils`] - Environment variable helpers

pub mod auth;
pub mod common;
pub mod config;
pub mod disposition;
pub mod model;
pub mod transport;
pub mod utils;
