//! Domain layer of the hub.
//!
//! This module contains the routed message model and the client contract,
//! independent of transports and wire formats.

pub mod client;
pub mod entity;
pub mod error;
pub mod value_object;

pub use client::Client;
pub use entity::{Packet, Payload};
pub use error::ClientError;
pub use value_object::ClientId;
