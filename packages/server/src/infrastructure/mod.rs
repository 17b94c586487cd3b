//! Infrastructure layer: storage, transports and wire formats.

pub mod client;
pub mod dto;
pub mod registry;

pub use registry::Registry;
