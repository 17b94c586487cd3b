//! Shared utilities for Plaza packages.

pub mod logger;
