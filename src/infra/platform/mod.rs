//! Platform backends.

pub mod memory;

pub use memory::{Delivery, InMemoryPlatform, ResultQuery};
