//! Common test utilities for media-dl integration tests

#[allow(dead_code)]
pub mod extractor;
#[allow(dead_code)]
pub mod server;

#[allow(unused_imports)]
pub use extractor::*;
#[allow(unused_imports)]
pub use server::*;
