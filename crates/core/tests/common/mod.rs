//! Common test utilities shared by the integration tests.
//!
//! This module provides:
//! - Fixtures (orchestrators, scaffolded projects, briefs)
//! - Programmable test stages and sinks
//! - Custom assertions over traces and events

pub mod assertions;
pub mod fixtures;
pub mod stages;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use stages::*;
