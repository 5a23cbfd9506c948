//! Common test infrastructure for pdfgate integration tests.
//!
//! Each test file compiles its own copy of this module, so items may appear
//! unused from the perspective of a single test file even though they're
//! used elsewhere.

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod app;
pub mod assertions;
pub mod fake_engine;

pub use app::TestApp;
pub use assertions::*;
pub use fake_engine::{EngineStats, FakeLauncher, EXPORT_FAIL_MARKER, SLOW_MARKER, STALL_MARKER};
