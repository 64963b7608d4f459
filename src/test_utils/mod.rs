//! the test_utils folder here will share utils or test components between unit
//! tests in this crate
mod common;
mod fake_transport;
mod recording_listener;

pub use common::*;
pub use fake_transport::*;
pub use recording_listener::*;
