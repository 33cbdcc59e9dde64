//! Helpers for exercising builders, batches, and chains without a database.

mod recording;
pub mod test_helpers;

pub use recording::{RecordedCall, RecordingSession};
pub use test_helpers::{create_test_row, result_set_of};
