//! PLOG stream reading
//!
//! - [`FileHeader`]: signature and version validation
//! - [`PlogStream`]: offset-tracking entry reader with mark/rewind
//! - [`WaitPolicy`]: back-off and give-up rules for files still being written

mod header;
mod reader;
mod wait;

pub use header::*;
pub use reader::*;
pub use wait::*;

#[cfg(test)]
pub(crate) use reader::test_support;
