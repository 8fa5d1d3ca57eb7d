pub mod error;
pub mod extended;
pub mod types;

pub use error::{VadpcmError, VadpcmResult};
pub use extended::Extended;
pub use types::*;
