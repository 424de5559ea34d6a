pub mod outcome;
pub mod payload;

pub use outcome::*;
pub use payload::*;
