pub mod content;
pub mod stats;

pub use content::*;
pub use stats::*;
