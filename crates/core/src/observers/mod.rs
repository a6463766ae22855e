pub mod scroll;
pub mod sections;

pub use scroll::*;
pub use sections::*;
