pub mod storage;
pub mod store;
pub mod token;

pub use storage::*;
pub use store::*;
pub use token::*;
