pub mod attribution;
pub mod device;
pub mod enricher;
pub mod environment;

pub use attribution::*;
pub use device::*;
pub use enricher::*;
pub use environment::*;
