pub mod shed_half_queue;

pub use shed_half_queue::*;
