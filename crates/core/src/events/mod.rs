pub mod click;
pub mod event;
pub mod events_dropped;
pub mod scroll_depth;
pub mod section;
pub mod session_start;
pub mod tracker;
pub mod tracker_builder;

pub use click::*;
pub use event::*;
pub use events_dropped::*;
pub use scroll_depth::*;
pub use section::*;
pub use session_start::*;
pub use tracker::*;
pub use tracker_builder::*;
