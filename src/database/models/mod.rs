pub mod entity;
pub mod order;
pub mod status_log;

pub use entity::*;
pub use order::*;
pub use status_log::*;
