pub mod buffered_logger;
pub mod console_logger;
pub mod controllers;
pub mod costmap;
pub mod file_logger;
pub mod multi_logger;
pub mod noop_logger;
pub mod planners;
pub mod registry;
pub mod transforms;

pub use buffered_logger::*;
pub use console_logger::*;
pub use controllers::*;
pub use costmap::*;
pub use file_logger::*;
pub use multi_logger::*;
pub use noop_logger::*;
pub use planners::*;
pub use registry::*;
pub use transforms::*;
