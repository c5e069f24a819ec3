pub mod control;
pub mod coordinator;
pub mod events;
pub mod frames;
pub mod plan_store;
pub mod ports;
pub mod requests;
pub mod types;
pub mod validation;
pub mod worker;

pub use control::*;
pub use coordinator::*;
pub use events::*;
pub use frames::*;
pub use plan_store::*;
pub use ports::*;
pub use requests::*;
pub use types::*;
pub use validation::*;
pub use worker::*;
