pub mod entities;
pub mod ports;
pub mod repositories;

pub use entities::*;
pub use listener_errors::{ListenerError, ListenerResult};
pub use ports::*;
pub use repositories::*;
