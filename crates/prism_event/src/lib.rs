//! # prism_event - Event System
//!
//! Typed publish/subscribe channels and command dispatch:
//! - Synchronous delivery in subscription order
//! - Explicit unsubscribe handles
//! - One handler per command name, enforced

pub mod bus;
pub mod command;

pub use bus::{Event, EventBus, SubscriberId};
pub use command::{CommandBus, CommandError, CommandHandler};

/// Prelude
pub mod prelude {
    pub use crate::bus::{Event, EventBus, SubscriberId};
    pub use crate::command::{CommandBus, CommandError, CommandHandler};
}
