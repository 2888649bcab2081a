//! Domain models for gatewatch.
//!
//! ## Submodules
//!
//! - [`channel`] - Channel records (direction, technology, lock state, metrics)
//! - [`capability`] - Capability flags declared by device profiles
//! - [`system`] - Firmware/hardware/uptime information
//! - [`poll`] - Aggregate poll results and status tags

mod capability;
mod channel;
mod poll;
mod system;

pub use capability::{Capability, CapabilitySet};
pub use channel::{ChannelDirection, ChannelRecord, ChannelTechnology, LockStatus};
pub use poll::{PollResult, PollStatus};
pub use system::SystemInfo;
