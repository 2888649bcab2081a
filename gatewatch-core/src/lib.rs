// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Gatewatch Core
//!
//! Core types and models shared by every gatewatch crate.
//!
//! This crate holds the normalized values that a poll cycle produces,
//! independent of which vendor interface they were decoded from:
//!
//! - [`ChannelRecord`] - One downstream or upstream channel
//! - [`SystemInfo`] - Firmware/hardware versions and uptime
//! - [`PollResult`] - Aggregate output of one polling cycle
//! - [`Capability`] - What a device profile can report or do
//!
//! Nothing in here performs I/O.

pub mod error;
pub mod models;

pub use error::CoreError;

pub use models::{
    // Capabilities
    Capability,
    CapabilitySet,
    // Channels
    ChannelDirection,
    ChannelRecord,
    ChannelTechnology,
    LockStatus,
    // Poll output
    PollResult,
    PollStatus,
    // System
    SystemInfo,
};
