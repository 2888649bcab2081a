// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # Gatewatch Profiles
//!
//! Device profiles and everything that turns a profile into channel data.
//!
//! Each profile is plain data: how to log in, which pages to fetch, how to
//! decode them and how to recognise the device. This crate contains:
//!
//! - **Decoders**: Table, transposed table, delimited string and JSON layouts
//! - **Discovery**: Hint-based profile selection with a raw-capture fallback
//! - **Orchestration**: Per-device session lifecycle and the poll cycle
//! - **Built-in profiles**: One module per vendor
//!
//! ## Supported Devices
//!
//! | Profile | Auth | Format | Restart |
//! |---------|------|--------|---------|
//! | ARRIS SB6141 | None | Transposed | ❌ |
//! | ARRIS SB8200 | None / URL token | Table | ❌ |
//! | ARRIS S33 | HNAP (SHA-256) | Delimited | ✅ |
//! | Motorola MB8600 | HNAP (MD5) | Delimited | ✅ |
//! | Netgear CM600 | Basic | Script | ❌ |
//! | Netgear C7000 | Form + nonce | Script | ❌ |
//! | Technicolor TC4400 | Basic | Table | ✅ |
//! | Hitron CODA-56 | Form | JSON | ❌ |
//! | Ubee UBC1318 | Meta redirect | Table | ❌ |
//!
//! ## Usage
//!
//! ```ignore
//! use gatewatch_fetch::{Credentials, FetchContext};
//! use gatewatch_profiles::{DataOrchestrator, DiscoveryPipeline};
//!
//! let ctx = Arc::new(FetchContext::new()?);
//! let outcome = DiscoveryPipeline::from_registry().discover(&ctx, &base).await?;
//!
//! let orchestrator = DataOrchestrator::new(outcome.selected, base, creds, ctx);
//! let result = orchestrator.poll().await;
//! ```

pub mod decode;
pub mod detect;
pub mod discovery;
pub mod error;
pub mod orchestrator;
pub mod profile;
pub mod registry;
pub mod variant;
pub mod vendors;

// Re-export key types

// Errors
pub use error::{CapabilityError, ParseError, PollError, ProfileError, StaleCause};

// Profiles
pub use profile::{DetectionHint, DeviceProfile, HintPattern};
pub use registry::ProfileRegistry;
pub use variant::ParserVariant;

// Decoding
pub use decode::info::InfoSpec;
pub use decode::{ChannelDecoder, DecodeOutput, FieldMap, KeyMap, RowOutcome};

// Discovery and polling
pub use detect::{HintMatcher, HintScore, LoginPageDetector};
pub use discovery::{CandidateScore, DiscoveryOutcome, DiscoveryPipeline, ResolvedProfile};
pub use orchestrator::{DataOrchestrator, DeviceHealth, SessionState};
