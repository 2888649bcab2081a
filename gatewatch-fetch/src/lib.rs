// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # Gatewatch Fetch
//!
//! Transport and authentication for cable modem web interfaces.
//!
//! ## Host APIs
//!
//! - [`host::http`] - HTTP client with a mandatory timeout and manual redirects
//!
//! ## Authentication
//!
//! - [`auth::AuthStrategy`] - Trait for login mechanisms
//! - [`auth::AuthSpec`] - Declarative strategy description stored on profiles
//! - [`session::Session`] - Cookies, tokens and keys for one device
//!
//! ## Example
//!
//! ```ignore
//! use gatewatch_fetch::{AuthSpec, Credentials, FetchContext, Resource, Session};
//!
//! let ctx = FetchContext::new()?;
//! let strategy = AuthSpec::Basic.build();
//! let mut session = Session::new(strategy.kind());
//! let creds = Credentials::new("admin", "password");
//!
//! strategy.authenticate(&ctx, &base, &mut session, &creds).await?;
//! let page = strategy
//!     .fetch(&ctx, &base, &session, &creds, &Resource::page("/cmconnectionstatus.html"))
//!     .await?;
//! ```

// Core modules
pub mod auth;
pub mod context;
pub mod credentials;
pub mod error;
pub mod host;
pub mod page;
pub mod probe;
pub mod retry;
pub mod session;

// Re-export key types at crate root

// Errors
pub use error::{AuthError, FetchError};

// Host APIs
pub use host::http::HttpClient;

// Auth
pub use auth::{AuthKind, AuthSpec, AuthStrategy, HnapDigest};
pub use credentials::Credentials;
pub use session::Session;

// Requests
pub use context::{FetchContext, FetchContextBuilder, FetchSettings};
pub use page::{ControlRequest, FetchedPage, Resource};
pub use probe::{Probe, ProbeResult, run_probes};
pub use retry::RetryStrategy;
