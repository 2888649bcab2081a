//! Host APIs for talking to devices.
//!
//! - [`http`] - HTTP client with a mandatory timeout and manual redirects

pub mod http;

pub use http::HttpClient;
