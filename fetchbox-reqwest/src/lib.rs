#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod transport;

pub use transport::ReqwestTransport;

/// Re-export of the client type the transport wraps.
pub use reqwest::Client;
