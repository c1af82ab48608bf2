//! TLS-Terminating TCP Relay
//!
//! A transparent relay that accepts TCP connections, optionally terminates TLS
//! on them, and forwards the byte stream in both directions to a fixed
//! plaintext backend. Built so TLS-speaking clients can be exercised against
//! servers that only speak plaintext.

pub mod config;
pub mod endpoint;
pub mod relay;
pub mod session;
pub mod tls;

// Re-export commonly used types and functions
pub use config::{BackendConfig, Config, ListenConfig, TlsConfig, load_config};
pub use endpoint::Endpoint;
pub use relay::Relay;
pub use session::BUFFER_SIZE;
pub use tls::{load_tls_config, server_config_from_pem};
