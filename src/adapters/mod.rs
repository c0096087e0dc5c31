// Adapters layer: concrete implementations of the domain ports for external systems.
// Local storage lives under config::cli next to the CLI configuration.

pub mod http;

pub use http::AlmaClient;
