//! Instagram Graph API client and the container publish protocol.

pub mod client;
pub mod config;
pub mod error;
pub mod media_url;
pub mod publisher;
pub mod types;

pub use client::GraphClient;
pub use config::{GraphConfig, GraphCredentials};
pub use error::{GraphError, Result};
pub use publisher::{InstagramPublisher, PublishedMedia};
