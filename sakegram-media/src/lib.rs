//! Clients for the external media services used before posting:
//! Cloudinary (public hosting), OpenAI (vision + image generation) and
//! remove.bg (background removal).

pub mod cloudinary;
pub mod config;
pub mod error;
pub mod openai;
pub mod removebg;

pub use cloudinary::{CloudinaryClient, CloudinaryCredentials};
pub use config::MediaEndpoints;
pub use error::{MediaError, Result};
pub use openai::{BrandAnalysis, OpenAiClient};
pub use removebg::RemoveBgClient;
