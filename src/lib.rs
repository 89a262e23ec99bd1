//! # Sakegram
//!
//! Scheduling and publishing of Instagram image posts, plus the studio
//! compositing used to prepare product photos before they are scheduled.
//!
//! The library holds everything that does not speak HTTP: the post model,
//! the durable post store, runtime settings, the dispatcher that publishes
//! due posts through the Graph API, and the image composites. The
//! companion `sakegram-http` crate puts an axum API in front of it and
//! `sakegram-server` ships the binary.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use sakegram::{Dispatcher, GraphPublisher, NewPost, PostStore, SettingsStore};
//! use sakegram_graph::GraphConfig;
//! use std::sync::Arc;
//!
//! # async fn run() -> sakegram::Result<()> {
//! let store = Arc::new(PostStore::open("./data/db.json")?);
//! let settings = Arc::new(SettingsStore::load("./data/.env")?);
//!
//! store.insert(NewPost {
//!     image_path: "https://res.cloudinary.com/demo/image/upload/bottle.jpg".into(),
//!     caption: "新酒入荷".into(),
//!     schedule_time: sakegram::parse_schedule_time("2026-12-01T09:00:00+09:00")?,
//! })?;
//!
//! let publisher = Arc::new(GraphPublisher::new(GraphConfig::from_env()));
//! let dispatcher = Dispatcher::new(store, settings, publisher);
//! let report = dispatcher.run_once(chrono::Utc::now()).await;
//! println!("{} posted, {} failed", report.posted, report.failed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Dependencies | Use case |
//! |---------|-------------|----------|
//! | `axum-support` | axum | [`SakegramError`] implements `IntoResponse` |
//! | `openapi` | utoipa | OpenAPI schemas for the wire types |
//!
//! Both features are enabled by default.

pub mod dispatcher;
pub mod error;
pub mod settings;
pub mod store;
pub mod studio;
pub mod types;

pub use dispatcher::{DispatchReport, Dispatcher, GraphPublisher, Publisher};
pub use error::{Result, SakegramError};
pub use settings::{Settings, SettingsStore, SettingsUpdate, SettingsView};
pub use store::PostStore;
pub use types::*;
