use crate::auth::SessionAuth;
use sakegram::{Dispatcher, PostStore, Publisher, SettingsStore};
use sakegram_media::MediaEndpoints;
use std::path::PathBuf;
use std::sync::Arc;

pub mod config;
pub mod health;
pub mod posts;
pub mod session;
pub mod studio;
pub mod upload;

pub struct AppState {
    pub store: Arc<PostStore>,
    pub settings: Arc<SettingsStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub auth: SessionAuth,
    pub media: MediaEndpoints,
    pub http_client: reqwest::Client,
    /// Where uploads and studio output are written; served at `/uploads`.
    pub uploads_dir: PathBuf,
    pub post_limit: usize,
}

impl AppState {
    pub fn new(
        store: Arc<PostStore>,
        settings: Arc<SettingsStore>,
        publisher: Arc<dyn Publisher>,
        media: MediaEndpoints,
        uploads_dir: PathBuf,
        post_limit: usize,
    ) -> Self {
        let dispatcher = Dispatcher::new(store.clone(), settings.clone(), publisher);
        let http_client = media.http_client();
        Self {
            store,
            settings,
            dispatcher,
            auth: SessionAuth::new(),
            media,
            http_client,
            uploads_dir,
            post_limit,
        }
    }
}

pub use config::{get_config, update_config};
pub use health::health;
pub use posts::{delete_post, list_posts, retry_post, schedule_post};
pub use session::{auth_status, login};
pub use studio::{analyze_sake, clean_background, generate_background, label_export};
