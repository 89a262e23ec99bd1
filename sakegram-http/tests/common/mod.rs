use sakegram::{GraphPublisher, PostStore, Settings, SettingsStore};
use sakegram_graph::GraphConfig;
use sakegram_http::handlers::AppState;
use sakegram_http::{build_router, ServerConfig};
use sakegram_media::MediaEndpoints;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub struct TestServer {
    pub addr: String,
    pub state: Arc<AppState>,
    pub dir: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub struct TestOptions {
    pub settings: Settings,
    pub graph: GraphConfig,
    pub media: MediaEndpoints,
    pub with_front_end: bool,
    pub post_limit: usize,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            graph: GraphConfig {
                poll_interval: Duration::from_millis(1),
                probe_images: false,
                ..GraphConfig::default()
            },
            media: MediaEndpoints::default(),
            with_front_end: false,
            post_limit: 100,
        }
    }
}

#[allow(dead_code)]
pub async fn spawn_server() -> TestServer {
    spawn_server_with(TestOptions::default()).await
}

pub async fn spawn_server_with(options: TestOptions) -> TestServer {
    let dir = TempDir::new().unwrap();
    let mut config = ServerConfig::with_data_dir(dir.path());
    config.dist_dir = dir.path().join("dist");
    config.post_limit = options.post_limit;
    if options.with_front_end {
        std::fs::create_dir_all(&config.dist_dir).unwrap();
        std::fs::write(
            config.dist_dir.join("index.html"),
            "<!doctype html><title>Sakegram</title>",
        )
        .unwrap();
    }

    let store = Arc::new(PostStore::open(config.db_path()).unwrap());
    let settings = Arc::new(SettingsStore::with_settings(
        &config.settings_file,
        options.settings,
    ));
    let state = Arc::new(AppState::new(
        store,
        settings,
        Arc::new(GraphPublisher::new(options.graph)),
        options.media,
        config.uploads_dir.clone(),
        config.post_limit,
    ));

    let app = build_router(state.clone(), &config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    TestServer { addr, state, dir }
}

/// A small valid PNG.
#[allow(dead_code)]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([180, 40, 40, 255]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

#[allow(dead_code)]
pub fn image_part(width: u32, height: u32) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(png_bytes(width, height))
        .file_name("bottle.png")
        .mime_str("image/png")
        .unwrap()
}
