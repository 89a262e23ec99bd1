use clap::Parser;
use sakegram_http::serve;

#[derive(Parser)]
#[command(name = "sakegram", version, about = "Schedule and publish Instagram posts")]
struct Cli {
    /// Directory holding db.json, .env and uploads/
    #[arg(long, env = "SAKEGRAM_DATA_DIR", default_value = ".")]
    data_dir: String,
    /// Full listen address; overrides --port
    #[arg(long, env = "SAKEGRAM_BIND_ADDR")]
    bind_addr: Option<String>,
    #[arg(long, env = "PORT", default_value = "3001")]
    port: u16,
    /// Built front-end to serve at /
    #[arg(long, env = "SAKEGRAM_DIST_DIR")]
    dist_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let bind_addr = cli
        .bind_addr
        .unwrap_or_else(|| format!("0.0.0.0:{}", cli.port));
    std::env::set_var("SAKEGRAM_DATA_DIR", &cli.data_dir);
    std::env::set_var("SAKEGRAM_BIND_ADDR", &bind_addr);
    if let Some(dist_dir) = cli.dist_dir {
        std::env::set_var("SAKEGRAM_DIST_DIR", dist_dir);
    }

    serve().await
}
