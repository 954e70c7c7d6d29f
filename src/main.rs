use clap::Parser;
use robert_capture::server::{routes, AppState, LaunchOptions};
use robert_capture::CaptureSettings;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 9670)]
    port: u16,

    /// Chrome executable to launch instead of the detected one
    #[arg(long)]
    chrome_path: Option<String>,

    /// Launch Chrome with --no-sandbox (Linux AppArmor workaround)
    #[arg(long)]
    no_sandbox: bool,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// JSON file with the capture settings used when a request has none
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    log::info!("Starting Robert Capture on port {}", args.port);

    let settings = match &args.settings {
        Some(path) => {
            log::info!("Loading capture settings from {}", path.display());
            CaptureSettings::from_file(path).await?
        }
        None => CaptureSettings::default(),
    };

    let state = Arc::new(
        AppState::new(LaunchOptions {
            chrome_path: args.chrome_path,
            no_sandbox: args.no_sandbox,
            headed: args.headed,
        })
        .with_settings(settings),
    );

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            log::info!("Listening on http://{}", addr);
            warp::serve(routes(state))
                .run_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
                .await;
            Ok(())
        }
        Err(e) => {
            log::error!("Failed to bind to port {}: {}", args.port, e);
            eprintln!(
                "Error: Port {} is already in use or unavailable.",
                args.port
            );
            std::process::exit(1);
        }
    }
}
