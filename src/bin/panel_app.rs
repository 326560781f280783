use clap::Parser;
use log::{error, info};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::env;
use std::net::SocketAddr;
use taskpanel::modules::proxy::{router, ProxyState};
use taskpanel::modules::serialize::load_panel_config;

#[derive(Parser)]
#[command(
    name = "panel_app",
    version,
    about = "Development proxy that forwards task panel API paths to the backend",
    long_about = None
)]
struct Cli {
    #[arg(short = 'c', long = "config", default_value = "./panel.toml")]
    config: String,

    /// Overrides `backend_url` from the configuration
    #[arg(short = 'b', long = "backend")]
    backend: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = TermLogger::init(
        LevelFilter::Info,
        ConfigBuilder::new().set_time_format_rfc3339().build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("logger unavailable: {e}");
    }

    let mut config = match load_panel_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Cannot read {}: {e}", cli.config);
            std::process::exit(1);
        }
    };
    if let Some(backend) = cli.backend {
        config.backend_url = backend;
    }

    let state = match ProxyState::new(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("Invalid backend url {}: {e}", config.backend_url);
            std::process::exit(1);
        }
    };

    let port = env::var("PANEL_APP_PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(config.proxy.listen_port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("Panel proxy running on http://{addr} -> {}", config.backend_url);
    info!("Forwarding {:?}", config.proxy.prefixes);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind port");
    axum::serve(listener, router(state))
        .await
        .expect("server error");
}
