use std::error::Error;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use clap::{Parser, Subcommand};
use log::{error, info};
use simplelog::*;
use taskpanel::modules::backend::{HttpBackend, TaskBackend};
use taskpanel::modules::poller::watch;
use taskpanel::modules::presenter::{render, Presenter};
use taskpanel::modules::serialize::{load_panel_config, save_panel_config, PanelConfig};
use taskpanel::modules::session::{ClientTaskSession, FileStore};
use taskpanel::modules::view::{progress_bar, TerminalView};

#[derive(Parser)]
#[command(
    name = "taskpanel",
    version,
    about = "Task panel for the scraping service",
    long_about = include_str!("../help.txt")
)]
struct Cli {
    #[arg(short = 'l', long = "log-file", default_value = "taskpanel.log")]
    log_file: String,

    #[arg(short = 'c', long = "config", default_value = "./panel.toml")]
    config: String,

    /// Overrides `session_file` from the configuration
    #[arg(short = 's', long = "session")]
    session: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a refresh run and track it as the active task
    Submit {
        /// Users to refresh; the backend's configured list when empty
        user_ids: Vec<String>,
    },
    /// Show the active task once
    Status,
    /// Follow the active task until it finishes
    Watch {
        #[arg(short = 'n', long = "max-polls")]
        max_polls: Option<usize>,
    },
    /// Stop the active task
    Cancel,
    /// Write the default configuration to the config path
    InitConfig,
}

fn init_logger(log_path: &str) -> Result<(), Box<dyn Error>> {
    WriteLogger::init(
        LevelFilter::Info,
        ConfigBuilder::new()
            .set_time_format_rfc3339()
            .build(),
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?,
    )?;
    Ok(())
}

fn build_presenter(
    config: &PanelConfig,
    session_path: &str,
) -> Result<Presenter<HttpBackend, TerminalView<Stdout>>, Box<dyn Error>> {
    let session = ClientTaskSession::load(Box::new(FileStore::new(session_path)))?;
    let backend = HttpBackend::new(&config.backend_url, config.request_timeout())?;
    Ok(Presenter::new(session, backend, TerminalView::new(io::stdout())))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logger(&cli.log_file)?;

    if let Command::InitConfig = cli.command {
        save_panel_config(&cli.config, &PanelConfig::default())?;
        println!("Wrote {}", cli.config);
        return Ok(());
    }

    let config = load_panel_config(&cli.config)?;
    let session_path = cli.session.clone().unwrap_or_else(|| config.session_file.clone());
    let mut presenter = build_presenter(&config, &session_path)?;
    info!("Backend at {}", presenter.backend().base_url());

    match cli.command {
        Command::Submit { user_ids } => {
            if let Err(e) = presenter.submit(&user_ids) {
                error!("Submit failed: {e}");
                return Err(e.into());
            }
        }
        Command::Status => match presenter.session().current_task_id().map(str::to_string) {
            None => println!("No active task"),
            Some(task_id) => match presenter.backend().task_status(&task_id) {
                Ok(status) => {
                    let effects = render(&status);
                    println!("Task {task_id}");
                    println!("{} {}", progress_bar(effects.progress), effects.message);
                    if let Some(started) = &status.start_time {
                        println!("started:       {started}");
                    }
                    if let Some(active) = &status.last_activity_time {
                        println!("last activity: {active}");
                    }
                }
                Err(e) => println!("Status unavailable: {e}"),
            },
        },
        Command::Watch { max_polls } => {
            let last = watch(&mut presenter, config.poll_interval(), max_polls);
            info!("Watch ended, last state: {last:?}");
        }
        Command::Cancel => {
            // the panel has shown the notice; the error only sets the exit code
            presenter.cancel()?;
        }
        Command::InitConfig => {}
    }

    Ok(())
}
