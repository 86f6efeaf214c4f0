use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rustdesk_updater::*;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "rustdesk-updater")]
#[command(about = "RustDesk self-update coordinator")]
struct Args {
    /// Configuration file path (defaults to $RUSTDESK_UPDATER_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the relaunch flag and installation state
    Status,
    /// Run the "will relaunch" transition against the installed system
    WillRelaunch,
    /// Clear the relaunch flag
    Clear,
    /// Show the update-available notification
    Notify {
        /// Version shown to the user
        display_version: String,
    },
    /// Run a command through the configured shell
    Run {
        /// Command text
        command: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Classify before clap sees the arguments: any argument at all means
    // this is not an updater relaunch.
    let launch = LaunchMode::from_env();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(format!("rustdesk_updater={}", args.log_level))
        .init();

    // A bare relaunch must not fail over a broken config file.
    let config = if args.command.is_none() {
        UpdaterConfig::load_or_fallback(args.config.as_deref())
    } else {
        UpdaterConfig::load_or_default(args.config.as_deref())?
    };
    let coordinator = Arc::new(PostUpdateCoordinator::from_config(&config));
    let listener = LifecycleListener::new(
        create_platform_backend("RustDesk"),
        Arc::clone(&coordinator),
    );

    match args.command {
        None => match coordinator.check_reinstall_service(&launch) {
            // A standalone host has nothing else to do, so it waits for the
            // background reinstall before exiting.
            Some(dispatch) => match dispatch.wait().await {
                Ok(output) => print!("{}", output),
                Err(e) => error!("{}", e),
            },
            None => info!("No post-update work pending"),
        },
        Some(Commands::Status) => {
            println!("state: {:?}", coordinator.state());
            for (store, value) in coordinator.flag().status() {
                match value {
                    Some(set) => println!("flag[{}]: {}", store, set),
                    None => println!("flag[{}]: unreadable", store),
                }
            }
            let facts = InstallationFacts::snapshot(coordinator.installation());
            println!("installed: {}", facts.installed);
            println!("daemon installed: {}", facts.daemon_installed);
            println!("service stopped: {}", facts.service_stopped);
            println!("reinstall command: {}", coordinator.reinstall_command());
        }
        Some(Commands::WillRelaunch) => {
            listener.on_event(&UpdaterEvent::WillRelaunch);
            println!("state: {:?}", coordinator.state());
        }
        Some(Commands::Clear) => {
            coordinator.flag().clear();
            println!("state: {:?}", coordinator.state());
        }
        Some(Commands::Notify { display_version }) => {
            let item = UpdateItem::new(display_version.clone(), display_version);
            listener.on_event(&UpdaterEvent::ValidUpdateFound(item));
        }
        Some(Commands::Run { command }) => {
            let runner = ShellRunner::from_config(&config.reinstall);
            let output = tokio::task::spawn_blocking(move || runner.run(&command)).await??;
            print!("{}", output);
        }
    }

    Ok(())
}
