//! todoist-mcp - MCP server exposing Todoist to AI assistants.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use todoist_api::TodoistClient;
use todoist_core::types::TaskFilter;
use todoist_core::{
    normalize, Config, ServerSettings, SettingsOverrides, TaskProvider, TransportKind,
    TransportSettings,
};
use todoist_mcp::{sse, transport, McpServer, ToolHandler};
use todoist_storage::{lookup_token, CredentialStore, KeychainStore, MemoryStore, TOKEN_KEY};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "todoist-mcp")]
#[command(author, version, about = "Todoist MCP server", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server
    Serve(ServeArgs),

    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Manage the stored API token
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// List active tasks as normalized JSON
    Tasks {
        /// Only tasks in this project
        #[arg(long)]
        project_id: Option<String>,

        /// Todoist filter query, e.g. "today | overdue"
        #[arg(short, long)]
        filter: Option<String>,

        #[command(flatten)]
        credentials: CredentialArgs,
    },
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Transport: stdio or sse
    #[arg(short, long)]
    transport: Option<TransportKind>,

    /// Host to bind (sse only)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (sse only)
    #[arg(short, long)]
    port: Option<u16>,

    #[command(flatten)]
    credentials: CredentialArgs,
}

#[derive(clap::Args)]
struct CredentialArgs {
    /// Todoist API token (overrides TODOIST_API_TOKEN and the keychain)
    #[arg(long)]
    token: Option<String>,

    /// Never read the token from the OS keychain
    #[arg(long)]
    no_keychain: bool,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print one value, e.g. `server.port`
    Get { key: String },

    /// Set one value, e.g. `server.transport sse`
    Set { key: String, value: String },

    /// Print the config file location
    Path,
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Store the API token in the OS keychain
    Login {
        /// Token to store; read from stdin when omitted
        #[arg(long)]
        token: Option<String>,
    },

    /// Remove the stored API token
    Logout,

    /// Report where the API token would be taken from
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout belongs to the stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match dotenv {
        Ok(path) => info!(path = ?path, "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring .env: {}", e),
    }

    let config_path = cli.config_file.as_deref();

    match cli.command {
        Some(Commands::Serve(args)) => serve(config_path, args).await,
        Some(Commands::Config { command }) => run_config(config_path, command),
        Some(Commands::Auth { command }) => run_auth(command),
        Some(Commands::Tasks {
            project_id,
            filter,
            credentials,
        }) => list_tasks(config_path, project_id, filter, credentials).await,
        None => {
            println!("todoist-mcp - Todoist MCP server");
            println!("Run with --help for usage information");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

fn resolve_settings(
    config_path: Option<&Path>,
    overrides: SettingsOverrides,
    no_keychain: bool,
) -> anyhow::Result<ServerSettings> {
    let config = load_config(config_path)?;
    let store: Box<dyn CredentialStore> = if no_keychain {
        Box::new(MemoryStore::new())
    } else {
        Box::new(KeychainStore::new())
    };
    let settings = ServerSettings::from_env(&config, &overrides, || lookup_token(store.as_ref()))?;
    Ok(settings)
}

fn build_client(settings: &ServerSettings) -> anyhow::Result<TodoistClient> {
    let client = match &settings.base_url {
        Some(url) => TodoistClient::with_base_url(url.as_str(), &settings.credential)?,
        None => TodoistClient::new(&settings.credential)?,
    };
    Ok(client)
}

async fn serve(config_path: Option<&Path>, args: ServeArgs) -> anyhow::Result<()> {
    let overrides = SettingsOverrides {
        token: args.credentials.token,
        transport: args.transport,
        host: args.host,
        port: args.port,
    };
    let settings = resolve_settings(config_path, overrides, args.credentials.no_keychain)?;

    let client = build_client(&settings)?;
    info!(
        transport = %settings.transport,
        base_url = client.base_url(),
        "Starting todoist MCP server"
    );
    let handler = Arc::new(ToolHandler::new(Arc::new(client)));

    match settings.transport {
        TransportSettings::Stdio => {
            transport::run_stdio(Arc::new(McpServer::new(handler)))
                .await
                .context("stdio transport failed")?;
        }
        TransportSettings::Sse { host, port } => {
            sse::serve(handler, &host, port)
                .await
                .with_context(|| format!("SSE transport on {}:{} failed", host, port))?;
        }
    }

    info!("MCP server stopped");
    Ok(())
}

fn run_config(config_path: Option<&Path>, command: ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = load_config(config_path)?;
            let rendered = toml::to_string_pretty(&config).context("Cannot render config")?;
            if rendered.trim().is_empty() {
                println!("(empty configuration)");
            } else {
                print!("{}", rendered);
            }
        }
        ConfigCommands::Get { key } => {
            let config = load_config(config_path)?;
            match config.get(&key)? {
                Some(value) => println!("{}", value),
                None => bail!("{} is not set", key),
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut config = load_config(config_path)?;
            config.set(&key, &value)?;
            match config_path {
                Some(path) => config.save_to(path)?,
                None => config.save()?,
            }
            println!("{} = {}", key, value);
        }
        ConfigCommands::Path => {
            let path = match config_path {
                Some(path) => path.to_path_buf(),
                None => Config::config_path()?,
            };
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn run_auth(command: AuthCommands) -> anyhow::Result<()> {
    let store = KeychainStore::new();

    match command {
        AuthCommands::Login { token } => {
            let token = match token {
                Some(token) => token,
                None => read_token()?,
            };
            let token = token.trim();
            if token.is_empty() {
                bail!("Refusing to store an empty token");
            }
            store.store(TOKEN_KEY, token)?;
            println!("Token stored in the OS keychain");
        }
        AuthCommands::Logout => {
            store.delete(TOKEN_KEY)?;
            println!("Stored token removed");
        }
        AuthCommands::Status => {
            let env_set = std::env::var(todoist_core::config::TOKEN_ENV)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false);
            if env_set {
                println!(
                    "Using {} from the environment",
                    todoist_core::config::TOKEN_ENV
                );
            } else if lookup_token(&store).is_some() {
                println!("Using the token stored in the OS keychain");
            } else {
                println!("No token configured");
            }
        }
    }
    Ok(())
}

fn read_token() -> anyhow::Result<String> {
    eprint!("Todoist API token: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Cannot read token from stdin")?;
    Ok(line)
}

async fn list_tasks(
    config_path: Option<&Path>,
    project_id: Option<String>,
    filter: Option<String>,
    credentials: CredentialArgs,
) -> anyhow::Result<()> {
    let overrides = SettingsOverrides {
        token: credentials.token,
        ..Default::default()
    };
    let settings = resolve_settings(config_path, overrides, credentials.no_keychain)?;
    let client = build_client(&settings)?;

    let tasks = client
        .get_tasks(TaskFilter {
            project_id,
            filter,
            ..Default::default()
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&normalize(&tasks)?)?);
    Ok(())
}
