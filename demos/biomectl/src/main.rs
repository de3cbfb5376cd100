//! biomectl: query a remote world generator from the command line.
//!
//! ```text
//! biomectl serve --generation rpc 127.0.0.1:25566
//! biomectl --generation rpc create 42 --world-type large_biomes
//! biomectl --generation rpc data 0 0 8 4 --quarter
//! ```
//!
//! The zero-copy generation only works inside one process, so for it the
//! tool starts a toy generator next to the client.

use std::path::PathBuf;

use anyhow::{Context, bail};
use biomewire::prelude::*;
use biomewire::protocol::WireCodec;
use biomewire::transport::Transport;
use biomewire::{GeneratorServer, ToyGenerator};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FRAMED: &str = "127.0.0.1:25565";
const DEFAULT_RPC: &str = "ws://127.0.0.1:25566";
const IPC_DIRECTORY: &str = "biomectl";

/// Talk to a remote world generator
#[derive(Parser)]
#[command(name = "biomectl")]
#[command(version)]
#[command(about = "Query or serve a remote world generator", long_about = None)]
struct Cli {
    /// Wire generation to speak
    #[arg(short, long, global = true, value_enum, default_value_t = Generation::Framed)]
    generation: Generation,

    /// Generator endpoint (host:port for framed, ws:// URL for rpc)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Client configuration as JSON
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Generation {
    Framed,
    Rpc,
    ZeroCopy,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the toy generator
    Serve {
        /// Address to listen on
        addr: Option<String>,
    },

    /// Fetch and print the generator's biome list
    List,

    /// Fetch biome ids for a rectangle
    Data {
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        y: i32,
        width: i32,
        height: i32,
        /// One sample per 4x4 blocks
        #[arg(short, long)]
        quarter: bool,
    },

    /// Create a world and sync its biomes
    Create {
        #[arg(allow_hyphen_values = true)]
        seed: i64,
        #[arg(short, long, default_value = "default")]
        world_type: String,
        /// Generator options, usually JSON
        #[arg(short, long, default_value = "")]
        options: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config: ClientConfig = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    if let Command::Serve { addr } = &cli.command {
        return serve(cli.generation, addr.as_deref()).await;
    }

    let builder = RemoteWorldClient::builder().config(config.clone());
    match cli.generation {
        Generation::Framed => {
            let endpoint = cli.endpoint.as_deref().unwrap_or(DEFAULT_FRAMED);
            let mut client = builder.connect_framed(endpoint).await?;
            run(&mut client, &cli.command).await
        }
        Generation::Rpc => {
            let endpoint = cli.endpoint.as_deref().unwrap_or(DEFAULT_RPC);
            let mut client = builder.connect_rpc(endpoint).await?;
            run(&mut client, &cli.command).await
        }
        Generation::ZeroCopy => {
            let driver = IpcDriver::new();
            let server_driver = driver.clone();
            let ipc = config.ipc.clone();
            let serving = tokio::spawn(async move {
                GeneratorServer::new(ToyGenerator::new())
                    .serve_ipc(&server_driver, IPC_DIRECTORY, ipc)
                    .await
            });

            let mut client = builder.connect_ipc(&driver, IPC_DIRECTORY).await?;
            let result = run(&mut client, &cli.command).await;
            serving.await??;
            result
        }
    }
}

async fn serve(generation: Generation, addr: Option<&str>) -> anyhow::Result<()> {
    let server = GeneratorServer::new(ToyGenerator::new());
    match generation {
        Generation::Framed => {
            let listener = TcpListener::bind(addr.unwrap_or(DEFAULT_FRAMED)).await?;
            server.serve_framed(listener).await;
        }
        Generation::Rpc => {
            let default = DEFAULT_RPC.trim_start_matches("ws://");
            let listener = TcpListener::bind(addr.unwrap_or(default)).await?;
            server.serve_rpc(listener).await;
        }
        Generation::ZeroCopy => {
            bail!("the zero-copy generation is in-process only; run a client command instead")
        }
    }
    Ok(())
}

async fn run<T: Transport, C: WireCodec>(
    client: &mut RemoteWorldClient<T, C>,
    command: &Command,
) -> anyhow::Result<()> {
    let profile = client.profile();
    tracing::info!(
        profile = profile.name(),
        version = profile.version_id(),
        generation = client.generation(),
        "connected"
    );

    let result = match command {
        Command::Serve { .. } => Ok(()),
        Command::List => client.get_biome_list().await.map(|report| {
            print_biomes(client.registry().as_ref(), &report);
        }),
        Command::Data {
            x,
            y,
            width,
            height,
            quarter,
        } => client
            .get_biome_data(*x, *y, *width, *height, *quarter)
            .await
            .map(|data| print_grid(&data, *width)),
        Command::Create {
            seed,
            world_type,
            options,
        } => {
            let world_type = WorldType::from_wire_name(world_type);
            client
                .create_world(*seed, world_type, options)
                .await
                .map(|report| {
                    println!("created {world_type} world with seed {seed}");
                    print_biomes(client.registry().as_ref(), &report);
                })
        }
    };

    client.close().await;
    Ok(result?)
}

fn print_biomes(registry: &dyn BiomeRegistry, report: &ReconcileReport) {
    for id in &report.ids {
        let Some(biome) = registry.get(*id) else {
            continue;
        };
        let new = if report.added.contains(id) { " (new)" } else { "" };
        println!("{:>4}  {}  {}{new}", id.0, biome.color, biome.name);
    }
    println!(
        "{} biomes, {} new, {} already known",
        report.ids.len(),
        report.added.len(),
        report.already_known
    );
}

fn print_grid(data: &[i32], width: i32) {
    let width = usize::try_from(width).unwrap_or(1).max(1);
    for row in data.chunks(width) {
        let line: Vec<String> = row.iter().map(|id| format!("{id:>3}")).collect();
        println!("{}", line.join(" "));
    }
}
