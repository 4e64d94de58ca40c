use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use registry_image_resource::{CheckRequest, InRequest, OutRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tracing::{debug, Level};

#[derive(Parser)]
#[command(version, about = "Image source model and content trust setup for registry resources")]
struct App {
    /// Log at debug level regardless of `source.debug`.
    #[arg(short, long, env = "RESOURCE_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the version and metadata for a fetched image.
    Metadata,
    /// Print the additional tags listed by `params.additional_tags`.
    Tags { source_dir: PathBuf },
    /// Print the version and metadata for a pushed image.
    OutMetadata {
        source_dir: PathBuf,
        #[arg(long)]
        digest: String,
    },
    /// Write the notary config directory for `source.content_trust`.
    PrepareTrust { dest: PathBuf },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    let args = App::parse();

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .wrap_err("failed to read request from stdin")?;

    let envelope: CheckRequest = parse(&input)?;

    let level = if args.debug || envelope.source.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    debug!(
        source = ?envelope.source,
        authenticated = envelope.source.has_credentials(),
        "Parsed request"
    );

    match args.command {
        Command::Metadata => {
            let request: InRequest = parse(&input)?;
            debug!(format = request.params.format(), "Describing image");
            emit(&request.response())
        }
        Command::Tags { source_dir } => {
            let request: OutRequest = parse(&input)?;
            emit(&request.params.parse_tags(&source_dir).await?)
        }
        Command::OutMetadata { source_dir, digest } => {
            let request: OutRequest = parse(&input)?;
            emit(&request.response(&digest, &source_dir).await?)
        }
        Command::PrepareTrust { dest } => {
            let trust = envelope
                .source
                .content_trust
                .as_ref()
                .ok_or_else(|| eyre!("no content_trust configured for {}", envelope.source.name()))?;

            let config_dir = trust
                .prepare_config_dir(&dest)
                .await
                .wrap_err("failed to prepare notary config")?;

            emit(&json!({ "config_dir": config_dir }))
        }
    }
}

fn parse<T: DeserializeOwned>(input: &str) -> color_eyre::eyre::Result<T> {
    serde_json::from_str(input).wrap_err("invalid request")
}

fn emit<T: Serialize>(value: &T) -> color_eyre::eyre::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
