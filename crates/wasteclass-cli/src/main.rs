mod config;

use std::collections::HashMap;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use wasteclass_core::food_waste;
use wasteclass_sync::{ArtifactFetcher, ClientSecret, OAuthClient};
use wasteclass_web::{AppState, ArtifactSource, ModelProvider};

use crate::config::{ArtifactArgs, CredentialArgs, RemoteArgs, artifact_source, parse_field};

#[derive(Parser)]
#[command(name = "wasteclass", version, about = "Food-waste category prediction service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the prediction form and endpoint.
    Serve(ServeArgs),
    /// Run one prediction from the command line.
    Predict(PredictArgs),
    /// Download remote artifacts without serving.
    Fetch(FetchArgs),
    /// Obtain OAuth credentials interactively and cache them.
    Authorize(CredentialArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = "WASTECLASS_BIND", default_value = "0.0.0.0:5000")]
    bind: String,

    /// Defer loading local artifacts until the first request.
    #[arg(long)]
    lazy: bool,

    #[command(flatten)]
    artifacts: ArtifactArgs,

    #[command(flatten)]
    remote: RemoteArgs,
}

#[derive(Args)]
struct PredictArgs {
    /// Feature value as `name=value`; repeat for every schema field.
    #[arg(long = "field", value_parser = parse_field, required = true)]
    fields: Vec<(String, String)>,

    #[command(flatten)]
    artifacts: ArtifactArgs,

    #[command(flatten)]
    remote: RemoteArgs,
}

#[derive(Args)]
struct FetchArgs {
    #[command(flatten)]
    artifacts: ArtifactArgs,

    #[command(flatten)]
    remote: RemoteArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("wasteclass v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Predict(args) => predict(args).await,
        Command::Fetch(args) => fetch(args).await,
        Command::Authorize(args) => authorize(args).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let source = artifact_source(&args.artifacts, &args.remote);
    let eager = matches!(source, ArtifactSource::Local(_)) && !args.lazy;
    let provider = ModelProvider::new(source, food_waste::schema_v1());

    if eager {
        provider
            .pipeline()
            .await
            .context("loading local artifacts (use --lazy to defer)")?;
    }
    tracing::info!(
        source = provider.source_name(),
        loaded = provider.is_loaded(),
        "model provider ready"
    );

    wasteclass_web::serve(&args.bind, AppState::new(provider))
        .await
        .with_context(|| format!("serving on {}", args.bind))
}

async fn predict(args: PredictArgs) -> anyhow::Result<()> {
    let source = artifact_source(&args.artifacts, &args.remote);
    let provider = ModelProvider::new(source, food_waste::schema_v1());
    let form: HashMap<String, String> = args.fields.into_iter().collect();

    let pipeline = provider.pipeline().await.map_err(|e| {
        let kind = e.kind();
        anyhow::Error::new(e).context(format!("loading artifacts [{kind}]"))
    })?;
    let prediction = pipeline.predict(&form).map_err(|e| {
        let kind = e.kind();
        anyhow::Error::new(e).context(format!("prediction failed [{kind}]"))
    })?;

    println!("{}", prediction.label);
    Ok(())
}

async fn fetch(args: FetchArgs) -> anyhow::Result<()> {
    let config = args
        .remote
        .remote_config(args.artifacts.paths())
        .context("--drive-model-id and --drive-scaler-id are required for fetch")?;
    let fetcher = ArtifactFetcher::new(config);

    let paths = fetcher
        .ensure_local()
        .await
        .context("fetching remote artifacts")?;
    println!("model:  {}", paths.model.display());
    println!("scaler: {}", paths.scaler.display());
    Ok(())
}

async fn authorize(args: CredentialArgs) -> anyhow::Result<()> {
    let secret = ClientSecret::from_file(&args.client_secret)
        .await
        .with_context(|| format!("reading {}", args.client_secret.display()))?;
    let oauth = OAuthClient::new(secret, args.token_cache.clone(), args.scope);

    let url = oauth.authorization_url()?;
    eprintln!("Open this URL in a browser and grant access:\n\n  {url}\n");
    eprintln!("Paste the `code` parameter from the redirect URL:");

    let mut code = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut code)
        .await
        .context("reading authorization code")?;
    anyhow::ensure!(!code.trim().is_empty(), "no authorization code entered");

    oauth
        .exchange_code(&code)
        .await
        .context("exchanging authorization code")?;
    eprintln!("Credentials saved to {}", args.token_cache.display());
    Ok(())
}
