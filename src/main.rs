use std::{net::SocketAddr, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sitepipe::{
    config::{Config, CONFIG_FILE},
    files,
    layout::Layout,
    pipeline::{self, ProdOptions},
    scaffold::create_new,
    tasks::Context,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(about, version)]
struct Args {
    /// config file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,
    /// port for the development server, overrides the config
    #[arg(long, global = true)]
    port: Option<u16>,
    /// command
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// run the stylesheet, html and script linters
    Linters,
    /// scan the generated pages and write accessibility reports
    Accessibility,
    /// build for development, then serve with live reload and rebuild on changes
    Dev,
    /// build for production, then serve the result
    Prod {
        /// stop after building
        #[arg(long)]
        no_serve: bool,
        /// copy the finished site into the docs directory
        #[arg(long)]
        docs: bool,
    },
    /// serve the output directory as it is
    Serve,
    /// remove the output directory
    Clean,
    /// create a new minimal site
    New {
        /// name of the new site
        name: String,
    },
}

fn init_env_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitepipe=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn context(args: &Args) -> anyhow::Result<Arc<Context>> {
    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load `{}`", args.config.display()))?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    let layout = Layout::new(&config);
    Ok(Arc::new(Context::new(config, layout)))
}

fn address(ctx: &Context) -> SocketAddr {
    SocketAddr::from((ctx.config.server.host, ctx.config.server.port))
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    match &args.command {
        Commands::Linters => {
            init_env_logger();
            let ctx = context(&args)?;
            let findings = pipeline::linters(&ctx).await?;
            if findings > 0 {
                log::error!("Linters reported {findings} issue(s)");
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Accessibility => {
            init_env_logger();
            pipeline::accessibility(&context(&args)?).await?;
        }
        Commands::Dev => {
            init_tracing();
            let ctx = context(&args)?;
            pipeline::dev(&ctx, address(&ctx)).await?;
        }
        Commands::Prod { no_serve, docs } => {
            init_tracing();
            let ctx = context(&args)?;
            let options = ProdOptions {
                docs: *docs,
                serve: (!no_serve).then(|| address(&ctx)),
            };
            pipeline::prod(&ctx, options).await?;
        }
        Commands::Serve => {
            init_tracing();
            let ctx = context(&args)?;
            pipeline::serve(&ctx, address(&ctx)).await?;
        }
        Commands::Clean => {
            init_env_logger();
            let ctx = context(&args)?;
            log::info!("Removing `{}`", ctx.layout.output.display());
            files::remove_dir(&ctx.layout.output)?;
        }
        Commands::New { name } => {
            init_env_logger();
            create_new(name)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            log::error!("Encountered error `{err:#}`");
            ExitCode::FAILURE
        }
    }
}
