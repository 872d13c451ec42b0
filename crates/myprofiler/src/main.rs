use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use query_profiler::{
    digest_dump, normalize_query, option_file_paths, read_option_files, render_now,
    ClientOptions, DumpSink, MySqlSource, Profiler, ProfilerConfig,
};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "myprofiler")]
#[command(version, about = "Casual MySQL profiler: the most frequent query shapes, live.")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample SHOW FULL PROCESSLIST and report the most frequent queries
    Profile(ProfileArgs),
    /// Rank the queries of a raw dump written by `profile --dump`
    Digest {
        path: PathBuf,
        /// How many most common queries to show
        #[arg(short = 'n', long, default_value_t = 10)]
        summary: usize,
    },
    /// Print the normalized shape of a single query
    Normalize { query: String },
}

#[derive(Args)]
struct ProfileArgs {
    /// Host of the database, or a Unix socket path [default: localhost]
    #[arg(long)]
    host: Option<String>,
    /// Port of the database [default: 3306]
    #[arg(long)]
    port: Option<u16>,
    /// User to connect as [default: $USER]
    #[arg(short, long)]
    user: Option<String>,
    #[arg(short, long, env = "MYSQL_PWD", hide_env_values = true)]
    password: Option<String>,
    /// Read MySQL configuration from this file in addition to ~/.my.cnf
    #[arg(short = 'e', long, value_name = "FILE")]
    defaults_extra_file: Option<PathBuf>,
    /// Also read the [client<SUFFIX>] group of the option files
    #[arg(short = 's', long, value_name = "SUFFIX")]
    defaults_group_suffix: Option<String>,
    /// Do not read any option file
    #[arg(long, conflicts_with_all = ["defaults_extra_file", "defaults_group_suffix"])]
    no_defaults: bool,
    /// How many most common queries to show
    #[arg(short = 'n', long, default_value_t = 10)]
    summary: usize,
    /// Limit how many recent samples are summarised (0 = all)
    #[arg(long, visible_alias = "window", default_value_t = 0)]
    limit: usize,
    /// Seconds between processlist samples
    #[arg(short, long, default_value_t = 1.0)]
    interval: f64,
    /// Print a report every N samples
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    delay: u32,
    /// Write raw queries to this file
    #[arg(short = 'o', long)]
    dump: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Profile(args) => profile(args).await?,
        Command::Digest { path, summary } => {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read dump file {}", path.display()))?;
            print!("{}", render_now(&digest_dump(&contents, summary)));
        }
        Command::Normalize { query } => println!("{}", normalize_query(&query)),
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn profile(args: ProfileArgs) -> anyhow::Result<()> {
    let config = ProfilerConfig::new(args.summary, args.limit, args.interval, args.delay)?;
    let from_files = if args.no_defaults {
        ClientOptions::default()
    } else {
        let paths = option_file_paths(args.defaults_extra_file.as_deref());
        read_option_files(&paths, args.defaults_group_suffix.as_deref())
            .context("failed to read option files")?
    };
    let flags = ClientOptions {
        host: args.host,
        port: args.port,
        user: args.user,
        password: args.password,
    };
    let login = ClientOptions {
        user: std::env::var("USER").ok(),
        ..ClientOptions::default()
    };
    let options = flags.or(from_files).or(login).into_connection_options();

    // Open the dump before connecting so a bad path fails fast.
    let dump = args
        .dump
        .as_ref()
        .map(|path| DumpSink::create(path))
        .transpose()
        .context("failed to prepare dump file")?;

    info!(server = %options.describe(), "connecting");
    let source = MySqlSource::connect(&options)
        .await
        .context("failed to connect to the database")?;

    let mut profiler = Profiler::new(source, config, io::stdout());
    if let Some(dump) = dump {
        profiler = profiler.with_dump(dump);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            // Keep the sender alive: dropping it would stop the profiler.
            warn!(error = %err, "unable to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("interrupt received, shutting down");
        let _ = shutdown_tx.send(true);
    });

    profiler.run(shutdown_rx).await;
    profiler
        .finish()
        .context("failed to write the final summary")?;

    let (source, _) = profiler.into_inner();
    source.disconnect().await;
    Ok(())
}
