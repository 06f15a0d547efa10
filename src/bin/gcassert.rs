//! gcassert command line
//!
//! Usage: gcassert verify [options] <package> [-- <go build args>]

use clap::{Parser, Subcommand};
use gcassert::OutputFormat;
use std::path::PathBuf;
use tracing::Level;

mod cli;

#[derive(Parser)]
#[command(name = "gcassert")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Assert that the Go compiler inlines calls and eliminates bounds checks where annotated", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a package and check its //gcassert directives
    Verify {
        /// Package path, relative to the working directory (`dir/...` recurses)
        package: String,

        /// Go toolchain binary
        #[arg(long, env = "GCASSERT_GO", default_value = gcassert::config::DEFAULT_GO)]
        go: String,

        /// Value passed to `go build -gcflags=`
        #[arg(long, default_value = gcassert::config::DEFAULT_GCFLAGS)]
        gcflags: String,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,

        /// Directory to build in and report paths relative to
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Check against a saved compiler log instead of running the build
        #[arg(long)]
        log: Option<PathBuf>,

        /// Extra arguments for `go build`
        #[arg(last = true)]
        build_args: Vec<String>,
    },

    /// List the directives of a package without building it
    List {
        /// Package path, relative to the working directory (`dir/...` recurses)
        package: String,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,

        /// Directory report paths are relative to
        #[arg(long)]
        work_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    gcassert::telemetry::init_tracing(cli.json_logs, level);

    let exit_code = match cli.command {
        Commands::Verify {
            package,
            go,
            gcflags,
            format,
            work_dir,
            log,
            build_args,
        } => {
            let config = gcassert::Config {
                go,
                gcflags,
                build_args,
                work_dir,
                format,
                ..gcassert::Config::default()
            };
            cli::verify::handle_verify(&config, &package, log.as_deref()).await
        }
        Commands::List {
            package,
            format,
            work_dir,
        } => {
            let config = gcassert::Config {
                work_dir,
                format,
                ..gcassert::Config::default()
            };
            cli::list::handle_list(&config, &package)
        }
    };

    std::process::exit(exit_code);
}
