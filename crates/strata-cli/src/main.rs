mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{Context, EXIT_DESCRIPTOR_ERROR, EXIT_FAILURE, EXIT_VARIABLE_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;
use strata_schema::Defaults;

#[derive(Debug, Parser)]
#[command(
    name = "strata",
    version,
    about = "Compose layered appliance descriptors into one effective configuration"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    /// TOML file with fallback values (password, cpus, memory, network).
    /// Defaults to ~/.config/strata/defaults.toml when it exists.
    #[arg(long, global = true)]
    defaults: Option<PathBuf>,

    /// Descriptor format hint for files without a recognised extension
    /// (e.g. "text/yaml").
    #[arg(long, global = true)]
    content_type: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the effective descriptor composed from a descriptor tree.
    Compose {
        /// Root appliance descriptor (.appl, .yml, .yaml or .toml).
        descriptor: PathBuf,
    },
    /// Show the flattened include order and the order layers are composed in.
    Tree {
        /// Root appliance descriptor.
        descriptor: PathBuf,
    },
    /// Print the resolved variables of the effective descriptor.
    Vars {
        /// Root appliance descriptor.
        descriptor: PathBuf,
    },
    /// Print the identity hash of the effective descriptor.
    Identity {
        /// Root appliance descriptor.
        descriptor: PathBuf,
    },
    /// Print the build-tree locations of the effective descriptor.
    Paths {
        /// Root appliance descriptor.
        descriptor: PathBuf,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("STRATA_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let defaults = match &cli.defaults {
        Some(path) => Defaults::load(path),
        None => Defaults::load_default(),
    };
    let defaults = match defaults {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let ctx = Context {
        defaults,
        content_type: cli.content_type,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Compose { descriptor } => commands::compose::run(&ctx, &descriptor),
        Commands::Tree { descriptor } => commands::tree::run(&ctx, &descriptor),
        Commands::Vars { descriptor } => commands::vars::run(&ctx, &descriptor),
        Commands::Identity { descriptor } => commands::identity::run(&ctx, &descriptor),
        Commands::Paths { descriptor } => commands::paths::run(&ctx, &descriptor),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("descriptor error:")
                || msg.starts_with("appliance descriptor not found")
                || msg.starts_with("appliance include cycle")
            {
                EXIT_DESCRIPTOR_ERROR
            } else if msg.starts_with("variable reference cycle") {
                EXIT_VARIABLE_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
