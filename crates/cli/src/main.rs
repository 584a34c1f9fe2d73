use anyhow::Result;
use clap::{Parser, Subcommand};
use symtab_cli::commands::{
    apply_state_command, calls_command, functions_command, info_command, internal_command,
    lib_flag_command, lookup_command, modules_command, save_state_command,
};
use symtab_cli::load_config_or_default;

/// Inspect the module and function model recovered from an executable image.
///
/// This CLI is a thin wrapper around `symtab-core`; all substantive logic
/// lives in the library.
#[derive(Parser, Debug)]
#[command(
    name = "symtab",
    version,
    about = "Symbol-table and function-discovery inspector",
    long_about = None
)]
struct Cli {
    /// Parse-time configuration (JSON, or YAML for .yaml/.yml).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize an image: segments, counts and ingestion health.
    Info {
        /// Path to the executable or object file.
        path: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the modules recovered from an image.
    Modules {
        path: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List functions in address order.
    Functions {
        path: String,

        /// Only list functions of this module (short or full name).
        #[arg(long)]
        module: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Find functions by name or by start address.
    Lookup {
        path: String,

        /// Symbol-table or demangled name.
        #[arg(long, conflicts_with = "addr")]
        name: Option<String>,

        /// Start address, hex (`0x...`) or decimal.
        #[arg(long)]
        addr: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show a function's entry, return and call points.
    Calls {
        path: String,

        /// Function name.
        #[arg(long)]
        function: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Resolve a runtime helper symbol.
    Internal {
        path: String,

        #[arg(long)]
        name: String,
    },

    /// Save every function's tags to a state file.
    SaveState {
        path: String,

        /// Destination file (.json, or .yaml/.yml).
        #[arg(long)]
        out: String,
    },

    /// Merge a saved state file into the image.
    ApplyState {
        path: String,

        /// State file to merge.
        #[arg(long)]
        state: String,

        /// Write the merged tags to this file.
        #[arg(long)]
        out: Option<String>,
    },

    /// Set or clear the library tag for `/Code` or `/Code/<module>`.
    LibFlag {
        path: String,

        #[arg(long, default_value = "/Code")]
        resource: String,

        /// Clear the tag instead of setting it.
        #[arg(long, default_value_t = false)]
        clear: bool,

        /// Write the resulting tags to this state file.
        #[arg(long)]
        out: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config_or_default(cli.config.as_deref())?;
    log::debug!("symtab-core v{}", symtab_core::version());

    match cli.command {
        Command::Info { path, json } => info_command(&path, &config, json)?,
        Command::Modules { path, json } => modules_command(&path, &config, json)?,
        Command::Functions { path, module, json } => {
            functions_command(&path, &config, module.as_deref(), json)?
        }
        Command::Lookup { path, name, addr, json } => {
            lookup_command(&path, &config, name.as_deref(), addr.as_deref(), json)?
        }
        Command::Calls { path, function, json } => calls_command(&path, &config, &function, json)?,
        Command::Internal { path, name } => internal_command(&path, &config, &name)?,
        Command::SaveState { path, out } => save_state_command(&path, &config, &out)?,
        Command::ApplyState { path, state, out } => {
            apply_state_command(&path, &config, &state, out.as_deref())?
        }
        Command::LibFlag { path, resource, clear, out } => {
            lib_flag_command(&path, &config, &resource, clear, out.as_deref())?
        }
    }

    Ok(())
}
