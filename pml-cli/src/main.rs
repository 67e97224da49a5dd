// CLI application
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "pml")]
#[command(about = "Mod loader and mixin patcher for PolyTrack")]
#[command(version)]
struct Cli {
    /// Loader config file (JSON or TOML). Defaults to the per-user config.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show the stored mod list
    List,
    /// Fetch every stored mod and show what was discovered
    Resolve,
    /// Add a mod by base URL
    Add {
        /// Base URL of the mod (the directory holding latest.json)
        base: String,

        /// Version to pin, or "latest"
        #[arg(short, long, default_value = "latest")]
        version: String,

        /// Keep resolving the newest version on every load
        #[arg(long)]
        auto_update: bool,
    },
    /// Remove a mod by ID
    Remove { id: String },
    /// Activate a mod on the next load
    Enable { id: String },
    /// Deactivate a mod on the next load
    Disable { id: String },
    /// Move a mod in the load order. Negative deltas raise priority.
    Reorder {
        id: String,

        #[arg(allow_hyphen_values = true)]
        delta: isize,
    },
    /// Run the full lifecycle and patch the host bundles
    Patch {
        /// Main game bundle
        #[arg(short, long)]
        main: PathBuf,

        /// Simulation worker bundle
        #[arg(short, long)]
        sim: Option<PathBuf>,

        /// Output directory for the patched bundles
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Also write the registered extensions as JSON
        #[arg(long)]
        table: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::List => commands::list_mods(&config)?,
        Commands::Resolve => {
            let pb = create_progress_bar("Fetching mods...");
            let loader = runtime.block_on(commands::discover(config))?;
            pb.finish_with_message("Discovery complete");
            commands::print_mods(&loader);
        }
        Commands::Add {
            base,
            version,
            auto_update,
        } => {
            let pb = create_progress_bar("Adding mod...");
            runtime.block_on(commands::add_mod(config, &base, &version, auto_update))?;
            pb.finish_with_message("Done");
        }
        Commands::Remove { id } => {
            let mut loader = runtime.block_on(commands::discover(config))?;
            commands::remove_mod(&mut loader, &id)?;
        }
        Commands::Enable { id } => {
            let mut loader = runtime.block_on(commands::discover(config))?;
            commands::set_loaded(&mut loader, &id, true)?;
        }
        Commands::Disable { id } => {
            let mut loader = runtime.block_on(commands::discover(config))?;
            commands::set_loaded(&mut loader, &id, false)?;
        }
        Commands::Reorder { id, delta } => {
            let mut loader = runtime.block_on(commands::discover(config))?;
            commands::reorder_mod(&mut loader, &id, delta)?;
        }
        Commands::Patch {
            main,
            sim,
            output_dir,
            table,
        } => {
            let pb = create_progress_bar("Loading mods...");
            let loader = runtime.block_on(commands::discover(config))?;
            pb.set_message("Patching bundles...");
            commands::patch_bundles(loader, &main, sim.as_deref(), &output_dir, table)?;
            pb.finish_with_message("Patching complete");
        }
    }

    Ok(())
}

fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb
}
