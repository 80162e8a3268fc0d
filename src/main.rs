use anyhow::Context;
use bootup_launcher::registry::{display_name, normalize_category, DEFAULT_CATEGORY};
use bootup_launcher::settings::{app_dir, Settings, SETTINGS_FILE};
use bootup_launcher::{logging, LaunchOutcome, Launcher, RegistryStore};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bootup")]
#[command(about = "Launch groups of applications by category")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to settings.json beside the executable)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    /// Category store to use instead of the configured one
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
    /// Launch the configured startup category without prompting
    #[arg(long)]
    startup: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all categories
    Categories,
    /// List the applications in a category
    List { category: Option<String> },
    /// Create a new, empty category
    AddCategory { name: String },
    /// Delete a category and all its applications
    RemoveCategory {
        name: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Add an application or shortcut to a category
    Add { category: String, path: PathBuf },
    /// Remove the application at INDEX (as shown by `list`) from a category
    Remove { category: String, index: usize },
    /// Launch every application in a category
    Run { category: Option<String> },
}

/// Parse the command line, rejecting `--startup` combined with a subcommand.
fn parse_cli<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    if cli.startup && cli.command.is_some() {
        return Err(Cli::command().error(
            ErrorKind::ArgumentConflict,
            "--startup cannot be combined with a subcommand",
        ));
    }
    Ok(cli)
}

fn main() -> anyhow::Result<()> {
    let cli = parse_cli(std::env::args_os()).unwrap_or_else(|e| e.exit());

    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(|| app_dir().join(SETTINGS_FILE));
    let settings = Settings::load(&settings_path.to_string_lossy())
        .with_context(|| format!("reading settings from {}", settings_path.display()))?;
    logging::init(cli.debug || settings.debug_logging, settings.log_file());

    let store_path = cli.store.clone().unwrap_or_else(|| settings.store_path());
    let mut store = RegistryStore::open(&store_path)
        .with_context(|| format!("loading categories from {}", store_path.display()))?;

    if cli.startup {
        let category = settings
            .startup_category
            .as_deref()
            .map(|c| store.registry().resolve_category(c))
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        println!("Running applications at startup...");
        return run(&store, &category);
    }

    match cli.command {
        None => {
            let category = choose_category(&store)?;
            run(&store, &category)
        }
        Some(Commands::Run { category }) => {
            let category = match category {
                Some(c) => c,
                None => choose_category(&store)?,
            };
            run(&store, &category)
        }
        Some(Commands::Categories) => {
            let reg = store.registry();
            for name in reg.categories() {
                let count = reg.entries(name).map(|e| e.len()).unwrap_or(0);
                println!("{name} ({count})");
            }
            Ok(())
        }
        Some(Commands::List { category }) => {
            let reg = store.registry();
            let category = match category {
                Some(c) => normalize_category(&c),
                None => reg.first_category().unwrap_or(DEFAULT_CATEGORY).to_string(),
            };
            let entries = reg.entries(&category)?;
            if entries.is_empty() {
                println!("No applications in '{category}'.");
            }
            for (i, path) in entries.iter().enumerate() {
                println!("{i:>3}  {:<24} {path}", display_name(path));
            }
            Ok(())
        }
        Some(Commands::AddCategory { name }) => {
            let name = store.add_category(&name)?;
            println!("Created new category: '{name}'");
            Ok(())
        }
        Some(Commands::RemoveCategory { name, yes }) => {
            let removed = store.remove_category(&name, |n| {
                yes || confirm(&format!("Delete category '{n}' and all its apps?"))
            })?;
            match removed {
                Some(_) => println!("Category '{}' has been removed.", normalize_category(&name)),
                None => println!("Nothing removed."),
            }
            Ok(())
        }
        Some(Commands::Add { category, path }) => {
            let path = absolute(&path)?;
            store.add_entry(&category, &path)?;
            println!("Added {} to '{}'", path, normalize_category(&category));
            Ok(())
        }
        Some(Commands::Remove { category, index }) => {
            let removed = store.remove_entry(&category, index)?;
            println!("Removed:\n{removed}");
            Ok(())
        }
    }
}

fn run(store: &RegistryStore, category: &str) -> anyhow::Result<()> {
    let outcomes = Launcher::new().run_category(store.registry(), category)?;
    if outcomes.is_empty() {
        println!("No applications to run in this category.");
        return Ok(());
    }
    println!("Starting applications for {}...", normalize_category(category));
    for outcome in &outcomes {
        match outcome {
            LaunchOutcome::Launched(path) => println!("  started {}", display_name(path)),
            LaunchOutcome::Failed { path, reason } => {
                eprintln!("Could not launch:\n{path}\n\n{reason}")
            }
        }
    }
    Ok(())
}

fn choose_category(store: &RegistryStore) -> anyhow::Result<String> {
    let reg = store.registry();
    println!("What do you plan to do today?");
    for name in reg.categories() {
        println!("- {}", capitalize(name));
    }
    let input = prompt("Choose a category: ")?;
    let chosen = reg.resolve_category(&input);
    if !reg.contains_category(&input) {
        println!(
            "No valid category chosen, defaulting to {}.",
            capitalize(DEFAULT_CATEGORY)
        );
    }
    Ok(chosen)
}

fn prompt(msg: &str) -> anyhow::Result<String> {
    print!("{msg}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn confirm(question: &str) -> bool {
    prompt(&format!("{question} [y/N] "))
        .map(|a| matches!(a.to_lowercase().as_str(), "y" | "yes"))
        .unwrap_or(false)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn absolute(path: &Path) -> anyhow::Result<String> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(path.to_string_lossy().into_owned())
}
