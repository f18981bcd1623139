// src/main.rs

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use keg::{CommandEditor, Config, Dex, DexEntry, Keg, PlainRenderer, PromptChooser, Target};

#[derive(Parser)]
#[command(name = "keg", version, about = "Knowledge exchange graph index")]
struct Cli {
    /// Config file (defaults to $KEG_CONFIG, then the user config dir)
    #[arg(long, global = true, env = "KEG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Make the working directory a keg
    Init,
    /// Create a new node and open it in the editor
    Create {
        /// Start from sample content
        #[arg(long)]
        sample: bool,
    },
    /// Edit a node (ID, `same`, `last`, or title pattern)
    Edit { target: String },
    /// Print a node's content
    View { target: String },
    /// Delete a node
    Delete { target: String },
    /// Index maintenance
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },
    /// Highest-numbered node
    Last {
        #[arg(value_enum)]
        field: Option<Field>,
    },
    /// Most recently changed nodes
    Changes { count: Option<usize> },
    /// Nodes whose title matches
    Titles {
        pattern: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// A random node
    Random {
        #[arg(value_enum)]
        field: Option<RandomField>,
    },
    /// Copy node directories in as new nodes
    Import { dirs: Vec<PathBuf> },
    /// Search node content
    Grep { pattern: String },
    /// Name and directory of the current keg
    Current,
    /// Directory of the current keg, or of a node in it
    Directory { target: Option<String> },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Rebuild both dex artifacts from the node tree
    Update,
}

#[derive(Clone, Copy, ValueEnum)]
enum Field {
    Id,
    Dir,
    Title,
    Time,
}

#[derive(Clone, Copy, ValueEnum)]
enum RandomField {
    Id,
    Title,
    Dir,
    Edit,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Command::Init = cli.command {
        let cwd = std::env::current_dir()?;
        let keg = Keg::init(&cwd, &config)?;
        println!("{}", keg.path().display());
        return Ok(());
    }

    let keg = Keg::current(&config).context("no keg found (set KEG_CURRENT or run `keg init`)")?;
    run(&keg, cli.command)
}

fn run(keg: &Keg, command: Command) -> Result<()> {
    let config = keg.config();
    match command {
        Command::Init => unreachable!("handled before keg resolution"),
        Command::Create { sample } => {
            let editor = CommandEditor::from_config(config);
            match keg.create(&editor, sample)? {
                Some(id) => println!("{}", id),
                None => tracing::info!("[Keg] Nothing saved"),
            }
        }
        Command::Edit { target } => {
            if let Some(entry) = resolve(keg, &target)? {
                keg.edit(entry.n, &CommandEditor::from_config(config))?;
            }
        }
        Command::View { target } => {
            if let Some(entry) = resolve(keg, &target)? {
                print!("{}", keg.view(entry.n, &PlainRenderer)?);
            }
        }
        Command::Delete { target } => {
            if let Some(entry) = resolve(keg, &target)? {
                keg.delete(entry.n)?;
                println!("deleted {}", entry.n);
            }
        }
        Command::Index { action: IndexAction::Update } => {
            let dex = keg.publisher().rebuild()?;
            tracing::info!("[Keg] Indexed {} nodes", dex.len());
        }
        Command::Last { field } => {
            let entry = keg.last()?;
            match field {
                None => print!("{}", listing(&Dex::from_iter([entry]), config.columns)),
                Some(Field::Id) => println!("{}", entry.n),
                Some(Field::Dir) => println!("{}", keg.node_dir(entry.n).display()),
                Some(Field::Title) => println!("{}", entry.t),
                Some(Field::Time) => println!("{}", entry.updated()),
            }
        }
        Command::Changes { count } => {
            let dex = keg.changes(count.unwrap_or(config.changes_default))?;
            print!("{}", listing(&dex, config.columns));
        }
        Command::Titles { pattern, json } => {
            let dex = keg.titles(pattern.as_deref().unwrap_or(""))?;
            if json {
                println!("{}", serde_json::to_string(&dex)?);
            } else {
                print!("{}", listing(&dex, config.columns));
            }
        }
        Command::Random { field } => {
            let entry = keg.random(&mut rand::rng())?;
            match field {
                None => print!("{}", listing(&Dex::from_iter([entry]), config.columns)),
                Some(RandomField::Id) => println!("{}", entry.n),
                Some(RandomField::Title) => println!("{}", entry.t),
                Some(RandomField::Dir) => println!("{}", keg.node_dir(entry.n).display()),
                Some(RandomField::Edit) => {
                    keg.edit(entry.n, &CommandEditor::from_config(config))?;
                }
            }
        }
        Command::Import { dirs } => {
            let dirs = if dirs.is_empty() { vec![std::env::current_dir()?] } else { dirs };
            let ids = keg.import(&dirs)?;
            for id in ids {
                println!("{}", id);
            }
        }
        Command::Grep { pattern } => {
            for hit in keg.grep(&pattern)? {
                println!("{}:{}: {}", hit.id, hit.line, hit.text);
            }
        }
        Command::Current => println!("{} {}", keg.name(), keg.path().display()),
        Command::Directory { target: None } => println!("{}", keg.path().display()),
        Command::Directory { target: Some(target) } => {
            if let Some(entry) = resolve(keg, &target)? {
                println!("{}", keg.node_dir(entry.n).display());
            }
        }
    }
    Ok(())
}

fn resolve(keg: &Keg, target: &str) -> Result<Option<DexEntry>> {
    let target: Target = target.parse()?;
    let mut chooser = PromptChooser::stdio();
    Ok(keg.resolve(&target, &mut chooser)?)
}

/// Aligned columns on a terminal, markdown include lines otherwise.
fn listing(dex: &Dex, columns: usize) -> String {
    if io::stdout().is_terminal() {
        dex.pretty(columns)
    } else {
        dex.as_includes()
    }
}
