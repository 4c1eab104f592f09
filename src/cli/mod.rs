//! CLI surface for noid-rs.
//!
//! Goal:
//! - one subcommand per minter operation, thin handlers
//! - global flags for settings file, backend, generator and data dir
//! - exit code 0 on success, 1 on any failure

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::{self, Settings};
use crate::store::Backend;
use crate::{Error, Result};

mod commands;
mod render;

// =============================================================================
// Entry + global options
// =============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "noid",
    version,
    about = "Nice Opaque Identifier minter and binder",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Settings file (default: the standard config location).
    #[arg(short = 'f', long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Storage backend: redb, sqlite, xml or memory.
    #[arg(short = 't', long, global = true, value_name = "BACKEND")]
    pub backend: Option<String>,

    /// PRNG name recorded for random minters.
    #[arg(short = 'g', long, global = true, value_name = "GENERATOR")]
    pub generator: Option<String>,

    /// Base directory for databases.
    #[arg(short = 'd', long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Database directory name under the data dir.
    #[arg(long, global = true, value_name = "NAME")]
    pub db: Option<String>,

    /// Debug output (repeat for more).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a minter database.
    Dbcreate(DbcreateArgs),

    /// Mint identifiers.
    Mint {
        /// How many to mint.
        count: usize,
    },

    /// Pre-generate identifiers into the pool.
    Pregen {
        /// How many to pool.
        count: usize,
    },

    /// Hold operations.
    Hold {
        #[command(subcommand)]
        cmd: HoldCmd,
    },

    /// Queue identifiers for (re-)issue.
    Queue {
        /// now, first, lvf, delete, <N>s or <N>d.
        when: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Bind an element value to an identifier.
    Bind {
        /// set, new, replace, append, prepend, delete or mint.
        how: String,
        id: String,
        elem: String,
        /// Value; omit or pass `-` to read stdin.
        value: Option<String>,
    },

    /// Fetch bindings, labelled.
    Fetch {
        id: String,
        elems: Vec<String>,
    },

    /// Fetch bindings, raw values only.
    Get {
        id: String,
        elems: Vec<String>,
    },

    /// Store a user note.
    Note { key: String, value: String },

    /// Validate identifiers against a template (`-` = the minter's own).
    Validate {
        template: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Show database information.
    Dbinfo {
        /// brief (default), full or dump.
        level: Option<String>,
    },

    /// Replace this database's contents from another backend's file.
    Dbimport {
        /// Source backend: redb, sqlite, xml.
        source: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum HoldCmd {
    /// Place holds.
    Set {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Release holds.
    Release {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct DbcreateArgs {
    /// Template, e.g. `tst3.rde`; omit for a bind-only minter.
    pub template: Option<String>,

    /// Durability term: long, medium, short or -.
    #[arg(long, default_value = "-")]
    pub term: String,

    /// Name assigning authority number (5 digits for long-term minters).
    #[arg(long, default_value = "")]
    pub naan: String,

    /// Name assigning authority.
    #[arg(long, default_value = "")]
    pub naa: String,

    /// Sub-authority.
    #[arg(long, default_value = "")]
    pub subnaa: String,

    /// Contact recorded in circulation records.
    #[arg(long)]
    pub contact: Option<String>,
}

/// Handler context: resolved settings.
pub(crate) struct Ctx {
    pub settings: Settings,
}

pub fn parse_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::parse_from(args)
}

/// Resolve settings from the settings file and the global flags.
fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = config::load(cli.settings.as_deref()).map_err(Error::Config)?;
    if let Some(backend) = &cli.backend {
        settings.backend = backend.parse::<Backend>()?;
    }
    if let Some(generator) = &cli.generator {
        settings.generator = generator.clone();
    }
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = Some(dir.clone());
    }
    if let Some(db) = &cli.db {
        settings.db_name = db.clone();
    }
    Ok(settings)
}

pub fn run(cli: Cli) -> Result<()> {
    let settings = resolve_settings(&cli)?;
    let ctx = Ctx { settings };
    match cli.command {
        Commands::Dbcreate(args) => commands::dbcreate::handle(&ctx, args),
        Commands::Mint { count } => commands::mint::handle(&ctx, count),
        Commands::Pregen { count } => commands::mint::handle_pregen(&ctx, count),
        Commands::Hold { cmd } => commands::hold::handle(&ctx, cmd),
        Commands::Queue { when, ids } => commands::queue::handle(&ctx, &when, &ids),
        Commands::Bind {
            how,
            id,
            elem,
            value,
        } => commands::bind::handle(&ctx, &how, &id, &elem, value),
        Commands::Fetch { id, elems } => commands::fetch::handle(&ctx, &id, &elems, true),
        Commands::Get { id, elems } => commands::fetch::handle(&ctx, &id, &elems, false),
        Commands::Note { key, value } => commands::bind::handle_note(&ctx, &key, &value),
        Commands::Validate { template, ids } => commands::validate::handle(&ctx, &template, &ids),
        Commands::Dbinfo { level } => commands::dbinfo::handle(&ctx, level.as_deref()),
        Commands::Dbimport { source } => commands::dbinfo::handle_import(&ctx, &source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mint() {
        let cli = parse_from(["noid", "mint", "5"]);
        assert!(matches!(cli.command, Commands::Mint { count: 5 }));
    }

    #[test]
    fn parses_global_flags() {
        let cli = parse_from(["noid", "-t", "sqlite", "-d", "/tmp/x", "mint", "1"]);
        assert_eq!(cli.backend.as_deref(), Some("sqlite"));
        assert_eq!(cli.data_dir.as_deref(), Some(std::path::Path::new("/tmp/x")));
    }

    #[test]
    fn parses_queue_and_hold() {
        let cli = parse_from(["noid", "queue", "now", "a", "b"]);
        match cli.command {
            Commands::Queue { when, ids } => {
                assert_eq!(when, "now");
                assert_eq!(ids, vec!["a", "b"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        let cli = parse_from(["noid", "hold", "set", "x"]);
        assert!(matches!(
            cli.command,
            Commands::Hold {
                cmd: HoldCmd::Set { .. }
            }
        ));
    }
}
