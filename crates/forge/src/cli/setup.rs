use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "forge", bin_name = "forge", version, disable_help_subcommand = true)]
#[command(about = "Production tracking entry tree with inherited attributes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the store (overrides FORGE_DATA_DIR)
    #[arg(long, global = true, help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Act as this user (overrides the configured user)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub user: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true, help_heading = "Options")]
    pub json: bool,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an entry with its type's defaults
    Add {
        /// Parent entry path
        parent: String,
        /// Name of the new entry
        name: String,
        /// Entry type; guessed from the parent when it allows only one
        #[arg(short = 't', long = "type", default_value = "")]
        entry_type: String,
    },

    /// Show an entry with its effective properties
    Get { path: String },

    /// List direct children
    #[command(alias = "list")]
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Delete an entry
    Rm {
        path: String,
        /// Delete the whole subtree
        #[arg(short, long)]
        recursive: bool,
    },

    /// Rename an entry
    Mv { path: String, new_name: String },

    /// Archive a root branch (admins only)
    Archive {
        path: String,
        /// Unarchive instead
        #[arg(long)]
        undo: bool,
    },

    /// Properties
    #[command(subcommand)]
    Prop(PropCommand),

    /// Environs
    #[command(subcommand)]
    Env(EnvCommand),

    /// Access rules
    #[command(subcommand)]
    Access(AccessCommand),

    /// Search entries below a root
    Search {
        root: String,
        /// Query terms, e.g. `type=shot status:wip,done`
        terms: Vec<String>,
        /// Run a saved search of the root entry instead
        #[arg(long, conflicts_with = "terms")]
        saved: Option<String>,
        /// Property holding saved searches
        #[arg(long, default_value = "search")]
        property: String,
    },

    /// Users and settings
    #[command(subcommand)]
    User(UserCommand),

    /// Groups and members
    #[command(subcommand)]
    Group(GroupCommand),

    /// Audit history of an entry
    Log {
        path: String,
        #[command(flatten)]
        filter: LogFilter,
    },
}

#[derive(Args, Debug)]
pub struct LogFilter {
    /// Only records of this category (needs --name)
    #[arg(long, value_enum, requires = "name")]
    pub category: Option<LogCategory>,
    /// Only records of this attribute
    #[arg(long, requires = "category")]
    pub name: Option<String>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogCategory {
    Entry,
    Property,
    Environ,
    Access,
}

#[derive(Subcommand, Debug)]
pub enum PropCommand {
    /// Effective properties, inherited ones included
    #[command(alias = "ls")]
    List { path: String },
    /// A property stored on the entry itself
    Get { path: String, name: String },
    /// Add a declared property
    Add {
        path: String,
        name: String,
        #[arg(default_value = "")]
        value: String,
        /// Must match the declared type when given
        #[arg(short = 't', long = "type")]
        type_name: Option<String>,
        #[arg(long)]
        inherit: Option<bool>,
    },
    /// Update value and/or inherit flag
    Set {
        path: String,
        name: String,
        value: Option<String>,
        #[arg(long)]
        inherit: Option<bool>,
    },
    /// Delete a property
    Rm { path: String, name: String },
}

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// Effective environs
    #[command(alias = "ls")]
    List { path: String },
    Get { path: String, name: String },
    Add {
        path: String,
        name: String,
        #[arg(default_value = "")]
        value: String,
        #[arg(short = 't', long = "type", default_value = "text")]
        type_name: String,
    },
    Set { path: String, name: String, value: String },
    Rm { path: String, name: String },
}

#[derive(Subcommand, Debug)]
pub enum AccessCommand {
    /// Effective rules, one per accessor
    #[command(alias = "ls")]
    List { path: String },
    Get { path: String, name: String },
    /// Grant `none`, `r` or `rw`
    Add { path: String, name: String, mode: String },
    Set { path: String, name: String, mode: String },
    Rm { path: String, name: String },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    Add {
        name: String,
        #[arg(long, default_value = "")]
        called: String,
    },
    #[command(alias = "ls")]
    List,
    Get { name: String },
    /// Change a display name
    Called { name: String, called: String },
    Whoami,
    /// Show archived branches in listings and search
    ShowArchived {
        #[arg(action = clap::ArgAction::Set)]
        on: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    Add {
        name: String,
        #[arg(long, default_value = "")]
        called: String,
    },
    #[command(alias = "ls")]
    List,
    Rename { name: String, new_name: String },
    Members { name: String },
    Join { group: String, member: String },
    Leave { group: String, member: String },
}
