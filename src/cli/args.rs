//! CLI argument definitions using clap

use crate::models::{OutputConflictPolicy, StoreScope};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pfx-export")]
#[command(version)]
#[command(
    about = "Export store certificates to PKCS#12 and split them into PEM files for Linux TLS servers",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: <config dir>/pfx-export/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List certificates in a store
    List(ListArgs),

    /// Export a certificate to PKCS#12 and convert it to PEM files
    Export(ExportArgs),

    /// Convert an existing PKCS#12 archive to PEM files
    Convert(ConvertArgs),

    /// Show recent export and convert runs
    History(HistoryArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Store to list
    #[arg(long, value_enum, default_value = "user")]
    pub scope: StoreScope,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Options shared by commands that write PEM files
#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Directory for the PEM files
    #[arg(short, long, value_name = "DIR", default_value = "pem")]
    pub out_dir: PathBuf,

    /// What to do when an output file already exists (default from config, else abort)
    #[arg(long, value_enum)]
    pub on_conflict: Option<OutputConflictPolicy>,

    /// OpenSSL executable (skips discovery)
    #[arg(long, value_name = "PATH")]
    pub openssl: Option<PathBuf>,

    /// Read the password from this environment variable instead of prompting
    #[arg(long, value_name = "VAR")]
    pub password_env: Option<String>,

    /// Print the run result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Thumbprint of the certificate to export (prompted when omitted)
    #[arg(value_name = "THUMBPRINT")]
    pub thumbprint: Option<String>,

    /// Store to export from
    #[arg(long, value_enum, default_value = "user")]
    pub scope: StoreScope,

    /// PKCS#12 archive to write; its file name is the base of the PEM names
    #[arg(long, value_name = "FILE", default_value = "out.pfx")]
    pub pfx: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// PKCS#12 archive to convert
    #[arg(value_name = "PFX")]
    pub pfx: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Number of most recent runs to show
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}
