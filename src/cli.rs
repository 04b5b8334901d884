//! Command-line interface definitions.

use crate::error::{ErrorKind, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use exn::ResultExt;
use ferry_transform::Options;
use std::io::Write;
use std::path::PathBuf;

/// Minify, rewrite and publish web assets to object storage behind a CDN
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub upload: UploadArgs,

    /// Config file path (default: per-user config directory)
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// More logging; repeat for more
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Write the top-level help text, as `--help` does.
pub fn print_help(out: &mut impl Write) -> Result<()> {
    let help = Cli::command().render_help();
    write!(out, "{help}").or_raise(|| ErrorKind::Output)?;
    out.flush().or_raise(|| ErrorKind::Output)
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Purge one public URL from the CDN cache
    Refresh {
        url: String,
    },

    /// Write a template config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

/// Options for the default upload command.
#[derive(clap::Args, Debug, Clone)]
pub struct UploadArgs {
    /// Files to process
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub files: Vec<PathBuf>,

    /// Minify CSS, JS, HTML and optimize images (`--compress=false` to disable)
    #[arg(
        short,
        long,
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub compress: bool,

    /// Lower JS syntax to ES2015
    #[arg(long)]
    pub babel: bool,

    /// Compile .scss and .sass
    #[arg(long)]
    pub sass: bool,

    /// Treat .less as CSS
    #[arg(long)]
    pub less: bool,

    /// No source maps
    #[arg(long)]
    pub raw: bool,

    /// Concatenate all files into one (needs --name)
    #[arg(long)]
    pub concat: bool,

    /// Publish under this fixed prefix instead of a content hash
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Output file name
    #[arg(long)]
    pub name: Option<String>,

    /// Convert to data URIs instead of uploading
    #[arg(long)]
    pub base64: bool,

    /// Write outputs to this directory instead of uploading
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub dest: Option<PathBuf>,

    /// Only print resulting URLs or paths, one per line
    #[arg(long)]
    pub output_simple: bool,

    /// Mangle top-level JS names
    #[arg(long)]
    pub obfuscate: bool,

    /// Wrap JS in an IIFE (with --compress)
    #[arg(long)]
    pub iife: bool,
}

impl UploadArgs {
    pub fn transform_options(&self) -> Options {
        Options {
            compress: self.compress,
            babel: self.babel,
            sass: self.sass,
            less: self.less,
            raw: self.raw,
            obfuscate: self.obfuscate,
            iife: self.iife,
        }
    }
}
