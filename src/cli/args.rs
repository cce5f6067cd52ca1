//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <FILE>`: Read configuration from this file
//! - `--debug`: Enable debug logging

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::config::DeliveryMode;

/// geojson-relay - Serve GeoJSON from a GitHub repository, following Git LFS pointers
#[derive(Parser, Debug)]
#[command(name = "geojson-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: search $GEOJSON_RELAY_CONFIG, XDG, ~/.geojson-relay)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server
    #[command(after_help = "EXAMPLES:
    geojson-relay serve
    geojson-relay serve --port 8080 --mode streaming
    GITHUB_TOKEN=... geojson-relay serve --bind 127.0.0.1")]
    Serve {
        /// Address to bind
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Port to listen on
        #[arg(long, short)]
        port: Option<u16>,

        /// Default delivery mode: buffered or streaming
        #[arg(long)]
        mode: Option<DeliveryMode>,
    },

    /// Resolve one path and write the document to stdout
    #[command(after_help = "EXAMPLES:
    geojson-relay get sichuan/sichuan.geojson
    geojson-relay get national/rail.geojson --stream > rail.geojson")]
    Get {
        /// Repository path of the document
        path: String,

        /// Relay bytes as they arrive instead of validating first
        #[arg(long)]
        stream: bool,
    },

    /// List a directory of the repository as JSON
    List {
        /// Directory to list (default: repository root)
        path: Option<String>,
    },
}
