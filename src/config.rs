//! Command-line configuration

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// NVR gateway daemon configuration.
#[derive(Parser, Debug, Clone)]
#[command(name = "nvrd")]
#[command(author, about, long_about = None, disable_version_flag = true)]
pub struct Config {
    /// Directory for persisted state (cameras, API keys).
    #[arg(short = 's', long, default_value = "/var/lib/nvrd")]
    pub store: PathBuf,

    /// Address to bind the HTTP server to.
    #[arg(short = 'l', long, default_value = "0.0.0.0:2998")]
    pub listen: SocketAddr,

    /// Logging level: >0 warn, 0 info, -1 debug, <= -2 trace.
    /// Levels <= -2 also raise recorder/store verbosity.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub log_level: i8,

    /// Print version and build metadata, then exit.
    #[arg(short = 'v', long = "version")]
    pub version: bool,
}

impl Config {
    /// Default EnvFilter directive for the configured level.
    /// RUST_LOG, when set, takes precedence over this.
    pub fn log_filter(&self) -> String {
        let level = match self.log_level {
            i8::MIN..=-2 => "trace",
            -1 => "debug",
            0 => "info",
            _ => "warn",
        };
        if self.log_level <= -2 {
            // Collaborator subsystems get loud too.
            format!("nvrd={level},tower_http=debug")
        } else {
            format!("nvrd={level},tower_http=warn")
        }
    }

    /// Store subdirectory holding camera documents.
    pub fn cameras_dir(&self) -> PathBuf {
        self.store.join("cameras")
    }

    /// Store file holding the API key set.
    pub fn keys_file(&self) -> PathBuf {
        self.store.join("api_keys.json")
    }
}

/// Print toolchain/revision/build-time metadata.
///
/// Metadata is baked in at build time via NVRD_COMMIT / NVRD_BUILD_TIME /
/// NVRD_RUSTC; a plain `cargo build` leaves them unset and they print as
/// "unknown". The caller exits 0 either way.
pub fn print_version() {
    println!("nvrd {}", env!("CARGO_PKG_VERSION"));
    println!("commit\t{}", option_env!("NVRD_COMMIT").unwrap_or("unknown"));
    println!(
        "built\t{}",
        option_env!("NVRD_BUILD_TIME").unwrap_or("unknown")
    );
    println!("rustc\t{}", option_env!("NVRD_RUSTC").unwrap_or("unknown"));
}
