// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Every flag can also be set through a REDEPLOY_* environment variable.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "redeploy")]
#[command(about = "Redeploy containers when their image is pushed")]
#[command(version)]
pub struct Cli {
    /// Compose-style file declaring the services to manage
    #[arg(
        short,
        long,
        env = "REDEPLOY_CONFIG",
        default_value = redeploy::config::DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Address to listen on
    #[arg(long, env = "REDEPLOY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "REDEPLOY_PORT", default_value_t = 8555)]
    pub port: u16,

    /// Path the webhook is served on
    #[arg(long, env = "REDEPLOY_PATH", default_value = "/")]
    pub path: String,

    /// Container engine endpoint (unix:// or tcp://); defaults to DOCKER_HOST
    #[arg(long, env = "REDEPLOY_DOCKER_HOST")]
    pub docker_host: Option<String>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, env = "REDEPLOY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log at debug level
    #[arg(short, long, env = "REDEPLOY_VERBOSE")]
    pub verbose: bool,
}
