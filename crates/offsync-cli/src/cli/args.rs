use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "offsync",
    version,
    about = "Keep an offline cache of static assets in sync with a versioned manifest"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory holding the named caches (default: <platform cache dir>/offsync)
    #[arg(long, global = true, env = "OFFSYNC_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Origin the resources are served from (overrides OFFSYNC_ORIGIN)
    #[arg(long, global = true)]
    pub origin: Option<String>,

    /// Deployment file: {"resources": {path: fingerprint}, "shell": [path, ...]}
    #[arg(long, global = true, default_value = "deployment.json")]
    pub deployment: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stage the shell resources of the deployment
    Install,
    /// Reconcile the content cache against the deployment manifest
    Activate,
    /// Serve one request through the interceptor
    Get(GetArgs),
    /// Deliver a control message (skipWaiting, downloadOffline)
    Message(MessageArgs),
    /// Download every manifest resource not cached yet
    Fill,
    /// Show cache state relative to the deployment
    Status,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Path relative to the origin, or a full URL
    pub path: String,

    /// Write the body here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MessageArgs {
    pub token: String,
}
