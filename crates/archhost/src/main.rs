//! # archbridge-host
//!
//! The helper executable. Started by a client with one argument, the channel
//! token; serves native calls on that channel until the client closes it.
//!
//! ## Environment
//! - `ARCHBRIDGE_CHANNEL_DIR`: where the channel endpoint is created.
//! - `ARCHBRIDGE_LIBRARY_PATH`: extra library search directories, path-list.
//! - `ARCHBRIDGE_LOG`: log filter, `info` when unset. Logs go to stderr.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use anyhow::bail;
use archbridge::Channel;
use archbridge::ChannelOptions;
use archbridge::ChannelToken;
use archbridge::LoopExit;
use archbridge::RequestLoop;
use archbridge::supervisor::CHANNEL_DIR_ENV;
use archcall::Engine;
use archcall::SearchPathResolver;
use archwire::CallDescriptor;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

const LOG_ENV: &str = "ARCHBRIDGE_LOG";
const LIBRARY_PATH_ENV: &str = "ARCHBRIDGE_LIBRARY_PATH";

fn main() -> ExitCode {
    init_logging();
    match run(env::args().skip(1)) {
        Ok(exit) => {
            info!(?exit, "helper exiting");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .compact()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(args: impl Iterator<Item = String>) -> anyhow::Result<LoopExit> {
    let token = parse_token(args)?;
    let options = channel_options();
    let search_dirs = library_dirs();
    info!(%token, pid = std::process::id(), dir = %options.dir.display(), "helper starting");

    let mut channel = Channel::listen(&token, &options)
        .with_context(|| format!("cannot open channel {}", token))?;

    let mut engine = Engine::new(SearchPathResolver::with_search_dirs(search_dirs));
    let exit = RequestLoop::new(|call: &CallDescriptor| engine.invoke(call))
        .run(&mut channel)
        .context("channel failed while serving")?;
    Ok(exit)
}

fn parse_token(args: impl Iterator<Item = String>) -> anyhow::Result<ChannelToken> {
    let args: Vec<String> = args.collect();
    let [token] = args.as_slice() else {
        bail!("usage: archbridge-host <channel-token> (got {} arguments)", args.len());
    };
    token.parse::<ChannelToken>().context("bad channel token")
}

fn channel_options() -> ChannelOptions {
    let mut options = ChannelOptions::default();
    if let Some(dir) = env::var_os(CHANNEL_DIR_ENV).filter(|v| !v.is_empty()) {
        options.dir = PathBuf::from(dir);
    }
    options
}

fn library_dirs() -> Vec<PathBuf> {
    env::var_os(LIBRARY_PATH_ENV)
        .map(|paths| env::split_paths(&paths).filter(|p| !p.as_os_str().is_empty()).collect())
        .unwrap_or_default()
}
