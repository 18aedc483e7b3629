mod cli;
mod flags;
mod repl;

use anyhow::Result;
use ctxassoc::config::Config;
use tracing::info;

use crate::cli::App;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let flags = flags::Ctxassoc::from_env_or_exit();
    let config = Config::load(flags.config.as_deref())?;
    info!(target: "lifecycle", "{} identities configured", config.identities.len());

    let mut app = App::new(config)?;
    match flags.subcommand {
        flags::CtxassocCmd::Repl(_) => repl::run(app).await,
        command => app.run(command).await,
    }
}
