use std::ffi::OsString;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, stdin, stdout};
use tracing::{info, warn};

use crate::cli::App;
use crate::flags;

/// Run `build`, `filter` and `keygen` lines against one [`App`], so
/// associations published earlier become the default filter sources.
pub(super) async fn run(mut app: App) -> Result<()> {
    let mut stdout = stdout();
    let reader = BufReader::new(stdin());
    let mut lines = reader.lines();

    stdout.write_all(b"\n> ").await?;
    stdout.flush().await?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "quit" | "exit" => break,
            "resources" => {
                info!(target: "repl", "Created resources");
                info!(target: "repl", "=================");
                for (index, url) in app.created().resources().iter().enumerate() {
                    info!(target: "repl", "{index}: {url}");
                }
            }
            _ => {
                let args: Vec<OsString> = line.split_ascii_whitespace().map(OsString::from).collect();
                match flags::Ctxassoc::from_vec(args) {
                    Ok(flags) => {
                        if let Err(e) = app.run(flags.subcommand).await {
                            warn!(target: "repl", "{e:#}");
                        }
                    }
                    Err(e) => warn!(target: "repl", "{e}"),
                }
            }
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}
