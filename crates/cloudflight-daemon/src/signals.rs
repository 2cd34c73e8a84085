//! Shutdown triggers.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Set up signal handlers for graceful shutdown.
///
/// Returns a receiver that will receive a message when a shutdown
/// signal (SIGTERM, SIGINT) is received. With `watch_stdin`, stdin
/// closing or a `shutdown` line on stdin also triggers shutdown, so a
/// parent process can stop the daemon by closing its end of the pipe.
pub fn setup_signal_handlers(watch_stdin: bool) -> Result<mpsc::Receiver<()>> {
    let (tx, rx) = mpsc::channel(1);

    // Handle SIGTERM
    #[cfg(unix)]
    {
        let tx_term = tx.clone();
        let mut stream =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::spawn(async move {
            stream.recv().await;
            info!("Received SIGTERM");
            let _ = tx_term.send(()).await;
        });
    }

    // Handle SIGINT (Ctrl+C)
    let tx_int = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT");
            let _ = tx_int.send(()).await;
        }
    });

    if watch_stdin {
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim() == "shutdown" => {
                        info!("Shutdown requested on stdin");
                        break;
                    }
                    Ok(Some(line)) => debug!(line = %line, "Ignoring stdin line"),
                    Ok(None) => {
                        info!("Stdin closed");
                        break;
                    }
                    Err(e) => {
                        info!(error = %e, "Stdin unreadable");
                        break;
                    }
                }
            }
            let _ = tx.send(()).await;
        });
    }

    Ok(rx)
}
