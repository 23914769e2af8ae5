//! Newline-delimited JSON serve loop over stdin/stdout.

use crate::service::Service;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// Serve requests line by line until stdin reaches EOF.
///
/// Stdout carries nothing but response objects; logging goes to stderr
/// so the protocol channel stays clean. Blank lines are skipped.
pub async fn serve(service: Service) -> io::Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    info!("Serving requests on stdio");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        debug!(bytes = line.len(), "Received request line");

        let mut payload = service.handle_line(&line).await.to_string();
        payload.push('\n');
        stdout.write_all(payload.as_bytes()).await?;
        stdout.flush().await?;
    }

    info!("Stdin closed, shutting down");
    Ok(())
}
