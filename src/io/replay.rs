//! JSONL replay source
//!
//! Reads recorded engine inputs (one JSON object per line) and forwards them
//! into the engine's input channel, preserving file order. Blank lines are
//! skipped; malformed lines are logged and skipped.

use crate::domain::types::EngineInput;
use anyhow::Context;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Parse a single replay line. `Ok(None)` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<EngineInput>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

/// Stream the file at `path` into `tx`. Returns the number of inputs sent.
pub async fn replay_file<P: AsRef<Path>>(
    path: P,
    tx: mpsc::Sender<EngineInput>,
) -> anyhow::Result<usize> {
    let path = path.as_ref();
    let file = File::open(path)
        .await
        .with_context(|| format!("Failed to open replay file {}", path.display()))?;
    replay_reader(file, &path.display().to_string(), tx).await
}

/// Stream JSONL inputs from any async reader (a file, stdin) into `tx`
pub async fn replay_reader<R: AsyncRead + Unpin>(
    reader: R,
    source: &str,
    tx: mpsc::Sender<EngineInput>,
) -> anyhow::Result<usize> {
    let mut lines = BufReader::new(reader).lines();

    let mut line_no = 0usize;
    let mut sent = 0usize;
    while let Some(line) =
        lines.next_line().await.with_context(|| format!("Failed to read replay input {source}"))?
    {
        line_no += 1;
        match parse_line(&line) {
            Ok(Some(input)) => {
                debug!(line = %line_no, input = %input.as_str(), "replay_input");
                if tx.send(input).await.is_err() {
                    warn!(line = %line_no, "replay_receiver_closed");
                    break;
                }
                sent += 1;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(line = %line_no, error = %e, "replay_line_invalid");
            }
        }
    }

    info!(source = %source, inputs = %sent, lines = %line_no, "replay_finished");
    Ok(sent)
}
