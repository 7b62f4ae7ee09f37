//! Stdin loop: feed envelopes to the engine, write replies.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use threadwarden_runtime::EngineHandle;

use crate::envelope::{parse_line, Envelope, Reply};

/// Handle one envelope. Notifications produce no reply.
pub async fn handle(engine: &EngineHandle, envelope: Envelope) -> anyhow::Result<Option<Reply>> {
    let reply = match envelope {
        Envelope::Notification { payload } => {
            engine.notify(payload).await?;
            None
        }
        Envelope::Command { payload } => match engine.command(payload).await? {
            Ok(policy) => Some(Reply::Policy { policy }),
            Err(e) => Some(Reply::Error {
                message: e.to_string(),
            }),
        },
        Envelope::Status { thread_id } => {
            let policy = engine.policy(thread_id.clone()).await?;
            let engine = engine.status().await?;
            Some(Reply::Status {
                thread_id,
                text: policy.status_text(),
                engine,
            })
        }
    };
    Ok(reply)
}

/// Read envelopes until EOF. Unparseable lines are answered with an error
/// reply and skipped.
pub async fn serve<R, W>(engine: &EngineHandle, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut count = 0u64;

    while let Some(line) = lines.next_line().await? {
        count += 1;
        let reply = match parse_line(&line) {
            Ok(Some(envelope)) => handle(engine, envelope).await?,
            Ok(None) => None,
            Err(e) => {
                warn!("Line {}: unreadable envelope: {}", count, e);
                Some(Reply::Error {
                    message: format!("line {}: {}", count, e),
                })
            }
        };

        if let Some(reply) = reply {
            let mut out = serde_json::to_vec(&reply)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
            writer.flush().await?;
        }
    }

    debug!("Input closed after {} lines", count);
    Ok(())
}
