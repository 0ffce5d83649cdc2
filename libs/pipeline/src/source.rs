use tokio_util::sync::CancellationToken;

use bridge_api::{BridgeError, ErrorSink, OutputSink, Transport};

use crate::convert::DecodePipeline;
use crate::endpoint::cancellable;

// ═══════════════════════════════════════════════════════════════
//  Consume loop: receive → ack → decode → emit
// ═══════════════════════════════════════════════════════════════

/// Mode flags of the consume loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeMode {
    /// Keep consuming until cancelled or a transport failure.
    pub follow: bool,
    /// Prefix emitted lines with `N: `.
    pub line_numbers: bool,
}

/// What a finished consume loop did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeSummary {
    pub emitted: u64,
    pub skipped: u64,
}

/// Consume one message (single-shot) or until stopped (follow).
///
/// Receive and ack failures are fatal in both modes. A payload failure stops
/// single-shot mode; follow mode reports it to `errors` and moves on without
/// emitting anything for that message.
pub async fn consume(
    name: &str,
    transport: &mut dyn Transport,
    pipeline: &DecodePipeline,
    mode: ConsumeMode,
    out: &mut dyn OutputSink,
    errors: &mut dyn ErrorSink,
    token: &CancellationToken,
) -> Result<ConsumeSummary, BridgeError> {
    tracing::info!(endpoint = %name, follow = mode.follow, "listening for message(s) ...");

    let mut summary = ConsumeSummary::default();
    // Номер строки растёт только на успешно выведенных сообщениях
    let mut line_number: u64 = 1;

    loop {
        let delivery = cancellable(token, "receive", transport.receive())
            .await
            .map_err(|e| e.context("unable to receive message"))?;
        cancellable(token, "ack", transport.ack(&delivery))
            .await
            .map_err(|e| e.context("unable to accept message"))?;

        tracing::debug!(endpoint = %name, id = delivery.id, bytes = delivery.body.len(), "received message");

        let data = match pipeline.decode_for_display(delivery.body) {
            Ok(data) => data,
            Err(e) if mode.follow && e.is_skippable() => {
                tracing::debug!(endpoint = %name, id = delivery.id, error = ?e, "skipping message");
                errors.report(&e.to_string());
                summary.skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        // Тело выводится как есть, без перекодировки в UTF-8
        if mode.line_numbers {
            let mut line = format!("{line_number}: ").into_bytes();
            line.extend_from_slice(&data);
            out.emit(&line);
            line_number += 1;
        } else {
            out.emit(&data);
        }
        summary.emitted += 1;

        if !mode.follow {
            break;
        }
    }

    tracing::debug!(endpoint = %name, emitted = summary.emitted, "reader exiting");
    Ok(summary)
}
