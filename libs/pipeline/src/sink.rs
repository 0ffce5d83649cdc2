use tokio_util::sync::CancellationToken;

use bridge_api::{BridgeError, Transport};

use crate::config::InputSource;
use crate::convert::EncodePipeline;
use crate::endpoint::cancellable;

// ═══════════════════════════════════════════════════════════════
//  Produce path: read source → encode → send
// ═══════════════════════════════════════════════════════════════

/// Send exactly one message built from `input`.
///
/// Source problems surface as `Config` before the transport is touched.
/// Returns the number of bytes sent.
pub async fn produce(
    name: &str,
    transport: &mut dyn Transport,
    pipeline: &EncodePipeline,
    input: &InputSource,
    token: &CancellationToken,
) -> Result<usize, BridgeError> {
    let data = input.load()?;
    let wire = pipeline
        .encode_for_transmission(data)
        .map_err(|e| e.context("unable to generate write value"))?;
    let len = wire.len();

    cancellable(token, "send", transport.send(wire))
        .await
        .map_err(|e| e.context("unable to send message"))?;

    tracing::info!(endpoint = %name, bytes = len, "message sent");
    Ok(len)
}
