use std::future::Future;

use tokio_util::sync::CancellationToken;

use bridge_api::{BridgeError, ErrorSink, OutputSink, Transport};

use crate::config::InputSource;
use crate::convert::{DecodePipeline, EncodePipeline};
use crate::sink::produce;
use crate::source::{consume, ConsumeMode, ConsumeSummary};

/// Race a blocking transport call against the caller's cancellation token.
///
/// Cancellation wins ties and surfaces as `ErrorKind::Cancelled`.
pub(crate) async fn cancellable<T>(
    token: &CancellationToken,
    what: &str,
    fut: impl Future<Output = Result<T, BridgeError>>,
) -> Result<T, BridgeError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(BridgeError::cancelled(format!("{what} cancelled"))),
        result = fut => result,
    }
}

// ═══════════════════════════════════════════════════════════════
//  Read endpoint
// ═══════════════════════════════════════════════════════════════

/// Consume-side endpoint: transport + decode pipeline + mode flags.
///
/// Built once at startup and read-only afterwards.
pub struct ReadEndpoint {
    name: String,
    transport: Box<dyn Transport>,
    pipeline: DecodePipeline,
    mode: ConsumeMode,
}

impl ReadEndpoint {
    pub fn new(
        name: impl Into<String>,
        transport: Box<dyn Transport>,
        pipeline: DecodePipeline,
        mode: ConsumeMode,
    ) -> Self {
        let name = name.into();
        tracing::info!(
            endpoint = %name,
            wire = %pipeline.request().wire,
            convert = %pipeline.request().convert,
            follow = mode.follow,
            line_numbers = mode.line_numbers,
            "read endpoint ready"
        );
        Self { name, transport, pipeline, mode }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run(
        &mut self,
        out: &mut dyn OutputSink,
        errors: &mut dyn ErrorSink,
        token: &CancellationToken,
    ) -> Result<ConsumeSummary, BridgeError> {
        consume(&self.name, &mut *self.transport, &self.pipeline, self.mode, out, errors, token).await
    }

    pub async fn close(mut self) -> Result<(), BridgeError> {
        self.transport.close().await
    }
}

// ═══════════════════════════════════════════════════════════════
//  Write endpoint
// ═══════════════════════════════════════════════════════════════

/// Produce-side endpoint: transport + encode pipeline.
pub struct WriteEndpoint {
    name: String,
    transport: Box<dyn Transport>,
    pipeline: EncodePipeline,
}

impl WriteEndpoint {
    pub fn new(name: impl Into<String>, transport: Box<dyn Transport>, pipeline: EncodePipeline) -> Self {
        let name = name.into();
        tracing::info!(
            endpoint = %name,
            output = %pipeline.request().output,
            "write endpoint ready"
        );
        Self { name, transport, pipeline }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run(&mut self, input: &InputSource, token: &CancellationToken) -> Result<usize, BridgeError> {
        produce(&self.name, &mut *self.transport, &self.pipeline, input, token).await
    }

    pub async fn close(mut self) -> Result<(), BridgeError> {
        self.transport.close().await
    }
}
