use tokio_util::sync::CancellationToken;

use bridge_api::{StderrSink, StdoutSink};
use pipeline::{ConsumeMode, DecodePipeline, ReadEndpoint};
use transport_amqp::AmqpTransport;

use crate::config::ReadArgs;
use crate::error::QbridgeError;

pub async fn run(args: &ReadArgs, token: &CancellationToken) -> Result<(), QbridgeError> {
    let cfg = args.effective()?;
    cfg.validate()?;

    let schema = super::resolve_schema(cfg.needs_schema(), &cfg.schema)?;
    let pipeline = DecodePipeline::new(cfg.decode, schema)?;

    let transport = AmqpTransport::receiver(
        &cfg.link.address,
        &cfg.link.queue,
        cfg.link.durable,
        cfg.exclusive,
    )
    .await?;

    let mode = ConsumeMode { follow: cfg.follow, line_numbers: cfg.line_numbers };
    let mut endpoint = ReadEndpoint::new(cfg.link.queue.clone(), Box::new(transport), pipeline, mode);

    let result = endpoint.run(&mut StdoutSink, &mut StderrSink, token).await;

    let name = endpoint.name().to_string();
    if let Err(e) = endpoint.close().await {
        tracing::warn!(endpoint = %name, error = %e, "close failed");
    }

    let summary = result?;
    tracing::info!(endpoint = %name, emitted = summary.emitted, skipped = summary.skipped, "read finished");
    Ok(())
}
