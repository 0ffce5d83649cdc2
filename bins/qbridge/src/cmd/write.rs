use tokio_util::sync::CancellationToken;

use pipeline::{EncodePipeline, WriteEndpoint};
use transport_amqp::AmqpTransport;

use crate::config::WriteArgs;
use crate::error::QbridgeError;

pub async fn run(args: &WriteArgs, token: &CancellationToken) -> Result<(), QbridgeError> {
    let cfg = args.effective()?;
    cfg.validate()?;

    let schema = super::resolve_schema(cfg.needs_schema(), &cfg.schema)?;
    // Unsupported combinations fail here, before any connection is opened
    let pipeline = EncodePipeline::new(cfg.encode, schema)?;

    let transport = AmqpTransport::sender(&cfg.link.address, &cfg.link.queue, cfg.link.durable).await?;
    let mut endpoint = WriteEndpoint::new(cfg.link.queue.clone(), Box::new(transport), pipeline);

    let result = endpoint.run(&cfg.input, token).await;

    let name = endpoint.name().to_string();
    if let Err(e) = endpoint.close().await {
        tracing::warn!(endpoint = %name, error = %e, "close failed");
    }

    result?;
    Ok(())
}
