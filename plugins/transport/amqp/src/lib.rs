use fe2o3_amqp::connection::ConnectionHandle;
use fe2o3_amqp::link::delivery::Delivery as AmqpDelivery;
use fe2o3_amqp::sasl_profile::SaslProfile;
use fe2o3_amqp::session::SessionHandle;
use fe2o3_amqp::types::messaging::{Body, Message, Outcome, Source, Target, TerminusDurability};
use fe2o3_amqp::types::primitives::{Binary, Value};
use fe2o3_amqp::{Connection, Receiver, Sender, Session};

use bridge_api::{BoxFuture, BridgeError, Delivery, Transport};

const EXCLUSIVE_SUFFIX: &str = "?consumer.exclusive=true";

enum Link {
    Receiver(Receiver),
    Sender(Sender),
}

/// AMQP 1.0 transport: one connection, one session, one link.
///
/// The connection uses anonymous SASL, which is what ActiveMQ and Artemis
/// accept out of the box.
pub struct AmqpTransport {
    queue: String,
    connection: ConnectionHandle<()>,
    session: SessionHandle<()>,
    link: Option<Link>,
    pending: Option<(u64, AmqpDelivery<Body<Value>>)>,
    next_id: u64,
}

impl AmqpTransport {
    /// Connect and attach a receiving link on `queue`.
    pub async fn receiver(
        address: &str,
        queue: &str,
        durable: bool,
        exclusive: bool,
    ) -> Result<Self, BridgeError> {
        let (connection, mut session) = connect(address).await?;
        let source = Source::builder()
            .address(source_address(queue, exclusive))
            .durable(durability(durable))
            .build();
        let receiver = Receiver::builder()
            .name(format!("qbridge-receiver-{queue}"))
            .source(source)
            .attach(&mut session)
            .await
            .map_err(|e| BridgeError::transport(format!("unable to instantiate receiver: {e}")))?;
        tracing::info!(%queue, durable, exclusive, "receiver attached");

        Ok(Self {
            queue: queue.to_string(),
            connection,
            session,
            link: Some(Link::Receiver(receiver)),
            pending: None,
            next_id: 0,
        })
    }

    /// Connect and attach a sending link on `queue`.
    pub async fn sender(address: &str, queue: &str, durable: bool) -> Result<Self, BridgeError> {
        let (connection, mut session) = connect(address).await?;
        let target = Target::builder()
            .address(queue.to_string())
            .durable(durability(durable))
            .build();
        let sender = Sender::builder()
            .name(format!("qbridge-sender-{queue}"))
            .target(target)
            .attach(&mut session)
            .await
            .map_err(|e| BridgeError::transport(format!("unable to instantiate sender: {e}")))?;
        tracing::info!(%queue, durable, "sender attached");

        Ok(Self {
            queue: queue.to_string(),
            connection,
            session,
            link: Some(Link::Sender(sender)),
            pending: None,
            next_id: 0,
        })
    }

    async fn receive_inner(&mut self) -> Result<Delivery, BridgeError> {
        let Some(Link::Receiver(receiver)) = self.link.as_mut() else {
            return Err(BridgeError::transport("link is not a receiver"));
        };
        let delivery: AmqpDelivery<Body<Value>> = receiver
            .recv()
            .await
            .map_err(|e| BridgeError::transport(e.to_string()))?;
        let body = body_bytes(delivery.body());

        let id = self.next_id;
        self.next_id += 1;
        self.pending = Some((id, delivery));
        Ok(Delivery { id, body })
    }

    async fn ack_inner(&mut self, delivery: &Delivery) -> Result<(), BridgeError> {
        let Some(Link::Receiver(receiver)) = self.link.as_mut() else {
            return Err(BridgeError::transport("link is not a receiver"));
        };
        let pending = match self.pending.take() {
            Some((id, pending)) if id == delivery.id => pending,
            Some(other) => {
                let expected = other.0;
                self.pending = Some(other);
                return Err(BridgeError::transport(format!(
                    "delivery {} is not pending (expected {expected})",
                    delivery.id
                )));
            }
            None => {
                return Err(BridgeError::transport(format!("delivery {} is not pending", delivery.id)));
            }
        };
        receiver
            .accept(&pending)
            .await
            .map_err(|e| BridgeError::transport(e.to_string()))
    }

    async fn send_inner(&mut self, body: Vec<u8>) -> Result<(), BridgeError> {
        let Some(Link::Sender(sender)) = self.link.as_mut() else {
            return Err(BridgeError::transport("link is not a sender"));
        };
        let message = Message::builder().data(Binary::from(body)).build();
        let outcome = sender
            .send(message)
            .await
            .map_err(|e| BridgeError::transport(e.to_string()))?;
        match outcome {
            Outcome::Accepted(_) => Ok(()),
            other => Err(BridgeError::transport(format!("message not accepted: {other:?}"))),
        }
    }

    async fn close_inner(&mut self) -> Result<(), BridgeError> {
        match self.link.take() {
            Some(Link::Receiver(receiver)) => receiver
                .close()
                .await
                .map_err(|e| BridgeError::transport(format!("receiver close: {e}")))?,
            Some(Link::Sender(sender)) => sender
                .close()
                .await
                .map_err(|e| BridgeError::transport(format!("sender close: {e}")))?,
            None => return Ok(()),
        }
        self.session
            .end()
            .await
            .map_err(|e| BridgeError::transport(format!("session end: {e}")))?;
        self.connection
            .close()
            .await
            .map_err(|e| BridgeError::transport(format!("connection close: {e}")))?;
        tracing::debug!(queue = %self.queue, "amqp link closed");
        Ok(())
    }
}

impl Transport for AmqpTransport {
    fn receive(&mut self) -> BoxFuture<'_, Result<Delivery, BridgeError>> {
        Box::pin(self.receive_inner())
    }

    fn ack<'a>(&'a mut self, delivery: &'a Delivery) -> BoxFuture<'a, Result<(), BridgeError>> {
        Box::pin(self.ack_inner(delivery))
    }

    fn send(&mut self, body: Vec<u8>) -> BoxFuture<'_, Result<(), BridgeError>> {
        Box::pin(self.send_inner(body))
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), BridgeError>> {
        Box::pin(self.close_inner())
    }
}

async fn connect(address: &str) -> Result<(ConnectionHandle<()>, SessionHandle<()>), BridgeError> {
    let mut connection = Connection::builder()
        .container_id(format!("qbridge-{}", std::process::id()))
        .sasl_profile(SaslProfile::Anonymous)
        .open(address)
        .await
        .map_err(|e| BridgeError::transport(format!("unable to connect to {address}: {e}")))?;
    let session = Session::begin(&mut connection)
        .await
        .map_err(|e| BridgeError::transport(format!("unable to instantiate session: {e}")))?;
    tracing::info!(%address, "connected");
    Ok((connection, session))
}

fn durability(durable: bool) -> TerminusDurability {
    if durable {
        TerminusDurability::UnsettledState
    } else {
        TerminusDurability::None
    }
}

/// ActiveMQ reads consumer options from the source address query string.
fn source_address(queue: &str, exclusive: bool) -> String {
    if exclusive {
        format!("{queue}{EXCLUSIVE_SUFFIX}")
    } else {
        queue.to_string()
    }
}

/// Flatten an AMQP body into the opaque payload bytes.
///
/// Never fails: a body section with no byte representation (sequence, or a
/// non-binary non-string value) becomes an empty payload, and the pipeline
/// decides what that means for the selected conversion.
fn body_bytes(body: &Body<Value>) -> Vec<u8> {
    match body {
        Body::Data(batch) => batch.iter().flat_map(|data| data.0.iter().copied()).collect(),
        Body::Value(value) => match &value.0 {
            Value::Binary(bytes) => bytes.to_vec(),
            Value::String(text) => text.clone().into_bytes(),
            other => {
                tracing::warn!(value = ?other, "amqp-value body has no byte form, passing empty payload");
                Vec::new()
            }
        },
        Body::Empty => Vec::new(),
        _ => {
            tracing::warn!("amqp-sequence body has no byte form, passing empty payload");
            Vec::new()
        }
    }
}
