//! Shared fixtures for the pipeline integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use prost_reflect::DescriptorPool;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet};
use tokio_util::sync::CancellationToken;

use bridge_api::{BoxFuture, BridgeError, Delivery, MessageSchema, Transport};
use format_protobuf::ProtobufSchema;

/// One observed call into the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Receive,
    Ack(u64),
    Send(Vec<u8>),
    Close,
}

/// In-memory transport replaying a fixed inbox and recording every call.
///
/// Once the inbox is drained `receive` blocks forever, like a quiet queue.
pub struct ScriptedTransport {
    inbox: VecDeque<Result<Vec<u8>, BridgeError>>,
    calls: Arc<Mutex<Vec<Call>>>,
    next_id: u64,
    ack_error: Option<BridgeError>,
    send_error: Option<BridgeError>,
    cancel_on_drain: Option<CancellationToken>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            inbox: VecDeque::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: 0,
            ack_error: None,
            send_error: None,
            cancel_on_drain: None,
        }
    }

    pub fn with_messages<I, B>(messages: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        let mut t = Self::new();
        t.inbox.extend(messages.into_iter().map(|m| Ok(m.into())));
        t
    }

    pub fn push_error(mut self, error: BridgeError) -> Self {
        self.inbox.push_back(Err(error));
        self
    }

    pub fn fail_ack(mut self, error: BridgeError) -> Self {
        self.ack_error = Some(error);
        self
    }

    pub fn fail_send(mut self, error: BridgeError) -> Self {
        self.send_error = Some(error);
        self
    }

    /// Cancel `token` when a receive finds the inbox empty.
    pub fn cancel_on_drain(mut self, token: CancellationToken) -> Self {
        self.cancel_on_drain = Some(token);
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<Call>>> {
        self.calls.clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Transport for ScriptedTransport {
    fn receive(&mut self) -> BoxFuture<'_, Result<Delivery, BridgeError>> {
        self.record(Call::Receive);
        let next = self.inbox.pop_front();
        let id = self.next_id;
        self.next_id += 1;
        if next.is_none() {
            if let Some(token) = &self.cancel_on_drain {
                token.cancel();
            }
        }
        Box::pin(async move {
            match next {
                Some(Ok(body)) => Ok(Delivery { id, body }),
                Some(Err(e)) => Err(e),
                None => std::future::pending().await,
            }
        })
    }

    fn ack<'a>(&'a mut self, delivery: &'a Delivery) -> BoxFuture<'a, Result<(), BridgeError>> {
        self.record(Call::Ack(delivery.id));
        let result = match &self.ack_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        };
        Box::pin(async move { result })
    }

    fn send(&mut self, body: Vec<u8>) -> BoxFuture<'_, Result<(), BridgeError>> {
        self.record(Call::Send(body));
        let result = match &self.send_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        };
        Box::pin(async move { result })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), BridgeError>> {
        self.record(Call::Close);
        Box::pin(async { Ok(()) })
    }
}

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

/// `events.Event { string name = 1; int32 id = 2; }`
pub fn event_schema() -> Arc<dyn MessageSchema> {
    let file = FileDescriptorProto {
        name: Some("events.proto".to_string()),
        package: Some("events".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Event".to_string()),
            field: vec![field("name", 1, Type::String), field("id", 2, Type::Int32)],
            ..Default::default()
        }],
        ..Default::default()
    };
    let pool = DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: vec![file] }).unwrap();
    Arc::new(ProtobufSchema::from_pool(&pool, "events.Event").unwrap())
}

/// Schema-binary encoding of `text` for the event schema.
pub fn event_bytes(text: &str) -> Vec<u8> {
    event_schema().encode(text.as_bytes()).unwrap()
}
