use std::sync::Arc;

use bridge_api::{
    BridgeError, ByteEncoding, DecodeRequest, EncodeRequest, MessageSchema, Middleware,
    SchemaEncoding,
};

// ═══════════════════════════════════════════════════════════════
//  Decode direction: wire body → display text
// ═══════════════════════════════════════════════════════════════

/// Consume-side conversion, resolved once from a [`DecodeRequest`].
///
/// Pipeline: schema.decode() (optional) → exactly one byte stage.
/// Stateless; clone it freely for independent receivers.
#[derive(Clone)]
pub struct DecodePipeline {
    request: DecodeRequest,
    schema: Option<Arc<dyn MessageSchema>>,
    bytes: Arc<dyn Middleware>,
}

impl DecodePipeline {
    /// Fails with `Config` when a schema-binary wire type has no schema, and
    /// with `Unsupported` when the wire type cannot be displayed.
    pub fn new(
        request: DecodeRequest,
        schema: Option<Arc<dyn MessageSchema>>,
    ) -> Result<Self, BridgeError> {
        let schema = match request.wire {
            SchemaEncoding::Raw => None,
            SchemaEncoding::Binary => Some(schema.ok_or_else(|| {
                BridgeError::config("message descriptor cannot be absent when output type is protobuf")
            })?),
            SchemaEncoding::Text => {
                return Err(BridgeError::unsupported(format!(
                    "unsupported read type '{}' (expected plain or protobuf)",
                    request.wire
                )));
            }
        };

        Ok(Self {
            request,
            schema,
            bytes: middleware_compress::middleware_for(request.convert),
        })
    }

    pub fn request(&self) -> DecodeRequest {
        self.request
    }

    /// Convert one received body into its displayable form.
    ///
    /// A schema failure aborts here; the byte stage never sees the stale body.
    pub fn decode_for_display(&self, body: Vec<u8>) -> Result<Vec<u8>, BridgeError> {
        let data = match &self.schema {
            Some(schema) => schema
                .decode(&body)
                .map_err(|e| e.context(format!("unable to decode {} message", schema.name())))?,
            None => body,
        };

        self.bytes
            .decode(data)
            .map_err(|e| e.context("unable to complete conversion"))
    }
}

impl std::fmt::Debug for DecodePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodePipeline")
            .field("request", &self.request)
            .field("schema", &self.schema.as_ref().map(|s| s.name()))
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Encode direction: source data → wire bytes
// ═══════════════════════════════════════════════════════════════

#[derive(Clone)]
enum EncodePlan {
    Identity,
    TextToBinary(Arc<dyn MessageSchema>),
}

/// Produce-side conversion, resolved once from an [`EncodeRequest`].
///
/// Supported pairs: plain → plain, jsonpb → protobuf. Anything else is
/// rejected at construction time so no send is wasted on it.
#[derive(Clone)]
pub struct EncodePipeline {
    request: EncodeRequest,
    plan: EncodePlan,
}

impl EncodePipeline {
    pub fn new(
        request: EncodeRequest,
        schema: Option<Arc<dyn MessageSchema>>,
    ) -> Result<Self, BridgeError> {
        if request.output.needs_schema() && schema.is_none() {
            return Err(BridgeError::config(format!(
                "message descriptor cannot be absent when output type is {}",
                request.output
            )));
        }

        let plan = match (request.input_bytes, request.input_schema, request.output, schema) {
            (ByteEncoding::Raw, SchemaEncoding::Raw, SchemaEncoding::Raw, _) => EncodePlan::Identity,
            (ByteEncoding::Raw, SchemaEncoding::Text, SchemaEncoding::Binary, Some(schema)) => {
                EncodePlan::TextToBinary(schema)
            }
            _ => {
                return Err(BridgeError::unsupported(format!(
                    "unsupported input/output combination: {} → {}",
                    describe_input(&request),
                    request.output
                )));
            }
        };

        Ok(Self { request, plan })
    }

    pub fn request(&self) -> EncodeRequest {
        self.request
    }

    /// Convert source data into the bytes handed to `Transport::send`.
    pub fn encode_for_transmission(&self, source: Vec<u8>) -> Result<Vec<u8>, BridgeError> {
        match &self.plan {
            EncodePlan::Identity => Ok(source),
            EncodePlan::TextToBinary(schema) => schema
                .encode(&source)
                .map_err(|e| e.context("unable to convert JSONPB to protobuf")),
        }
    }
}

impl std::fmt::Debug for EncodePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let schema = match &self.plan {
            EncodePlan::Identity => None,
            EncodePlan::TextToBinary(schema) => Some(schema.name()),
        };
        f.debug_struct("EncodePipeline")
            .field("request", &self.request)
            .field("schema", &schema)
            .finish()
    }
}

fn describe_input(request: &EncodeRequest) -> String {
    match (request.input_bytes, request.input_schema) {
        (ByteEncoding::Raw, schema) => schema.to_string(),
        (bytes, SchemaEncoding::Raw) => bytes.to_string(),
        (bytes, schema) => format!("{bytes}+{schema}"),
    }
}
