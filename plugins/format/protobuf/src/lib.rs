use std::path::{Path, PathBuf};

use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};

use bridge_api::{BridgeError, MessageSchema};

/// File extensions recognised as serialized `FileDescriptorSet`s when the
/// schema location is a directory.
const DESCRIPTOR_EXTENSIONS: &[&str] = &["bin", "pb", "desc", "protoset", "fds"];

/// Protobuf source files, compiled in-process.
const PROTO_EXTENSION: &str = "proto";

// ═══════════════════════════════════════════════════════════════
//  Schema handle
// ═══════════════════════════════════════════════════════════════

/// Runtime protobuf message type. Structured text is the protobuf JSON mapping.
#[derive(Debug, Clone)]
pub struct ProtobufSchema {
    descriptor: MessageDescriptor,
}

impl ProtobufSchema {
    pub fn new(descriptor: MessageDescriptor) -> Self {
        Self { descriptor }
    }

    /// Look up `root` in an already built pool.
    pub fn from_pool(pool: &DescriptorPool, root: &str) -> Result<Self, BridgeError> {
        find_message(pool, root).map(Self::new)
    }
}

impl MessageSchema for ProtobufSchema {
    fn name(&self) -> &str {
        self.descriptor.full_name()
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, BridgeError> {
        let message = DynamicMessage::decode(self.descriptor.clone(), data)
            .map_err(|e| BridgeError::decode(format!("protobuf decode: {e}")))?;
        serde_json::to_vec(&message)
            .map_err(|e| BridgeError::decode(format!("protobuf→json: {e}")))
    }

    fn encode(&self, text: &[u8]) -> Result<Vec<u8>, BridgeError> {
        let mut de = serde_json::Deserializer::from_slice(text);
        let message = DynamicMessage::deserialize(self.descriptor.clone(), &mut de)
            .map_err(|e| BridgeError::conversion(format!("json→protobuf: {e}")))?;
        de.end()
            .map_err(|e| BridgeError::conversion(format!("json→protobuf: {e}")))?;
        Ok(message.encode_to_vec())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Resolver
// ═══════════════════════════════════════════════════════════════

/// Resolve `root` from `.proto` sources, descriptor sets, or a directory of either.
///
/// Called once per process, before the transport is opened.
pub fn resolve(location: impl AsRef<Path>, root: &str) -> Result<ProtobufSchema, BridgeError> {
    let location = location.as_ref();
    let pool = load_pool(location)?;
    let schema = ProtobufSchema::from_pool(&pool, root)?;
    tracing::info!(
        location = %location.display(),
        message = %schema.name(),
        "resolved message descriptor"
    );
    Ok(schema)
}

/// Build a descriptor pool from `location`.
///
/// A `.proto` file is compiled with its own directory as the import root; any
/// other file is decoded as one `FileDescriptorSet`. A directory contributes
/// every `.proto` file (compiled together, imports relative to the directory)
/// and every descriptor-set file directly inside it, sorted by name.
pub fn load_pool(location: &Path) -> Result<DescriptorPool, BridgeError> {
    if location.is_file() {
        if has_extension(location, &[PROTO_EXTENSION]) {
            let include = match location.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            return compile_protos(include, &[location.to_path_buf()]);
        }
        let bytes = read_descriptor(location)?;
        return DescriptorPool::decode(bytes.as_slice()).map_err(|e| {
            BridgeError::config(format!(
                "failed to parse descriptor set '{}': {e}",
                location.display()
            ))
        });
    }

    if !location.is_dir() {
        return Err(BridgeError::config(format!(
            "schema location '{}' does not exist",
            location.display()
        )));
    }

    let entries = std::fs::read_dir(location).map_err(|e| {
        BridgeError::config(format!("cannot list '{}': {e}", location.display()))
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let (protos, sets): (Vec<PathBuf>, Vec<PathBuf>) = files
        .into_iter()
        .filter(|path| has_extension(path, &[PROTO_EXTENSION]) || has_extension(path, DESCRIPTOR_EXTENSIONS))
        .partition(|path| has_extension(path, &[PROTO_EXTENSION]));

    if protos.is_empty() && sets.is_empty() {
        return Err(BridgeError::config(format!(
            "no .proto or descriptor set files ({}) found in '{}'",
            DESCRIPTOR_EXTENSIONS.join(", "),
            location.display()
        )));
    }

    let mut pool = if protos.is_empty() {
        DescriptorPool::new()
    } else {
        compile_protos(location, &protos)?
    };
    for path in &sets {
        let bytes = read_descriptor(path)?;
        pool.decode_file_descriptor_set(bytes.as_slice()).map_err(|e| {
            BridgeError::config(format!("failed to parse descriptor set '{}': {e}", path.display()))
        })?;
        tracing::debug!(file = %path.display(), "loaded descriptor set");
    }
    Ok(pool)
}

/// Compile `.proto` sources with `include` as the import root.
fn compile_protos(include: &Path, files: &[PathBuf]) -> Result<DescriptorPool, BridgeError> {
    let mut compiler = protox::Compiler::new([include]).map_err(|e| {
        BridgeError::config(format!("invalid proto include path '{}': {e}", include.display()))
    })?;
    compiler.include_imports(true);
    compiler
        .open_files(files)
        .map_err(|e| BridgeError::config(format!("failed to compile proto files: {e}")))?;
    tracing::debug!(include = %include.display(), files = files.len(), "compiled proto sources");
    Ok(compiler.descriptor_pool())
}

/// Find a message by fully-qualified name, falling back to a unique short name.
pub fn find_message(pool: &DescriptorPool, root: &str) -> Result<MessageDescriptor, BridgeError> {
    let root = root.trim_start_matches('.');
    if root.is_empty() {
        return Err(BridgeError::config("root message name is empty"));
    }
    if let Some(descriptor) = pool.get_message_by_name(root) {
        return Ok(descriptor);
    }

    let mut candidates: Vec<MessageDescriptor> =
        pool.all_messages().filter(|m| m.name() == root).collect();
    match candidates.len() {
        0 => Err(BridgeError::config(format!(
            "message type '{root}' not found in descriptor"
        ))),
        1 => Ok(candidates.remove(0)),
        _ => {
            let names: Vec<&str> = candidates.iter().map(|m| m.full_name()).collect();
            Err(BridgeError::config(format!(
                "message type '{root}' is ambiguous: {}",
                names.join(", ")
            )))
        }
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext))
}

fn read_descriptor(path: &Path) -> Result<Vec<u8>, BridgeError> {
    std::fs::read(path).map_err(|e| {
        BridgeError::config(format!("failed to read descriptor file '{}': {e}", path.display()))
    })
}
