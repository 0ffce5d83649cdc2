use std::io::Read;
use std::sync::Arc;

use base64::Engine;
use bridge_api::{BridgeError, ByteEncoding, Middleware};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Byte-axis stage for the given encoding, resolved once at startup.
pub fn middleware_for(encoding: ByteEncoding) -> Arc<dyn Middleware> {
    match encoding {
        ByteEncoding::Raw => Arc::new(Identity),
        ByteEncoding::Base64 => Arc::new(Base64Middleware),
        ByteEncoding::Gzip => Arc::new(GzipMiddleware::default()),
    }
}

// ---- Identity ----

/// Passes bytes through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl Middleware for Identity {
    fn decode(&self, data: Vec<u8>) -> Result<Vec<u8>, BridgeError> {
        Ok(data)
    }

    fn encode(&self, data: Vec<u8>) -> Result<Vec<u8>, BridgeError> {
        Ok(data)
    }
}

// ---- Base64 ----

/// Standard alphabet with padding.
#[derive(Debug, Default, Clone, Copy)]
pub struct Base64Middleware;

impl Middleware for Base64Middleware {
    fn decode(&self, data: Vec<u8>) -> Result<Vec<u8>, BridgeError> {
        // Тела часто приходят с переводом строки в конце
        base64::engine::general_purpose::STANDARD
            .decode(data.trim_ascii())
            .map_err(|e| BridgeError::conversion(format!("base64 decode: {e}")))
    }

    fn encode(&self, data: Vec<u8>) -> Result<Vec<u8>, BridgeError> {
        Ok(base64::engine::general_purpose::STANDARD.encode(data).into_bytes())
    }
}

// ---- Gzip ----

#[derive(Debug, Clone, Copy)]
pub struct GzipMiddleware {
    level: flate2::Compression,
}

impl GzipMiddleware {
    /// Compression level 1-9; out-of-range values are clamped.
    pub fn with_level(level: u32) -> Self {
        Self { level: flate2::Compression::new(level.clamp(1, 9)) }
    }
}

impl Default for GzipMiddleware {
    fn default() -> Self {
        Self::with_level(6)
    }
}

impl Middleware for GzipMiddleware {
    fn decode(&self, data: Vec<u8>) -> Result<Vec<u8>, BridgeError> {
        if data.is_empty() {
            return Err(BridgeError::conversion("gzip decompress: empty payload"));
        }
        if !data.starts_with(&GZIP_MAGIC) {
            return Err(BridgeError::conversion("gzip decompress: invalid gzip header"));
        }
        let mut decoder = flate2::read::GzDecoder::new(&data[..]);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| BridgeError::conversion(format!("gzip decompress: {e}")))?;
        Ok(decompressed)
    }

    fn encode(&self, data: Vec<u8>) -> Result<Vec<u8>, BridgeError> {
        let mut encoder = flate2::read::GzEncoder::new(&data[..], self.level);
        let mut compressed = Vec::new();
        encoder
            .read_to_end(&mut compressed)
            .map_err(|e| BridgeError::conversion(format!("gzip compress: {e}")))?;
        Ok(compressed)
    }
}
