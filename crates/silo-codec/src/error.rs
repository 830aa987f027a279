/// Errors from encoding and decoding payloads.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// The value variant cannot be persisted.
    #[error("value type is not storable")]
    Unsupported,

    /// An encoded payload contained a symbol outside the alphabet.
    #[error("symbol outside the encoding alphabet: {0:?}")]
    ForeignSymbol(char),

    /// An encoded chunk decodes to more than a 32-bit word.
    #[error("encoded chunk overflows a 32-bit word")]
    ChunkOverflow,

    /// The tail-length marker of an encoded payload is inconsistent.
    #[error("malformed tail marker in encoded payload")]
    MalformedTail,

    /// The obfuscation transport layer (base64 variant) failed to decode.
    #[error("invalid transport encoding: {0}")]
    Transport(String),

    /// Deobfuscation produced bytes that are not text; in practice this
    /// means the secret did not match.
    #[error("deobfuscation produced non-text output")]
    WrongSecret,

    /// Serializing a payload to its textual form failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
