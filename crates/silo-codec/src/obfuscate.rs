//! Reversible XOR obfuscation for record payloads.
//!
//! The payload is XORed byte-wise against a pad cycled from a fixed wrapper
//! around the caller's secret, then carried as base64 with the `=` and `/`
//! characters swapped for `$` and `@` so the output stays filename-safe.
//!
//! This is obfuscation, not cryptography: the transform is symmetric,
//! trivially reversible, and keyed only by the plain-text secret. It keeps
//! payloads from being casually readable on disk and nothing more.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{CodecError, CodecResult};

/// Wrapper mixed around the caller secret to form the XOR pad.
const WRAP_PREFIX: &str = "!!$";
const WRAP_SUFFIX: &str = "!!";

fn pad_bytes(secret: &str) -> Vec<u8> {
    format!("{WRAP_PREFIX}{secret}{WRAP_SUFFIX}").into_bytes()
}

fn xor_cycle(data: &[u8], pad: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(pad.iter().cycle())
        .map(|(byte, key)| byte ^ key)
        .collect()
}

/// Obfuscate `text` with `secret`. The output contains no `=` or `/`.
pub fn obfuscate(text: &str, secret: &str) -> String {
    let mixed = xor_cycle(text.as_bytes(), &pad_bytes(secret));
    STANDARD
        .encode(mixed)
        .replace('=', "$")
        .replace('/', "@")
}

/// Invert [`obfuscate`]. Fails when the transport encoding is damaged or
/// when the secret does not reproduce text.
pub fn deobfuscate(sealed: &str, secret: &str) -> CodecResult<String> {
    let transport: String = sealed
        .chars()
        .map(|c| match c {
            '$' => '=',
            '@' => '/',
            c => c,
        })
        .collect();
    let mixed = STANDARD
        .decode(transport)
        .map_err(|err| CodecError::Transport(err.to_string()))?;
    let plain = xor_cycle(&mixed, &pad_bytes(secret));
    String::from_utf8(plain).map_err(|_| CodecError::WrongSecret)
}
