//! Cryptographic value types shared by the contract and FHE ports.
//!
//! # Wire conventions
//!
//! - A [`Handle`] is the 32-byte reference the co-processor hands out for a
//!   ciphertext: `sha256(ciphertext || contract || account)`.
//! - Input proofs are signatures over `sha256(handle || contract || account)`.
//! - Clear values are encoded as consecutive 32-byte big-endian words, the
//!   same layout as `abi.encode(uint256, ...)`.
//! - Decryption proofs are signatures over `sha256(handles... || encoded)`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Size of one ABI word.
pub const ABI_WORD: usize = 32;

/// Error type for cryptographic value handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Invalid clear value encoding: {0}")]
    InvalidEncoding(String),
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn parse_hex<const N: usize>(input: &str) -> Option<[u8; N]> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    if digits.len() != N * 2 || !digits.is_ascii() {
        return None;
    }
    let mut out = [0u8; N];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(out)
}

/// A 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Derive an address from arbitrary key material (last 20 bytes of its SHA-256).
    #[must_use]
    pub fn derive(material: &[u8]) -> Self {
        let digest = Sha256::digest(material);
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[12..]);
        Self(out)
    }

    /// Short form for compact display, e.g. `0x1234…abcd`.
    #[must_use]
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex::<20>(s.trim())
            .map(Self)
            .ok_or_else(|| CryptoError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", to_hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// Opaque reference to a ciphertext held by the co-processor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle([u8; 32]);

impl Handle {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build a handle from a slice, e.g. a SQLite blob.
    ///
    /// # Errors
    /// Returns `CryptoError::InvalidHandle` if the slice is not 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidHandle(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(array))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute the handle for a freshly encrypted input.
    #[must_use]
    pub fn for_ciphertext(ciphertext: &[u8], contract: &Address, account: &Address) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(ciphertext);
        hasher.update(contract.as_bytes());
        hasher.update(account.as_bytes());
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", to_hex(&self.0))
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 4 bytes are enough to tell handles apart in logs.
        write!(f, "Handle(0x{}..)", to_hex(&self.0[..4]))
    }
}

/// Output of client-side encryption: the ciphertext handle plus its input proof.
#[derive(Clone, Serialize, Deserialize)]
pub struct EncryptedInput {
    /// Handle of the encrypted value, submitted on-chain in place of the ciphertext
    pub encrypted_data: Handle,

    /// Proof of well-formedness bound to the contract and submitting account
    pub proof: Vec<u8>,
}

impl EncryptedInput {
    #[must_use]
    pub fn new(encrypted_data: Handle, proof: Vec<u8>) -> Self {
        Self {
            encrypted_data,
            proof,
        }
    }
}

impl fmt::Debug for EncryptedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedInput")
            .field("encrypted_data", &self.encrypted_data)
            .field("proof_bytes", &self.proof.len())
            .finish()
    }
}

/// Message signed by the gateway to attest an encrypted input.
#[must_use]
pub fn input_proof_message(handle: &Handle, contract: &Address, account: &Address) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(handle.as_bytes());
    hasher.update(contract.as_bytes());
    hasher.update(account.as_bytes());
    hasher.finalize().into()
}

/// Message signed by the gateway to attest a decryption result.
#[must_use]
pub fn decryption_proof_message(handles: &[Handle], encoded_clear_values: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for handle in handles {
        hasher.update(handle.as_bytes());
    }
    hasher.update(encoded_clear_values);
    hasher.finalize().into()
}

/// ABI-encode clear values as 32-byte big-endian words.
#[must_use]
pub fn encode_clear_values(values: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * ABI_WORD);
    for value in values {
        out.extend_from_slice(&[0u8; ABI_WORD - 8]);
        out.extend_from_slice(&value.to_be_bytes());
    }
    out
}

/// Decode ABI words produced by [`encode_clear_values`].
///
/// # Errors
/// Returns `CryptoError::InvalidEncoding` if the length is not a multiple of a
/// word or a word does not fit in 64 bits.
pub fn decode_clear_values(encoded: &[u8]) -> Result<Vec<u64>, CryptoError> {
    if encoded.is_empty() || encoded.len() % ABI_WORD != 0 {
        return Err(CryptoError::InvalidEncoding(format!(
            "length {} is not a positive multiple of {ABI_WORD}",
            encoded.len()
        )));
    }

    encoded
        .chunks_exact(ABI_WORD)
        .map(|word| {
            let (high, low) = word.split_at(ABI_WORD - 8);
            if high.iter().any(|&b| b != 0) {
                return Err(CryptoError::InvalidEncoding("value exceeds 64 bits".into()));
            }
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(low);
            Ok(u64::from_be_bytes(bytes))
        })
        .collect()
}
