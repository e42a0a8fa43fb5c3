//! Local accounts: ed25519 key material and on-chain address derivation
//!
//! The on-chain address of a single-key account is its authentication key:
//! `sha3_256(public_key || 0x00)`, where the trailing byte identifies the
//! ed25519 signature scheme.

use crate::error::{ClientError, ClientResult};

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;

/// Scheme byte appended to the public key when deriving the authentication key
const ED25519_SCHEME: u8 = 0x00;

/// 32-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress([u8; AccountAddress::LENGTH]);

impl AccountAddress {
    pub const LENGTH: usize = 32;

    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Address `0x1`, home of the framework modules
    pub fn one() -> Self {
        let mut bytes = [0u8; Self::LENGTH];
        bytes[Self::LENGTH - 1] = 1;
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    /// Authentication key of a single ed25519 public key
    pub fn from_ed25519_public_key(public_key: &VerifyingKey) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(public_key.as_bytes());
        hasher.update([ED25519_SCHEME]);
        Self(hasher.finalize().into())
    }

    /// Full-length `0x`-prefixed lowercase hex
    pub fn to_hex_literal(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_literal())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.to_hex_literal())
    }
}

impl FromStr for AccountAddress {
    type Err = ClientError;

    /// Accepts `0x1`, `1`, and full 64-character forms
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > Self::LENGTH * 2 {
            return Err(ClientError::InvalidAddress(s.to_string()));
        }

        // Short addresses are left-padded to the full width
        let padded = format!("{:0>64}", digits);
        let mut bytes = [0u8; Self::LENGTH];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|e| ClientError::InvalidAddress(format!("{}: {}", s, e)))?;

        Ok(Self(bytes))
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_literal())
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An account whose private key is held locally
pub struct Account {
    /// Derived once from the public key
    address: AccountAddress,
    signing_key: SigningKey,
}

impl Account {
    /// Create an account from a raw 32-byte ed25519 private key
    pub fn from_private_key(private_key: &[u8]) -> ClientResult<Self> {
        let secret: [u8; 32] = private_key.try_into().map_err(|_| {
            ClientError::SigningFailure(format!(
                "ed25519 private key must be 32 bytes, got {}",
                private_key.len()
            ))
        })?;

        let signing_key = SigningKey::from_bytes(&secret);
        let address = AccountAddress::from_ed25519_public_key(&signing_key.verifying_key());

        Ok(Self {
            address,
            signing_key,
        })
    }

    /// Create an account from a hex private key, with or without `0x`
    pub fn from_hex(private_key: &str) -> ClientResult<Self> {
        let trimmed = private_key.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits)
            .map_err(|e| ClientError::SigningFailure(format!("Invalid private key hex: {}", e)))?;
        Self::from_private_key(&bytes)
    }

    /// Generate a fresh random account
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        let address = AccountAddress::from_ed25519_public_key(&signing_key.verifying_key());
        Self {
            address,
            signing_key,
        }
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign the exact bytes given. Ed25519 signatures are deterministic.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify a signature against this account's public key
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        self.signing_key
            .verifying_key()
            .verify(message, &Signature::from_bytes(&sig_bytes))
            .is_ok()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";

    #[test]
    fn test_address_derivation_is_stable() {
        let a = Account::from_hex(KEY).unwrap();
        let b = Account::from_hex(KEY.trim_start_matches("0x")).unwrap();
        assert_eq!(a.address(), b.address());

        let vk = VerifyingKey::from_bytes(&a.public_key()).unwrap();
        assert_eq!(a.address(), AccountAddress::from_ed25519_public_key(&vk));
    }

    #[test]
    fn test_sign_is_deterministic_and_verifies() {
        let account = Account::from_hex(KEY).unwrap();
        let message = b"canonical signing message";

        let first = account.sign(message);
        let second = account.sign(message);
        assert_eq!(first, second);
        assert!(account.verify(message, &first));
        assert!(!account.verify(b"different message", &first));
        assert!(!account.verify(message, &first[..63]));
    }

    #[test]
    fn test_bad_key_material_is_signing_failure() {
        assert!(matches!(
            Account::from_private_key(&[1u8; 31]),
            Err(ClientError::SigningFailure(_))
        ));
        assert!(matches!(
            Account::from_hex("0xnothex"),
            Err(ClientError::SigningFailure(_))
        ));
    }

    #[test]
    fn test_address_parsing() {
        let one: AccountAddress = "0x1".parse().unwrap();
        assert_eq!(one, AccountAddress::one());
        assert_eq!(
            one.to_string(),
            "0x0000000000000000000000000000000000000000000000000000000000000001"
        );

        let full = "0x0bf137ced519f68a3ac97eee8007712eeb7c5c982ebf9c79aed9666627a44aaa";
        assert_eq!(full.parse::<AccountAddress>().unwrap().to_string(), full);

        assert!("".parse::<AccountAddress>().is_err());
        assert!("0xzz".parse::<AccountAddress>().is_err());
        assert!(format!("{}00", full).parse::<AccountAddress>().is_err());
    }

    #[test]
    fn test_address_serde() {
        let addr: AccountAddress = "0xabc".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        let back: AccountAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}
