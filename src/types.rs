//! Transaction value types exchanged with the node

use crate::account::AccountAddress;
use crate::payload::TransactionPayload;

use serde::{Deserialize, Serialize};

/// A transaction ready to be encoded for signing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub sender: AccountAddress,
    #[serde(with = "u64_string")]
    pub sequence_number: u64,
    #[serde(with = "u64_string")]
    pub max_gas_amount: u64,
    #[serde(with = "u64_string")]
    pub gas_unit_price: u64,
    #[serde(with = "u64_string")]
    pub expiration_timestamp_secs: u64,
    pub payload: TransactionPayload,
}

/// Signature block attached to a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "ed25519_signature")]
pub struct Ed25519Authenticator {
    /// `0x`-hex public key
    pub public_key: String,
    /// `0x`-hex signature over the encoded signing message
    pub signature: String,
}

impl Ed25519Authenticator {
    pub fn new(public_key: &[u8], signature: &[u8]) -> Self {
        Self {
            public_key: format!("0x{}", hex::encode(public_key)),
            signature: format!("0x{}", hex::encode(signature)),
        }
    }
}

/// Unsigned transaction plus authenticator; immutable once assembled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    raw: UnsignedTransaction,
    signature: Ed25519Authenticator,
}

impl SignedTransaction {
    pub fn new(raw: UnsignedTransaction, signature: Ed25519Authenticator) -> Self {
        Self { raw, signature }
    }

    pub fn raw(&self) -> &UnsignedTransaction {
        &self.raw
    }

    pub fn authenticator(&self) -> &Ed25519Authenticator {
        &self.signature
    }

    /// JSON body for `POST /transactions`
    pub fn to_submission_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Confirmation status of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Committed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Committed => "committed",
            TransactionStatus::Failed => "failed",
        }
    }
}

/// Outcome of a submission or a status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub hash: String,
    pub status: TransactionStatus,
    /// VM status for failed transactions
    pub error_detail: Option<String>,
    pub version: Option<u64>,
    pub gas_used: Option<u64>,
}

impl TransactionResult {
    pub fn pending(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            status: TransactionStatus::Pending,
            error_detail: None,
            version: None,
            gas_used: None,
        }
    }

    /// Committed and Failed never change on re-query
    pub fn is_terminal(&self) -> bool {
        self.status != TransactionStatus::Pending
    }
}

/// Raw transaction view returned by `GET /transactions/by_hash/{hash}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TransactionView {
    #[serde(rename = "type")]
    pub kind: String,
    pub hash: String,
    pub success: Option<bool>,
    pub vm_status: Option<String>,
    #[serde(default, with = "opt_u64_string")]
    pub version: Option<u64>,
    #[serde(default, with = "opt_u64_string")]
    pub gas_used: Option<u64>,
}

impl From<TransactionView> for TransactionResult {
    fn from(view: TransactionView) -> Self {
        if view.kind == "pending_transaction" {
            return TransactionResult::pending(view.hash);
        }

        let success = view.success.unwrap_or(false);
        TransactionResult {
            hash: view.hash,
            status: if success {
                TransactionStatus::Committed
            } else {
                TransactionStatus::Failed
            },
            error_detail: if success { None } else { view.vm_status },
            version: view.version,
            gas_used: view.gas_used,
        }
    }
}

/// On-chain account summary from `GET /accounts/{address}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccountView {
    #[serde(with = "u64_string")]
    pub sequence_number: u64,
}

/// A single resource stored under an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub data: serde_json::Value,
}

/// Numbers travel as decimal strings in node JSON
pub(crate) mod u64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Num(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Str(s) => s.parse().map_err(de::Error::custom),
            Repr::Num(n) => Ok(n),
        }
    }
}

pub(crate) mod opt_u64_string {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::u64_string")] u64);

        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{arg, build_entry_function};
    use serde_json::json;

    fn sample_raw() -> UnsignedTransaction {
        UnsignedTransaction {
            sender: "0xabc".parse().unwrap(),
            sequence_number: 5,
            max_gas_amount: 2000,
            gas_unit_price: 100,
            expiration_timestamp_secs: 1_700_000_000,
            payload: build_entry_function("0xabc::M", "f", Vec::<String>::new(), vec![arg::string("x")])
                .unwrap(),
        }
    }

    #[test]
    fn test_signed_transaction_wire_shape() {
        let signed = SignedTransaction::new(sample_raw(), Ed25519Authenticator::new(&[1, 2], &[3, 4]));
        let json: serde_json::Value =
            serde_json::from_slice(&signed.to_submission_bytes().unwrap()).unwrap();

        assert_eq!(json["sequence_number"], "5");
        assert_eq!(json["gas_unit_price"], "100");
        assert_eq!(json["payload"]["type"], "entry_function_payload");
        assert_eq!(
            json["signature"],
            json!({"type": "ed25519_signature", "public_key": "0x0102", "signature": "0x0304"})
        );
    }

    #[test]
    fn test_transaction_view_statuses() {
        let pending: TransactionView =
            serde_json::from_value(json!({"type": "pending_transaction", "hash": "0x1"})).unwrap();
        assert_eq!(TransactionResult::from(pending).status, TransactionStatus::Pending);

        let committed: TransactionView = serde_json::from_value(json!({
            "type": "user_transaction", "hash": "0x2", "success": true,
            "vm_status": "Executed successfully", "version": "42", "gas_used": "7"
        }))
        .unwrap();
        let result = TransactionResult::from(committed);
        assert_eq!(result.status, TransactionStatus::Committed);
        assert_eq!(result.version, Some(42));
        assert_eq!(result.gas_used, Some(7));
        assert!(result.error_detail.is_none());

        let failed: TransactionView = serde_json::from_value(json!({
            "type": "user_transaction", "hash": "0x3", "success": false,
            "vm_status": "Move abort: EINSUFFICIENT_BALANCE"
        }))
        .unwrap();
        let result = TransactionResult::from(failed);
        assert_eq!(result.status, TransactionStatus::Failed);
        assert!(result.is_terminal());
        assert_eq!(result.error_detail.as_deref(), Some("Move abort: EINSUFFICIENT_BALANCE"));
    }
}
