//! Entry-function payload construction
//!
//! Payloads are built from an `address::module` identifier, a function name,
//! type arguments and call arguments that are already in the node's JSON
//! wire form. Nothing here checks arguments against the on-chain function
//! signature; a mismatch is reported by the node when the transaction is
//! encoded or executed.

use crate::account::AccountAddress;
use crate::error::{ClientError, ClientResult};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

const PRIMITIVE_TYPES: &[&str] = &[
    "bool", "u8", "u16", "u32", "u64", "u128", "u256", "address", "signer",
];

/// `address::module`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleId {
    pub address: AccountAddress,
    pub name: String,
}

impl FromStr for ModuleId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, name) = s
            .split_once("::")
            .ok_or_else(|| ClientError::InvalidFunctionId(format!("'{}' is not address::module", s)))?;
        let address = address
            .parse()
            .map_err(|_| ClientError::InvalidFunctionId(format!("bad address in '{}'", s)))?;
        check_identifier(name, s)?;
        Ok(Self {
            address,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.address, self.name)
    }
}

/// Fully-qualified `address::module::function`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryFunctionId {
    pub module: ModuleId,
    pub name: String,
}

impl FromStr for EntryFunctionId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, name) = s
            .rsplit_once("::")
            .ok_or_else(|| ClientError::InvalidFunctionId(format!("'{}' is not address::module::function", s)))?;
        let module: ModuleId = module.parse()?;
        check_identifier(name, s)?;
        Ok(Self {
            module,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for EntryFunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.name)
    }
}

impl Serialize for EntryFunctionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntryFunctionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Transaction payload in the node's JSON submission format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransactionPayload {
    #[serde(rename = "entry_function_payload")]
    EntryFunction {
        function: EntryFunctionId,
        type_arguments: Vec<String>,
        arguments: Vec<Value>,
    },
}

impl TransactionPayload {
    pub fn function(&self) -> &EntryFunctionId {
        match self {
            TransactionPayload::EntryFunction { function, .. } => function,
        }
    }
}

/// Build an entry-function payload after validating its shape
pub fn build_entry_function<T, A>(
    module: &str,
    function: &str,
    type_args: T,
    args: A,
) -> ClientResult<TransactionPayload>
where
    T: IntoIterator,
    T::Item: Into<String>,
    A: IntoIterator<Item = Value>,
{
    if function.is_empty() {
        return Err(ClientError::InvalidFunctionId(
            "function name is empty".to_string(),
        ));
    }
    let module: ModuleId = module.parse()?;
    check_identifier(function, function)?;

    build_entry_function_by_id(
        EntryFunctionId {
            module,
            name: function.to_string(),
        },
        type_args,
        args,
    )
}

/// Same as [`build_entry_function`] for an already parsed identifier
pub fn build_entry_function_by_id<T, A>(
    function: EntryFunctionId,
    type_args: T,
    args: A,
) -> ClientResult<TransactionPayload>
where
    T: IntoIterator,
    T::Item: Into<String>,
    A: IntoIterator<Item = Value>,
{
    let type_arguments: Vec<String> = type_args.into_iter().map(Into::into).collect();
    for tag in &type_arguments {
        validate_type_tag(tag)?;
    }

    let arguments: Vec<Value> = args.into_iter().collect();
    for (index, arg) in arguments.iter().enumerate() {
        validate_argument(arg).map_err(|reason| ClientError::InvalidArgumentEncoding { index, reason })?;
    }

    Ok(TransactionPayload::EntryFunction {
        function,
        type_arguments,
        arguments,
    })
}

fn check_identifier(name: &str, context: &str) -> ClientResult<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(ClientError::InvalidFunctionId(format!(
            "'{}' is not a valid identifier in '{}'",
            name, context
        )))
    }
}

/// Validate a Move type tag such as `u64`, `vector<u8>` or
/// `0x1::coin::Coin<0x1::aptos_coin::AptosCoin>`
pub fn validate_type_tag(tag: &str) -> ClientResult<()> {
    if parse_type_tag(tag.trim()) {
        Ok(())
    } else {
        Err(ClientError::InvalidTypeArgument(tag.to_string()))
    }
}

fn parse_type_tag(tag: &str) -> bool {
    if PRIMITIVE_TYPES.contains(&tag) {
        return true;
    }

    if let Some(inner) = tag.strip_prefix("vector<").and_then(|t| t.strip_suffix('>')) {
        return parse_type_tag(inner.trim());
    }

    let (path, generics) = match tag.find('<') {
        Some(open) => match tag.strip_suffix('>') {
            Some(t) => (&t[..open], Some(&t[open + 1..])),
            None => return false,
        },
        None => (tag, None),
    };

    let parts: Vec<&str> = path.split("::").collect();
    if parts.len() != 3
        || parts[0].parse::<AccountAddress>().is_err()
        || !IDENTIFIER.is_match(parts[1])
        || !IDENTIFIER.is_match(parts[2])
    {
        return false;
    }

    match generics {
        Some(list) => split_top_level(list)
            .map(|items| items.iter().all(|t| parse_type_tag(t.trim())))
            .unwrap_or(false),
        None => true,
    }
}

/// Split on commas that are not nested inside `<...>`
fn split_top_level(list: &str) -> Option<Vec<&str>> {
    let mut items = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            ',' if depth == 0 => {
                items.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    items.push(&list[start..]);
    Some(items)
}

/// Wire form: strings (including stringified integers and hex bytes),
/// booleans, and arrays of those.
fn validate_argument(arg: &Value) -> Result<(), String> {
    match arg {
        Value::String(_) | Value::Bool(_) => Ok(()),
        Value::Array(items) => items.iter().try_for_each(validate_argument),
        Value::Number(n) => Err(format!(
            "number {} must be passed as a decimal string",
            n
        )),
        Value::Null => Err("null has no wire encoding".to_string()),
        Value::Object(_) => Err("objects have no wire encoding".to_string()),
    }
}

/// Helpers producing arguments in wire form
pub mod arg {
    use crate::account::AccountAddress;
    use serde_json::Value;

    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn bool(b: bool) -> Value {
        Value::Bool(b)
    }

    pub fn u64(n: u64) -> Value {
        Value::String(n.to_string())
    }

    pub fn u128(n: u128) -> Value {
        Value::String(n.to_string())
    }

    /// `vector<u8>` arguments travel as `0x`-prefixed hex
    pub fn bytes(b: impl AsRef<[u8]>) -> Value {
        Value::String(format!("0x{}", hex::encode(b.as_ref())))
    }

    pub fn address(a: &AccountAddress) -> Value {
        Value::String(a.to_hex_literal())
    }

    pub fn vector(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Array(items.into_iter().collect())
    }
}
