// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Normalised memory keys
//!
//! Two keys are the same key when their canonical forms match:
//! - integers compare by value, whatever their width or signedness
//! - floats compare by bit pattern
//! - strings and byte strings compare by content
//!
//! The stable hash is `xxh64("<tag>:<canonical text>", 0)` and does not
//! change between processes, so it can name persisted entries.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

use crate::MemoryError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MemoryKey {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bytes(Vec<u8>),
}

impl MemoryKey {
    fn tag(&self) -> &'static str {
        match self {
            MemoryKey::Str(_) => "str",
            MemoryKey::Int(_) | MemoryKey::UInt(_) => "int",
            MemoryKey::Float(_) => "float",
            MemoryKey::Bytes(_) => "bytes",
        }
    }

    /// `tag:text` form shared by equality, hashing and persistence
    pub fn canonical(&self) -> String {
        let text = match self {
            MemoryKey::Str(s) => s.clone(),
            MemoryKey::Int(i) => i.to_string(),
            MemoryKey::UInt(u) => u.to_string(),
            MemoryKey::Float(f) => format!("{:016x}", f.to_bits()),
            MemoryKey::Bytes(b) => b.iter().map(|byte| format!("{:02x}", byte)).collect(),
        };
        format!("{}:{}", self.tag(), text)
    }

    pub fn stable_hash(&self) -> u64 {
        xxh64(self.canonical().as_bytes(), 0)
    }
}

impl PartialEq for MemoryKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MemoryKey::Str(a), MemoryKey::Str(b)) => a == b,
            (MemoryKey::Int(a), MemoryKey::Int(b)) => a == b,
            (MemoryKey::UInt(a), MemoryKey::UInt(b)) => a == b,
            (MemoryKey::Int(i), MemoryKey::UInt(u)) | (MemoryKey::UInt(u), MemoryKey::Int(i)) => {
                u64::try_from(*i).map(|i| i == *u).unwrap_or(false)
            }
            (MemoryKey::Float(a), MemoryKey::Float(b)) => a.to_bits() == b.to_bits(),
            (MemoryKey::Bytes(a), MemoryKey::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for MemoryKey {}

impl Hash for MemoryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.stable_hash());
    }
}

impl fmt::Display for MemoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryKey::Str(s) => write!(f, "{}", s),
            MemoryKey::Int(i) => write!(f, "{}", i),
            MemoryKey::UInt(u) => write!(f, "{}", u),
            MemoryKey::Float(v) => write!(f, "{}", v),
            MemoryKey::Bytes(b) => write!(f, "{:?}", b),
        }
    }
}

impl From<&str> for MemoryKey {
    fn from(value: &str) -> Self {
        MemoryKey::Str(value.to_string())
    }
}

impl From<String> for MemoryKey {
    fn from(value: String) -> Self {
        MemoryKey::Str(value)
    }
}

impl From<&String> for MemoryKey {
    fn from(value: &String) -> Self {
        MemoryKey::Str(value.clone())
    }
}

impl From<f64> for MemoryKey {
    fn from(value: f64) -> Self {
        MemoryKey::Float(value)
    }
}

impl From<Vec<u8>> for MemoryKey {
    fn from(value: Vec<u8>) -> Self {
        MemoryKey::Bytes(value)
    }
}

impl From<&[u8]> for MemoryKey {
    fn from(value: &[u8]) -> Self {
        MemoryKey::Bytes(value.to_vec())
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(
            impl From<$t> for MemoryKey {
                fn from(value: $t) -> Self {
                    MemoryKey::Int(value as i64)
                }
            }
        )*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(
            impl From<$t> for MemoryKey {
                fn from(value: $t) -> Self {
                    MemoryKey::UInt(value as u64)
                }
            }
        )*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

/// Keys arriving as JSON (for example from a processor payload)
impl TryFrom<&serde_json::Value> for MemoryKey {
    type Error = MemoryError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::String(s) => Ok(MemoryKey::Str(s.clone())),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(MemoryKey::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(MemoryKey::UInt(u))
                } else if let Some(f) = n.as_f64() {
                    Ok(MemoryKey::Float(f))
                } else {
                    Err(MemoryError::UnsupportedKey(n.to_string()))
                }
            }
            other => Err(MemoryError::UnsupportedKey(format!(
                "JSON {} cannot be used as a key",
                json_kind(other)
            ))),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
