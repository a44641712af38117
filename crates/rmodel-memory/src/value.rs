// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Tagged memory values

use serde::{Deserialize, Serialize};
use std::fmt;

/// A value stored in brain memory
///
/// The variant is kept through persistence, so an `Int` written by one
/// neuron is read back as an `Int` by the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MemoryValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Json(serde_json::Value),
}

impl MemoryValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            MemoryValue::String(_) => "string",
            MemoryValue::Int(_) => "int",
            MemoryValue::Float(_) => "float",
            MemoryValue::Bool(_) => "bool",
            MemoryValue::Json(_) => "json",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MemoryValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MemoryValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and integers widened to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MemoryValue::Float(f) => Some(*f),
            MemoryValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MemoryValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            MemoryValue::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Convert any value into its JSON representation
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MemoryValue::String(s) => serde_json::Value::from(s.as_str()),
            MemoryValue::Int(i) => serde_json::Value::from(*i),
            MemoryValue::Float(f) => serde_json::Value::from(*f),
            MemoryValue::Bool(b) => serde_json::Value::from(*b),
            MemoryValue::Json(v) => v.clone(),
        }
    }
}

impl fmt::Display for MemoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryValue::String(s) => write!(f, "{}", s),
            MemoryValue::Int(i) => write!(f, "{}", i),
            MemoryValue::Float(v) => write!(f, "{}", v),
            MemoryValue::Bool(b) => write!(f, "{}", b),
            MemoryValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<String> for MemoryValue {
    fn from(value: String) -> Self {
        MemoryValue::String(value)
    }
}

impl From<&str> for MemoryValue {
    fn from(value: &str) -> Self {
        MemoryValue::String(value.to_string())
    }
}

impl From<bool> for MemoryValue {
    fn from(value: bool) -> Self {
        MemoryValue::Bool(value)
    }
}

impl From<f64> for MemoryValue {
    fn from(value: f64) -> Self {
        MemoryValue::Float(value)
    }
}

impl From<f32> for MemoryValue {
    fn from(value: f32) -> Self {
        MemoryValue::Float(value as f64)
    }
}

impl From<serde_json::Value> for MemoryValue {
    fn from(value: serde_json::Value) -> Self {
        MemoryValue::Json(value)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for MemoryValue {
                fn from(value: $t) -> Self {
                    MemoryValue::Int(value as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);
