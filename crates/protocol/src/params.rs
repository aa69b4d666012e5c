use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Parameter fields excluded from cache keys: they change per request
/// without changing the logical work.
pub const VOLATILE_PARAM_KEYS: &[&str] = &["timestamp", "request_id", "trace_id", "session_id"];

/// Task parameters as supplied by a plugin. `BTreeMap` keeps field ordering
/// stable, which cache keying relies on.
pub type TaskParams = BTreeMap<String, ParamValue>;

/// A task parameter value.
///
/// The original system accepted arbitrary duck-typed objects; this is the
/// explicit tagged equivalent, with accessor-validators instead of runtime
/// reflection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
}

impl ParamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "string",
            Self::List => "list",
            Self::Map => "map",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("parameter '{name}' expected {expected}, got {actual}")]
pub struct ParamTypeError {
    pub name: String,
    pub expected: &'static str,
    pub actual: &'static str,
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Bool(_) => ParamKind::Bool,
            Self::Int(_) => ParamKind::Int,
            Self::Float(_) => ParamKind::Float,
            Self::Str(_) => ParamKind::Str,
            Self::List(_) => ParamKind::List,
            Self::Map(_) => ParamKind::Map,
        }
    }

    pub fn expect_str(&self, name: &str) -> Result<&str, ParamTypeError> {
        match self {
            Self::Str(value) => Ok(value),
            other => Err(type_error(name, ParamKind::Str, other)),
        }
    }

    pub fn expect_bool(&self, name: &str) -> Result<bool, ParamTypeError> {
        match self {
            Self::Bool(value) => Ok(*value),
            other => Err(type_error(name, ParamKind::Bool, other)),
        }
    }

    pub fn expect_usize(&self, name: &str) -> Result<usize, ParamTypeError> {
        match self {
            Self::Int(value) if *value >= 0 => Ok(usize::try_from(*value).unwrap_or(usize::MAX)),
            other => Err(type_error(name, ParamKind::Int, other)),
        }
    }
}

fn type_error(name: &str, expected: ParamKind, actual: &ParamValue) -> ParamTypeError {
    ParamTypeError {
        name: name.to_string(),
        expected: expected.as_str(),
        actual: actual.kind().as_str(),
    }
}

/// Parameters with volatile fields dropped, in stable (BTreeMap) order.
/// This is the form that feeds cache-key hashing.
pub fn canonical_params(params: &TaskParams) -> TaskParams {
    params
        .iter()
        .filter(|(key, _)| !VOLATILE_PARAM_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
