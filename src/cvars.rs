//! Console variables (CVars).
//!
//! A CVar is a named value whose type is fixed when it is first declared.
//! Later assignments, including the ones typed at the prompt, are converted
//! to that type or rejected.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ConversionError, DefinitionError};

/// Declared type of a CVar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CVarType {
    Bool,
    Int,
    Float,
    Text,
}

impl CVarType {
    pub fn name(self) -> &'static str {
        match self {
            CVarType::Bool => "bool",
            CVarType::Int => "int",
            CVarType::Float => "float",
            CVarType::Text => "string",
        }
    }
}

/// A CVar value
#[derive(Debug, Clone, PartialEq)]
pub enum CVarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CVarValue {
    pub fn kind(&self) -> CVarType {
        match self {
            CVarValue::Bool(_) => CVarType::Bool,
            CVarValue::Int(_) => CVarType::Int,
            CVarValue::Float(_) => CVarType::Float,
            CVarValue::Text(_) => CVarType::Text,
        }
    }

    /// Parse raw console input as a value of `kind`
    pub fn parse(kind: CVarType, raw: &str) -> Result<Self, ConversionError> {
        let err = || ConversionError {
            value: raw.to_string(),
            expected: kind.name(),
        };
        let trimmed = raw.trim();

        match kind {
            CVarType::Bool => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Ok(CVarValue::Bool(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(CVarValue::Bool(false))
                } else {
                    Err(err())
                }
            }
            CVarType::Int => trimmed.parse().map(CVarValue::Int).map_err(|_| err()),
            CVarType::Float => trimmed.parse().map(CVarValue::Float).map_err(|_| err()),
            CVarType::Text => Ok(CVarValue::Text(raw.to_string())),
        }
    }

    /// Convert this value to `kind`
    pub fn coerce(self, kind: CVarType) -> Result<Self, ConversionError> {
        if self.kind() == kind {
            return Ok(self);
        }
        match (self, kind) {
            (CVarValue::Int(i), CVarType::Float) => Ok(CVarValue::Float(i as f64)),
            (CVarValue::Bool(b), CVarType::Int) => Ok(CVarValue::Int(i64::from(b))),
            (CVarValue::Float(f), CVarType::Int) if f.fract() == 0.0 => Ok(CVarValue::Int(f as i64)),
            (other, CVarType::Text) => Ok(CVarValue::Text(other.to_string())),
            (CVarValue::Text(s), kind) => Self::parse(kind, &s),
            (other, kind) => Err(ConversionError {
                value: other.to_string(),
                expected: kind.name(),
            }),
        }
    }
}

impl fmt::Display for CVarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CVarValue::Bool(b) => write!(f, "{}", b),
            CVarValue::Int(i) => write!(f, "{}", i),
            CVarValue::Float(x) => write!(f, "{}", x),
            CVarValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for CVarValue {
    fn from(value: bool) -> Self {
        CVarValue::Bool(value)
    }
}

impl From<i32> for CVarValue {
    fn from(value: i32) -> Self {
        CVarValue::Int(i64::from(value))
    }
}

impl From<i64> for CVarValue {
    fn from(value: i64) -> Self {
        CVarValue::Int(value)
    }
}

impl From<f64> for CVarValue {
    fn from(value: f64) -> Self {
        CVarValue::Float(value)
    }
}

impl From<&str> for CVarValue {
    fn from(value: &str) -> Self {
        CVarValue::Text(value.to_string())
    }
}

impl From<String> for CVarValue {
    fn from(value: String) -> Self {
        CVarValue::Text(value)
    }
}

/// Typed read access to a CVar value
pub trait FromCVar: Sized {
    fn from_cvar(value: &CVarValue) -> Option<Self>;
}

impl FromCVar for bool {
    fn from_cvar(value: &CVarValue) -> Option<Self> {
        match value {
            CVarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromCVar for i64 {
    fn from_cvar(value: &CVarValue) -> Option<Self> {
        match value {
            CVarValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromCVar for i32 {
    fn from_cvar(value: &CVarValue) -> Option<Self> {
        match value {
            CVarValue::Int(i) => i32::try_from(*i).ok(),
            _ => None,
        }
    }
}

impl FromCVar for f64 {
    fn from_cvar(value: &CVarValue) -> Option<Self> {
        match value {
            CVarValue::Float(x) => Some(*x),
            CVarValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromCVar for String {
    fn from_cvar(value: &CVarValue) -> Option<Self> {
        Some(value.to_string())
    }
}

/// A declared CVar
#[derive(Debug, Clone, PartialEq)]
pub struct CVar {
    pub kind: CVarType,
    pub value: CVarValue,
}

/// Name-ordered CVar storage
#[derive(Debug, Default, Clone)]
pub struct CVarStore {
    vars: BTreeMap<String, CVar>,
}

impl CVarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new CVar; its type is taken from `value`
    pub fn add(&mut self, name: &str, value: impl Into<CVarValue>) -> Result<(), DefinitionError> {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(DefinitionError::InvalidName(name.to_string()));
        }
        if self.vars.contains_key(name) {
            return Err(DefinitionError::DuplicateCVar(name.to_string()));
        }
        let value = value.into();
        self.vars.insert(
            name.to_string(),
            CVar {
                kind: value.kind(),
                value,
            },
        );
        Ok(())
    }

    /// Set an existing CVar (converting to its declared type) or declare it.
    pub fn set(&mut self, name: &str, value: impl Into<CVarValue>) -> Result<(), ConversionError> {
        let value = value.into();
        match self.vars.get_mut(name) {
            Some(var) => {
                var.value = value.coerce(var.kind)?;
                Ok(())
            }
            None => {
                self.vars.insert(
                    name.to_string(),
                    CVar {
                        kind: value.kind(),
                        value,
                    },
                );
                Ok(())
            }
        }
    }

    /// Assign raw console input to an existing CVar.
    ///
    /// The stored value is left untouched when conversion fails.
    pub fn set_from_str(&mut self, name: &str, raw: &str) -> Result<Option<&CVarValue>, ConversionError> {
        let Some(var) = self.vars.get_mut(name) else {
            return Ok(None);
        };
        var.value = CVarValue::parse(var.kind, raw)?;
        Ok(Some(&var.value))
    }

    pub fn get(&self, name: &str) -> Option<&CVar> {
        self.vars.get(name)
    }

    /// Typed value lookup
    pub fn value<T: FromCVar>(&self, name: &str) -> Option<T> {
        self.vars.get(name).and_then(|var| T::from_cvar(&var.value))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Result<CVar, DefinitionError> {
        self.vars
            .remove(name)
            .ok_or_else(|| DefinitionError::UnknownCVar(name.to_string()))
    }

    /// All CVars ordered by name
    pub fn ordered_by_name(&self) -> impl Iterator<Item = (&str, &CVar)> {
        self.vars.iter().map(|(name, var)| (name.as_str(), var))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
