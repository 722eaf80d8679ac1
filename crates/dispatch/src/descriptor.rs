//! Provider descriptors: identity, credential needs, parameter schema

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::Parameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Inclusive integer bounds; out-of-range values are clamped
    Range { min: i64, max: i64 },
    /// Allowed string values; anything else falls back to the default
    OneOf(Vec<String>),
}

/// Parameter binding failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error("missing required parameter '{0}'")]
    Missing(String),

    #[error("parameter '{name}' must be a {expected}")]
    WrongType { name: String, expected: ParamType },

    #[error("parameter '{name}' does not accept '{value}'")]
    NotAllowed { name: String, value: String },
}

/// One entry of a provider's parameter schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamType,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
}

impl ParamSpec {
    fn new(name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
            default: None,
            constraint: None,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::String, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer, description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Boolean, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.constraint = Some(Constraint::Range { min, max });
        self
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraint = Some(Constraint::OneOf(
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Coerce, constrain and default one raw value.
    ///
    /// `Ok(None)` means the parameter is optional and absent.
    pub fn resolve(&self, raw: Option<&Value>) -> Result<Option<Value>, BindError> {
        let raw = raw.filter(|v| !v.is_null());

        match raw.map(|v| self.coerce(v)) {
            Some(Some(value)) => self.constrain(value).map(Some),
            Some(None) => match &self.default {
                Some(default) => Ok(Some(default.clone())),
                None if self.required => Err(BindError::WrongType {
                    name: self.name.clone(),
                    expected: self.kind,
                }),
                None => Ok(None),
            },
            None => match &self.default {
                Some(default) => Ok(Some(default.clone())),
                None if self.required => Err(BindError::Missing(self.name.clone())),
                None => Ok(None),
            },
        }
    }

    fn coerce(&self, value: &Value) -> Option<Value> {
        match self.kind {
            ParamType::Integer => coerce_integer(value).map(Value::from),
            ParamType::Boolean => coerce_bool(value).map(Value::from),
            ParamType::String => {
                let text = match value {
                    Value::String(s) => s.trim().to_string(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                if self.required && text.is_empty() {
                    None
                } else {
                    Some(Value::String(text))
                }
            }
        }
    }

    fn constrain(&self, value: Value) -> Result<Value, BindError> {
        match &self.constraint {
            Some(Constraint::Range { min, max }) => match value.as_i64() {
                Some(n) => Ok(Value::from(n.clamp(*min, *max))),
                None => Ok(value),
            },
            Some(Constraint::OneOf(allowed)) => {
                let text = value.as_str().unwrap_or_default();
                if let Some(hit) = allowed.iter().find(|a| a.eq_ignore_ascii_case(text)) {
                    return Ok(Value::String(hit.clone()));
                }
                match &self.default {
                    Some(default) => {
                        debug!(
                            "◆ '{}' NOT ALLOWED FOR {}, USING DEFAULT",
                            text, self.name
                        );
                        Ok(default.clone())
                    }
                    None => Err(BindError::NotAllowed {
                        name: self.name.clone(),
                        value: text.to_string(),
                    }),
                }
            }
            None => Ok(value),
        }
    }
}

/// Integers from numbers or numeric strings; fractions are truncated
pub(crate) fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "on" => Some(true),
            "false" | "no" | "n" | "0" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Static metadata for one capability provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderDescriptor {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub required_credentials: BTreeSet<String>,
    pub parameter_schema: Vec<ParamSpec>,
    /// Overrides the system-wide default timeout
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl ProviderDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: String::new(),
            required_credentials: BTreeSet::new(),
            parameter_schema: Vec::new(),
            timeout: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn requires(mut self, credential: impl Into<String>) -> Self {
        self.required_credentials.insert(credential.into());
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.parameter_schema.push(spec);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn param_spec(&self, name: &str) -> Option<&ParamSpec> {
        self.parameter_schema.iter().find(|p| p.name == name)
    }

    /// Build this provider's argument set from a request's parameters.
    ///
    /// Only schema parameters are kept, in schema order.
    pub fn bind(&self, params: &Parameters) -> Result<Parameters, BindError> {
        let mut bound = Parameters::new();
        for spec in &self.parameter_schema {
            if let Some(value) = spec.resolve(params.get(&spec.name))? {
                bound.insert(spec.name.clone(), value);
            }
        }
        debug!("◆ BOUND {} PARAMS FOR {}", bound.len(), self.id);
        Ok(bound)
    }
}
