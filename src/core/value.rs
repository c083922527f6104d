//! The custom-value channel.
//!
//! Monitored states and transitions expose a free-form, domain-defined tag
//! that conditions and external observers may poll. Rather than an open
//! dynamic type, the value space is a closed tagged variant covering the
//! kinds the domain actually uses, which keeps equality comparison
//! well-defined.

use serde::{Deserialize, Serialize};

/// A domain-defined tag stored on a monitored state or transition.
///
/// `Value` is the payload for value-equality conditions: a
/// [`Condition::state_value`](crate::core::Condition::state_value) compares a
/// state's current value against an expected one with plain `==`.
///
/// Equality follows the derived `PartialEq`: two values are equal when they
/// have the same variant and the same payload. `Float` comparison uses IEEE
/// semantics, so a `NaN` value never equals anything, including itself.
///
/// # Example
///
/// ```rust
/// use cadence::core::Value;
///
/// let mode = Value::from("found");
/// assert_eq!(mode, Value::Text("found".to_string()));
/// assert_ne!(Value::Bool(true), Value::Int(1));
/// assert_eq!(Value::default(), Value::None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// No value assigned. This is the default for freshly created states.
    #[default]
    None,
    /// A boolean tag, e.g. a blinker's begin-on flag.
    Bool(bool),
    /// An integer tag, e.g. a step index.
    Int(i64),
    /// A floating-point tag, e.g. a sensor reading snapshot.
    Float(f64),
    /// A textual tag, e.g. a mode name like `"found"`.
    Text(String),
}

impl Value {
    /// Check whether a value has been assigned.
    pub fn is_some(&self) -> bool {
        !matches!(self, Value::None)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}
