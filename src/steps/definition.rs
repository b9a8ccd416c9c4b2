//! Step definitions and their ordered properties.
//!
//! A step definition describes one page of the account-creation wizard.
//! Its behaviour is driven entirely by string properties grouped into
//! three namespaces:
//!
//! - `init.*` - values shown to the client (labels, default text, choices)
//! - `server.*` - control metadata the client never sees: next/previous
//!   links, handler bindings, templating markers
//! - `data.*` - keys the client fills in and sends back
//!
//! # Example
//!
//! ```yaml
//! id: class-select
//! kind: radio
//! title: Choose your community
//! properties:
//!   init.choice0: Warder
//!   init.choice1: Aes Sedai
//!   data.choice: "0"
//!   server.method: setWotCharacterClass
//!   server.choice0.next: warder-rank
//!   server.choice1.next: aes-sedai-rank
//! ```

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Prefix of client-visible properties.
pub const INIT_PREFIX: &str = "init.";
/// Prefix of server-only properties.
pub const SERVER_PREFIX: &str = "server.";
/// Prefix of properties echoed back by the client.
pub const DATA_PREFIX: &str = "data.";

/// Widget the client uses to render a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// A single text field.
    #[default]
    Text,
    /// Two text fields.
    TextPair,
    /// A password field with confirmation.
    Password,
    /// A multi-line text area.
    TextArea,
    /// A scrollable list of choices.
    List,
    /// A drop-down list of choices.
    Combo,
    /// Radio buttons.
    Radio,
    /// Read-only information.
    Info,
}

/// An ordered set of string properties.
///
/// Insertion order is preserved: it is the order the client displays
/// fields in and the order the session applies submitted data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(Vec<(String, String)>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a property, keeping its position if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// Entries whose key starts with `prefix`.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.iter().filter(move |(k, _)| k.starts_with(prefix))
    }

    /// A copy without the entries whose key starts with `prefix`.
    pub fn without_prefix(&self, prefix: &str) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| !k.starts_with(prefix))
                .cloned()
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Self::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Property values may be written as any YAML/JSON scalar.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Text(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

struct PropertiesVisitor;

impl<'de> Visitor<'de> for PropertiesVisitor {
    type Value = Properties;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of property names to scalar values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut props = Properties::new();
        while let Some((key, value)) = access.next_entry::<String, Scalar>()? {
            props.insert(key, String::from(value));
        }
        Ok(props)
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(Properties::new())
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PropertiesVisitor)
    }
}

fn default_true() -> bool {
    true
}

/// One page of the wizard.
///
/// Definitions are immutable once loaded into the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Unique step identifier, referenced by `next` and `previous` links.
    pub id: String,

    #[serde(default)]
    pub kind: StepKind,

    #[serde(default)]
    pub title: String,

    /// Whether the client may go back from this step.
    #[serde(default = "default_true")]
    pub previous_enabled: bool,

    #[serde(default = "default_true")]
    pub next_enabled: bool,

    /// Submitting this step finalizes the account.
    #[serde(default)]
    pub last_step: bool,

    #[serde(default)]
    pub properties: Properties,
}

impl StepDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: StepKind::default(),
            title: String::new(),
            previous_enabled: true,
            next_enabled: true,
            last_step: false,
            properties: Properties::new(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key)
    }

    /// `server.next`: the default transition.
    pub fn default_next(&self) -> Option<&str> {
        self.property("server.next")
    }

    /// `server.previous`: the step to return to.
    pub fn previous(&self) -> Option<&str> {
        self.property("server.previous")
    }

    /// `server.method`: the handler applied to every data key without a
    /// specific binding.
    pub fn default_method(&self) -> Option<&str> {
        self.property("server.method")
    }

    /// `server.<suffix>.method`
    pub fn method_for(&self, suffix: &str) -> Option<&str> {
        self.property(&format!("server.{}.method", suffix))
    }

    /// `server.<suffix>.next`
    pub fn next_for(&self, suffix: &str) -> Option<&str> {
        self.property(&format!("server.{}.next", suffix))
    }

    /// `init.choice<N>`: the label of the Nth alternative.
    pub fn choice(&self, index: usize) -> Option<&str> {
        self.property(&format!("init.choice{}", index))
    }

    /// Properties the client may see: everything but `server.*`.
    pub fn client_properties(&self) -> Properties {
        self.properties.without_prefix(SERVER_PREFIX)
    }

    /// Every step id this definition links to, with the property key
    /// holding the link.
    pub fn links(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .with_prefix(SERVER_PREFIX)
            .filter(|(k, _)| *k == "server.previous" || k.ends_with(".next"))
    }
}

/// A file of step definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepFile {
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}
