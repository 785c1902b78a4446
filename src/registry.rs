//! Block type registry.
//!
//! Maps block names to [`BlockType`] descriptors. A block type is *static*
//! when it has no render callback (its saved markup is the output) and
//! *dynamic* when a callback produces the output at render time.
//!
//! A process-wide registry is available through [`Registry::global`] and the
//! free functions [`register_block_type`], [`unregister_block_type`] and
//! [`is_block_type_registered`]. Independent registries can be created for
//! isolated rendering.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RenderContext;
use crate::error::RegistryError;
use crate::render::BlockInstance;
use crate::types::Attributes;

/// Static block types registered by [`Registry::with_core_blocks`].
pub const CORE_STATIC_BLOCKS: &[&str] = &[
    "core/audio",
    "core/button",
    "core/buttons",
    "core/code",
    "core/column",
    "core/columns",
    "core/cover",
    "core/embed",
    "core/file",
    "core/freeform",
    "core/gallery",
    "core/group",
    "core/heading",
    "core/html",
    "core/image",
    "core/list",
    "core/media-text",
    "core/more",
    "core/nextpage",
    "core/paragraph",
    "core/preformatted",
    "core/pullquote",
    "core/quote",
    "core/separator",
    "core/shortcode",
    "core/spacer",
    "core/subhead",
    "core/table",
    "core/text-columns",
    "core/verse",
    "core/video",
];

// ------------------------------------------------------------------
// Render values and callbacks
// ------------------------------------------------------------------

/// What a render callback may return.
///
/// Every variant coerces to a string: numbers to their canonical decimal
/// form and `Null` to the empty string.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderValue {
    Text(String),
    Int(i64),
    Float(f64),
    Null,
}

impl RenderValue {
    /// Coerce to the string a callback's output contributes to the document.
    pub fn into_string(self) -> String {
        match self {
            RenderValue::Text(s) => s,
            RenderValue::Int(n) => n.to_string(),
            RenderValue::Float(f) => f.to_string(),
            RenderValue::Null => String::new(),
        }
    }
}

impl fmt::Display for RenderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderValue::Text(s) => f.write_str(s),
            RenderValue::Int(n) => write!(f, "{n}"),
            RenderValue::Float(x) => write!(f, "{x}"),
            RenderValue::Null => Ok(()),
        }
    }
}

impl From<String> for RenderValue {
    fn from(s: String) -> Self {
        RenderValue::Text(s)
    }
}

impl From<&str> for RenderValue {
    fn from(s: &str) -> Self {
        RenderValue::Text(s.to_string())
    }
}

impl From<i64> for RenderValue {
    fn from(n: i64) -> Self {
        RenderValue::Int(n)
    }
}

impl From<i32> for RenderValue {
    fn from(n: i32) -> Self {
        RenderValue::Int(n.into())
    }
}

impl From<u32> for RenderValue {
    fn from(n: u32) -> Self {
        RenderValue::Int(n.into())
    }
}

impl From<f64> for RenderValue {
    fn from(f: f64) -> Self {
        RenderValue::Float(f)
    }
}

impl From<()> for RenderValue {
    fn from(_: ()) -> Self {
        RenderValue::Null
    }
}

impl<T: Into<RenderValue>> From<Option<T>> for RenderValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RenderValue::Null, Into::into)
    }
}

/// A dynamic block's render function: `(attributes, inner content, instance)`.
pub type RenderCallback =
    Arc<dyn Fn(&Attributes, &str, &mut BlockInstance<'_>) -> RenderValue + Send + Sync>;

// ------------------------------------------------------------------
// Attribute schema
// ------------------------------------------------------------------

/// JSON type an attribute must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

impl AttributeType {
    /// Whether `value` has this JSON type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            AttributeType::String => value.is_string(),
            AttributeType::Number => value.is_number(),
            AttributeType::Integer => value.as_f64().is_some_and(|f| f.fract() == 0.0),
            AttributeType::Boolean => value.is_boolean(),
            AttributeType::Array => value.is_array(),
            AttributeType::Object => value.is_object(),
            AttributeType::Null => value.is_null(),
        }
    }
}

/// Declared shape of one block attribute.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeSchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AttributeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl AttributeSchema {
    /// An attribute of type `kind` with no default.
    pub fn of(kind: AttributeType) -> Self {
        Self {
            kind: Some(kind),
            default: None,
        }
    }

    /// Use `default` when the attribute is missing.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn accepts(&self, value: &Value) -> bool {
        self.kind.is_none_or(|kind| kind.accepts(value))
    }
}

// ------------------------------------------------------------------
// Block types
// ------------------------------------------------------------------

/// Options for registering a block type.
#[derive(Clone, Default)]
pub struct BlockTypeSettings {
    attributes: Option<BTreeMap<String, AttributeSchema>>,
    render_callback: Option<RenderCallback>,
}

impl BlockTypeSettings {
    /// Settings for a static block type with no declared attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the block dynamic. The callback's return value is coerced to a
    /// string through [`RenderValue`].
    pub fn render_callback<F, R>(mut self, callback: F) -> Self
    where
        F: Fn(&Attributes, &str, &mut BlockInstance<'_>) -> R + Send + Sync + 'static,
        R: Into<RenderValue>,
    {
        let callback: RenderCallback = Arc::new(
            move |attrs: &Attributes, content: &str, instance: &mut BlockInstance<'_>| -> RenderValue {
                callback(attrs, content, instance).into()
            },
        );
        self.render_callback = Some(callback);
        self
    }

    /// Declare one attribute.
    pub fn attribute(mut self, name: impl Into<String>, schema: AttributeSchema) -> Self {
        self.attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), schema);
        self
    }
}

impl fmt::Debug for BlockTypeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockTypeSettings")
            .field("attributes", &self.attributes)
            .field("dynamic", &self.render_callback.is_some())
            .finish()
    }
}

/// `block.json`-style metadata accepted by [`Registry::register_from_metadata`].
#[derive(Debug, Clone, Deserialize)]
struct BlockMetadata {
    name: String,
    #[serde(default)]
    attributes: Option<BTreeMap<String, AttributeSchema>>,
}

/// A registered block type.
#[derive(Clone)]
pub struct BlockType {
    name: String,
    attributes: Option<BTreeMap<String, AttributeSchema>>,
    render_callback: Option<RenderCallback>,
}

impl BlockType {
    /// A block type named `name`. The name is validated on registration.
    pub fn new(name: impl Into<String>, settings: BlockTypeSettings) -> Self {
        Self {
            name: name.into(),
            attributes: settings.attributes,
            render_callback: settings.render_callback,
        }
    }

    /// The registered name, `namespace/name`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the type has a render callback.
    pub fn is_dynamic(&self) -> bool {
        self.render_callback.is_some()
    }

    /// Declared attribute schema, if any.
    pub fn attributes(&self) -> Option<&BTreeMap<String, AttributeSchema>> {
        self.attributes.as_ref()
    }

    /// Validate attributes against the declared schema.
    ///
    /// Declared attributes with a value of the wrong type are dropped,
    /// missing declared attributes with a default are filled in, and
    /// undeclared attributes pass through unchanged.
    pub fn prepare_attributes(&self, attrs: &Attributes) -> Attributes {
        let Some(schema) = &self.attributes else {
            return attrs.clone();
        };

        let mut prepared: Attributes = attrs
            .iter()
            .filter(|(key, value)| schema.get(*key).is_none_or(|s| s.accepts(value)))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for (key, attr) in schema {
            if let Some(default) = &attr.default
                && !prepared.contains_key(key)
            {
                prepared.insert(key.clone(), default.clone());
            }
        }
        prepared
    }

    /// Render this block type on its own, outside of a document.
    ///
    /// Static types render the empty string. Dynamic types run their
    /// callback with a detached [`BlockInstance`] and a fresh context.
    pub fn render(&self, attrs: &Attributes, content: &str) -> String {
        let mut context = RenderContext::new();
        let mut instance = BlockInstance::detached(&self.name, &mut context);
        self.render_with(attrs, content, &mut instance)
    }

    pub(crate) fn render_with(
        &self,
        attrs: &Attributes,
        content: &str,
        instance: &mut BlockInstance<'_>,
    ) -> String {
        let Some(callback) = &self.render_callback else {
            return String::new();
        };
        let attrs = self.prepare_attributes(attrs);
        callback(&attrs, content, instance).into_string()
    }
}

impl fmt::Debug for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockType")
            .field("name", &self.name)
            .field("attributes", &self.attributes)
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}

// ------------------------------------------------------------------
// Registry
// ------------------------------------------------------------------

static GLOBAL: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::with_core_blocks()));

/// Name → block type mapping.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: BTreeMap<String, BlockType>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every name in [`CORE_STATIC_BLOCKS`] as a static type.
    pub fn with_core_blocks() -> Self {
        let types = CORE_STATIC_BLOCKS
            .iter()
            .map(|name| {
                let name = (*name).to_string();
                (name.clone(), BlockType::new(name, BlockTypeSettings::new()))
            })
            .collect();
        Self { types }
    }

    /// The process-wide registry, seeded with the core static types.
    pub fn global() -> &'static RwLock<Registry> {
        &GLOBAL
    }

    /// Register a block type built from `settings`.
    ///
    /// Fails if the name is invalid or already taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        settings: BlockTypeSettings,
    ) -> Result<&BlockType, RegistryError> {
        self.register_type(BlockType::new(name, settings))
    }

    /// Register a prebuilt block type.
    pub fn register_type(&mut self, block_type: BlockType) -> Result<&BlockType, RegistryError> {
        validate_name(&block_type.name)?;
        if self.types.contains_key(&block_type.name) {
            return Err(RegistryError::AlreadyRegistered(block_type.name));
        }

        debug!(
            "registered block type {} ({})",
            block_type.name,
            if block_type.is_dynamic() { "dynamic" } else { "static" }
        );
        let name = block_type.name.clone();
        Ok(self.types.entry(name).or_insert(block_type))
    }

    /// Register a static block type from `block.json`-style metadata.
    ///
    /// Only `name` and `attributes` are read; other keys are ignored.
    pub fn register_from_metadata(&mut self, json: &str) -> Result<&BlockType, RegistryError> {
        let metadata: BlockMetadata = serde_json::from_str(json)
            .map_err(|e| RegistryError::InvalidMetadata(e.to_string()))?;
        self.register_type(BlockType {
            name: metadata.name,
            attributes: metadata.attributes,
            render_callback: None,
        })
    }

    /// Remove a block type, returning its descriptor.
    pub fn unregister(&mut self, name: &str) -> Result<BlockType, RegistryError> {
        let removed = self
            .types
            .remove(name)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;
        debug!("unregistered block type {name}");
        Ok(removed)
    }

    /// Look up a block type by full name.
    pub fn get_registered(&self, name: &str) -> Option<&BlockType> {
        self.types.get(name)
    }

    /// Whether `name` is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Every registered type, sorted by name.
    pub fn get_all_registered(&self) -> impl Iterator<Item = &BlockType> {
        self.types.values()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Names must be lowercase `namespace/name`, each part `[a-z0-9-]+`.
fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(RegistryError::InvalidName {
            name: name.to_string(),
            reason: "block type names must not contain uppercase characters",
        });
    }

    let part_ok = |part: &str| {
        !part.is_empty()
            && part
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    };
    match name.split_once('/') {
        Some((namespace, local)) if part_ok(namespace) && part_ok(local) => Ok(()),
        _ => Err(RegistryError::InvalidName {
            name: name.to_string(),
            reason: "block type names must contain a namespace prefix, e.g. my-plugin/my-block",
        }),
    }
}

/// Register a block type in the global registry.
///
/// Safe to call from a render callback: [`render_document`](crate::render_document)
/// does not hold the lock while blocks render. A type registered mid-pass
/// is seen by the next render, not the running one.
pub fn register_block_type(
    name: impl Into<String>,
    settings: BlockTypeSettings,
) -> Result<(), RegistryError> {
    Registry::global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(name, settings)
        .map(|_| ())
}

/// Remove a block type from the global registry.
///
/// Like [`register_block_type`], the running render pass is unaffected.
pub fn unregister_block_type(name: &str) -> Result<BlockType, RegistryError> {
    Registry::global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .unregister(name)
}

/// Whether `name` is registered in the global registry.
pub fn is_block_type_registered(name: &str) -> bool {
    Registry::global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_registered(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            other => panic!("Expected object, got {other:?}"),
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = Registry::new();
        registry
            .register("my-plugin/notice", BlockTypeSettings::new())
            .unwrap();

        assert!(registry.is_registered("my-plugin/notice"));
        assert!(!registry.is_registered("my-plugin/other"));
        let block_type = registry.get_registered("my-plugin/notice").unwrap();
        assert_eq!(block_type.name(), "my-plugin/notice");
        assert!(!block_type.is_dynamic());
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = Registry::new();
        registry.register("core/test", BlockTypeSettings::new()).unwrap();
        let err = registry
            .register("core/test", BlockTypeSettings::new())
            .unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered("core/test".into()));
    }

    #[test]
    fn unregister_absent_fails() {
        let mut registry = Registry::new();
        let err = registry.unregister("core/test").unwrap_err();
        assert_eq!(err, RegistryError::NotRegistered("core/test".into()));
    }

    #[test]
    fn unregister_returns_type() {
        let mut registry = Registry::with_core_blocks();
        let removed = registry.unregister("core/paragraph").unwrap();
        assert_eq!(removed.name(), "core/paragraph");
        assert!(!registry.is_registered("core/paragraph"));
    }

    #[test]
    fn invalid_names_rejected() {
        let mut registry = Registry::new();
        for name in ["Core/test", "test", "core/", "/test", "core/te_st", "a/b/c"] {
            let err = registry
                .register(name, BlockTypeSettings::new())
                .unwrap_err();
            assert!(
                matches!(err, RegistryError::InvalidName { .. }),
                "{name} should be rejected, got {err:?}"
            );
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn core_blocks_are_static() {
        let registry = Registry::with_core_blocks();
        assert_eq!(registry.len(), CORE_STATIC_BLOCKS.len());
        assert!(registry.get_all_registered().all(|t| !t.is_dynamic()));
        let names: Vec<_> = registry.get_all_registered().map(BlockType::name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn metadata_registration() {
        let mut registry = Registry::new();
        let block_type = registry
            .register_from_metadata(
                r#"{
                    "name": "my-plugin/card",
                    "title": "Card",
                    "attributes": {
                        "level": { "type": "integer", "default": 2 },
                        "label": { "type": "string" }
                    }
                }"#,
            )
            .unwrap();
        let schema = block_type.attributes().unwrap();
        assert_eq!(schema["level"].default, Some(json!(2)));
        assert_eq!(schema["label"].kind, Some(AttributeType::String));
    }

    #[test]
    fn metadata_without_name_fails() {
        let mut registry = Registry::new();
        let err = registry.register_from_metadata("{}").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidMetadata(_)));
    }

    #[test]
    fn prepare_attributes_applies_schema() {
        let block_type = BlockType::new(
            "my-plugin/card",
            BlockTypeSettings::new()
                .attribute("level", AttributeSchema::of(AttributeType::Integer).with_default(2))
                .attribute("label", AttributeSchema::of(AttributeType::String))
                .attribute("align", AttributeSchema::default().with_default("left")),
        );

        let prepared = block_type.prepare_attributes(&attrs(json!({
            "label": 42,
            "extra": true,
        })));
        assert_eq!(
            Value::Object(prepared),
            json!({ "extra": true, "align": "left", "level": 2 })
        );

        let prepared = block_type.prepare_attributes(&attrs(json!({ "level": 3.0, "label": "x" })));
        assert_eq!(Value::Object(prepared), json!({ "level": 3.0, "label": "x", "align": "left" }));
    }

    #[test]
    fn prepare_without_schema_is_identity() {
        let block_type = BlockType::new("core/test", BlockTypeSettings::new());
        let input = attrs(json!({ "value": "b1" }));
        assert_eq!(block_type.prepare_attributes(&input), input);
    }

    #[test]
    fn integer_type_check() {
        assert!(AttributeType::Integer.accepts(&json!(4)));
        assert!(AttributeType::Integer.accepts(&json!(4.0)));
        assert!(!AttributeType::Integer.accepts(&json!(4.5)));
        assert!(!AttributeType::Integer.accepts(&json!("4")));
        assert!(AttributeType::Number.accepts(&json!(4.5)));
    }

    #[test]
    fn render_value_coercion() {
        assert_eq!(RenderValue::from(10).into_string(), "10");
        assert_eq!(RenderValue::from(-3i64).into_string(), "-3");
        assert_eq!(RenderValue::from(1.5).into_string(), "1.5");
        assert_eq!(RenderValue::from(10.0).into_string(), "10");
        assert_eq!(RenderValue::from(()).into_string(), "");
        assert_eq!(RenderValue::from(None::<String>).into_string(), "");
        assert_eq!(RenderValue::from(Some("x")).to_string(), "x");
    }

    #[test]
    fn static_type_renders_empty_on_its_own() {
        let block_type = BlockType::new("core/paragraph", BlockTypeSettings::new());
        assert_eq!(block_type.render(&Attributes::new(), "<p>x</p>"), "");
    }

    #[test]
    fn dynamic_type_renders_numeric_as_string() {
        let block_type = BlockType::new(
            "core/test",
            BlockTypeSettings::new().render_callback(|_, _, _| 10),
        );
        let rendered: String = block_type.render(&Attributes::new(), "");
        assert_eq!(rendered, "10");
    }

    #[test]
    fn callback_sees_prepared_attributes() {
        let block_type = BlockType::new(
            "core/test",
            BlockTypeSettings::new()
                .attribute("value", AttributeSchema::of(AttributeType::String).with_default("dflt"))
                .render_callback(|attrs, content, _| {
                    format!("{}|{content}", attrs["value"].as_str().unwrap_or("?"))
                }),
        );
        assert_eq!(block_type.render(&Attributes::new(), "inner"), "dflt|inner");
        assert_eq!(
            block_type.render(&attrs(json!({ "value": 7 })), ""),
            "dflt|"
        );
    }
}
