//! Schema types, builders and configuration validation
//!
//! A [`Schema`] declares every attribute and nested block of a resource together
//! with its mutability flags. The same schema drives configuration validation
//! here and planning in [`crate::lifecycle`].

use crate::defaults::Default;
use crate::plan_modifier::{PlanModifier, RequiresReplaceIfChanged};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use crate::validator::Validator;
use std::collections::HashMap;
use std::sync::Arc;

/// AttributeType mirrors Terraform's type system
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    /// Ordered, allows duplicates
    List(Box<AttributeType>),
    /// Unordered, compared without regard to order
    Set(Box<AttributeType>),
    /// String keys only
    Map(Box<AttributeType>),
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    pub fn list_of(element: AttributeType) -> Self {
        AttributeType::List(Box::new(element))
    }

    pub fn set_of(element: AttributeType) -> Self {
        AttributeType::Set(Box::new(element))
    }

    pub fn map_of(element: AttributeType) -> Self {
        AttributeType::Map(Box::new(element))
    }

    /// Whether `value` is acceptable for this type; null and unknown always are
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (value, self) {
            (Dynamic::Null | Dynamic::Unknown, _) => true,
            (Dynamic::String(_), AttributeType::String) => true,
            (Dynamic::Number(_), AttributeType::Number) => true,
            (Dynamic::Bool(_), AttributeType::Bool) => true,
            (Dynamic::List(items), AttributeType::List(element))
            | (Dynamic::List(items), AttributeType::Set(element)) => {
                items.iter().all(|item| element.accepts(item))
            }
            (Dynamic::Map(map), AttributeType::Map(element)) => {
                map.values().all(|item| element.accepts(item))
            }
            (Dynamic::Map(map), AttributeType::Object(fields)) => fields
                .iter()
                .all(|(name, field)| map.get(name).map_or(true, |v| field.accepts(v))),
            _ => false,
        }
    }
}

/// Schema is returned by providers, resources and data sources
#[derive(Debug, Clone)]
pub struct Schema {
    /// Increment when stored state needs migrating
    pub version: i64,
    pub block: Block,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    pub fn nested_block(&self, name: &str) -> Option<&NestedBlock> {
        self.block.block_types.iter().find(|b| b.type_name == name)
    }

    /// Check configuration against the declared shape.
    ///
    /// Covers required attributes, type agreement, unknown attributes,
    /// values set on computed-only attributes, nested block counts and every
    /// attribute validator.
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if !config.is_null() {
            self.block
                .validate(&config.value, &AttributePath::root(), &mut diagnostics);
        }
        diagnostics
    }
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub deprecated: bool,
}

impl Block {
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let map = match value {
            Dynamic::Map(map) => map,
            Dynamic::Unknown => return,
            other => {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Expected an object at {}", display_path(path)),
                        format!("Got {}", other.type_name()),
                    )
                    .with_attribute(path.clone()),
                );
                return;
            }
        };

        let mut names: Vec<&String> = map.keys().collect();
        names.sort();
        for name in names {
            let known = self.attributes.iter().any(|a| &a.name == name)
                || self.block_types.iter().any(|b| &b.type_name == name);
            if !known {
                let attr_path = path.clone().attribute(name);
                diagnostics.push(
                    Diagnostic::error(
                        format!("Unknown field: {}", attr_path),
                        format!("The field '{}' is not defined in the schema", name),
                    )
                    .with_attribute(attr_path),
                );
            }
        }

        for attr in &self.attributes {
            let attr_path = path.clone().attribute(&attr.name);
            let attr_value = map.get(&attr.name).unwrap_or(&Dynamic::Null);
            attr.validate(attr_value, &attr_path, diagnostics);
        }

        for nested in &self.block_types {
            let block_path = path.clone().attribute(&nested.type_name);
            let block_value = map.get(&nested.type_name).unwrap_or(&Dynamic::Null);
            nested.validate(block_value, &block_path, diagnostics);
        }
    }
}

fn display_path(path: &AttributePath) -> String {
    if path.steps.is_empty() {
        "root".to_string()
    } else {
        path.to_string()
    }
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing the value destroys and recreates the resource
    pub force_new: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn Default>>,
    pub deprecated: bool,
}

impl Attribute {
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if value.is_null() {
            if self.required {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Missing required field: {}", path),
                        format!("The field '{}' is required but was not provided", self.name),
                    )
                    .with_attribute(path.clone()),
                );
            }
            return;
        }

        if self.computed && !self.optional && !self.required {
            diagnostics.push(
                Diagnostic::error(
                    format!("Value for unconfigurable attribute: {}", path),
                    format!("The field '{}' is computed and cannot be set", self.name),
                )
                .with_attribute(path.clone()),
            );
            return;
        }

        if !self.r#type.accepts(value) {
            diagnostics.push(
                Diagnostic::error(
                    format!("Type mismatch for field: {}", path),
                    format!(
                        "Field '{}' expects type {:?} but got {}",
                        self.name,
                        self.r#type,
                        value.type_name()
                    ),
                )
                .with_attribute(path.clone()),
            );
            return;
        }

        for validator in &self.validators {
            validator.validate(value, path, diagnostics);
        }
    }
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("force_new", &self.force_new)
            .field("validators", &self.validators.len())
            .field("plan_modifiers", &self.plan_modifiers.len())
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// NestedBlock represents a repeated or single configuration block
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: usize,
    /// Zero means unbounded
    pub max_items: usize,
    /// Any change inside the block destroys and recreates the resource
    pub force_new: bool,
    /// When the block is absent from configuration the prior value is kept;
    /// an explicit empty list still clears it
    pub computed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Single,
    List,
    Set,
}

impl NestedBlock {
    pub fn list(type_name: &str, block: Block) -> Self {
        Self::with_nesting(type_name, block, NestingMode::List)
    }

    pub fn set(type_name: &str, block: Block) -> Self {
        Self::with_nesting(type_name, block, NestingMode::Set)
    }

    pub fn single(type_name: &str, block: Block) -> Self {
        Self::with_nesting(type_name, block, NestingMode::Single)
    }

    fn with_nesting(type_name: &str, block: Block, nesting: NestingMode) -> Self {
        Self {
            type_name: type_name.to_string(),
            block,
            nesting,
            min_items: 0,
            max_items: 0,
            force_new: false,
            computed: false,
        }
    }

    pub fn min_items(mut self, min: usize) -> Self {
        self.min_items = min;
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = max;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let items: Vec<&Dynamic> = match (self.nesting, value) {
            (_, Dynamic::Unknown) => return,
            (_, Dynamic::Null) => Vec::new(),
            (NestingMode::Single, single @ Dynamic::Map(_)) => vec![single],
            (NestingMode::List | NestingMode::Set, Dynamic::List(list)) => list.iter().collect(),
            (_, other) => {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid block: {}", path),
                        format!("Block '{}' cannot be a {}", self.type_name, other.type_name()),
                    )
                    .with_attribute(path.clone()),
                );
                return;
            }
        };

        if items.len() < self.min_items {
            diagnostics.push(
                Diagnostic::error(
                    format!("Insufficient {} blocks", self.type_name),
                    format!(
                        "At least {} \"{}\" blocks are required",
                        self.min_items, self.type_name
                    ),
                )
                .with_attribute(path.clone()),
            );
        }
        if self.max_items > 0 && items.len() > self.max_items {
            diagnostics.push(
                Diagnostic::error(
                    format!("Too many {} blocks", self.type_name),
                    format!(
                        "No more than {} \"{}\" blocks are allowed",
                        self.max_items, self.type_name
                    ),
                )
                .with_attribute(path.clone()),
            );
        }

        for (idx, item) in items.into_iter().enumerate() {
            let item_path = match self.nesting {
                NestingMode::Single => path.clone(),
                _ => path.clone().index(idx as i64),
            };
            self.block.validate(item, &item_path, diagnostics);
        }
    }
}

/// AttributeBuilder provides a fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                force_new: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
                deprecated: false,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        if !self.attribute.force_new {
            self.attribute.force_new = true;
            self.attribute
                .plan_modifiers
                .push(Arc::new(RequiresReplaceIfChanged));
        }
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.attribute.validators.push(Arc::new(validator));
        self
    }

    /// Modifiers run in insertion order; add normalising modifiers before `force_new`
    pub fn plan_modifier(mut self, modifier: impl PlanModifier + 'static) -> Self {
        let insert_at = self
            .attribute
            .plan_modifiers
            .len()
            .saturating_sub(usize::from(self.attribute.force_new));
        self.attribute
            .plan_modifiers
            .insert(insert_at, Arc::new(modifier));
        self
    }

    pub fn default(mut self, default: impl Default + 'static) -> Self {
        self.attribute.default = Some(Arc::new(default));
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// BlockBuilder assembles the body of a nested block
#[derive(Default)]
pub struct BlockBuilder {
    block: Block,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.block.block_types.push(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.block.description = desc.to_string();
        self
    }

    pub fn build(self) -> Block {
        self.block
    }
}

/// SchemaBuilder provides a fluent API for building schemas
#[derive(Default)]
pub struct SchemaBuilder {
    version: i64,
    block: BlockBuilder,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.block = self.block.attribute(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.block = self.block.block(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.block = self.block.description(desc);
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            version: self.version,
            block: self.block.build(),
        }
    }
}
