//! Tags and metadata
//!
//! Absent and empty are the same thing for every resource: expand always sends
//! a mapping and flatten always writes one.

use std::collections::HashMap;
use tfplug::defaults::StaticDefault;
use tfplug::schema::Attribute;
use tfplug::types::{AttributePath, Diagnostic, Dynamic};
use tfplug::validator::Validator;
use tfplug::{AttributeBuilder, AttributeType};

pub const MAX_TAGS: usize = 50;
pub const MAX_KEY_LENGTH: usize = 512;
pub const MAX_VALUE_LENGTH: usize = 256;

pub fn expand(tags: Option<&HashMap<String, String>>) -> HashMap<String, String> {
    tags.cloned().unwrap_or_default()
}

pub fn flatten(tags: Option<&HashMap<String, String>>) -> HashMap<String, String> {
    tags.cloned().unwrap_or_default()
}

/// The optional `tags` attribute shared by every ARM resource
pub fn schema() -> Attribute {
    AttributeBuilder::new("tags", AttributeType::map_of(AttributeType::String))
        .optional()
        .description("A mapping of tags to assign to the resource")
        .default(StaticDefault::empty_map())
        .validator(TagsValidator)
        .build()
}

pub struct TagsValidator;

impl Validator for TagsValidator {
    fn description(&self) -> String {
        format!(
            "at most {} tags, keys up to {} and values up to {} characters",
            MAX_TAGS, MAX_KEY_LENGTH, MAX_VALUE_LENGTH
        )
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(tags) = value.as_map() else {
            return;
        };

        if tags.len() > MAX_TAGS {
            diagnostics.push(
                Diagnostic::error(
                    format!("{} can have at most {} tags", path, MAX_TAGS),
                    format!("Got {} tags", tags.len()),
                )
                .with_attribute(path.clone()),
            );
        }

        let mut keys: Vec<&String> = tags.keys().collect();
        keys.sort();
        for key in keys {
            if key.chars().count() > MAX_KEY_LENGTH {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} key is too long", path),
                        format!("Tag key {:?} exceeds {} characters", key, MAX_KEY_LENGTH),
                    )
                    .with_attribute(path.clone().key(key)),
                );
            }
            let length = tags[key].as_str().map(|v| v.chars().count()).unwrap_or(0);
            if length > MAX_VALUE_LENGTH {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} value is too long", path),
                        format!("Value of tag {:?} exceeds {} characters", key, MAX_VALUE_LENGTH),
                    )
                    .with_attribute(path.clone().key(key)),
                );
            }
        }
    }
}

/// Blob metadata keys come back lower-cased, so upper case never converges
pub struct LowercaseKeysValidator;

impl Validator for LowercaseKeysValidator {
    fn description(&self) -> String {
        "keys must be lower case".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(map) = value.as_map() else {
            return;
        };
        let mut keys: Vec<&String> = map.keys().filter(|k| k.chars().any(char::is_uppercase)).collect();
        keys.sort();
        for key in keys {
            diagnostics.push(
                Diagnostic::error(
                    format!("{} keys must be lower case", path),
                    format!("Key {:?} contains upper case characters", key),
                )
                .with_attribute(path.clone().key(key)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_map(entries: &[(&str, &str)]) -> Dynamic {
        Dynamic::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), Dynamic::from(*v)))
                .collect(),
        )
    }

    #[test]
    fn absent_and_empty_flatten_alike() {
        assert_eq!(flatten(None), HashMap::new());
        assert_eq!(flatten(Some(&HashMap::new())), HashMap::new());
        assert_eq!(expand(None), HashMap::new());
    }

    #[test]
    fn tags_survive_expand_then_flatten() {
        let tags = HashMap::from([
            ("environment".to_string(), "production".to_string()),
            ("cost_center".to_string(), "MSFT".to_string()),
        ]);
        assert_eq!(flatten(Some(&expand(Some(&tags)))), tags);
    }

    #[test]
    fn too_many_tags_rejected() {
        let entries: Vec<(String, String)> =
            (0..=MAX_TAGS).map(|i| (format!("k{}", i), "v".to_string())).collect();
        let borrowed: Vec<(&str, &str)> = entries.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        let mut diags = Vec::new();
        TagsValidator.validate(&tag_map(&borrowed), &AttributePath::new("tags"), &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("at most 50 tags"));
    }

    #[test]
    fn long_values_rejected() {
        let long = "x".repeat(MAX_VALUE_LENGTH + 1);
        let mut diags = Vec::new();
        TagsValidator.validate(&tag_map(&[("k", &long)]), &AttributePath::new("tags"), &mut diags);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_ref().map(|p| p.to_string()).as_deref(), Some("tags[\"k\"]"));
    }

    #[test]
    fn upper_case_metadata_keys_rejected() {
        let mut diags = Vec::new();
        LowercaseKeysValidator.validate(
            &tag_map(&[("owner", "a"), ("Team", "b")]),
            &AttributePath::new("metadata"),
            &mut diags,
        );
        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("Team"));
    }
}
