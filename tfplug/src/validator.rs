//! Attribute validators
//!
//! Validators run against configuration before any plan is produced. They skip
//! null and unknown values; required-ness is checked by the schema itself.

use crate::types::{AttributePath, Diagnostic, Dynamic};

pub trait Validator: Send + Sync {
    fn description(&self) -> String;
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn not_empty() -> Self {
        Self {
            min: Some(1),
            max: None,
        }
    }

    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        format!("string length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(s) = value.as_str() else {
            return;
        };
        let len = s.chars().count();
        if let Some(min) = self.min {
            if len < min {
                let summary = if min == 1 {
                    format!("{} must not be empty", path)
                } else {
                    format!("{} must have minimum length of {}", path, min)
                };
                diagnostics.push(
                    Diagnostic::error(summary, format!("Got length {}", len))
                        .with_attribute(path.clone()),
                );
            }
        }
        if let Some(max) = self.max {
            if len > max {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must have maximum length of {}", path, max),
                        format!("Got length {}", len),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must match {}", path, self.description),
                        format!("Value '{}' does not match pattern", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        format!("number between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(n) = value.as_number() else {
            return;
        };
        if let Some(min) = self.min {
            if n < min {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be at least {}", path, min),
                        format!("Got {}", n),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
        if let Some(max) = self.max {
            if n > max {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be at most {}", path, max),
                        format!("Got {}", n),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        format!("list length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(items) = value.as_list() else {
            return;
        };
        if let Some(min) = self.min {
            if items.len() < min {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must have at least {} items", path, min),
                        format!("Got {} items", items.len()),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
        if let Some(max) = self.max {
            if items.len() > max {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must have at most {} items", path, max),
                        format!("Got {} items", items.len()),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// Accepts one of a fixed set of strings
pub struct OneOfValidator {
    pub values: Vec<&'static str>,
    pub ignore_case: bool,
}

impl OneOfValidator {
    pub fn new(values: &[&'static str]) -> Self {
        Self {
            values: values.to_vec(),
            ignore_case: false,
        }
    }

    pub fn ignore_case(values: &[&'static str]) -> Self {
        Self {
            values: values.to_vec(),
            ignore_case: true,
        }
    }

    pub fn accepts(&self, candidate: &str) -> bool {
        self.values.iter().any(|v| {
            if self.ignore_case {
                v.eq_ignore_ascii_case(candidate)
            } else {
                *v == candidate
            }
        })
    }
}

impl Validator for OneOfValidator {
    fn description(&self) -> String {
        format!("one of {}", self.values.join(", "))
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.accepts(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be one of: {}", path, self.values.join(", ")),
                        format!("Got '{}'", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// Wraps a parse function; the error string becomes the diagnostic detail
pub struct StringFuncValidator<F>
where
    F: Fn(&str) -> Result<(), String> + Send + Sync,
{
    check: F,
    description: String,
}

impl<F> StringFuncValidator<F>
where
    F: Fn(&str) -> Result<(), String> + Send + Sync,
{
    pub fn new(description: impl Into<String>, check: F) -> Self {
        Self {
            check,
            description: description.into(),
        }
    }
}

impl<F> Validator for StringFuncValidator<F>
where
    F: Fn(&str) -> Result<(), String> + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if let Err(detail) = (self.check)(s) {
                diagnostics.push(
                    Diagnostic::error(format!("{} must be {}", path, self.description), detail)
                        .with_attribute(path.clone()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(validator: &dyn Validator, value: Dynamic) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        validator.validate(&value, &AttributePath::new("field"), &mut diags);
        diags
    }

    #[test]
    fn string_length_validator_accepts_valid_length() {
        let validator = StringLengthValidator::between(3, 10);
        assert!(run(&validator, Dynamic::from("hello")).is_empty());
    }

    #[test]
    fn string_length_validator_rejects_empty() {
        let diags = run(&StringLengthValidator::not_empty(), Dynamic::from(""));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("must not be empty"));
        assert_eq!(diags[0].attribute, Some(AttributePath::new("field")));
    }

    #[test]
    fn string_length_validator_rejects_too_long() {
        let diags = run(&StringLengthValidator::between(0, 5), Dynamic::from("hello world"));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("maximum length"));
    }

    #[test]
    fn string_pattern_validator_rejects_non_matching() {
        let validator = StringPatternValidator {
            pattern: regex::Regex::new(r"^[a-z0-9]{3,24}$").unwrap(),
            description: "a storage account name".to_string(),
        };

        assert!(run(&validator, Dynamic::from("acctest01")).is_empty());
        let diags = run(&validator, Dynamic::from("Not-Valid"));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("storage account name"));
    }

    #[test]
    fn number_range_validator_rejects_out_of_range() {
        let validator = NumberRangeValidator {
            min: Some(1.0),
            max: Some(2_147_483_647.0),
        };

        assert!(run(&validator, Dynamic::Number(3600.0)).is_empty());
        let diags = run(&validator, Dynamic::Number(0.0));
        assert!(diags[0].summary.contains("at least"));
    }

    #[test]
    fn list_length_validator_enforces_max() {
        let validator = ListLengthValidator {
            min: None,
            max: Some(1),
        };
        let list = Dynamic::List(vec![Dynamic::from("a"), Dynamic::from("b")]);
        assert_eq!(run(&validator, list).len(), 1);
    }

    #[test]
    fn one_of_validator_honours_case_mode() {
        let strict = OneOfValidator::new(&["Complete", "Incremental"]);
        assert_eq!(run(&strict, Dynamic::from("complete")).len(), 1);

        let relaxed = OneOfValidator::ignore_case(&["VnetLocal", "Internet"]);
        assert!(run(&relaxed, Dynamic::from("vnetlocal")).is_empty());
        assert_eq!(run(&relaxed, Dynamic::from("Intranet")).len(), 1);
    }

    #[test]
    fn validators_skip_null_and_unknown() {
        let validator = StringLengthValidator::not_empty();
        assert!(run(&validator, Dynamic::Null).is_empty());
        assert!(run(&validator, Dynamic::Unknown).is_empty());
    }

    #[test]
    fn string_func_validator_uses_error_as_detail() {
        let validator = StringFuncValidator::new("a multiple of 512", |s: &str| {
            s.parse::<u64>()
                .ok()
                .filter(|n| n % 512 == 0)
                .map(|_| ())
                .ok_or_else(|| format!("{} is not a multiple of 512", s))
        });

        assert!(run(&validator, Dynamic::from("1024")).is_empty());
        let diags = run(&validator, Dynamic::from("1000"));
        assert_eq!(diags[0].detail, "1000 is not a multiple of 512");
    }
}
