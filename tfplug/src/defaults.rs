//! Default values for optional attributes
//!
//! Defaults are applied during planning when an attribute is absent from
//! configuration, before plan modifiers run.

use crate::types::{AttributePath, Dynamic};
use std::collections::HashMap;

pub struct DefaultRequest {
    pub path: AttributePath,
}

pub struct DefaultResponse {
    pub value: Dynamic,
}

pub trait Default: Send + Sync {
    fn description(&self) -> String;
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

/// StaticDefault provides a fixed default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn string(value: &str) -> Self {
        Self::new(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Self {
        Self::new(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(Dynamic::Bool(value))
    }

    pub fn empty_map() -> Self {
        Self::new(Dynamic::Map(HashMap::new()))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("defaults to {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: self.value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_default_returns_value() {
        let default = StaticDefault::bool(false);
        let response = default.default_value(DefaultRequest {
            path: AttributePath::new("disable_bgp_route_propagation"),
        });
        assert_eq!(response.value, Dynamic::Bool(false));
    }

    #[test]
    fn static_default_describes_value() {
        let default = StaticDefault::string("application/octet-stream");
        assert!(default.description().contains("application/octet-stream"));
    }
}
