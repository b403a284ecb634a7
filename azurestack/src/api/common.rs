//! Common types and utilities for the Azure Resource Manager API

use serde::{Deserialize, Serialize};

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ArmErrorResponse {
    pub error: ArmErrorBody,
}

#[derive(Debug, Deserialize, Default)]
pub struct ArmErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Reference to another ARM object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SubResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }
}

/// `{"value": [...]}` list envelope
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink")]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_version(version: &str) -> Self {
        Self::new().add("api-version", version)
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_query_params() {
        let params = ApiQueryParams::api_version("2018-11-01")
            .add("$expand", "ipConfigurations")
            .add_optional("$top", Some(10))
            .add_optional("none", None::<String>);

        let query = params.to_query_string();
        assert!(query.starts_with("?api-version=2018-11-01"));
        assert!(query.contains("$expand=ipConfigurations"));
        assert!(query.contains("$top=10"));
        assert!(!query.contains("none="));
    }

    #[test]
    fn arm_error_body_parses() {
        let body: ArmErrorResponse = serde_json::from_str(
            r#"{"error":{"code":"ResourceGroupNotFound","message":"Resource group 'rg' could not be found."}}"#,
        )
        .unwrap();
        assert_eq!(body.error.code, "ResourceGroupNotFound");
    }
}
