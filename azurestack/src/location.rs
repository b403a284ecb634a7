//! Azure locations
//!
//! The API accepts `West Europe`, `westeurope` and `WestEurope` alike and
//! always answers with the lower-case form without spaces.

use tfplug::plan_modifier::{PlanModifier, PlanModifyRequest, PlanModifyResponse};
use tfplug::schema::Attribute;
use tfplug::types::Dynamic;
use tfplug::validator::StringLengthValidator;
use tfplug::{AttributeBuilder, AttributeType};

pub fn normalize(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Plans the normalised spelling so the stored value matches what Read returns
pub struct NormalizeLocation;

impl PlanModifier for NormalizeLocation {
    fn description(&self) -> String {
        "locations are compared in lower case without spaces".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        match request.plan.as_str() {
            Some(location) => PlanModifyResponse::keep(Dynamic::String(normalize(location))),
            None => PlanModifyResponse::keep(request.plan),
        }
    }
}

/// Required, ForceNew `location`
pub fn schema() -> Attribute {
    AttributeBuilder::new("location", AttributeType::String)
        .description("The Azure Stack location where the resource exists")
        .required()
        .validator(StringLengthValidator::not_empty())
        .plan_modifier(NormalizeLocation)
        .force_new()
        .build()
}

/// Computed `location` for data sources
pub fn computed_schema() -> Attribute {
    AttributeBuilder::new("location", AttributeType::String)
        .description("The Azure Stack location of the resource")
        .computed()
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::types::AttributePath;

    fn run_modifiers(prior: &str, planned: Dynamic) -> (Dynamic, bool) {
        let mut value = planned;
        let mut replace = false;
        for modifier in &schema().plan_modifiers {
            let response = modifier.modify_plan(PlanModifyRequest {
                state: Dynamic::from(prior),
                plan: value,
                config: Dynamic::Null,
                path: AttributePath::new("location"),
            });
            value = response.plan_value;
            replace |= response.requires_replace;
        }
        (value, replace)
    }

    #[test]
    fn normalize_strips_spaces_and_case() {
        assert_eq!(normalize("West Europe"), "westeurope");
        assert_eq!(normalize("local"), "local");
        assert_eq!(normalize(" North Central US "), "northcentralus");
    }

    #[test]
    fn different_spelling_of_same_location_does_not_replace() {
        let (value, replace) = run_modifiers("westeurope", Dynamic::from("West Europe"));
        assert_eq!(value, Dynamic::from("westeurope"));
        assert!(!replace);
    }

    #[test]
    fn new_location_replaces() {
        let (value, replace) = run_modifiers("westeurope", Dynamic::from("East US"));
        assert_eq!(value, Dynamic::from("eastus"));
        assert!(replace);
    }

    #[test]
    fn unknown_passes_through() {
        let (value, replace) = run_modifiers("westeurope", Dynamic::Unknown);
        assert!(value.is_unknown());
        assert!(!replace);
    }
}
