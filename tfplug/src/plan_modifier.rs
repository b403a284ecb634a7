//! Plan modifiers
//!
//! Modifiers run per attribute after defaults and computed values have been
//! filled in. They can rewrite the planned value or ask for replacement.

use crate::types::{AttributePath, Diagnostic, Dynamic};

#[derive(Debug, Clone)]
pub struct PlanModifyRequest {
    pub state: Dynamic,
    pub plan: Dynamic,
    pub config: Dynamic,
    pub path: AttributePath,
}

#[derive(Debug, Clone)]
pub struct PlanModifyResponse {
    pub plan_value: Dynamic,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl PlanModifyResponse {
    pub fn keep(plan_value: Dynamic) -> Self {
        Self {
            plan_value,
            requires_replace: false,
            diagnostics: Vec::new(),
        }
    }
}

pub trait PlanModifier: Send + Sync {
    fn description(&self) -> String;
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse;
}

/// ForceNew: a change to the attribute destroys and recreates the resource
pub struct RequiresReplaceIfChanged;

impl PlanModifier for RequiresReplaceIfChanged {
    fn description(&self) -> String {
        "changing this value forces a new resource".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        // nothing to replace while creating, and unknowns are settled at apply
        let requires_replace = !request.state.is_null()
            && !request.plan.is_unknown()
            && !values_equal(&request.state, &request.plan);

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// Keeps the prior state value for a computed attribute instead of planning unknown
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "once set, the value is unchanged by updates".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = match (&request.plan, &request.state) {
            (Dynamic::Unknown, state) if !state.is_null() => state.clone(),
            _ => request.plan,
        };
        PlanModifyResponse::keep(plan_value)
    }
}

/// Plans the prior value when it differs from configuration only in letter case.
/// The API echoes enumerations back in its own casing.
pub struct SuppressCaseDiff;

impl PlanModifier for SuppressCaseDiff {
    fn description(&self) -> String {
        "differences in letter case are ignored".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let same = match (request.state.as_str(), request.plan.as_str()) {
            (Some(prior), Some(planned)) => prior.eq_ignore_ascii_case(planned),
            _ => false,
        };
        if same {
            PlanModifyResponse::keep(request.state)
        } else {
            PlanModifyResponse::keep(request.plan)
        }
    }
}

/// Plans the prior value when both sides are the same JSON document
pub struct SuppressJsonDiff;

impl PlanModifier for SuppressJsonDiff {
    fn description(&self) -> String {
        "whitespace and key order in JSON documents are ignored".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let (Some(prior), Some(planned)) = (request.state.as_str(), request.plan.as_str()) else {
            return PlanModifyResponse::keep(request.plan);
        };
        let same = match (
            serde_json::from_str::<serde_json::Value>(prior),
            serde_json::from_str::<serde_json::Value>(planned),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if same {
            PlanModifyResponse::keep(request.state)
        } else {
            PlanModifyResponse::keep(request.plan)
        }
    }
}

pub struct RequiresReplaceIf<F>
where
    F: Fn(&PlanModifyRequest) -> bool + Send + Sync,
{
    predicate: F,
    description: String,
}

impl<F> RequiresReplaceIf<F>
where
    F: Fn(&PlanModifyRequest) -> bool + Send + Sync,
{
    pub fn new(predicate: F, description: impl Into<String>) -> Self {
        Self {
            predicate,
            description: description.into(),
        }
    }
}

impl<F> PlanModifier for RequiresReplaceIf<F>
where
    F: Fn(&PlanModifyRequest) -> bool + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let requires_replace = !request.state.is_null() && (self.predicate)(&request);
        let mut diagnostics = Vec::new();

        if requires_replace {
            diagnostics.push(
                Diagnostic::warning(
                    format!("Attribute '{}' requires resource replacement", request.path),
                    self.description.clone(),
                )
                .with_attribute(request.path.clone()),
            );
        }

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
            diagnostics,
        }
    }
}

/// Structural equality that treats numbers within epsilon as equal
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Unknown, Dynamic::Unknown) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            // absent and null members are the same thing
            a.keys().chain(b.keys()).all(|k| match (a.get(k), b.get(k)) {
                (Some(left), Some(right)) => values_equal(left, right),
                (Some(v), None) | (None, Some(v)) => v.is_null(),
                (None, None) => true,
            })
        }
        _ => false,
    }
}
