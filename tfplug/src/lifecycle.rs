//! Plan and apply
//!
//! Planning merges configuration with prior state under the schema rules:
//! defaults fill absent optional attributes, computed attributes keep their
//! prior value (or become unknown on create), plan modifiers run per attribute
//! and force-new attributes or blocks mark the change as a replacement.
//! Applying dispatches the planned change to create, update or delete.

use crate::context::Context;
use crate::defaults::DefaultRequest;
use crate::plan_modifier::{values_equal, PlanModifyRequest};
use crate::resource::{
    CreateResourceRequest, DeleteResourceRequest, Resource, UpdateResourceRequest,
    ValidateResourceConfigRequest,
};
use crate::schema::{Block, NestedBlock, NestingMode, Schema};
use crate::types::{has_errors, AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    NoOp,
    Create,
    Update,
    Replace,
    Delete,
}

#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
    pub action: ChangeAction,
}

impl PlannedChange {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

#[derive(Debug, Clone)]
pub struct ApplyResourceChangeResponse {
    /// None once the resource has been destroyed
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ApplyResourceChangeResponse {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

/// Produce the planned state for moving `prior_state` towards `config`.
///
/// A null config plans destruction and a null prior state plans creation.
pub fn plan_resource_change(
    schema: &Schema,
    prior_state: &DynamicValue,
    config: &DynamicValue,
) -> PlannedChange {
    if config.is_null() {
        let action = if prior_state.is_null() {
            ChangeAction::NoOp
        } else {
            ChangeAction::Delete
        };
        return PlannedChange {
            planned_state: DynamicValue::null(),
            requires_replace: Vec::new(),
            diagnostics: Vec::new(),
            action,
        };
    }

    let mut planner = Planner {
        creating: prior_state.is_null(),
        requires_replace: Vec::new(),
        diagnostics: Vec::new(),
    };
    let planned = planner.plan_block(
        &schema.block,
        &prior_state.value,
        &config.value,
        &AttributePath::root(),
    );

    let action = if planner.creating {
        ChangeAction::Create
    } else if !planner.requires_replace.is_empty() {
        ChangeAction::Replace
    } else if values_equal(&prior_state.value, &planned) {
        ChangeAction::NoOp
    } else {
        ChangeAction::Update
    };

    PlannedChange {
        planned_state: DynamicValue::new(planned),
        requires_replace: planner.requires_replace,
        diagnostics: planner.diagnostics,
        action,
    }
}

struct Planner {
    creating: bool,
    requires_replace: Vec<AttributePath>,
    diagnostics: Vec<Diagnostic>,
}

fn member<'a>(value: &'a Dynamic, name: &str) -> &'a Dynamic {
    static NULL: Dynamic = Dynamic::Null;
    value
        .as_map()
        .and_then(|m| m.get(name))
        .unwrap_or(&NULL)
}

impl Planner {
    fn plan_block(
        &mut self,
        block: &Block,
        prior: &Dynamic,
        config: &Dynamic,
        path: &AttributePath,
    ) -> Dynamic {
        let mut planned = HashMap::new();

        for attr in &block.attributes {
            let attr_path = path.clone().attribute(&attr.name);
            let prior_value = member(prior, &attr.name);
            let config_value = member(config, &attr.name);

            let mut value = config_value.clone();
            if value.is_null() {
                if let Some(default) = &attr.default {
                    value = default
                        .default_value(DefaultRequest {
                            path: attr_path.clone(),
                        })
                        .value;
                } else if attr.computed {
                    // unknown only for a new object; existing ones keep even a null value
                    value = if prior.is_null() {
                        Dynamic::Unknown
                    } else {
                        prior_value.clone()
                    };
                }
            }

            for modifier in &attr.plan_modifiers {
                let response = modifier.modify_plan(PlanModifyRequest {
                    state: prior_value.clone(),
                    plan: value,
                    config: config_value.clone(),
                    path: attr_path.clone(),
                });
                value = response.plan_value;
                if response.requires_replace && !self.creating {
                    tracing::debug!("{} requires replacement", attr_path);
                    self.requires_replace.push(attr_path.clone());
                }
                self.diagnostics.extend(response.diagnostics);
            }

            planned.insert(attr.name.clone(), value);
        }

        for nested in &block.block_types {
            let block_path = path.clone().attribute(&nested.type_name);
            let prior_value = member(prior, &nested.type_name);
            let config_value = member(config, &nested.type_name);

            let value = self.plan_nested(nested, prior_value, config_value, &block_path);
            if nested.force_new
                && !self.creating
                && !value.is_unknown()
                && !values_equal(&normalise_block(nested, prior_value), &value)
            {
                tracing::debug!("{} requires replacement", block_path);
                self.requires_replace.push(block_path.clone());
            }
            planned.insert(nested.type_name.clone(), value);
        }

        Dynamic::Map(planned)
    }

    fn plan_nested(
        &mut self,
        nested: &NestedBlock,
        prior: &Dynamic,
        config: &Dynamic,
        path: &AttributePath,
    ) -> Dynamic {
        if config.is_null() && nested.computed {
            return if prior.is_null() {
                Dynamic::Unknown
            } else {
                prior.clone()
            };
        }

        match nested.nesting {
            NestingMode::Single => match config {
                Dynamic::Map(_) => self.plan_block(&nested.block, prior, config, path),
                _ => Dynamic::Null,
            },
            NestingMode::List | NestingMode::Set => {
                let items = config.as_list().map(Vec::as_slice).unwrap_or_default();
                let prior_items = prior.as_list().map(Vec::as_slice).unwrap_or_default();
                Dynamic::List(
                    items
                        .iter()
                        .enumerate()
                        .map(|(idx, item)| {
                            let prior_item = prior_items.get(idx).unwrap_or(&Dynamic::Null);
                            let item_path = path.clone().index(idx as i64);
                            self.plan_block(&nested.block, prior_item, item, &item_path)
                        })
                        .collect(),
                )
            }
        }
    }
}

/// Absent repeated blocks and an empty list mean the same thing
fn normalise_block(nested: &NestedBlock, value: &Dynamic) -> Dynamic {
    match (nested.nesting, value) {
        (NestingMode::List | NestingMode::Set, Dynamic::Null) => Dynamic::List(Vec::new()),
        _ => value.clone(),
    }
}

/// Carry out a planned change against the remote API
pub async fn apply_resource_change(
    ctx: Context,
    resource: &dyn Resource,
    prior_state: DynamicValue,
    planned_state: DynamicValue,
    config: DynamicValue,
) -> ApplyResourceChangeResponse {
    let type_name = resource.type_name().to_string();

    if planned_state.is_null() {
        if prior_state.is_null() {
            return ApplyResourceChangeResponse {
                new_state: None,
                diagnostics: Vec::new(),
            };
        }
        tracing::info!("Destroying {}", type_name);
        let response = resource
            .delete(
                ctx,
                DeleteResourceRequest {
                    type_name,
                    prior_state: prior_state.clone(),
                },
            )
            .await;
        let new_state = if has_errors(&response.diagnostics) {
            Some(prior_state)
        } else {
            None
        };
        return ApplyResourceChangeResponse {
            new_state,
            diagnostics: response.diagnostics,
        };
    }

    if prior_state.is_null() {
        tracing::info!("Creating {}", type_name);
        let response = resource
            .create(
                ctx,
                CreateResourceRequest {
                    type_name,
                    planned_state,
                    config,
                },
            )
            .await;
        return ApplyResourceChangeResponse {
            new_state: Some(response.new_state),
            diagnostics: response.diagnostics,
        };
    }

    tracing::info!("Updating {}", type_name);
    let response = resource
        .update(
            ctx,
            UpdateResourceRequest {
                type_name,
                prior_state,
                planned_state,
                config,
            },
        )
        .await;
    ApplyResourceChangeResponse {
        new_state: Some(response.new_state),
        diagnostics: response.diagnostics,
    }
}

/// Validate, plan and apply in one pass, the way `terraform apply` drives a
/// single resource. Replacements destroy the old object before creating the
/// new one.
pub async fn converge(
    ctx: Context,
    resource: &dyn Resource,
    prior_state: DynamicValue,
    config: DynamicValue,
) -> ApplyResourceChangeResponse {
    let schema = resource.schema();
    let unchanged = |prior: DynamicValue, diagnostics: Vec<Diagnostic>| {
        ApplyResourceChangeResponse {
            new_state: if prior.is_null() { None } else { Some(prior) },
            diagnostics,
        }
    };

    if !config.is_null() {
        let validation = resource
            .validate(
                ctx,
                ValidateResourceConfigRequest {
                    type_name: resource.type_name().to_string(),
                    config: config.clone(),
                },
            )
            .await;
        if has_errors(&validation.diagnostics) {
            return unchanged(prior_state, validation.diagnostics);
        }
    }

    let plan = plan_resource_change(&schema, &prior_state, &config);
    if plan.has_errors() {
        return unchanged(prior_state, plan.diagnostics);
    }

    match plan.action {
        ChangeAction::NoOp => unchanged(prior_state, plan.diagnostics),
        ChangeAction::Replace => {
            let replaced: Vec<String> = plan.requires_replace.iter().map(|p| p.to_string()).collect();
            tracing::info!(
                "Replacing {} because of changes to {}",
                resource.type_name(),
                replaced.join(", ")
            );
            let destroyed = apply_resource_change(
                ctx,
                resource,
                prior_state,
                DynamicValue::null(),
                DynamicValue::null(),
            )
            .await;
            if destroyed.has_errors() {
                return destroyed;
            }
            let fresh = plan_resource_change(&schema, &DynamicValue::null(), &config);
            let mut response = apply_resource_change(
                ctx,
                resource,
                DynamicValue::null(),
                fresh.planned_state,
                config,
            )
            .await;
            let mut diagnostics = plan.diagnostics;
            diagnostics.append(&mut response.diagnostics);
            response.diagnostics = diagnostics;
            response
        }
        ChangeAction::Create | ChangeAction::Update | ChangeAction::Delete => {
            let mut response =
                apply_resource_change(ctx, resource, prior_state, plan.planned_state, config)
                    .await;
            let mut diagnostics = plan.diagnostics;
            diagnostics.append(&mut response.diagnostics);
            response.diagnostics = diagnostics;
            response
        }
    }
}
