//! `azurestack_template_deployment`
//!
//! Every update re-runs the deployment with the full template. Template and
//! parameter bodies are JSON strings; they are compared structurally so
//! whitespace and key order never show up as a diff.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{SuppressCaseDiff, SuppressJsonDiff};
use tfplug::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::validator::{OneOfValidator, StringFuncValidator};
use tfplug::DynamicValue;

use crate::api::resources::{Deployment, DeploymentProperties};
use crate::api::{ignore_not_found, ApiError};
use crate::config::Timeouts;
use crate::error::ProviderError;
use crate::ids::{ResourceId, TemplateDeploymentId};
use crate::provider_data::AzureStackProviderData;
use crate::resources::common::{
    created, decode, decode_state, deleted, encode, ensure_absent, id_attribute, import_id, name_attribute,
    prefer_case, read_back, resource_group_name_attribute, state_id, updated,
};

const TYPE_NAME: &str = "azurestack_template_deployment";

pub const DEPLOYMENT_MODES: [&str; 2] = ["Complete", "Incremental"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateDeploymentModel {
    pub id: Option<String>,
    pub name: String,
    pub resource_group_name: String,
    pub template_body: Option<String>,
    pub parameters: HashMap<String, String>,
    pub parameters_body: Option<String>,
    pub deployment_mode: String,
    pub outputs: HashMap<String, String>,
}

fn parse_json(attribute: &str, body: &str) -> Result<Value, ProviderError> {
    serde_json::from_str(body).map_err(|e| {
        ProviderError::validation(TYPE_NAME, format!("{} is not valid JSON: {}", attribute, e))
    })
}

fn is_json(body: &str) -> Result<(), String> {
    serde_json::from_str::<Value>(body)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// `parameters_body` is taken as-is, then each `parameters` entry is added as
/// `{"value": ...}`, replacing a body entry of the same name
pub fn expand_parameters(model: &TemplateDeploymentModel) -> Result<Option<Value>, ProviderError> {
    let mut parameters = match model.parameters_body.as_deref().filter(|b| !b.trim().is_empty()) {
        Some(body) => match parse_json("parameters_body", body)? {
            Value::Object(map) => map,
            other => {
                return Err(ProviderError::validation(
                    TYPE_NAME,
                    format!("parameters_body must be a JSON object, got {}", other),
                ))
            }
        },
        None => Map::new(),
    };
    for (key, value) in &model.parameters {
        let mut wrapped = Map::new();
        wrapped.insert("value".to_string(), Value::String(value.clone()));
        parameters.insert(key.clone(), Value::Object(wrapped));
    }
    Ok((!parameters.is_empty()).then_some(Value::Object(parameters)))
}

pub fn expand(model: &TemplateDeploymentModel) -> Result<Deployment, ProviderError> {
    let Some(body) = model.template_body.as_deref().filter(|b| !b.trim().is_empty()) else {
        return Err(ProviderError::validation(TYPE_NAME, "template_body is required"));
    };
    Ok(Deployment {
        properties: DeploymentProperties {
            mode: Some(model.deployment_mode.clone()),
            template: Some(parse_json("template_body", body)?),
            parameters: expand_parameters(model)?,
            ..Default::default()
        },
        ..Default::default()
    })
}

/// Output values as strings: booleans as `true`/`false`, numbers in decimal
/// and objects or arrays as JSON
pub fn flatten_outputs(outputs: Option<&Value>) -> HashMap<String, String> {
    let Some(Value::Object(outputs)) = outputs else {
        return HashMap::new();
    };
    outputs
        .iter()
        .map(|(name, output)| {
            let value = match output.get("value") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(Value::Bool(b)) => b.to_string(),
                Some(Value::Number(n)) => n.to_string(),
                Some(other) => other.to_string(),
            };
            (name.clone(), value)
        })
        .collect()
}

/// The configured template when it matches what ARM holds, otherwise ARM's copy
pub fn flatten_template(exported: &Value, known: Option<&str>) -> Option<String> {
    if exported.is_null() {
        return known.map(str::to_string);
    }
    match known {
        Some(known) if serde_json::from_str::<Value>(known).is_ok_and(|k| k == *exported) => {
            Some(known.to_string())
        }
        _ => Some(exported.to_string()),
    }
}

pub fn flatten(
    id: &TemplateDeploymentId,
    deployment: &Deployment,
    template: &Value,
    known: &TemplateDeploymentModel,
) -> TemplateDeploymentModel {
    TemplateDeploymentModel {
        id: Some(id.id()),
        name: id.name.clone(),
        resource_group_name: id.resource_group.clone(),
        template_body: flatten_template(template, known.template_body.as_deref()),
        parameters: known.parameters.clone(),
        parameters_body: known.parameters_body.clone(),
        deployment_mode: prefer_case(
            Some(known.deployment_mode.as_str()),
            deployment.properties.mode.clone(),
        )
        .unwrap_or_default(),
        outputs: flatten_outputs(deployment.properties.outputs.as_ref()),
    }
}

pub struct TemplateDeploymentResource {
    provider_data: AzureStackProviderData,
    timeouts: Timeouts,
}

impl TemplateDeploymentResource {
    pub fn new(provider_data: AzureStackProviderData) -> Self {
        Self {
            provider_data,
            timeouts: Timeouts::default(),
        }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a template deployment of resources")
            .attribute(id_attribute())
            .attribute(name_attribute("The name of the deployment"))
            .attribute(resource_group_name_attribute())
            .attribute(
                AttributeBuilder::new("template_body", AttributeType::String)
                    .description("The ARM template as JSON")
                    .optional()
                    .computed()
                    .validator(StringFuncValidator::new("valid JSON", is_json))
                    .plan_modifier(SuppressJsonDiff)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("parameters", AttributeType::map_of(AttributeType::String))
                    .description("Template parameters as name/value pairs")
                    .optional()
                    .default(StaticDefault::empty_map())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("parameters_body", AttributeType::String)
                    .description("Template parameters as a JSON object")
                    .optional()
                    .validator(StringFuncValidator::new("valid JSON", is_json))
                    .plan_modifier(SuppressJsonDiff)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("deployment_mode", AttributeType::String)
                    .description("Complete or Incremental")
                    .required()
                    .force_new()
                    .validator(OneOfValidator::ignore_case(&DEPLOYMENT_MODES))
                    .plan_modifier(SuppressCaseDiff)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("outputs", AttributeType::map_of(AttributeType::String))
                    .description("Outputs of the deployment")
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn create_deployment(
        &self,
        ctx: &Context,
        model: &TemplateDeploymentModel,
    ) -> Result<String, ProviderError> {
        let deployment = expand(model)?;
        let resources = self.provider_data.client.resources();
        let id = TemplateDeploymentId::new(
            self.provider_data.client.subscription_id(),
            &model.resource_group_name,
            &model.name,
        );

        let existing = resources.get_deployment(ctx, &id).await;
        ensure_absent(existing, TYPE_NAME, &id.id(), &model.name, &model.resource_group_name)?;

        tracing::info!("Creating template deployment {}", id);
        resources
            .create_or_update_deployment(ctx, &id, &deployment)
            .await
            .map_err(|e| {
                ProviderError::upstream(TYPE_NAME, "creating", &model.name, &model.resource_group_name, e)
            })?;
        Ok(id.id())
    }

    async fn read_deployment(
        &self,
        ctx: &Context,
        id: &str,
        known: &TemplateDeploymentModel,
    ) -> Result<Option<DynamicValue>, ProviderError> {
        let id = TemplateDeploymentId::parse(id)?;
        let resources = self.provider_data.client.resources();
        let upstream = |action: &'static str, e: ApiError| {
            ProviderError::upstream(TYPE_NAME, action, &id.name, &id.resource_group, e)
        };

        let deployment = match resources.get_deployment(ctx, &id).await {
            Ok(deployment) => deployment,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Template deployment {} was not found, removing from state", id);
                return Ok(None);
            }
            Err(e) => return Err(upstream("reading", e)),
        };
        let template = resources
            .export_template(ctx, &id)
            .await
            .map_err(|e| upstream("exporting template of", e))?;
        Ok(Some(encode(TYPE_NAME, &flatten(&id, &deployment, &template, known))?))
    }

    async fn update_deployment(
        &self,
        ctx: &Context,
        prior: &TemplateDeploymentModel,
        planned: &TemplateDeploymentModel,
    ) -> Result<String, ProviderError> {
        let deployment = expand(planned)?;
        let id = TemplateDeploymentId::parse(prior.id.as_deref().unwrap_or_default())?;

        tracing::info!("Updating template deployment {}", id);
        self.provider_data
            .client
            .resources()
            .create_or_update_deployment(ctx, &id, &deployment)
            .await
            .map_err(|e| ProviderError::upstream(TYPE_NAME, "updating", &id.name, &id.resource_group, e))?;
        Ok(id.id())
    }

    async fn delete_deployment(&self, ctx: &Context, prior: &DynamicValue) -> Result<(), ProviderError> {
        let id = TemplateDeploymentId::parse(&state_id(TYPE_NAME, prior)?)?;
        tracing::info!("Deleting template deployment {}", id);
        ignore_not_found(self.provider_data.client.resources().delete_deployment(ctx, &id).await)
            .map_err(|e| ProviderError::upstream(TYPE_NAME, "deleting", &id.name, &id.resource_group, e))
    }
}

#[async_trait]
impl Resource for TemplateDeploymentResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.create);
        let model: TemplateDeploymentModel = match decode(TYPE_NAME, &request.planned_state) {
            Ok(model) => model,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let id = match self.create_deployment(&ctx, &model).await {
            Ok(id) => id,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let read = self.read_deployment(&ctx, &id, &model).await;
        created(TYPE_NAME, request.planned_state, id, read)
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.read);
        let prior = decode_state::<TemplateDeploymentModel>(TYPE_NAME, &request.current_state)
            .and_then(|known| state_id(TYPE_NAME, &request.current_state).map(|id| (id, known)));
        let read = match prior {
            Ok((id, known)) => self.read_deployment(&ctx, &id, &known).await,
            Err(e) => Err(e),
        };
        read_back(request.current_state, read)
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.update);
        let models = decode::<TemplateDeploymentModel>(TYPE_NAME, &request.prior_state).and_then(|prior| {
            decode::<TemplateDeploymentModel>(TYPE_NAME, &request.planned_state).map(|planned| (prior, planned))
        });
        let (prior, planned) = match models {
            Ok(models) => models,
            Err(e) => return UpdateResourceResponse::failed(request.prior_state, e.into()),
        };
        let id = match self.update_deployment(&ctx, &prior, &planned).await {
            Ok(id) => id,
            Err(e) => return UpdateResourceResponse::failed(request.prior_state, e.into()),
        };
        let read = self.read_deployment(&ctx, &id, &planned).await;
        updated(TYPE_NAME, request.planned_state, id, read)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.delete);
        deleted(self.delete_deployment(&ctx, &request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithImportState for TemplateDeploymentResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_id::<TemplateDeploymentId>(&request)
    }
}
