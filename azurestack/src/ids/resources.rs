use super::parser::SegmentParser;
use super::{IdError, ResourceId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroupId {
    pub subscription_id: String,
    pub name: String,
}

impl ResourceGroupId {
    pub fn new(subscription_id: &str, name: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            name: name.to_string(),
        }
    }
}

impl ResourceId for ResourceGroupId {
    const KIND: &'static str = "Resource Group";

    fn parse(input: &str) -> Result<Self, IdError> {
        let mut p = SegmentParser::new(Self::KIND, input)?;
        let (subscription_id, name) = p.resource_group_scope()?;
        p.finish()?;
        Ok(Self {
            subscription_id,
            name,
        })
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.name
        )
    }
}

display_as_id!(ResourceGroupId);

resource_group_child_id!(
    TemplateDeploymentId,
    "Template Deployment",
    "Microsoft.Resources",
    "deployments"
);
