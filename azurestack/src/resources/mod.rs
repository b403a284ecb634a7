pub(crate) mod common;
pub mod compute;
pub mod dns;
pub mod network;
pub mod resource_group;
pub mod storage;
pub mod template_deployment;

pub use compute::VirtualMachineResource;
pub use dns::{MxRecordResource, NsRecordResource};
pub use network::{
    LocalNetworkGatewayResource, NetworkInterfaceBackendAddressPoolAssociationResource,
    RouteTableResource,
};
pub use resource_group::ResourceGroupResource;
pub use storage::StorageBlobResource;
pub use template_deployment::TemplateDeploymentResource;
