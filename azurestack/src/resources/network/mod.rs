//! Network resources

pub mod local_network_gateway;
pub mod nic_backend_address_pool_association;
pub mod route_table;

pub use local_network_gateway::LocalNetworkGatewayResource;
pub use nic_backend_address_pool_association::NetworkInterfaceBackendAddressPoolAssociationResource;
pub use route_table::RouteTableResource;
