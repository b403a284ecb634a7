use super::parser::{provider_prefix, SegmentParser};
use super::{IdError, ResourceId};

resource_group_child_id!(RouteTableId, "Route Table", "Microsoft.Network", "routeTables");
resource_group_child_id!(
    LocalNetworkGatewayId,
    "Local Network Gateway",
    "Microsoft.Network",
    "localNetworkGateways"
);
resource_group_child_id!(
    NetworkInterfaceId,
    "Network Interface",
    "Microsoft.Network",
    "networkInterfaces"
);

/// `{parent marker}/{parent}/{marker}/{name}` under Microsoft.Network
macro_rules! network_child_id {
    ($name:ident, $kind:literal, $parent_marker:literal, $parent:ident, $marker:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub subscription_id: String,
            pub resource_group: String,
            pub $parent: String,
            pub name: String,
        }

        impl $name {
            pub fn new(subscription_id: &str, resource_group: &str, $parent: &str, name: &str) -> Self {
                Self {
                    subscription_id: subscription_id.to_string(),
                    resource_group: resource_group.to_string(),
                    $parent: $parent.to_string(),
                    name: name.to_string(),
                }
            }
        }

        impl ResourceId for $name {
            const KIND: &'static str = $kind;

            fn parse(input: &str) -> Result<Self, IdError> {
                let mut p = SegmentParser::new(Self::KIND, input)?;
                let (subscription_id, resource_group) = p.resource_group_scope()?;
                p.provider("Microsoft.Network")?;
                let $parent = p.keyed($parent_marker)?;
                let name = p.keyed($marker)?;
                p.finish()?;
                Ok(Self {
                    subscription_id,
                    resource_group,
                    $parent,
                    name,
                })
            }

            fn id(&self) -> String {
                format!(
                    "{}/{}/{}/{}/{}",
                    provider_prefix(&self.subscription_id, &self.resource_group, "Microsoft.Network"),
                    $parent_marker.to_ascii_lowercase(),
                    self.$parent,
                    $marker.to_ascii_lowercase(),
                    self.name
                )
            }
        }

        display_as_id!($name);
    };
}

network_child_id!(SubnetId, "Subnet", "virtualNetworks", virtual_network_name, "subnets");
network_child_id!(
    NetworkInterfaceIpConfigurationId,
    "Network Interface IP Configuration",
    "networkInterfaces",
    network_interface_name,
    "ipConfigurations"
);
network_child_id!(
    LoadBalancerBackendAddressPoolId,
    "Load Balancer Backend Address Pool",
    "loadBalancers",
    load_balancer_name,
    "backendAddressPools"
);

impl NetworkInterfaceIpConfigurationId {
    pub fn network_interface_id(&self) -> NetworkInterfaceId {
        NetworkInterfaceId::new(
            &self.subscription_id,
            &self.resource_group,
            &self.network_interface_name,
        )
    }
}

/// `{ip configuration id}|{backend address pool id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterfaceBackendAddressPoolAssociationId {
    pub ip_configuration: NetworkInterfaceIpConfigurationId,
    pub backend_address_pool: LoadBalancerBackendAddressPoolId,
}

impl NetworkInterfaceBackendAddressPoolAssociationId {
    pub fn new(
        ip_configuration: NetworkInterfaceIpConfigurationId,
        backend_address_pool: LoadBalancerBackendAddressPoolId,
    ) -> Self {
        Self {
            ip_configuration,
            backend_address_pool,
        }
    }
}

impl ResourceId for NetworkInterfaceBackendAddressPoolAssociationId {
    const KIND: &'static str = "Network Interface Backend Address Pool Association";

    fn parse(input: &str) -> Result<Self, IdError> {
        let Some((ip_configuration, pool)) = input.split_once('|') else {
            return Err(IdError::new(
                Self::KIND,
                input,
                "expected {ipConfigurationId}|{backendAddressPoolId}",
            ));
        };
        let ip_configuration = NetworkInterfaceIpConfigurationId::parse(ip_configuration)
            .map_err(|e| IdError::new(Self::KIND, input, e.to_string()))?;
        let backend_address_pool = LoadBalancerBackendAddressPoolId::parse(pool)
            .map_err(|e| IdError::new(Self::KIND, input, e.to_string()))?;
        Ok(Self {
            ip_configuration,
            backend_address_pool,
        })
    }

    fn id(&self) -> String {
        format!("{}|{}", self.ip_configuration.id(), self.backend_address_pool.id())
    }
}

display_as_id!(NetworkInterfaceBackendAddressPoolAssociationId);

#[cfg(test)]
mod tests {
    use super::*;

    const IP_CONFIG: &str = "/subscriptions/12345/resourceGroups/group1/providers/Microsoft.Network/networkInterfaces/nic1/ipConfigurations/primary";
    const POOL: &str = "/subscriptions/12345/resourceGroups/group1/providers/Microsoft.Network/loadBalancers/lb1/backendAddressPools/pool1";

    #[test]
    fn route_table_id_lower_cases_markers() {
        let id = RouteTableId::parse(
            "/subscriptions/12345/resourceGroups/Group1/providers/Microsoft.Network/routeTables/Table1",
        )
        .unwrap();
        assert_eq!(id, RouteTableId::new("12345", "Group1", "Table1"));
        assert_eq!(
            id.id(),
            "/subscriptions/12345/resourceGroups/Group1/providers/microsoft.network/routetables/Table1"
        );
    }

    #[test]
    fn route_table_id_rejects_other_namespace() {
        let err = RouteTableId::parse(
            "/subscriptions/12345/resourceGroups/group1/providers/Microsoft.Compute/routeTables/t",
        )
        .unwrap_err();
        assert!(err.reason.contains("Microsoft.Compute"));
    }

    #[test]
    fn ip_configuration_id_yields_interface_id() {
        let id = NetworkInterfaceIpConfigurationId::parse(IP_CONFIG).unwrap();
        assert_eq!(id.network_interface_name, "nic1");
        assert_eq!(id.name, "primary");
        assert_eq!(
            id.network_interface_id(),
            NetworkInterfaceId::new("12345", "group1", "nic1")
        );
    }

    #[test]
    fn association_id_round_trips() {
        let input = format!("{}|{}", IP_CONFIG, POOL);
        let id = NetworkInterfaceBackendAddressPoolAssociationId::parse(&input).unwrap();
        assert_eq!(id.backend_address_pool.load_balancer_name, "lb1");

        let again = NetworkInterfaceBackendAddressPoolAssociationId::parse(&id.id()).unwrap();
        assert_eq!(again, id);
    }

    #[test]
    fn association_id_requires_separator() {
        let err = NetworkInterfaceBackendAddressPoolAssociationId::parse(IP_CONFIG).unwrap_err();
        assert!(err.reason.contains('|'));
    }

    #[test]
    fn association_id_reports_inner_failure() {
        let input = format!("{}|/subscriptions/12345", IP_CONFIG);
        let err = NetworkInterfaceBackendAddressPoolAssociationId::parse(&input).unwrap_err();
        assert_eq!(err.kind, "Network Interface Backend Address Pool Association");
        assert!(err.reason.contains("Load Balancer Backend Address Pool"));
    }
}
