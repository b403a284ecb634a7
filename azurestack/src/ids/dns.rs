use super::parser::{provider_prefix, SegmentParser};
use super::{IdError, ResourceId};

/// Record sets live under `dnszones/{zone}/{record type}/{name}`
macro_rules! record_set_id {
    ($name:ident, $kind:literal, $record_type:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub subscription_id: String,
            pub resource_group: String,
            pub zone_name: String,
            pub name: String,
        }

        impl $name {
            pub fn new(subscription_id: &str, resource_group: &str, zone_name: &str, name: &str) -> Self {
                Self {
                    subscription_id: subscription_id.to_string(),
                    resource_group: resource_group.to_string(),
                    zone_name: zone_name.to_string(),
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
                let zone_name = p.keyed("dnszones")?;
                let name = p.keyed($record_type)?;
                p.finish()?;
                Ok(Self {
                    subscription_id,
                    resource_group,
                    zone_name,
                    name,
                })
            }

            fn id(&self) -> String {
                format!(
                    "{}/dnszones/{}/{}/{}",
                    provider_prefix(&self.subscription_id, &self.resource_group, "Microsoft.Network"),
                    self.zone_name,
                    $record_type,
                    self.name
                )
            }
        }

        display_as_id!($name);
    };
}

record_set_id!(NsRecordId, "DNS NS Record", "NS");
record_set_id!(MxRecordId, "DNS MX Record", "MX");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ns_record_id_formats_record_type_upper_case() {
        let id = NsRecordId::parse(
            "/subscriptions/12345/resourceGroups/group1/providers/Microsoft.Network/dnsZones/example.com/ns/www",
        )
        .unwrap();
        assert_eq!(id.zone_name, "example.com");
        assert_eq!(
            id.to_string(),
            "/subscriptions/12345/resourceGroups/group1/providers/microsoft.network/dnszones/example.com/NS/www"
        );
    }

    #[test]
    fn mx_record_id_rejects_other_record_types() {
        let err = MxRecordId::parse(
            "/subscriptions/12345/resourceGroups/group1/providers/Microsoft.Network/dnszones/example.com/NS/www",
        )
        .unwrap_err();
        assert_eq!(err.kind, "DNS MX Record");
        assert!(err.reason.contains("\"MX\""));
    }

    #[test]
    fn mx_record_id_requires_name() {
        assert!(MxRecordId::parse(
            "/subscriptions/12345/resourceGroups/group1/providers/Microsoft.Network/dnszones/example.com/MX"
        )
        .is_err());
    }
}
