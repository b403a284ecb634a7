//! DNS record sets

pub mod mx_record;
pub mod ns_record;

pub use mx_record::MxRecordResource;
pub use ns_record::NsRecordResource;

use tfplug::schema::Attribute;
use tfplug::validator::{NumberRangeValidator, StringLengthValidator};
use tfplug::{AttributeBuilder, AttributeType};

pub(crate) fn zone_name_attribute() -> Attribute {
    AttributeBuilder::new("zone_name", AttributeType::String)
        .description("The DNS zone the record set belongs to")
        .required()
        .force_new()
        .validator(StringLengthValidator::not_empty())
        .build()
}

pub(crate) fn ttl_attribute() -> Attribute {
    AttributeBuilder::new("ttl", AttributeType::Number)
        .description("Time to live of the record set in seconds")
        .required()
        .validator(NumberRangeValidator {
            min: Some(0.0),
            max: Some(2147483647.0),
        })
        .build()
}

pub(crate) fn fqdn_attribute() -> Attribute {
    AttributeBuilder::new("fqdn", AttributeType::String)
        .description("The fully qualified domain name of the record set")
        .computed()
        .build()
}
