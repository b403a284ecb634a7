//! Data sources read through a provider holding a ready client

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

mod common;

use azurestack::AzureStackProvider;
use common::*;
use mockito::{Matcher, Server};
use serde_json::json;
use tfplug::data_source::ReadDataSourceRequest;
use tfplug::{AttributePath, Context, Provider};

#[tokio::test]
async fn network_interface_is_looked_up_by_name() {
    let mut server = Server::new_async().await;
    let path = format!("{}/providers/microsoft.network/networkinterfaces/nic1", rg_path("rg1"));
    let _nic = server
        .mock("GET", path.as_str())
        .match_query(Matcher::UrlEncoded("api-version".into(), "2018-11-01".into()))
        .with_body(
            json!({
                "id": path,
                "name": "nic1",
                "location": "local",
                "tags": {"env": "test"},
                "properties": {
                    "macAddress": "00-0D-3A-00-00-01",
                    "enableIPForwarding": false,
                    "virtualMachine": {"id": "/subscriptions/s/resourceGroups/rg1/providers/Microsoft.Compute/virtualMachines/vm1"},
                    "dnsSettings": {"dnsServers": [], "appliedDnsServers": ["10.0.0.2"]},
                    "ipConfigurations": [{
                        "name": "ipconfig1",
                        "properties": {
                            "privateIPAddress": "10.0.2.4",
                            "privateIPAllocationMethod": "Static",
                            "privateIPAddressVersion": "IPv4",
                            "primary": true,
                            "subnet": {"id": "/subscriptions/s/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/vn1/subnets/sn1"}
                        }
                    }]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let provider = AzureStackProvider::with_provider_data(provider_data(&server.url()));
    let data_source = provider
        .create_data_source("azurestack_network_interface")
        .await
        .unwrap();
    let response = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "azurestack_network_interface".to_string(),
                config: value(json!({"name": "nic1", "resource_group_name": "rg1"})),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let state = response.state;
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), path);
    assert_eq!(
        state.get_string(&AttributePath::new("private_ip_address")).unwrap(),
        "10.0.2.4"
    );
    assert_eq!(
        state
            .get_string(
                &AttributePath::new("ip_configuration")
                    .index(0)
                    .attribute("private_ip_address_allocation")
            )
            .unwrap(),
        "static"
    );
    assert_eq!(
        state.get_string(&AttributePath::new("mac_address")).unwrap(),
        "00-0D-3A-00-00-01"
    );
    assert_eq!(
        state.get_list(&AttributePath::new("applied_dns_servers")).unwrap().len(),
        1
    );
}

#[tokio::test]
async fn missing_network_interface_is_an_error() {
    let mut server = Server::new_async().await;
    let path = format!("{}/providers/microsoft.network/networkinterfaces/nope", rg_path("rg1"));
    let _missing = server
        .mock("GET", path.as_str())
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(NOT_FOUND)
        .create_async()
        .await;

    let provider = AzureStackProvider::with_provider_data(provider_data(&server.url()));
    let data_source = provider
        .create_data_source("azurestack_network_interface")
        .await
        .unwrap();
    let response = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "azurestack_network_interface".to_string(),
                config: value(json!({"name": "nope", "resource_group_name": "rg1"})),
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(
        response.diagnostics[0].summary,
        "azurestack_network_interface not found"
    );
}

#[tokio::test]
async fn client_config_reports_configured_identity() {
    let provider = AzureStackProvider::with_provider_data(provider_data("https://management.local.azurestack.external"));
    let data_source = provider
        .create_data_source("azurestack_client_config")
        .await
        .unwrap();
    let response = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "azurestack_client_config".to_string(),
                config: value(json!({})),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    let state = response.state;
    assert_eq!(state.get_string(&AttributePath::new("subscription_id")).unwrap(), SUBSCRIPTION);
    assert_eq!(state.get_string(&AttributePath::new("tenant_id")).unwrap(), "tenant");
    assert_eq!(state.get_string(&AttributePath::new("client_id")).unwrap(), "client");
    assert!(!state.get_string(&AttributePath::new("id")).unwrap().is_empty());
}
