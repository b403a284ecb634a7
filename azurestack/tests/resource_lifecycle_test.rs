//! Create, update, replace and import against a mocked ARM endpoint

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

mod common;

use azurestack::resources::{NsRecordResource, ResourceGroupResource, RouteTableResource};
use common::*;
use mockito::{Matcher, Server};
use serde_json::json;
use tfplug::{
    converge, import_and_read, plan_resource_change, AttributePath, ChangeAction, Context,
    DynamicValue, Resource,
};

#[tokio::test]
async fn ns_record_is_created_and_read_back() {
    init_tracing();
    let mut server = Server::new_async().await;
    let path = format!(
        "{}/providers/microsoft.network/dnszones/example.com/NS/ns1",
        rg_path("rg1")
    );

    let absent = server
        .mock("GET", path.as_str())
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(NOT_FOUND)
        .expect(1)
        .create_async()
        .await;
    let put = server
        .mock("PUT", path.as_str())
        .match_query(Matcher::UrlEncoded("api-version".into(), "2016-04-01".into()))
        .match_body(Matcher::PartialJson(json!({
            "properties": {
                "TTL": 300,
                "NSRecords": [{"nsdname": "ns1.contoso.com"}, {"nsdname": "ns2.contoso.com"}]
            }
        })))
        .with_status(201)
        .with_body(r#"{"name":"ns1"}"#)
        .create_async()
        .await;
    let _present = server
        .mock("GET", path.as_str())
        .match_query(Matcher::Any)
        .with_body(
            json!({
                "id": path,
                "name": "ns1",
                "properties": {
                    "TTL": 300,
                    "fqdn": "ns1.example.com.",
                    "NSRecords": [{"nsdname": "ns1.contoso.com"}, {"nsdname": "ns2.contoso.com"}],
                    "metadata": {"env": "test"}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let resource = NsRecordResource::new(provider_data(&server.url()));
    let config = value(json!({
        "name": "ns1",
        "resource_group_name": "rg1",
        "zone_name": "example.com",
        "records": ["ns1.contoso.com", "ns2.contoso.com"],
        "ttl": 300,
        "tags": {"env": "test"}
    }));

    let response = converge(Context::new(), &resource, DynamicValue::null(), config).await;
    assert!(!response.has_errors(), "{:?}", response.diagnostics);
    absent.assert_async().await;
    put.assert_async().await;

    let state = response.new_state.unwrap();
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), path);
    assert_eq!(
        state.get_string(&AttributePath::new("fqdn")).unwrap(),
        "ns1.example.com."
    );
    assert_eq!(state.get_list(&AttributePath::new("records")).unwrap().len(), 2);
    assert_eq!(state.get_number(&AttributePath::new("ttl")).unwrap(), 300.0);
}

#[tokio::test]
async fn route_table_gains_its_first_route() {
    init_tracing();
    let mut server = Server::new_async().await;
    let id = format!("{}/providers/microsoft.network/routetables/rt1", rg_path("rg1"));
    let route = json!({
        "name": "route1",
        "properties": {"addressPrefix": "10.1.0.0/16", "nextHopType": "VnetLocal"}
    });

    let _before = server
        .mock("GET", id.as_str())
        .match_query(Matcher::Any)
        .with_body(
            json!({
                "id": id, "name": "rt1", "location": "local",
                "properties": {"routes": [], "provisioningState": "Succeeded"}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let put = server
        .mock("PUT", id.as_str())
        .match_query(Matcher::UrlEncoded("api-version".into(), "2018-11-01".into()))
        .match_body(Matcher::PartialJson(json!({"properties": {"routes": [route]}})))
        .with_body(json!({"id": id, "name": "rt1"}).to_string())
        .create_async()
        .await;
    let _after = server
        .mock("GET", id.as_str())
        .match_query(Matcher::Any)
        .with_body(
            json!({
                "id": id, "name": "rt1", "location": "local",
                "properties": {"routes": [route], "provisioningState": "Succeeded"}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let resource = RouteTableResource::new(provider_data(&server.url()));
    let prior = value(json!({
        "id": id,
        "name": "rt1",
        "location": "local",
        "resource_group_name": "rg1",
        "route": [],
        "disable_bgp_route_propagation": false,
        "subnets": [],
        "tags": {}
    }));
    let config = value(json!({
        "name": "rt1",
        "location": "local",
        "resource_group_name": "rg1",
        "route": [{"name": "route1", "address_prefix": "10.1.0.0/16", "next_hop_type": "VnetLocal"}]
    }));

    let plan = plan_resource_change(&resource.schema(), &prior, &config);
    assert_eq!(plan.action, ChangeAction::Update);

    let response = converge(Context::new(), &resource, prior, config).await;
    assert!(!response.has_errors(), "{:?}", response.diagnostics);
    put.assert_async().await;

    let state = response.new_state.unwrap();
    let routes = state.get_list(&AttributePath::new("route")).unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(
        state
            .get_string(&AttributePath::new("route").index(0).attribute("next_hop_type"))
            .unwrap(),
        "VnetLocal"
    );
}

#[tokio::test]
async fn existing_resource_group_must_be_imported() {
    init_tracing();
    let mut server = Server::new_async().await;
    let path = rg_path("rg1");

    let _existing = server
        .mock("GET", path.as_str())
        .match_query(Matcher::Any)
        .with_body(json!({"id": path, "name": "rg1", "location": "local"}).to_string())
        .create_async()
        .await;
    let put = server
        .mock("PUT", path.as_str())
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let resource = ResourceGroupResource::new(provider_data(&server.url()));
    let config = value(json!({"name": "rg1", "location": "local"}));

    let response = converge(Context::new(), &resource, DynamicValue::null(), config).await;
    assert!(response.has_errors());
    assert_eq!(
        response.diagnostics[0].summary,
        "azurestack_resource_group already exists"
    );
    assert!(response.diagnostics[0].detail.contains("needs to be imported into the State"));
    put.assert_async().await;
}

#[tokio::test]
async fn changing_location_replaces_the_resource_group() {
    init_tracing();
    let mut server = Server::new_async().await;
    let path = rg_path("rg1");

    let delete = server
        .mock("DELETE", path.as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let _absent = server
        .mock("GET", path.as_str())
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(NOT_FOUND)
        .expect(1)
        .create_async()
        .await;
    let put = server
        .mock("PUT", path.as_str())
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({"location": "local2"})))
        .with_status(201)
        .with_body(json!({"id": path, "name": "rg1", "location": "local2"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let _created = server
        .mock("GET", path.as_str())
        .match_query(Matcher::Any)
        .with_body(json!({"id": path, "name": "rg1", "location": "local2", "tags": {}}).to_string())
        .create_async()
        .await;

    let resource = ResourceGroupResource::new(provider_data(&server.url()));
    let prior = value(json!({"id": path, "name": "rg1", "location": "local", "tags": {}}));
    let config = value(json!({"name": "rg1", "location": "Local2"}));

    let plan = plan_resource_change(&resource.schema(), &prior, &config);
    assert_eq!(plan.action, ChangeAction::Replace);
    assert_eq!(plan.requires_replace, vec![AttributePath::new("location")]);

    let response = converge(Context::new(), &resource, prior, config).await;
    assert!(!response.has_errors(), "{:?}", response.diagnostics);
    delete.assert_async().await;
    put.assert_async().await;
    assert_eq!(
        response
            .new_state
            .unwrap()
            .get_string(&AttributePath::new("location"))
            .unwrap(),
        "local2"
    );
}

#[tokio::test]
async fn import_reads_route_table_by_id() {
    init_tracing();
    let mut server = Server::new_async().await;
    let id = format!("{}/providers/microsoft.network/routetables/rt1", rg_path("rg1"));

    let _table = server
        .mock("GET", id.as_str())
        .match_query(Matcher::Any)
        .with_body(
            json!({
                "id": id, "name": "rt1", "location": "local",
                "tags": {"env": "prod"},
                "properties": {"disableBgpRoutePropagation": true}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let resource = RouteTableResource::new(provider_data(&server.url()));
    let mixed_case = format!(
        "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Network/routeTables/rt1",
        SUBSCRIPTION
    );

    let (state, diagnostics) = import_and_read(Context::new(), &resource, &mixed_case).await;
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let state = state.unwrap();
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), id);
    assert_eq!(state.get_string(&AttributePath::new("resource_group_name")).unwrap(), "rg1");
    assert!(state
        .get_bool(&AttributePath::new("disable_bgp_route_propagation"))
        .unwrap());
}

#[tokio::test]
async fn import_of_missing_object_fails() {
    init_tracing();
    let mut server = Server::new_async().await;
    let path = rg_path("gone");
    let _missing = server
        .mock("GET", path.as_str())
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(NOT_FOUND)
        .create_async()
        .await;

    let resource = ResourceGroupResource::new(provider_data(&server.url()));
    let (state, diagnostics) = import_and_read(Context::new(), &resource, &path).await;
    assert!(state.is_none());
    assert_eq!(diagnostics[0].summary, "Cannot import non-existent remote object");
}
