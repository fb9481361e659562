//! ApiClient tests against a mock server
//!
//! Cover envelope decoding and the query cache: repeated reads are served
//! from the cache, mutations invalidate their aggregate.

use std::time::Duration;

use farm_cli::api::{ApiClient, CreateSpeciesRequest, LivestockQuery, PageQuery};
use farm_cli::cache::QueryCache;
use farm_cli::CliError;
use farm_common::types::{LivestockStatus, SpeciesType};
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const ANIMAL_ID: &str = "6f1c1f8e-2b7a-4d4e-9a43-0d7b1f6e5a10";
const SPECIES_ID: &str = "0b8d3c55-7f0e-4d55-8d7e-3c1f2a9b6e21";

fn client(server: &MockServer) -> ApiClient {
    ApiClient::with_cache(
        server.uri(),
        Duration::from_secs(5),
        QueryCache::new(Duration::from_secs(60)),
    )
    .unwrap()
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "statusCode": 200,
        "success": true,
        "data": data,
        "errors": null,
        "message": "OK"
    }))
}

fn failure(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "statusCode": status,
        "success": false,
        "data": null,
        "errors": [{"code": code, "message": message}],
        "message": message
    }))
}

fn animal(status: &str) -> Value {
    json!({
        "id": ANIMAL_ID,
        "inspection_code": "000001",
        "species_id": SPECIES_ID,
        "barn_id": null,
        "status": status,
        "gender": "MALE",
        "color": "Vàng",
        "weight_kg": 310.0,
        "date_of_birth": null,
        "origin": "Trại giống Bình Minh"
    })
}

fn page(items: Vec<Value>) -> Value {
    let total = items.len();
    json!({
        "items": items,
        "pagination": {
            "page": 1,
            "page_size": 20,
            "total": total,
            "total_pages": 1,
            "has_next": false,
            "has_prev": false
        }
    })
}

#[tokio::test]
async fn test_repeated_list_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/livestock"))
        .and(query_param("status", "HEALTHY"))
        .respond_with(ok(page(vec![animal("HEALTHY")])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let query = LivestockQuery {
        status: Some(LivestockStatus::Healthy),
        ..Default::default()
    };

    let first = client.list_livestock(&query).await.unwrap();
    let second = client.list_livestock(&query).await.unwrap();
    assert_eq!(first.items.len(), 1);
    assert_eq!(second.items[0].inspection_code, "000001");
    assert_eq!(client.cache().len(), 1);
}

#[tokio::test]
async fn test_status_change_invalidates_livestock_queries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/livestock/{}", ANIMAL_ID)))
        .respond_with(ok(animal("HEALTHY")))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/api/v1/livestock/{}/status", ANIMAL_ID)))
        .and(body_json(json!({"status": "QUARANTINED"})))
        .respond_with(ok(animal("QUARANTINED")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/species"))
        .respond_with(ok(page(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let id = ANIMAL_ID.parse().unwrap();

    client.get_livestock(id).await.unwrap();
    client.list_species(None, PageQuery::default()).await.unwrap();
    let updated = client
        .change_livestock_status(id, LivestockStatus::Quarantined)
        .await
        .unwrap();
    assert_eq!(updated.status, LivestockStatus::Quarantined);

    // livestock went back to the server, species stayed cached
    client.get_livestock(id).await.unwrap();
    client.list_species(None, PageQuery::default()).await.unwrap();
}

#[tokio::test]
async fn test_create_species_invalidates_species_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/species"))
        .respond_with(ok(page(vec![])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/species"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "statusCode": 201,
            "success": true,
            "data": {
                "id": SPECIES_ID,
                "name": "Lợn rừng",
                "description": null,
                "species_type": "PIG",
                "created_at": "2026-03-02T09:00:00Z"
            },
            "errors": null,
            "message": "Species created"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    client.list_species(None, PageQuery::default()).await.unwrap();
    let created = client
        .create_species(&CreateSpeciesRequest {
            name: "Lợn rừng".into(),
            description: None,
            species_type: SpeciesType::Pig,
        })
        .await
        .unwrap();
    assert_eq!(created.species_type, SpeciesType::Pig);
    client.list_species(None, PageQuery::default()).await.unwrap();
}

#[tokio::test]
async fn test_failure_envelope_becomes_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/api/v1/batch-imports/{}/cancel", ANIMAL_ID)))
        .respond_with(failure(
            409,
            "INVALID_STATE",
            "Batch import is COMPLETED and cannot cancel",
        ))
        .mount(&server)
        .await;

    let err = client(&server)
        .cancel_batch_import(ANIMAL_ID.parse().unwrap())
        .await
        .unwrap_err();
    match err {
        CliError::Api { status, message } => {
            assert_eq!(status, 409);
            assert!(message.contains("cannot cancel"));
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_failed_reads_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/livestock/code/404"))
        .respond_with(failure(404, "NOT_FOUND", "Livestock with code '404' not found"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    for _ in 0..2 {
        let err = client.get_livestock_by_code("404").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
    assert!(client.cache().is_empty());
}

#[tokio::test]
async fn test_health_is_never_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ok(json!({"status": "healthy", "database": "connected", "version": "0.1.0"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    for _ in 0..2 {
        assert_eq!(client.health().await.unwrap().database, "connected");
    }
}
