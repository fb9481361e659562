//! End-to-end API tests over the full router
//!
//! Each workflow walks one back-office process through `/api/v1`: the
//! response envelope, status transitions between aggregates and the audit
//! trail. Every workflow runs twice, on the in-memory store and on the
//! PostgreSQL repositories `main` serves. The PostgreSQL runs need a server
//! in `DATABASE_URL`:
//!
//! ```text
//! DATABASE_URL=postgresql://localhost/farm cargo test -p farm-server --test api_tests -- --ignored
//! ```

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{id_of, settle, TestApp};
use serde_json::json;

async fn species(app: &TestApp, name: &str) -> String {
    app.create("/species", json!({"name": name, "species_type": "PIG"}))
        .await
}

async fn animal(app: &TestApp, species_id: &str, code: Option<&str>) -> String {
    let mut body = json!({
        "species_id": species_id,
        "gender": "FEMALE",
        "weight_kg": 85.5
    });
    if let Some(code) = code {
        body["inspection_code"] = json!(code);
    }
    app.create("/livestock", body).await
}

async fn import_workflow_allocates_codes_and_houses_livestock(app: TestApp) {
    let pig = species(&app, "Lợn thịt").await;
    app.create(
        "/code-ranges",
        json!({"species_id": pig, "start_code": 1, "end_code": 2}),
    )
    .await;

    let first = animal(&app, &pig, None).await;
    let second = animal(&app, &pig, None).await;
    let (_, resp) = app.get(&format!("/livestock/{}", first)).await;
    assert_eq!(resp["data"]["inspection_code"], "000001");
    let (status, resp) = app.get("/livestock/code/000002").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["id"], second.as_str());

    // range 1-2 is used up
    let (status, resp) = app
        .post(
            "/livestock",
            json!({"species_id": pig, "gender": "MALE", "weight_kg": 90.0}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(resp["message"].as_str().unwrap().contains("exhausted"));

    let barn = app
        .create(
            "/barns",
            json!({"name": "Chuồng B", "address": "Xã Tân Lập", "owner": "Trần Thị Mai", "capacity": 20}),
        )
        .await;
    let batch = app
        .create(
            "/batch-imports",
            json!({
                "name": "Lô nhập tháng 5",
                "supplier": "Trại giống Bình Minh",
                "barn_id": barn,
                "expected_quantity": 2,
                "expected_import_date": "2026-05-01"
            }),
        )
        .await;

    for id in [&first, &second] {
        let (status, _) = app
            .post(&format!("/batch-imports/{}/livestock", batch), json!({"livestock_id": id}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, resp) = app.get(&format!("/batch-imports/{}", batch)).await;
    assert_eq!(resp["data"]["status"], "COMPLETED");
    assert_eq!(resp["data"]["details"].as_array().unwrap().len(), 2);

    let (_, resp) = app.get(&format!("/livestock?barn_id={}", barn)).await;
    assert_eq!(resp["data"]["pagination"]["total"], 2);

    // a barn housing livestock cannot go
    let (status, _) = app.delete(&format!("/barns/{}", barn)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

async fn export_claim_and_replacement(app: TestApp) {
    let pig = species(&app, "Lợn nái").await;
    let sold = animal(&app, &pig, Some("EX-001")).await;
    let spare = animal(&app, &pig, Some("EX-002")).await;

    let batch = app
        .create(
            "/batch-exports",
            json!({
                "customer_name": "Công ty Thực phẩm Sao Mai",
                "total_livestock": 3,
                "export_date": "2026-06-15"
            }),
        )
        .await;
    let (_, resp) = app.get(&format!("/batch-exports/{}", batch)).await;
    assert_eq!(resp["data"]["warranty_days"], 30);

    let (status, resp) = app
        .post(
            &format!("/batch-exports/{}/livestock", batch),
            json!({"livestock_id": sold, "unit_price": 7_500_000.0}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["status"], "EXPORTING");
    assert_eq!(resp["data"]["details"][0]["livestock_status"], "EXPORTED");

    // an exported animal is off the farm
    let (status, _) = app
        .put(&format!("/livestock/{}/status", sold), json!({"status": "HEALTHY"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let claim = app
        .create(
            "/insurance-requests",
            json!({"livestock_id": sold, "batch_export_id": batch, "reason": "Bỏ ăn sau khi nhận"}),
        )
        .await;
    let (status, _) = app.action(&format!("/insurance-requests/{}/approve", claim)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, resp) = app
        .post(
            &format!("/insurance-requests/{}/complete", claim),
            json!({"replacement_livestock_id": spare}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["status"], "COMPLETED");

    let (_, resp) = app.get(&format!("/livestock/{}", spare)).await;
    assert_eq!(resp["data"]["status"], "EXPORTED");

    // an export that already shipped cannot be cancelled
    let (status, _) = app.action(&format!("/batch-exports/{}/cancel", batch)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, resp) = app.get("/reports/dashboard").await;
    assert_eq!(resp["data"]["open_insurance_requests"], 0);
    assert_eq!(resp["data"]["livestock"]["total"], 2);
}

async fn treatment_and_vaccination_history(app: TestApp) {
    let pig = species(&app, "Lợn rừng").await;
    let patient = animal(&app, &pig, Some("MR-001")).await;

    let fever = app
        .create(
            "/diseases",
            json!({"name": "Dịch tả lợn", "disease_type": "INFECTIOUS"}),
        )
        .await;
    let antibiotic = app
        .create(
            "/medicines",
            json!({"name": "Amoxicillin", "medicine_type": "TREATMENT", "disease_ids": [fever]}),
        )
        .await;
    let vaccine = app
        .create(
            "/medicines",
            json!({"name": "Vắc xin dịch tả", "medicine_type": "VACCINE", "disease_ids": [fever]}),
        )
        .await;

    let record = app
        .create(
            "/medical-records",
            json!({"livestock_id": patient, "disease_id": fever, "medicine_id": antibiotic}),
        )
        .await;
    let (_, resp) = app.get(&format!("/livestock/{}", patient)).await;
    assert_eq!(resp["data"]["status"], "SICK");

    let (status, resp) = app.action(&format!("/medical-records/{}/recover", record)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["status"], "RECOVERED");
    let (_, resp) = app.get(&format!("/livestock/{}", patient)).await;
    assert_eq!(resp["data"]["status"], "HEALTHY");

    let scheduled_at = Utc::now().to_rfc3339();
    let (status, _) = app
        .post(
            "/batch-vaccinations",
            json!({"name": "Tiêm đợt 1", "medicine_id": antibiotic, "scheduled_at": scheduled_at}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let round = app
        .create(
            "/batch-vaccinations",
            json!({"name": "Tiêm đợt 1", "medicine_id": vaccine, "scheduled_at": scheduled_at}),
        )
        .await;
    let (status, resp) = app
        .post(
            &format!("/batch-vaccinations/{}/livestock", round),
            json!({"livestock_id": patient}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["status"], "IN_PROGRESS");

    // one dose per animal per round
    let (status, _) = app
        .post(
            &format!("/batch-vaccinations/{}/livestock", round),
            json!({"livestock_id": patient}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, resp) = app.get(&format!("/livestock/{}/vaccinations", patient)).await;
    assert_eq!(resp["data"][0]["medicine_name"], "Vắc xin dịch tả");

    // the medicine is now in use
    let (status, _) = app.delete(&format!("/medicines/{}", vaccine)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

async fn orders_follow_awarded_procurement(app: TestApp) {
    let pig = species(&app, "Lợn giống").await;
    let package = app
        .create(
            "/procurements",
            json!({
                "code": "GT-2026-01",
                "name": "Cung cấp lợn giống quý III",
                "owner": "Sở Nông nghiệp",
                "expired_at": (Utc::now() + Duration::days(30)).to_rfc3339(),
                "details": [{"species_id": pig, "required_quantity": 40, "min_weight_kg": 15.0, "max_weight_kg": 25.0}]
            }),
        )
        .await;

    let order = json!({
        "customer_name": "HTX Hòa Bình",
        "procurement_package_id": package,
        "lines": [
            {"species_id": pig, "quantity": 10, "unit_price": 2_000_000.0},
            {"species_id": pig, "quantity": 5, "unit_price": 2_200_000.0}
        ]
    });
    let (status, resp) = app.post("/orders", order.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["message"].as_str().unwrap().contains("cannot take orders"));

    let (status, _) = app.action(&format!("/procurements/{}/award", package)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, resp) = app.post("/orders", order).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resp["data"]["total_amount"], 31_000_000.0);
    assert!(resp["data"]["code"].as_str().unwrap().starts_with("ORD-"));
    let id = id_of(&resp);

    let (status, _) = app.action(&format!("/orders/{}/complete", id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    app.action(&format!("/orders/{}/confirm", id)).await;
    let (_, resp) = app.action(&format!("/orders/{}/complete", id)).await;
    assert_eq!(resp["data"]["status"], "COMPLETED");

    // referenced by an order
    let (status, _) = app.delete(&format!("/procurements/{}", package)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

async fn writes_are_audited_with_actor(app: TestApp) {
    let actor = uuid::Uuid::new_v4().to_string();
    let (status, created) = app
        .request(
            Method::POST,
            "/species",
            Some(json!({"name": "Dê", "species_type": "GOAT"})),
            Some(&actor),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["created_by"], actor.as_str());

    // failed writes leave no trail
    app.post("/species", json!({"name": "Dê", "species_type": "GOAT"}))
        .await;
    settle().await;

    let (_, resp) = app.get("/audit?resource_type=species").await;
    assert_eq!(resp["data"]["pagination"]["total"], 1);
    let entry = &resp["data"]["items"][0];
    assert_eq!(entry["action"], "create");
    assert_eq!(entry["user_id"], actor.as_str());
    assert_eq!(entry["changes"]["name"], "Dê");
}

async fn failures_share_the_envelope(app: TestApp) {

    let (status, resp) = app.post("/species", json!({"name": "", "species_type": "PIG"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp["success"], false);
    assert_eq!(resp["errors"][0]["field"], "name");

    let (status, resp) = app.get("/livestock/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["statusCode"], 400);

    let (status, resp) = app.get(&format!("/species/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(resp["data"].is_null());

    let (status, resp) = app
        .request(Method::GET, "/species", None, Some("not-a-uuid"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["success"], true);
}

async fn manual_codes_do_not_block_allocation(app: TestApp) {
    let pig = species(&app, "Lợn Móng Cái").await;
    app.create(
        "/code-ranges",
        json!({"species_id": pig, "start_code": 1, "end_code": 100}),
    )
    .await;
    animal(&app, &pig, Some("000001")).await;

    for expected in ["000002", "000003", "000004"] {
        let id = animal(&app, &pig, None).await;
        let (_, resp) = app.get(&format!("/livestock/{}", id)).await;
        assert_eq!(resp["data"]["inspection_code"], expected);
    }

    let (_, resp) = app.get(&format!("/code-ranges?species_id={}", pig)).await;
    assert_eq!(resp["data"]["items"][0]["current_code"], 5);
}

async fn list_filters_are_literal_and_bounded(app: TestApp) {
    let pig = species(&app, "Lợn Mường Khương").await;
    for (code, origin) in [("LK-1", "Hợp tác xã 50% vốn"), ("LK-2", "Trại Sa Pa")] {
        let body = json!({
            "species_id": pig,
            "gender": "MALE",
            "inspection_code": code,
            "origin": origin
        });
        app.create("/livestock", body).await;
    }

    let (_, resp) = app.get("/livestock?keyword=%25").await;
    assert_eq!(resp["data"]["pagination"]["total"], 1);
    assert_eq!(resp["data"]["items"][0]["inspection_code"], "LK-1");
    let (_, resp) = app.get("/livestock?keyword=LK_").await;
    assert_eq!(resp["data"]["pagination"]["total"], 0);
    let (_, resp) = app.get("/species?name=_").await;
    assert_eq!(resp["data"]["pagination"]["total"], 0);

    let (status, resp) = app.get("/livestock?page=9223372036854775807").await;
    assert_eq!(status, StatusCode::OK);
    assert!(resp["data"]["items"].as_array().unwrap().is_empty());
    assert_eq!(resp["data"]["pagination"]["total"], 2);
}

async fn medicine_disease_links_are_replaced(app: TestApp) {
    let cholera = app
        .create("/diseases", json!({"name": "Tụ huyết trùng", "disease_type": "INFECTIOUS"}))
        .await;
    let foot = app
        .create("/diseases", json!({"name": "Lở mồm long móng", "disease_type": "INFECTIOUS"}))
        .await;
    let medicine = app
        .create(
            "/medicines",
            json!({"name": "Oxytetracycline", "medicine_type": "TREATMENT", "disease_ids": [cholera]}),
        )
        .await;

    let (status, resp) = app
        .put(
            &format!("/medicines/{}", medicine),
            json!({"name": "Oxytetracycline", "medicine_type": "TREATMENT", "disease_ids": [foot, foot]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["disease_ids"], json!([foot]));

    let (_, resp) = app.get(&format!("/medicines?disease_id={}", cholera)).await;
    assert_eq!(resp["data"]["pagination"]["total"], 0);
    let (_, resp) = app.get(&format!("/medicines?disease_id={}", foot)).await;
    assert_eq!(resp["data"]["pagination"]["total"], 1);

    let (status, resp) = app
        .put(
            &format!("/medicines/{}", medicine),
            json!({"name": "Oxytetracycline", "medicine_type": "TREATMENT", "disease_ids": [uuid::Uuid::new_v4()]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", resp);

    // the rejected update left the links alone
    let (_, resp) = app.get(&format!("/medicines/{}", medicine)).await;
    assert_eq!(resp["data"]["disease_ids"], json!([foot]));
}

async fn sick_animal_can_die_once(app: TestApp) {
    let pig = species(&app, "Lợn Ỉ").await;
    let patient = animal(&app, &pig, Some("MR-900")).await;
    let disease = app
        .create("/diseases", json!({"name": "Suyễn lợn", "disease_type": "INFECTIOUS"}))
        .await;
    let record = app
        .create("/medical-records", json!({"livestock_id": patient, "disease_id": disease}))
        .await;

    let (status, resp) = app.action(&format!("/medical-records/{}/dead", record)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["status"], "DEAD");
    let (_, resp) = app.get(&format!("/livestock/{}", patient)).await;
    assert_eq!(resp["data"]["status"], "DEAD");

    let (status, _) = app.action(&format!("/medical-records/{}/recover", record)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app
        .post("/medical-records", json!({"livestock_id": patient, "disease_id": disease}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

async fn roles_guard_their_users(app: TestApp) {
    let (_, resp) = app.get("/roles/permissions").await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 12);

    let (status, resp) = app
        .post("/roles", json!({"name": "Kỹ thuật", "permissions": ["livestock.fly"]}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp["errors"][0]["field"], "permissions[0]");

    let (status, resp) = app
        .post(
            "/roles",
            json!({"name": "Kỹ thuật", "permissions": ["medical.write", " medical.write", "report.read"]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resp["data"]["permissions"], json!(["medical.write", "report.read"]));
    let role = id_of(&resp);

    let user = app
        .create(
            "/users",
            json!({"username": "thu.nguyen", "email": "Thu.Nguyen@trai.vn", "full_name": "Nguyễn Thị Thu", "role_id": role}),
        )
        .await;
    let (status, _) = app
        .post(
            "/users",
            json!({"username": "thu.n", "email": "thu.nguyen@trai.vn", "full_name": "Nguyễn Thu", "role_id": role}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    for _ in 0..2 {
        let (status, resp) = app.action(&format!("/users/{}/deactivate", user)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"]["is_active"], false);
    }
    let (_, resp) = app.get("/users?is_active=false").await;
    assert_eq!(resp["data"]["pagination"]["total"], 1);
    let (_, resp) = app.get("/roles?permission=report.read").await;
    assert_eq!(resp["data"]["pagination"]["total"], 1);

    let (status, _) = app.delete(&format!("/roles/{}", role)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    app.delete(&format!("/users/{}", user)).await;
    let (status, _) = app.delete(&format!("/roles/{}", role)).await;
    assert_eq!(status, StatusCode::OK);
}

/// Run each workflow on the in-memory store and on PostgreSQL
macro_rules! on_both_backends {
    ($($workflow:ident),+ $(,)?) => {
        mod memory {
            $(
                #[tokio::test]
                async fn $workflow() {
                    super::$workflow(super::TestApp::new()).await;
                }
            )+
        }

        mod postgres {
            $(
                #[sqlx::test(migrations = "../../migrations")]
                #[ignore = "requires PostgreSQL"]
                async fn $workflow(pool: sqlx::PgPool) {
                    super::$workflow(super::TestApp::postgres(pool)).await;
                }
            )+
        }
    };
}

on_both_backends!(
    import_workflow_allocates_codes_and_houses_livestock,
    export_claim_and_replacement,
    treatment_and_vaccination_history,
    orders_follow_awarded_procurement,
    writes_are_audited_with_actor,
    failures_share_the_envelope,
    manual_codes_do_not_block_allocation,
    list_filters_are_literal_and_bounded,
    medicine_disease_links_are_replaced,
    sick_animal_can_die_once,
    roles_guard_their_users,
);
