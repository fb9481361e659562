//! PostgreSQL repository tests
//!
//! Each test gets a fresh database with the workspace migrations applied.
//! They need a reachable server in `DATABASE_URL`:
//!
//! ```text
//! DATABASE_URL=postgresql://localhost/farm cargo test -p farm-server --test db_tests -- --ignored
//! ```

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use farm_common::types::{Gender, LivestockStatus, ProcurementStatus, SpeciesType};
use farm_server::config::FarmConfig;
use farm_server::features::batch_exports::BatchExportRequest;
use farm_server::features::code_ranges::CreateCodeRangeRequest;
use farm_server::features::insurance::CreateInsuranceRequest;
use farm_server::features::livestock::CreateLivestockRequest;
use farm_server::features::procurements::{
    ProcurementDetailRequest, ProcurementFilter, ProcurementRequest,
};
use farm_server::features::species::CreateSpeciesRequest;
use farm_server::{DbError, Repositories};
use sqlx::PgPool;
use uuid::Uuid;

fn repos(pool: PgPool) -> Repositories {
    Repositories::postgres(pool, &FarmConfig::default())
}

async fn species(repos: &Repositories, name: &str) -> Uuid {
    repos
        .species
        .create(
            CreateSpeciesRequest {
                name: name.into(),
                description: None,
                species_type: SpeciesType::Cattle,
            },
            None,
        )
        .await
        .unwrap()
        .id
}

fn animal(species_id: Uuid, code: Option<&str>) -> CreateLivestockRequest {
    CreateLivestockRequest {
        inspection_code: code.map(str::to_string),
        species_id,
        barn_id: None,
        gender: Gender::Male,
        color: Some("Vàng".into()),
        weight_kg: 320.0,
        date_of_birth: None,
        origin: None,
        status: None,
    }
}

async fn code_range(repos: &Repositories, species_id: Uuid, start: i64, end: i64) {
    repos
        .code_ranges
        .create(
            CreateCodeRangeRequest {
                species_id,
                start_code: start,
                end_code: end,
            },
            None,
        )
        .await
        .unwrap();
}

async fn set_warranty(pool: &PgPool, livestock_id: Uuid, until: DateTime<Utc>) {
    sqlx::query("UPDATE batch_export_details SET warranty_until = $1 WHERE livestock_id = $2")
        .bind(until)
        .bind(livestock_id)
        .execute(pool)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_allocations_hand_out_distinct_codes(pool: PgPool) {
    let repos = repos(pool);
    let cattle = species(&repos, "Bò vàng").await;
    code_range(&repos, cattle, 1, 5).await;
    code_range(&repos, cattle, 100, 104).await;

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let codes = repos.code_ranges.clone();
            tokio::spawn(async move { codes.allocate_next(cattle).await })
        })
        .collect();

    let mut codes = HashSet::new();
    for handle in handles {
        codes.insert(handle.await.unwrap().unwrap().code);
    }
    assert_eq!(codes.len(), 10);
    assert!(codes.contains("000001"));
    assert!(codes.contains("000104"));

    let err = repos.code_ranges.allocate_next(cattle).await.unwrap_err();
    assert!(matches!(err, DbError::Conflict(_)));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_overlapping_range_is_rejected(pool: PgPool) {
    let repos = repos(pool);
    let cattle = species(&repos, "Bò sữa").await;
    code_range(&repos, cattle, 10, 20).await;

    let err = repos
        .code_ranges
        .create(
            CreateCodeRangeRequest {
                species_id: cattle,
                start_code: 20,
                end_code: 30,
            },
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Range 20-30 overlaps an existing range of this species");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_allocation_skips_codes_taken_by_hand(pool: PgPool) {
    let repos = repos(pool);
    let cattle = species(&repos, "Bò lai").await;
    code_range(&repos, cattle, 1, 3).await;
    repos.livestock.create(animal(cattle, Some("000001")), None).await.unwrap();
    repos.livestock.create(animal(cattle, Some("000002")), None).await.unwrap();

    let created = repos.livestock.create(animal(cattle, None), None).await.unwrap();
    assert_eq!(created.inspection_code, "000003");

    // the range ran out while skipping
    let err = repos.livestock.create(animal(cattle, None), None).await.unwrap_err();
    assert!(err.to_string().contains("exhausted"));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_species_with_ranges_cannot_be_deleted(pool: PgPool) {
    let repos = repos(pool);
    let cattle = species(&repos, "Bò tót").await;
    code_range(&repos, cattle, 1, 3).await;

    let err = repos.species.delete(cattle).await.unwrap_err();
    assert!(matches!(err, DbError::Conflict(_)));
    assert!(err.to_string().contains("inspection_code_ranges_species_id_fkey"));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_export_marks_livestock_and_fills_batch(pool: PgPool) {
    let repos = repos(pool);
    let cattle = species(&repos, "Bò thịt").await;
    let a = repos.livestock.create(animal(cattle, Some("B-1")), None).await.unwrap();
    let b = repos.livestock.create(animal(cattle, Some("B-2")), None).await.unwrap();

    let batch = repos
        .batch_exports
        .create(
            BatchExportRequest {
                customer_name: "Lò mổ Hóc Môn".into(),
                customer_phone: Some("0909 000 111".into()),
                customer_address: None,
                total_livestock: 2,
                export_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
                warranty_days: Some(14),
            },
            None,
        )
        .await
        .unwrap();

    repos.batch_exports.add_livestock(batch.id, a.id, 25_000_000.0, None).await.unwrap();
    let full = repos
        .batch_exports
        .add_livestock(batch.id, b.id, 26_000_000.0, None)
        .await
        .unwrap();

    assert_eq!(full.batch.exported_quantity, 2);
    assert!(full.batch.completed_at.is_some());
    assert_eq!(full.details.len(), 2);
    let detail = &full.details[0];
    assert_eq!((detail.warranty_until - detail.exported_at).num_days(), 14);

    let shipped = repos.livestock.get(a.id).await.unwrap();
    assert_eq!(shipped.status, LivestockStatus::Exported);

    let summary = repos.livestock.summary().await.unwrap();
    assert_eq!(summary.count(LivestockStatus::Exported), 2);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_dashboard_lists_species_without_livestock(pool: PgPool) {
    let repos = repos(pool);
    let cattle = species(&repos, "Bò Mông").await;
    species(&repos, "Trâu").await;
    repos.livestock.create(animal(cattle, Some("M-1")), None).await.unwrap();

    let summaries = repos.reports.livestock_by_species().await.unwrap();
    assert_eq!(summaries.len(), 2);
    let empty = summaries.iter().find(|s| s.species_name == "Trâu").unwrap();
    assert_eq!(empty.total, 0);

    let dashboard = repos.reports.dashboard().await.unwrap();
    assert_eq!(dashboard.livestock.total, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_lapsed_package_reads_expired_and_is_locked(pool: PgPool) {
    let repos = repos(pool.clone());
    let cattle = species(&repos, "Bò giống").await;
    let package = repos
        .procurements
        .create(
            ProcurementRequest {
                code: "GT-2026-09".into(),
                name: "Cung cấp bê giống".into(),
                description: None,
                owner: "UBND huyện Mộc Châu".into(),
                expired_at: Utc::now() + Duration::days(10),
                details: vec![ProcurementDetailRequest {
                    species_id: cattle,
                    required_quantity: 20,
                    min_weight_kg: 80.0,
                    max_weight_kg: 120.0,
                    description: None,
                }],
            },
            None,
        )
        .await
        .unwrap()
        .package;

    sqlx::query("UPDATE procurement_packages SET expired_at = NOW() - INTERVAL '1 day' WHERE id = $1")
        .bind(package.id)
        .execute(&pool)
        .await
        .unwrap();

    let filter = |status| ProcurementFilter {
        status: Some(status),
        ..Default::default()
    };
    let expired = repos.procurements.list(filter(ProcurementStatus::Expired)).await.unwrap();
    assert_eq!(expired.pagination.total, 1);
    assert_eq!(expired.items[0].status, ProcurementStatus::Expired);
    let open = repos.procurements.list(filter(ProcurementStatus::Open)).await.unwrap();
    assert_eq!(open.pagination.total, 0);

    let err = repos.procurements.award(package.id, None).await.unwrap_err();
    assert_eq!(err.to_string(), "Cannot award procurement package in status EXPIRED");
    let err = repos.procurements.delete(package.id).await.unwrap_err();
    assert_eq!(err.to_string(), "Cannot delete procurement package in status EXPIRED");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_claim_allowed_through_last_warranty_day(pool: PgPool) {
    let repos = repos(pool.clone());
    let cattle = species(&repos, "Bò Lai Sind").await;
    let sold = repos.livestock.create(animal(cattle, Some("W-1")), None).await.unwrap();
    let batch = repos
        .batch_exports
        .create(
            BatchExportRequest {
                customer_name: "Nhà hàng Bò Tơ Tây Ninh".into(),
                customer_phone: None,
                customer_address: None,
                total_livestock: 1,
                export_date: Utc::now().date_naive(),
                warranty_days: Some(7),
            },
            None,
        )
        .await
        .unwrap();
    repos.batch_exports.add_livestock(batch.id, sold.id, 30_000_000.0, None).await.unwrap();

    let claim = || CreateInsuranceRequest {
        livestock_id: sold.id,
        batch_export_id: batch.id,
        disease_id: None,
        reason: "Què chân".into(),
    };

    let yesterday = Utc::now() - Duration::days(1);
    set_warranty(&pool, sold.id, yesterday).await;
    let err = repos.insurance.create(claim(), None).await.unwrap_err();
    assert!(matches!(err, DbError::Validation(_)));

    // first second of today still covers the whole day
    let start_of_today = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
    set_warranty(&pool, sold.id, start_of_today).await;
    let request = repos.insurance.create(claim(), None).await.unwrap();
    assert_eq!(request.livestock_id, sold.id);
}
