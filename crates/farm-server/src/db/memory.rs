//! In-process store implementing every repository trait
//!
//! Backs the router and integration tests. It keeps the guards, error
//! messages and list ordering of the PostgreSQL repositories. Each operation
//! runs under one lock and validates before it mutates, which stands in for
//! the transactions on the SQL side.

use std::cmp::Reverse;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farm_common::types::{
    BatchExportStatus, BatchImportStatus, InsuranceStatus, LivestockStatus, MedicalRecordStatus,
    OrderStatus, ProcurementStatus, VaccinationStatus,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{as_reference, missing_reference, DbError, DbResult, Repositories};
use crate::audit::{AuditEntry, AuditFilter, AuditRepository, CreateAuditEntry};
use crate::config::FarmConfig;
use crate::features::{
    barns::{Barn, BarnFilter, BarnRepository, BarnRequest},
    batch_exports::{
        BatchExport, BatchExportDetail, BatchExportFilter, BatchExportRepository,
        BatchExportRequest, BatchExportWithDetails,
    },
    batch_imports::{
        BatchImport, BatchImportDetail, BatchImportFilter, BatchImportRepository,
        BatchImportRequest, BatchImportWithDetails,
    },
    code_ranges::{
        format_code, repository::EXHAUSTED, AllocatedCode, CodeRange, CodeRangeFilter,
        CodeRangeRepository, CreateCodeRangeRequest,
    },
    diseases::{Disease, DiseaseFilter, DiseaseRepository, DiseaseRequest},
    insurance::{
        models::{ensure_claimable, ensure_replaceable},
        CreateInsuranceRequest, InsuranceFilter, InsuranceRepository, InsuranceRequest,
    },
    livestock::{
        CreateLivestockRequest, Livestock, LivestockFilter, LivestockRepository, LivestockSummary,
        UpdateLivestockRequest, VaccinationHistoryEntry,
    },
    medical_records::{
        models::{status_on_diagnosis, status_on_recovery},
        MedicalRecord, MedicalRecordFilter, MedicalRecordRepository, MedicalRecordRequest,
    },
    medicines::{Medicine, MedicineFilter, MedicineRepository, MedicineRequest},
    orders::{Order, OrderFilter, OrderLine, OrderRepository, OrderRequest, OrderWithLines},
    procurements::{
        ProcurementDetail, ProcurementDetailRequest, ProcurementFilter, ProcurementPackage,
        ProcurementRepository, ProcurementRequest, ProcurementWithDetails,
    },
    reports::{
        models::{species_summaries, tally},
        Dashboard, ReportRepository, SpeciesStatusRow, SpeciesSummary,
    },
    roles::{Role, RoleFilter, RoleRepository, RoleRequest},
    shared::{normalize, Paginated},
    species::{CreateSpeciesRequest, Species, SpeciesFilter, SpeciesRepository, UpdateSpeciesRequest},
    users::{User, UserFilter, UserRepository, UserRequest},
    vaccinations::{
        BatchVaccination, BatchVaccinationWithDetails, VaccinationDetail, VaccinationFilter,
        VaccinationRepository, VaccinationRequest,
    },
};

/// Rows addressed by primary key
trait Keyed {
    fn key(&self) -> Uuid;
}

macro_rules! keyed {
    ($($row:ty),+ $(,)?) => {
        $(impl Keyed for $row {
            fn key(&self) -> Uuid {
                self.id
            }
        })+
    };
}

keyed!(
    Species,
    Barn,
    CodeRange,
    Livestock,
    BatchImport,
    BatchExport,
    Disease,
    Medicine,
    BatchVaccination,
    MedicalRecord,
    ProcurementPackage,
    Order,
    InsuranceRequest,
    Role,
    User,
);

fn find<'a, T: Keyed>(rows: &'a [T], entity: &'static str, id: Uuid) -> DbResult<&'a T> {
    rows.iter()
        .find(|row| row.key() == id)
        .ok_or_else(|| DbError::not_found(entity, id))
}

fn find_mut<'a, T: Keyed>(rows: &'a mut [T], entity: &'static str, id: Uuid) -> DbResult<&'a mut T> {
    rows.iter_mut()
        .find(|row| row.key() == id)
        .ok_or_else(|| DbError::not_found(entity, id))
}

/// Body reference check, 400 on a miss
fn reference<T: Keyed>(rows: &[T], entity: &'static str, id: Uuid) -> DbResult<()> {
    if rows.iter().any(|row| row.key() == id) {
        Ok(())
    } else {
        Err(missing_reference(entity, id))
    }
}

/// Write back a row changed on a copy
fn store<T: Keyed>(rows: &mut [T], row: T) {
    if let Some(slot) = rows.iter_mut().find(|r| r.key() == row.key()) {
        *slot = row;
    }
}

fn unique(taken: bool, entity: &'static str, key: &str) -> DbResult<()> {
    if taken {
        Err(DbError::duplicate(entity, key))
    } else {
        Ok(())
    }
}

/// Same wording as a foreign key violation mapped by `classify`
fn still_referenced(entity: &'static str, constraint: &str) -> DbError {
    DbError::conflict(format!(
        "{} is referenced by or refers to other records ({})",
        entity, constraint
    ))
}

/// `ORDER BY <at> DESC`, latest insert first on ties
fn newest_first<T: Clone>(
    rows: &[T],
    keep: impl Fn(&T) -> bool,
    at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut items: Vec<T> = rows.iter().rev().filter(|r| keep(r)).cloned().collect();
    items.sort_by_key(|r| Reverse(at(r)));
    items
}

struct ImportRow {
    id: Uuid,
    batch_import_id: Uuid,
    livestock_id: Uuid,
    imported_at: DateTime<Utc>,
}

struct ExportRow {
    id: Uuid,
    batch_export_id: Uuid,
    livestock_id: Uuid,
    exported_at: DateTime<Utc>,
    warranty_until: DateTime<Utc>,
    unit_price: f64,
}

struct VaccinationRow {
    id: Uuid,
    batch_vaccination_id: Uuid,
    livestock_id: Uuid,
    vaccinated_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    species: Vec<Species>,
    barns: Vec<Barn>,
    code_ranges: Vec<CodeRange>,
    livestock: Vec<Livestock>,
    batch_imports: Vec<BatchImport>,
    import_rows: Vec<ImportRow>,
    batch_exports: Vec<BatchExport>,
    export_rows: Vec<ExportRow>,
    diseases: Vec<Disease>,
    medicines: Vec<Medicine>,
    vaccinations: Vec<BatchVaccination>,
    vaccination_rows: Vec<VaccinationRow>,
    medical_records: Vec<MedicalRecord>,
    procurements: Vec<ProcurementPackage>,
    procurement_details: Vec<ProcurementDetail>,
    orders: Vec<Order>,
    order_lines: Vec<OrderLine>,
    insurance: Vec<InsuranceRequest>,
    roles: Vec<Role>,
    users: Vec<User>,
    audit: Vec<AuditEntry>,
}

impl State {
    fn inspection_code(&self, livestock_id: Uuid) -> String {
        self.livestock
            .iter()
            .find(|l| l.id == livestock_id)
            .map(|l| l.inspection_code.clone())
            .unwrap_or_default()
    }

    fn set_livestock_status(
        &mut self,
        id: Uuid,
        status: LivestockStatus,
        actor: Option<Uuid>,
    ) -> DbResult<()> {
        let animal = find_mut(&mut self.livestock, "Livestock", id)?;
        animal.status = status;
        animal.updated_by = actor;
        animal.updated_at = Utc::now();
        Ok(())
    }

    /// Hand out the next free code of the species' first open range,
    /// consuming codes already taken by livestock
    fn allocate_code(&mut self, species_id: Uuid, width: usize) -> DbResult<(Uuid, String)> {
        loop {
            let range = self
                .code_ranges
                .iter_mut()
                .filter(|r| r.species_id == species_id && r.has_available())
                .min_by_key(|r| r.start_code)
                .ok_or_else(|| {
                    DbError::conflict(format!("{} for species {}", EXHAUSTED, species_id))
                })?;

            let mut allocated = None;
            while range.current_code <= range.end_code {
                let code = format_code(range.current_code, width);
                range.current_code += 1;
                if !self.livestock.iter().any(|l| l.inspection_code == code) {
                    allocated = Some(code);
                    break;
                }
            }
            range.updated_at = Utc::now();

            if let Some(code) = allocated {
                return Ok((range.id, code));
            }
        }
    }

    fn import_details(&self, batch_import_id: Uuid) -> Vec<BatchImportDetail> {
        let mut details: Vec<BatchImportDetail> = self
            .import_rows
            .iter()
            .filter(|d| d.batch_import_id == batch_import_id)
            .filter_map(|d| {
                let animal = self.livestock.iter().find(|l| l.id == d.livestock_id)?;
                Some(BatchImportDetail {
                    id: d.id,
                    batch_import_id: d.batch_import_id,
                    livestock_id: d.livestock_id,
                    inspection_code: animal.inspection_code.clone(),
                    livestock_status: animal.status,
                    imported_at: d.imported_at,
                })
            })
            .collect();
        details.sort_by_key(|d| d.imported_at);
        details
    }

    fn export_detail(&self, row: &ExportRow) -> Option<BatchExportDetail> {
        let animal = self.livestock.iter().find(|l| l.id == row.livestock_id)?;
        Some(BatchExportDetail {
            id: row.id,
            batch_export_id: row.batch_export_id,
            livestock_id: row.livestock_id,
            inspection_code: animal.inspection_code.clone(),
            livestock_status: animal.status,
            exported_at: row.exported_at,
            warranty_until: row.warranty_until,
            unit_price: row.unit_price,
        })
    }

    fn export_details(&self, batch_export_id: Uuid) -> Vec<BatchExportDetail> {
        let mut details: Vec<BatchExportDetail> = self
            .export_rows
            .iter()
            .filter(|d| d.batch_export_id == batch_export_id)
            .filter_map(|d| self.export_detail(d))
            .collect();
        details.sort_by_key(|d| d.exported_at);
        details
    }

    fn vaccination_details(&self, batch_vaccination_id: Uuid) -> Vec<VaccinationDetail> {
        let mut details: Vec<VaccinationDetail> = self
            .vaccination_rows
            .iter()
            .filter(|d| d.batch_vaccination_id == batch_vaccination_id)
            .map(|d| VaccinationDetail {
                id: d.id,
                batch_vaccination_id: d.batch_vaccination_id,
                livestock_id: d.livestock_id,
                inspection_code: self.inspection_code(d.livestock_id),
                vaccinated_at: d.vaccinated_at,
            })
            .collect();
        details.sort_by_key(|d| d.vaccinated_at);
        details
    }

    fn procurement_details(&self, package_id: Uuid) -> Vec<ProcurementDetail> {
        self.procurement_details
            .iter()
            .filter(|d| d.procurement_package_id == package_id)
            .cloned()
            .collect()
    }

    fn order_lines(&self, order_id: Uuid) -> Vec<OrderLine> {
        self.order_lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect()
    }

    fn ensure_species(&self, ids: impl IntoIterator<Item = Uuid>) -> DbResult<()> {
        for id in ids {
            reference(&self.species, "Species", id)?;
        }
        Ok(())
    }

    fn ensure_vaccine(&self, medicine_id: Uuid) -> DbResult<()> {
        let medicine = find(&self.medicines, "Medicine", medicine_id).map_err(as_reference)?;
        if medicine.is_vaccine() {
            Ok(())
        } else {
            Err(DbError::validation(format!(
                "Medicine '{}' is a {} and cannot be used for vaccination",
                medicine.name, medicine.medicine_type
            )))
        }
    }

    fn replace_procurement_details(&mut self, package_id: Uuid, details: &[ProcurementDetailRequest]) {
        self.procurement_details
            .retain(|d| d.procurement_package_id != package_id);
        self.procurement_details
            .extend(details.iter().map(|d| ProcurementDetail {
                id: Uuid::new_v4(),
                procurement_package_id: package_id,
                species_id: d.species_id,
                required_quantity: d.required_quantity,
                min_weight_kg: d.min_weight_kg,
                max_weight_kg: d.max_weight_kg,
                description: d.description.clone(),
            }));
    }

    fn species_rows(&self) -> Vec<SpeciesStatusRow> {
        let mut species: Vec<&Species> = self.species.iter().collect();
        species.sort_by(|a, b| a.name.cmp(&b.name));

        let mut rows = Vec::new();
        for s in species {
            let animals: Vec<&Livestock> =
                self.livestock.iter().filter(|l| l.species_id == s.id).collect();
            if animals.is_empty() {
                rows.push(SpeciesStatusRow {
                    species_id: s.id,
                    species_name: s.name.clone(),
                    status: None,
                    count: 0,
                });
                continue;
            }
            for status in LivestockStatus::ALL {
                let count = animals.iter().filter(|l| l.status == *status).count() as i64;
                if count > 0 {
                    rows.push(SpeciesStatusRow {
                        species_id: s.id,
                        species_name: s.name.clone(),
                        status: Some(*status),
                        count,
                    });
                }
            }
        }
        rows
    }
}

/// In-memory implementation of every repository
pub struct MemoryStore {
    farm: FarmConfig,
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new(farm: FarmConfig) -> Self {
        Self {
            farm,
            state: Mutex::new(State::default()),
        }
    }

    /// Store with default business settings, ready to hand out
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new(FarmConfig::default()))
    }

    /// Every repository backed by this store
    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            species: self.clone(),
            barns: self.clone(),
            code_ranges: self.clone(),
            livestock: self.clone(),
            batch_imports: self.clone(),
            batch_exports: self.clone(),
            diseases: self.clone(),
            medicines: self.clone(),
            vaccinations: self.clone(),
            medical_records: self.clone(),
            procurements: self.clone(),
            orders: self.clone(),
            insurance: self.clone(),
            roles: self.clone(),
            users: self.clone(),
            reports: self.clone(),
            audit: self.clone(),
        }
    }

    /// Move a package's deadline, e.g. into the past
    pub async fn backdate_procurement(&self, id: Uuid, expired_at: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        if let Some(package) = state.procurements.iter_mut().find(|p| p.id == id) {
            package.expired_at = expired_at;
        }
    }
}

#[async_trait]
impl SpeciesRepository for MemoryStore {
    async fn create(&self, req: CreateSpeciesRequest, actor: Option<Uuid>) -> DbResult<Species> {
        let mut state = self.state.lock().await;
        let name = req.name.trim().to_string();
        unique(state.species.iter().any(|s| s.name == name), "Species", &name)?;

        let now = Utc::now();
        let species = Species {
            id: Uuid::new_v4(),
            name,
            description: req.description,
            species_type: req.species_type,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.species.push(species.clone());
        Ok(species)
    }

    async fn get(&self, id: Uuid) -> DbResult<Species> {
        let state = self.state.lock().await;
        find(&state.species, "Species", id).cloned()
    }

    async fn list(&self, filter: SpeciesFilter) -> DbResult<Paginated<Species>> {
        let state = self.state.lock().await;
        let mut items: Vec<Species> = state
            .species
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(filter.page_request().slice(items))
    }

    async fn update(
        &self,
        id: Uuid,
        req: UpdateSpeciesRequest,
        actor: Option<Uuid>,
    ) -> DbResult<Species> {
        let mut state = self.state.lock().await;
        let name = req.name.trim().to_string();
        find(&state.species, "Species", id)?;
        unique(
            state.species.iter().any(|s| s.id != id && s.name == name),
            "Species",
            &name,
        )?;

        let species = find_mut(&mut state.species, "Species", id)?;
        species.name = name;
        species.description = req.description;
        species.species_type = req.species_type;
        species.updated_by = actor;
        species.updated_at = Utc::now();
        Ok(species.clone())
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if state.livestock.iter().any(|l| l.species_id == id) {
            return Err(DbError::conflict("Species is still referenced by livestock"));
        }
        find(&state.species, "Species", id)?;
        if state.code_ranges.iter().any(|r| r.species_id == id) {
            return Err(still_referenced("Species", "inspection_code_ranges_species_id_fkey"));
        }
        if state.procurement_details.iter().any(|d| d.species_id == id) {
            return Err(still_referenced("Species", "procurement_details_species_id_fkey"));
        }
        if state.order_lines.iter().any(|l| l.species_id == id) {
            return Err(still_referenced("Species", "order_lines_species_id_fkey"));
        }
        state.species.retain(|s| s.id != id);
        Ok(())
    }
}

#[async_trait]
impl BarnRepository for MemoryStore {
    async fn create(&self, req: BarnRequest, actor: Option<Uuid>) -> DbResult<Barn> {
        let mut state = self.state.lock().await;
        let name = req.name.trim().to_string();
        unique(state.barns.iter().any(|b| b.name == name), "Barn", &name)?;

        let now = Utc::now();
        let barn = Barn {
            id: Uuid::new_v4(),
            name,
            address: req.address.trim().to_string(),
            owner: req.owner.trim().to_string(),
            capacity: req.capacity,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.barns.push(barn.clone());
        Ok(barn)
    }

    async fn get(&self, id: Uuid) -> DbResult<Barn> {
        let state = self.state.lock().await;
        find(&state.barns, "Barn", id).cloned()
    }

    async fn list(&self, filter: BarnFilter) -> DbResult<Paginated<Barn>> {
        let state = self.state.lock().await;
        let mut items: Vec<Barn> = state
            .barns
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(filter.page_request().slice(items))
    }

    async fn update(&self, id: Uuid, req: BarnRequest, actor: Option<Uuid>) -> DbResult<Barn> {
        let mut state = self.state.lock().await;
        let name = req.name.trim().to_string();
        find(&state.barns, "Barn", id)?;
        unique(
            state.barns.iter().any(|b| b.id != id && b.name == name),
            "Barn",
            &name,
        )?;

        let barn = find_mut(&mut state.barns, "Barn", id)?;
        barn.name = name;
        barn.address = req.address.trim().to_string();
        barn.owner = req.owner.trim().to_string();
        barn.capacity = req.capacity;
        barn.updated_by = actor;
        barn.updated_at = Utc::now();
        Ok(barn.clone())
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if state.livestock.iter().any(|l| l.barn_id == Some(id)) {
            return Err(DbError::conflict("Barn still houses livestock"));
        }
        find(&state.barns, "Barn", id)?;
        if state.batch_imports.iter().any(|b| b.barn_id == Some(id)) {
            return Err(still_referenced("Barn", "batch_imports_barn_id_fkey"));
        }
        state.barns.retain(|b| b.id != id);
        Ok(())
    }
}

#[async_trait]
impl CodeRangeRepository for MemoryStore {
    async fn create(&self, req: CreateCodeRangeRequest, actor: Option<Uuid>) -> DbResult<CodeRange> {
        let mut state = self.state.lock().await;
        reference(&state.species, "Species", req.species_id)?;

        let overlapping = state
            .code_ranges
            .iter()
            .any(|r| r.species_id == req.species_id && r.overlaps(req.start_code, req.end_code));
        if overlapping {
            return Err(DbError::conflict(format!(
                "Range {}-{} overlaps an existing range of this species",
                req.start_code, req.end_code
            )));
        }

        let now = Utc::now();
        let range = CodeRange {
            id: Uuid::new_v4(),
            species_id: req.species_id,
            start_code: req.start_code,
            end_code: req.end_code,
            current_code: req.start_code,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.code_ranges.push(range.clone());
        Ok(range)
    }

    async fn get(&self, id: Uuid) -> DbResult<CodeRange> {
        let state = self.state.lock().await;
        find(&state.code_ranges, "Code range", id).cloned()
    }

    async fn list(&self, filter: CodeRangeFilter) -> DbResult<Paginated<CodeRange>> {
        let state = self.state.lock().await;
        let mut items: Vec<CodeRange> = state
            .code_ranges
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        items.sort_by_key(|r| (r.species_id, r.start_code));
        Ok(filter.page_request().slice(items))
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if find(&state.code_ranges, "Code range", id)?.is_used() {
            return Err(DbError::conflict(
                "Code range has already issued codes and cannot be deleted",
            ));
        }
        state.code_ranges.retain(|r| r.id != id);
        Ok(())
    }

    async fn allocate_next(&self, species_id: Uuid) -> DbResult<AllocatedCode> {
        let mut state = self.state.lock().await;
        let (range_id, code) = state.allocate_code(species_id, self.farm.inspection_code_width)?;

        let allocated = AllocatedCode {
            species_id,
            range_id,
            code,
        };
        tracing::debug!(species_id = %species_id, code = %allocated.code, "Inspection code allocated");
        Ok(allocated)
    }
}

#[async_trait]
impl LivestockRepository for MemoryStore {
    async fn create(&self, req: CreateLivestockRequest, actor: Option<Uuid>) -> DbResult<Livestock> {
        let mut state = self.state.lock().await;
        reference(&state.species, "Species", req.species_id)?;
        if let Some(barn_id) = req.barn_id {
            reference(&state.barns, "Barn", barn_id)?;
        }

        let code = match normalize(req.inspection_code.clone()) {
            Some(code) => {
                unique(
                    state.livestock.iter().any(|l| l.inspection_code == code),
                    "Livestock",
                    &code,
                )?;
                code
            },
            None => {
                state
                    .allocate_code(req.species_id, self.farm.inspection_code_width)?
                    .1
            },
        };

        let now = Utc::now();
        let animal = Livestock {
            id: Uuid::new_v4(),
            inspection_code: code,
            species_id: req.species_id,
            barn_id: req.barn_id,
            status: req.initial_status(),
            gender: req.gender,
            color: normalize(req.color),
            weight_kg: req.weight_kg,
            date_of_birth: req.date_of_birth,
            origin: normalize(req.origin),
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.livestock.push(animal.clone());
        Ok(animal)
    }

    async fn get(&self, id: Uuid) -> DbResult<Livestock> {
        let state = self.state.lock().await;
        find(&state.livestock, "Livestock", id).cloned()
    }

    async fn get_by_code(&self, code: &str) -> DbResult<Livestock> {
        let state = self.state.lock().await;
        state
            .livestock
            .iter()
            .find(|l| l.inspection_code == code)
            .cloned()
            .ok_or_else(|| DbError::not_found("Livestock", code))
    }

    async fn list(&self, filter: LivestockFilter) -> DbResult<Paginated<Livestock>> {
        let state = self.state.lock().await;
        let mut items: Vec<Livestock> = state
            .livestock
            .iter()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.inspection_code.cmp(&b.inspection_code));
        Ok(filter.page_request().slice(items))
    }

    async fn update(
        &self,
        id: Uuid,
        req: UpdateLivestockRequest,
        actor: Option<Uuid>,
    ) -> DbResult<Livestock> {
        let mut state = self.state.lock().await;
        if let Some(barn_id) = req.barn_id {
            reference(&state.barns, "Barn", barn_id)?;
        }

        let animal = find_mut(&mut state.livestock, "Livestock", id)?;
        animal.barn_id = req.barn_id;
        animal.color = normalize(req.color);
        animal.weight_kg = req.weight_kg;
        animal.date_of_birth = req.date_of_birth;
        animal.origin = normalize(req.origin);
        animal.updated_by = actor;
        animal.updated_at = Utc::now();
        Ok(animal.clone())
    }

    async fn change_status(
        &self,
        id: Uuid,
        status: LivestockStatus,
        actor: Option<Uuid>,
    ) -> DbResult<Livestock> {
        let mut state = self.state.lock().await;
        let current = find(&state.livestock, "Livestock", id)?.status;
        super::ensure_transition("livestock", current, status, "change status of")?;
        state.set_livestock_status(id, status, actor)?;

        tracing::info!(livestock_id = %id, from = %current, to = %status, "Livestock status changed");
        find(&state.livestock, "Livestock", id).cloned()
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock().await;
        find(&state.livestock, "Livestock", id)?;

        let referenced = state.import_rows.iter().any(|d| d.livestock_id == id)
            || state.export_rows.iter().any(|d| d.livestock_id == id)
            || state.vaccination_rows.iter().any(|d| d.livestock_id == id)
            || state.medical_records.iter().any(|r| r.livestock_id == id)
            || state
                .insurance
                .iter()
                .any(|r| r.livestock_id == id || r.replacement_livestock_id == Some(id));
        if referenced {
            return Err(DbError::conflict(
                "Livestock belongs to a batch or medical record and cannot be deleted",
            ));
        }

        state.livestock.retain(|l| l.id != id);
        Ok(())
    }

    async fn vaccination_history(&self, id: Uuid) -> DbResult<Vec<VaccinationHistoryEntry>> {
        let state = self.state.lock().await;
        find(&state.livestock, "Livestock", id)?;

        let mut history: Vec<VaccinationHistoryEntry> = state
            .vaccination_rows
            .iter()
            .filter(|d| d.livestock_id == id)
            .filter_map(|d| {
                let batch = state.vaccinations.iter().find(|b| b.id == d.batch_vaccination_id)?;
                let medicine = state.medicines.iter().find(|m| m.id == batch.medicine_id)?;
                Some(VaccinationHistoryEntry {
                    batch_vaccination_id: batch.id,
                    batch_name: batch.name.clone(),
                    medicine_id: medicine.id,
                    medicine_name: medicine.name.clone(),
                    vaccinated_at: d.vaccinated_at,
                })
            })
            .collect();
        history.sort_by_key(|h| Reverse(h.vaccinated_at));
        Ok(history)
    }

    async fn summary(&self) -> DbResult<LivestockSummary> {
        let state = self.state.lock().await;
        Ok(LivestockSummary::from_counts(
            state.livestock.iter().map(|l| (l.status, 1)),
        ))
    }
}

#[async_trait]
impl BatchImportRepository for MemoryStore {
    async fn create(&self, req: BatchImportRequest, actor: Option<Uuid>) -> DbResult<BatchImport> {
        let mut state = self.state.lock().await;
        if let Some(barn_id) = req.barn_id {
            reference(&state.barns, "Barn", barn_id)?;
        }

        let now = Utc::now();
        let batch = BatchImport {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            supplier: req.supplier.trim().to_string(),
            barn_id: req.barn_id,
            expected_quantity: req.expected_quantity,
            imported_quantity: 0,
            expected_import_date: req.expected_import_date,
            completed_at: None,
            status: BatchImportStatus::Pending,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.batch_imports.push(batch.clone());
        Ok(batch)
    }

    async fn get(&self, id: Uuid) -> DbResult<BatchImportWithDetails> {
        let state = self.state.lock().await;
        let batch = find(&state.batch_imports, "Batch import", id)?.clone();
        Ok(BatchImportWithDetails {
            details: state.import_details(id),
            batch,
        })
    }

    async fn list(&self, filter: BatchImportFilter) -> DbResult<Paginated<BatchImport>> {
        let state = self.state.lock().await;
        let items = newest_first(&state.batch_imports, |b| filter.matches(b), |b| b.created_at);
        Ok(filter.page_request().slice(items))
    }

    async fn update(
        &self,
        id: Uuid,
        req: BatchImportRequest,
        actor: Option<Uuid>,
    ) -> DbResult<BatchImport> {
        let mut state = self.state.lock().await;
        find(&state.batch_imports, "Batch import", id)?.ensure_editable()?;
        if let Some(barn_id) = req.barn_id {
            reference(&state.barns, "Barn", barn_id)?;
        }

        let batch = find_mut(&mut state.batch_imports, "Batch import", id)?;
        batch.name = req.name.trim().to_string();
        batch.supplier = req.supplier.trim().to_string();
        batch.barn_id = req.barn_id;
        batch.expected_quantity = req.expected_quantity;
        batch.expected_import_date = req.expected_import_date;
        batch.updated_by = actor;
        batch.updated_at = Utc::now();
        Ok(batch.clone())
    }

    async fn add_livestock(
        &self,
        id: Uuid,
        livestock_id: Uuid,
        actor: Option<Uuid>,
    ) -> DbResult<BatchImportWithDetails> {
        let mut state = self.state.lock().await;
        let mut batch = find(&state.batch_imports, "Batch import", id)?.clone();
        let animal = find(&state.livestock, "Livestock", livestock_id)
            .map_err(as_reference)?
            .clone();

        if !animal.status.is_on_farm() {
            return Err(DbError::invalid_state("livestock", animal.status, "import"));
        }
        if state.import_rows.iter().any(|d| d.livestock_id == livestock_id) {
            return Err(DbError::duplicate("Imported livestock", &animal.inspection_code));
        }

        let now = Utc::now();
        batch.register_livestock(now)?;
        batch.updated_by = actor;
        batch.updated_at = now;

        state.import_rows.push(ImportRow {
            id: Uuid::new_v4(),
            batch_import_id: id,
            livestock_id,
            imported_at: now,
        });
        if animal.barn_id.is_none() {
            if let Some(barn_id) = batch.barn_id {
                let stored = find_mut(&mut state.livestock, "Livestock", livestock_id)?;
                stored.barn_id = Some(barn_id);
                stored.updated_by = actor;
                stored.updated_at = now;
            }
        }
        store(&mut state.batch_imports, batch.clone());

        tracing::info!(
            batch_import_id = %id,
            livestock_id = %livestock_id,
            imported = batch.imported_quantity,
            expected = batch.expected_quantity,
            status = %batch.status,
            "Livestock added to import batch"
        );
        Ok(BatchImportWithDetails {
            details: state.import_details(id),
            batch,
        })
    }

    async fn remove_livestock(
        &self,
        id: Uuid,
        livestock_id: Uuid,
        actor: Option<Uuid>,
    ) -> DbResult<BatchImportWithDetails> {
        let mut state = self.state.lock().await;
        let mut batch = find(&state.batch_imports, "Batch import", id)?.clone();
        batch.unregister_livestock()?;

        let position = state
            .import_rows
            .iter()
            .position(|d| d.batch_import_id == id && d.livestock_id == livestock_id)
            .ok_or_else(|| DbError::not_found("Import detail", livestock_id))?;
        state.import_rows.remove(position);

        batch.updated_by = actor;
        batch.updated_at = Utc::now();
        store(&mut state.batch_imports, batch.clone());

        tracing::info!(batch_import_id = %id, livestock_id = %livestock_id, "Livestock removed from import batch");
        Ok(BatchImportWithDetails {
            details: state.import_details(id),
            batch,
        })
    }

    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchImport> {
        self.import_transition(id, BatchImportStatus::Completed, "complete", actor)
            .await
    }

    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchImport> {
        self.import_transition(id, BatchImportStatus::Cancelled, "cancel", actor)
            .await
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock().await;
        find(&state.batch_imports, "Batch import", id)?.ensure_deletable()?;
        if state.import_rows.iter().any(|d| d.batch_import_id == id) {
            return Err(DbError::conflict("Batch import still has livestock"));
        }
        state.batch_imports.retain(|b| b.id != id);
        Ok(())
    }
}

impl MemoryStore {
    async fn import_transition(
        &self,
        id: Uuid,
        to: BatchImportStatus,
        action: &'static str,
        actor: Option<Uuid>,
    ) -> DbResult<BatchImport> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let batch = find_mut(&mut state.batch_imports, "Batch import", id)?;
        batch.transition(to, action, now)?;
        batch.updated_by = actor;
        batch.updated_at = now;

        tracing::info!(batch_import_id = %id, status = %to, "Batch import status changed");
        Ok(batch.clone())
    }

    async fn export_transition(
        &self,
        id: Uuid,
        to: BatchExportStatus,
        action: &'static str,
        actor: Option<Uuid>,
    ) -> DbResult<BatchExport> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let batch = find_mut(&mut state.batch_exports, "Batch export", id)?;
        batch.transition(to, action, now)?;
        batch.updated_by = actor;
        batch.updated_at = now;

        tracing::info!(batch_export_id = %id, status = %to, "Batch export status changed");
        Ok(batch.clone())
    }

    async fn vaccination_transition(
        &self,
        id: Uuid,
        to: VaccinationStatus,
        action: &'static str,
        actor: Option<Uuid>,
    ) -> DbResult<BatchVaccination> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let batch = find_mut(&mut state.vaccinations, "Batch vaccination", id)?;
        batch.transition(to, action, now)?;
        batch.updated_by = actor;
        batch.updated_at = now;

        tracing::info!(batch_vaccination_id = %id, status = %to, "Vaccination status changed");
        Ok(batch.clone())
    }

    async fn procurement_transition(
        &self,
        id: Uuid,
        to: ProcurementStatus,
        action: &'static str,
        actor: Option<Uuid>,
    ) -> DbResult<ProcurementPackage> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let package = find_mut(&mut state.procurements, "Procurement package", id)?;
        package.transition(to, action, now)?;
        package.updated_by = actor;
        package.updated_at = now;

        tracing::info!(procurement_id = %id, status = %to, "Procurement status changed");
        Ok(package.clone())
    }

    async fn order_transition(
        &self,
        id: Uuid,
        to: OrderStatus,
        action: &'static str,
        actor: Option<Uuid>,
    ) -> DbResult<Order> {
        let mut state = self.state.lock().await;
        let order = find_mut(&mut state.orders, "Order", id)?;
        order.transition(to, action)?;
        order.updated_by = actor;
        order.updated_at = Utc::now();

        tracing::info!(order_id = %id, code = %order.code, status = %to, "Order status changed");
        Ok(order.clone())
    }

    async fn insurance_transition(
        &self,
        id: Uuid,
        to: InsuranceStatus,
        action: &'static str,
        actor: Option<Uuid>,
    ) -> DbResult<InsuranceRequest> {
        let mut state = self.state.lock().await;
        let request = find_mut(&mut state.insurance, "Insurance request", id)?;
        request.transition(to, action)?;
        request.updated_by = actor;
        request.updated_at = Utc::now();

        tracing::info!(insurance_request_id = %id, status = %to, "Insurance request status changed");
        Ok(request.clone())
    }
}

#[async_trait]
impl BatchExportRepository for MemoryStore {
    async fn create(&self, req: BatchExportRequest, actor: Option<Uuid>) -> DbResult<BatchExport> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let batch = BatchExport {
            id: Uuid::new_v4(),
            customer_name: req.customer_name.trim().to_string(),
            customer_phone: normalize(req.customer_phone),
            customer_address: normalize(req.customer_address),
            total_livestock: req.total_livestock,
            exported_quantity: 0,
            export_date: req.export_date,
            warranty_days: req.warranty_days.unwrap_or(self.farm.default_warranty_days),
            completed_at: None,
            status: BatchExportStatus::Pending,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.batch_exports.push(batch.clone());
        Ok(batch)
    }

    async fn get(&self, id: Uuid) -> DbResult<BatchExportWithDetails> {
        let state = self.state.lock().await;
        let batch = find(&state.batch_exports, "Batch export", id)?.clone();
        Ok(BatchExportWithDetails {
            details: state.export_details(id),
            batch,
        })
    }

    async fn list(&self, filter: BatchExportFilter) -> DbResult<Paginated<BatchExport>> {
        let state = self.state.lock().await;
        let items = newest_first(&state.batch_exports, |b| filter.matches(b), |b| b.created_at);
        Ok(filter.page_request().slice(items))
    }

    async fn update(
        &self,
        id: Uuid,
        req: BatchExportRequest,
        actor: Option<Uuid>,
    ) -> DbResult<BatchExport> {
        let mut state = self.state.lock().await;
        let batch = find_mut(&mut state.batch_exports, "Batch export", id)?;
        batch.ensure_editable()?;

        batch.customer_name = req.customer_name.trim().to_string();
        batch.customer_phone = normalize(req.customer_phone);
        batch.customer_address = normalize(req.customer_address);
        batch.total_livestock = req.total_livestock;
        batch.export_date = req.export_date;
        batch.warranty_days = req.warranty_days.unwrap_or(batch.warranty_days);
        batch.updated_by = actor;
        batch.updated_at = Utc::now();
        Ok(batch.clone())
    }

    async fn add_livestock(
        &self,
        id: Uuid,
        livestock_id: Uuid,
        unit_price: f64,
        actor: Option<Uuid>,
    ) -> DbResult<BatchExportWithDetails> {
        let mut state = self.state.lock().await;
        let mut batch = find(&state.batch_exports, "Batch export", id)?.clone();
        let animal = find(&state.livestock, "Livestock", livestock_id)
            .map_err(as_reference)?
            .clone();

        if animal.status != LivestockStatus::Healthy {
            return Err(DbError::invalid_state("livestock", animal.status, "export"));
        }

        let now = Utc::now();
        batch.register_livestock(now)?;
        unique(
            state.export_rows.iter().any(|d| d.livestock_id == livestock_id),
            "Exported livestock",
            &animal.inspection_code,
        )?;
        batch.updated_by = actor;
        batch.updated_at = now;

        state.export_rows.push(ExportRow {
            id: Uuid::new_v4(),
            batch_export_id: id,
            livestock_id,
            exported_at: now,
            warranty_until: batch.warranty_until(now),
            unit_price,
        });
        state.set_livestock_status(livestock_id, LivestockStatus::Exported, actor)?;
        store(&mut state.batch_exports, batch.clone());

        tracing::info!(
            batch_export_id = %id,
            livestock_id = %livestock_id,
            exported = batch.exported_quantity,
            total = batch.total_livestock,
            status = %batch.status,
            "Livestock exported"
        );
        Ok(BatchExportWithDetails {
            details: state.export_details(id),
            batch,
        })
    }

    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchExport> {
        self.export_transition(id, BatchExportStatus::Completed, "complete", actor)
            .await
    }

    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchExport> {
        self.export_transition(id, BatchExportStatus::Cancelled, "cancel", actor)
            .await
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock().await;
        find(&state.batch_exports, "Batch export", id)?.ensure_deletable()?;
        let referenced = state.export_rows.iter().any(|d| d.batch_export_id == id)
            || state.insurance.iter().any(|r| r.batch_export_id == id);
        if referenced {
            return Err(DbError::conflict("Batch export still has livestock"));
        }
        state.batch_exports.retain(|b| b.id != id);
        Ok(())
    }
}

#[async_trait]
impl DiseaseRepository for MemoryStore {
    async fn create(&self, req: DiseaseRequest, actor: Option<Uuid>) -> DbResult<Disease> {
        let mut state = self.state.lock().await;
        let name = req.name.trim().to_string();
        unique(state.diseases.iter().any(|d| d.name == name), "Disease", &name)?;

        let now = Utc::now();
        let disease = Disease {
            id: Uuid::new_v4(),
            name,
            symptom: normalize(req.symptom),
            description: normalize(req.description),
            disease_type: req.disease_type,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.diseases.push(disease.clone());
        Ok(disease)
    }

    async fn get(&self, id: Uuid) -> DbResult<Disease> {
        let state = self.state.lock().await;
        find(&state.diseases, "Disease", id).cloned()
    }

    async fn list(&self, filter: DiseaseFilter) -> DbResult<Paginated<Disease>> {
        let state = self.state.lock().await;
        let mut items: Vec<Disease> = state
            .diseases
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(filter.page_request().slice(items))
    }

    async fn update(
        &self,
        id: Uuid,
        req: DiseaseRequest,
        actor: Option<Uuid>,
    ) -> DbResult<Disease> {
        let mut state = self.state.lock().await;
        let name = req.name.trim().to_string();
        find(&state.diseases, "Disease", id)?;
        unique(
            state.diseases.iter().any(|d| d.id != id && d.name == name),
            "Disease",
            &name,
        )?;

        let disease = find_mut(&mut state.diseases, "Disease", id)?;
        disease.name = name;
        disease.symptom = normalize(req.symptom);
        disease.description = normalize(req.description);
        disease.disease_type = req.disease_type;
        disease.updated_by = actor;
        disease.updated_at = Utc::now();
        Ok(disease.clone())
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let referenced = state.medicines.iter().any(|m| m.disease_ids.contains(&id))
            || state.medical_records.iter().any(|r| r.disease_id == id)
            || state.insurance.iter().any(|r| r.disease_id == Some(id));
        if referenced {
            return Err(DbError::conflict(
                "Disease is referenced by medicines or medical records",
            ));
        }
        find(&state.diseases, "Disease", id)?;
        state.diseases.retain(|d| d.id != id);
        Ok(())
    }
}

#[async_trait]
impl MedicineRepository for MemoryStore {
    async fn create(&self, req: MedicineRequest, actor: Option<Uuid>) -> DbResult<Medicine> {
        let mut state = self.state.lock().await;
        let name = req.name.trim().to_string();
        unique(state.medicines.iter().any(|m| m.name == name), "Medicine", &name)?;

        let mut disease_ids = req.unique_disease_ids();
        for disease_id in &disease_ids {
            reference(&state.diseases, "Disease", *disease_id)?;
        }
        disease_ids.sort();

        let now = Utc::now();
        let medicine = Medicine {
            id: Uuid::new_v4(),
            name,
            medicine_type: req.medicine_type,
            description: normalize(req.description),
            disease_ids,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.medicines.push(medicine.clone());

        tracing::info!(medicine_id = %medicine.id, diseases = medicine.disease_ids.len(), "Medicine created");
        Ok(medicine)
    }

    async fn get(&self, id: Uuid) -> DbResult<Medicine> {
        let state = self.state.lock().await;
        find(&state.medicines, "Medicine", id).cloned()
    }

    async fn list(&self, filter: MedicineFilter) -> DbResult<Paginated<Medicine>> {
        let state = self.state.lock().await;
        let mut items: Vec<Medicine> = state
            .medicines
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(filter.page_request().slice(items))
    }

    async fn update(
        &self,
        id: Uuid,
        req: MedicineRequest,
        actor: Option<Uuid>,
    ) -> DbResult<Medicine> {
        let mut state = self.state.lock().await;
        let name = req.name.trim().to_string();
        find(&state.medicines, "Medicine", id)?;
        unique(
            state.medicines.iter().any(|m| m.id != id && m.name == name),
            "Medicine",
            &name,
        )?;

        let mut disease_ids = req.unique_disease_ids();
        for disease_id in &disease_ids {
            reference(&state.diseases, "Disease", *disease_id)?;
        }
        disease_ids.sort();

        let medicine = find_mut(&mut state.medicines, "Medicine", id)?;
        medicine.name = name;
        medicine.medicine_type = req.medicine_type;
        medicine.description = normalize(req.description);
        medicine.disease_ids = disease_ids;
        medicine.updated_by = actor;
        medicine.updated_at = Utc::now();
        Ok(medicine.clone())
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let referenced = state.vaccinations.iter().any(|v| v.medicine_id == id)
            || state.medical_records.iter().any(|r| r.medicine_id == Some(id));
        if referenced {
            return Err(DbError::conflict(
                "Medicine is used by vaccination batches or medical records",
            ));
        }
        find(&state.medicines, "Medicine", id)?;
        state.medicines.retain(|m| m.id != id);
        Ok(())
    }
}

#[async_trait]
impl VaccinationRepository for MemoryStore {
    async fn create(
        &self,
        req: VaccinationRequest,
        actor: Option<Uuid>,
    ) -> DbResult<BatchVaccination> {
        let mut state = self.state.lock().await;
        state.ensure_vaccine(req.medicine_id)?;

        let now = Utc::now();
        let batch = BatchVaccination {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            medicine_id: req.medicine_id,
            scheduled_at: req.scheduled_at,
            completed_at: None,
            conductor: normalize(req.conductor),
            description: normalize(req.description),
            status: VaccinationStatus::Scheduled,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.vaccinations.push(batch.clone());
        Ok(batch)
    }

    async fn get(&self, id: Uuid) -> DbResult<BatchVaccinationWithDetails> {
        let state = self.state.lock().await;
        let batch = find(&state.vaccinations, "Batch vaccination", id)?.clone();
        Ok(BatchVaccinationWithDetails {
            details: state.vaccination_details(id),
            batch,
        })
    }

    async fn list(&self, filter: VaccinationFilter) -> DbResult<Paginated<BatchVaccination>> {
        let state = self.state.lock().await;
        let items = newest_first(&state.vaccinations, |b| filter.matches(b), |b| b.scheduled_at);
        Ok(filter.page_request().slice(items))
    }

    async fn update(
        &self,
        id: Uuid,
        req: VaccinationRequest,
        actor: Option<Uuid>,
    ) -> DbResult<BatchVaccination> {
        let mut state = self.state.lock().await;
        find(&state.vaccinations, "Batch vaccination", id)?.ensure_editable()?;
        state.ensure_vaccine(req.medicine_id)?;

        let batch = find_mut(&mut state.vaccinations, "Batch vaccination", id)?;
        batch.name = req.name.trim().to_string();
        batch.medicine_id = req.medicine_id;
        batch.scheduled_at = req.scheduled_at;
        batch.conductor = normalize(req.conductor);
        batch.description = normalize(req.description);
        batch.updated_by = actor;
        batch.updated_at = Utc::now();
        Ok(batch.clone())
    }

    async fn add_livestock(
        &self,
        id: Uuid,
        livestock_id: Uuid,
        vaccinated_at: Option<DateTime<Utc>>,
        actor: Option<Uuid>,
    ) -> DbResult<BatchVaccinationWithDetails> {
        let mut state = self.state.lock().await;
        let mut batch = find(&state.vaccinations, "Batch vaccination", id)?.clone();
        let animal = find(&state.livestock, "Livestock", livestock_id).map_err(as_reference)?;

        if !animal.status.is_on_farm() {
            return Err(DbError::invalid_state("livestock", animal.status, "vaccinate"));
        }
        let already = state
            .vaccination_rows
            .iter()
            .any(|d| d.batch_vaccination_id == id && d.livestock_id == livestock_id);
        if already {
            return Err(DbError::duplicate("Vaccinated livestock", &animal.inspection_code));
        }

        batch.register_livestock()?;
        batch.updated_by = actor;
        batch.updated_at = Utc::now();

        state.vaccination_rows.push(VaccinationRow {
            id: Uuid::new_v4(),
            batch_vaccination_id: id,
            livestock_id,
            vaccinated_at: vaccinated_at.unwrap_or_else(Utc::now),
        });
        store(&mut state.vaccinations, batch.clone());

        let details = state.vaccination_details(id);
        tracing::info!(
            batch_vaccination_id = %id,
            livestock_id = %livestock_id,
            vaccinated = details.len(),
            "Livestock vaccinated"
        );
        Ok(BatchVaccinationWithDetails { batch, details })
    }

    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchVaccination> {
        self.vaccination_transition(id, VaccinationStatus::Completed, "complete", actor)
            .await
    }

    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchVaccination> {
        self.vaccination_transition(id, VaccinationStatus::Cancelled, "cancel", actor)
            .await
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock().await;
        find(&state.vaccinations, "Batch vaccination", id)?.ensure_deletable()?;
        if state.vaccination_rows.iter().any(|d| d.batch_vaccination_id == id) {
            return Err(DbError::conflict("Batch vaccination already has vaccinated livestock"));
        }
        state.vaccinations.retain(|b| b.id != id);
        Ok(())
    }
}

#[async_trait]
impl MedicalRecordRepository for MemoryStore {
    async fn create(
        &self,
        req: MedicalRecordRequest,
        actor: Option<Uuid>,
    ) -> DbResult<MedicalRecord> {
        let mut state = self.state.lock().await;
        let animal_status = find(&state.livestock, "Livestock", req.livestock_id)
            .map_err(as_reference)?
            .status;
        if !animal_status.is_on_farm() {
            return Err(DbError::invalid_state(
                "livestock",
                animal_status,
                "open a medical record for",
            ));
        }
        reference(&state.diseases, "Disease", req.disease_id)?;
        if let Some(medicine_id) = req.medicine_id {
            reference(&state.medicines, "Medicine", medicine_id)?;
        }

        let now = Utc::now();
        let record = MedicalRecord {
            id: Uuid::new_v4(),
            livestock_id: req.livestock_id,
            disease_id: req.disease_id,
            medicine_id: req.medicine_id,
            diagnosed_at: req.diagnosed_at.unwrap_or(now),
            treatment: normalize(req.treatment),
            status: MedicalRecordStatus::Treating,
            closed_at: None,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.medical_records.push(record.clone());
        if let Some(status) = status_on_diagnosis(animal_status) {
            state.set_livestock_status(record.livestock_id, status, actor)?;
        }

        tracing::info!(
            medical_record_id = %record.id,
            livestock_id = %record.livestock_id,
            disease_id = %record.disease_id,
            "Medical record opened"
        );
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> DbResult<MedicalRecord> {
        let state = self.state.lock().await;
        find(&state.medical_records, "Medical record", id).cloned()
    }

    async fn list(&self, filter: MedicalRecordFilter) -> DbResult<Paginated<MedicalRecord>> {
        let state = self.state.lock().await;
        let items = newest_first(&state.medical_records, |r| filter.matches(r), |r| r.diagnosed_at);
        Ok(filter.page_request().slice(items))
    }

    async fn recover(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<MedicalRecord> {
        let mut state = self.state.lock().await;
        let mut record = find(&state.medical_records, "Medical record", id)?.clone();
        let animal_status = find(&state.livestock, "Livestock", record.livestock_id)?.status;

        let now = Utc::now();
        record.close(MedicalRecordStatus::Recovered, "recover", now)?;
        record.updated_by = actor;
        record.updated_at = now;
        store(&mut state.medical_records, record.clone());

        let still_treating = state.medical_records.iter().any(|r| {
            r.livestock_id == record.livestock_id && r.status == MedicalRecordStatus::Treating
        });
        if !still_treating {
            if let Some(status) = status_on_recovery(animal_status) {
                state.set_livestock_status(record.livestock_id, status, actor)?;
            }
        }

        tracing::info!(medical_record_id = %id, livestock_id = %record.livestock_id, still_treating, "Medical record recovered");
        Ok(record)
    }

    async fn mark_dead(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<MedicalRecord> {
        let mut state = self.state.lock().await;
        let mut record = find(&state.medical_records, "Medical record", id)?.clone();
        let animal_status = find(&state.livestock, "Livestock", record.livestock_id)?.status;

        let now = Utc::now();
        record.close(MedicalRecordStatus::Dead, "mark dead", now)?;
        record.updated_by = actor;
        record.updated_at = now;
        store(&mut state.medical_records, record.clone());
        if animal_status.is_on_farm() {
            state.set_livestock_status(record.livestock_id, LivestockStatus::Dead, actor)?;
        }

        tracing::warn!(medical_record_id = %id, livestock_id = %record.livestock_id, "Livestock died under treatment");
        Ok(record)
    }
}

#[async_trait]
impl ProcurementRepository for MemoryStore {
    async fn create(
        &self,
        req: ProcurementRequest,
        actor: Option<Uuid>,
    ) -> DbResult<ProcurementWithDetails> {
        let mut state = self.state.lock().await;
        let code = req.code.trim().to_string();
        unique(
            state.procurements.iter().any(|p| p.code == code),
            "Procurement package",
            &code,
        )?;
        state.ensure_species(req.details.iter().map(|d| d.species_id))?;

        let now = Utc::now();
        let package = ProcurementPackage {
            id: Uuid::new_v4(),
            code,
            name: req.name.trim().to_string(),
            description: normalize(req.description.clone()),
            owner: req.owner.trim().to_string(),
            expired_at: req.expired_at,
            status: ProcurementStatus::Open,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.procurements.push(package.clone());
        state.replace_procurement_details(package.id, &req.details);
        let details = state.procurement_details(package.id);

        tracing::info!(procurement_id = %package.id, code = %package.code, details = details.len(), "Procurement package created");
        Ok(ProcurementWithDetails { package, details })
    }

    async fn get(&self, id: Uuid) -> DbResult<ProcurementWithDetails> {
        let state = self.state.lock().await;
        let package = find(&state.procurements, "Procurement package", id)?.clone();
        Ok(ProcurementWithDetails {
            package: package.resolve_expiry(Utc::now()),
            details: state.procurement_details(id),
        })
    }

    async fn list(&self, filter: ProcurementFilter) -> DbResult<Paginated<ProcurementPackage>> {
        let state = self.state.lock().await;
        let now = Utc::now();
        let items: Vec<ProcurementPackage> =
            newest_first(&state.procurements, |p| filter.matches(p, now), |p| p.expired_at)
                .into_iter()
                .map(|p| p.resolve_expiry(now))
                .collect();
        Ok(filter.page_request().slice(items))
    }

    async fn update(
        &self,
        id: Uuid,
        req: ProcurementRequest,
        actor: Option<Uuid>,
    ) -> DbResult<ProcurementWithDetails> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let code = req.code.trim().to_string();
        find(&state.procurements, "Procurement package", id)?.ensure_editable(now)?;
        unique(
            state.procurements.iter().any(|p| p.id != id && p.code == code),
            "Procurement package",
            &code,
        )?;
        state.ensure_species(req.details.iter().map(|d| d.species_id))?;

        let package = find_mut(&mut state.procurements, "Procurement package", id)?;
        package.code = code;
        package.name = req.name.trim().to_string();
        package.description = normalize(req.description.clone());
        package.owner = req.owner.trim().to_string();
        package.expired_at = req.expired_at;
        package.updated_by = actor;
        package.updated_at = now;
        let package = package.clone();

        state.replace_procurement_details(id, &req.details);
        Ok(ProcurementWithDetails {
            package,
            details: state.procurement_details(id),
        })
    }

    async fn award(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<ProcurementPackage> {
        self.procurement_transition(id, ProcurementStatus::Awarded, "award", actor)
            .await
    }

    async fn close(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<ProcurementPackage> {
        self.procurement_transition(id, ProcurementStatus::Closed, "close", actor)
            .await
    }

    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<ProcurementPackage> {
        self.procurement_transition(id, ProcurementStatus::Cancelled, "cancel", actor)
            .await
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock().await;
        find(&state.procurements, "Procurement package", id)?.ensure_deletable(Utc::now())?;
        if state
            .orders
            .iter()
            .any(|o| o.procurement_package_id == Some(id))
        {
            return Err(DbError::conflict("Procurement package is referenced by orders"));
        }
        state.procurements.retain(|p| p.id != id);
        state
            .procurement_details
            .retain(|d| d.procurement_package_id != id);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create(&self, req: OrderRequest, actor: Option<Uuid>) -> DbResult<OrderWithLines> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let code = req.code_or_generate(now);

        if let Some(package_id) = req.procurement_package_id {
            let package = find(&state.procurements, "Procurement package", package_id)
                .map_err(as_reference)?;
            let status = package.effective_status(now);
            if status != ProcurementStatus::Awarded {
                return Err(DbError::validation(format!(
                    "Procurement package '{}' is {} and cannot take orders",
                    package.code, status
                )));
            }
        }
        state.ensure_species(req.lines.iter().map(|l| l.species_id))?;
        unique(state.orders.iter().any(|o| o.code == code), "Order", &code)?;

        let order = Order {
            id: Uuid::new_v4(),
            code,
            customer_name: req.customer_name.trim().to_string(),
            customer_phone: normalize(req.customer_phone.clone()),
            procurement_package_id: req.procurement_package_id,
            status: OrderStatus::Pending,
            total_amount: req.total_amount(),
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.orders.push(order.clone());
        state.order_lines.extend(req.lines.iter().map(|line| OrderLine {
            id: Uuid::new_v4(),
            order_id: order.id,
            species_id: line.species_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
        }));

        tracing::info!(order_id = %order.id, code = %order.code, total_amount = order.total_amount, "Order created");
        Ok(OrderWithLines {
            lines: state.order_lines(order.id),
            order,
        })
    }

    async fn get(&self, id: Uuid) -> DbResult<OrderWithLines> {
        let state = self.state.lock().await;
        let order = find(&state.orders, "Order", id)?.clone();
        Ok(OrderWithLines {
            lines: state.order_lines(id),
            order,
        })
    }

    async fn list(&self, filter: OrderFilter) -> DbResult<Paginated<Order>> {
        let state = self.state.lock().await;
        let items = newest_first(&state.orders, |o| filter.matches(o), |o| o.created_at);
        Ok(filter.page_request().slice(items))
    }

    async fn confirm(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<Order> {
        self.order_transition(id, OrderStatus::Confirmed, "confirm", actor)
            .await
    }

    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<Order> {
        self.order_transition(id, OrderStatus::Completed, "complete", actor)
            .await
    }

    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<Order> {
        self.order_transition(id, OrderStatus::Cancelled, "cancel", actor)
            .await
    }
}

#[async_trait]
impl InsuranceRepository for MemoryStore {
    async fn create(
        &self,
        req: CreateInsuranceRequest,
        actor: Option<Uuid>,
    ) -> DbResult<InsuranceRequest> {
        let mut state = self.state.lock().await;
        reference(&state.batch_exports, "Batch export", req.batch_export_id)?;

        let detail = state
            .export_rows
            .iter()
            .find(|d| d.batch_export_id == req.batch_export_id && d.livestock_id == req.livestock_id)
            .and_then(|row| state.export_detail(row))
            .ok_or_else(|| {
                DbError::validation(format!(
                    "Livestock '{}' was not exported in batch export '{}'",
                    req.livestock_id, req.batch_export_id
                ))
            })?;
        let now = Utc::now();
        ensure_claimable(&detail, now)?;
        if let Some(disease_id) = req.disease_id {
            reference(&state.diseases, "Disease", disease_id)?;
        }

        let open = state
            .insurance
            .iter()
            .any(|r| r.livestock_id == req.livestock_id && r.status.is_open());
        if open {
            return Err(DbError::conflict(format!(
                "Livestock '{}' already has an open insurance request",
                detail.inspection_code
            )));
        }

        let request = InsuranceRequest {
            id: Uuid::new_v4(),
            livestock_id: req.livestock_id,
            batch_export_id: req.batch_export_id,
            disease_id: req.disease_id,
            reason: req.reason.trim().to_string(),
            status: InsuranceStatus::New,
            reject_reason: None,
            replacement_livestock_id: None,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.insurance.push(request.clone());

        tracing::info!(
            insurance_request_id = %request.id,
            livestock = %detail.inspection_code,
            batch_export_id = %request.batch_export_id,
            "Insurance request filed"
        );
        Ok(request)
    }

    async fn get(&self, id: Uuid) -> DbResult<InsuranceRequest> {
        let state = self.state.lock().await;
        find(&state.insurance, "Insurance request", id).cloned()
    }

    async fn list(&self, filter: InsuranceFilter) -> DbResult<Paginated<InsuranceRequest>> {
        let state = self.state.lock().await;
        let items = newest_first(&state.insurance, |r| filter.matches(r), |r| r.created_at);
        Ok(filter.page_request().slice(items))
    }

    async fn approve(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<InsuranceRequest> {
        self.insurance_transition(id, InsuranceStatus::Approved, "approve", actor)
            .await
    }

    async fn reject(
        &self,
        id: Uuid,
        reason: String,
        actor: Option<Uuid>,
    ) -> DbResult<InsuranceRequest> {
        let mut state = self.state.lock().await;
        let request = find_mut(&mut state.insurance, "Insurance request", id)?;
        request.reject(&reason)?;
        request.updated_by = actor;
        request.updated_at = Utc::now();

        tracing::info!(insurance_request_id = %id, "Insurance request rejected");
        Ok(request.clone())
    }

    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<InsuranceRequest> {
        self.insurance_transition(id, InsuranceStatus::Cancelled, "cancel", actor)
            .await
    }

    async fn complete(
        &self,
        id: Uuid,
        replacement_livestock_id: Uuid,
        actor: Option<Uuid>,
    ) -> DbResult<InsuranceRequest> {
        let mut state = self.state.lock().await;
        let mut request = find(&state.insurance, "Insurance request", id)?.clone();
        request.complete(replacement_livestock_id)?;

        let replacement = find(&state.livestock, "Livestock", replacement_livestock_id)
            .map_err(as_reference)?;
        ensure_replaceable(replacement.status)?;
        let replacement_code = replacement.inspection_code.clone();

        state.set_livestock_status(replacement_livestock_id, LivestockStatus::Exported, actor)?;
        request.updated_by = actor;
        request.updated_at = Utc::now();
        store(&mut state.insurance, request.clone());

        tracing::info!(
            insurance_request_id = %id,
            replacement = %replacement_code,
            "Insurance request completed with replacement"
        );
        Ok(request)
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn create(&self, req: RoleRequest, actor: Option<Uuid>) -> DbResult<Role> {
        let mut state = self.state.lock().await;
        let name = req.name.trim().to_string();
        unique(state.roles.iter().any(|r| r.name == name), "Role", &name)?;

        let now = Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            name,
            description: normalize(req.description.clone()),
            permissions: req.normalized_permissions(),
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.roles.push(role.clone());

        tracing::info!(role_id = %role.id, name = %role.name, "Role created");
        Ok(role)
    }

    async fn get(&self, id: Uuid) -> DbResult<Role> {
        let state = self.state.lock().await;
        find(&state.roles, "Role", id).cloned()
    }

    async fn list(&self, filter: RoleFilter) -> DbResult<Paginated<Role>> {
        let state = self.state.lock().await;
        let mut items: Vec<Role> = state
            .roles
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(filter.page_request().slice(items))
    }

    async fn update(&self, id: Uuid, req: RoleRequest, actor: Option<Uuid>) -> DbResult<Role> {
        let mut state = self.state.lock().await;
        let name = req.name.trim().to_string();
        find(&state.roles, "Role", id)?;
        unique(
            state.roles.iter().any(|r| r.id != id && r.name == name),
            "Role",
            &name,
        )?;

        let role = find_mut(&mut state.roles, "Role", id)?;
        role.name = name;
        role.description = normalize(req.description.clone());
        role.permissions = req.normalized_permissions();
        role.updated_by = actor;
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let name = find(&state.roles, "Role", id)?.name.clone();
        let users = state.users.iter().filter(|u| u.role_id == id).count();
        if users > 0 {
            return Err(DbError::conflict(format!(
                "Role '{}' is still assigned to {} user(s)",
                name, users
            )));
        }
        state.roles.retain(|r| r.id != id);

        tracing::info!(role_id = %id, name = %name, "Role deleted");
        Ok(())
    }
}

impl State {
    /// Username first, then email, like the unique indexes
    fn ensure_user_unique(&self, except: Option<Uuid>, req: &UserRequest) -> DbResult<()> {
        let others = || self.users.iter().filter(move |u| Some(u.id) != except);
        let username = req.username_key();
        unique(others().any(|u| u.username == username), "User", &username)?;
        let email = req.email_key();
        unique(others().any(|u| u.email == email), "User email", &email)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, req: UserRequest, actor: Option<Uuid>) -> DbResult<User> {
        let mut state = self.state.lock().await;
        reference(&state.roles, "Role", req.role_id)?;
        state.ensure_user_unique(None, &req)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: req.username_key(),
            email: req.email_key(),
            full_name: req.full_name.trim().to_string(),
            phone: normalize(req.phone.clone()),
            role_id: req.role_id,
            is_active: true,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        };
        state.users.push(user.clone());

        tracing::info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    async fn get(&self, id: Uuid) -> DbResult<User> {
        let state = self.state.lock().await;
        find(&state.users, "User", id).cloned()
    }

    async fn list(&self, filter: UserFilter) -> DbResult<Paginated<User>> {
        let state = self.state.lock().await;
        let mut items: Vec<User> = state
            .users
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(filter.page_request().slice(items))
    }

    async fn update(&self, id: Uuid, req: UserRequest, actor: Option<Uuid>) -> DbResult<User> {
        let mut state = self.state.lock().await;
        reference(&state.roles, "Role", req.role_id)?;
        find(&state.users, "User", id)?;
        state.ensure_user_unique(Some(id), &req)?;

        let user = find_mut(&mut state.users, "User", id)?;
        user.username = req.username_key();
        user.email = req.email_key();
        user.full_name = req.full_name.trim().to_string();
        user.phone = normalize(req.phone.clone());
        user.role_id = req.role_id;
        user.updated_by = actor;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_active(&self, id: Uuid, active: bool, actor: Option<Uuid>) -> DbResult<User> {
        let mut state = self.state.lock().await;
        let user = find_mut(&mut state.users, "User", id)?;
        user.is_active = active;
        user.updated_by = actor;
        user.updated_at = Utc::now();

        tracing::info!(user_id = %id, active, "User activation changed");
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock().await;
        find(&state.users, "User", id)?;
        state.users.retain(|u| u.id != id);
        Ok(())
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn dashboard(&self) -> DbResult<Dashboard> {
        let state = self.state.lock().await;
        let by_species = species_summaries(&state.species_rows());

        let imports: Vec<(BatchImportStatus, i64)> =
            state.batch_imports.iter().map(|b| (b.status, 1)).collect();
        let exports: Vec<(BatchExportStatus, i64)> =
            state.batch_exports.iter().map(|b| (b.status, 1)).collect();

        Ok(Dashboard {
            livestock: LivestockSummary::from_counts(
                state.livestock.iter().map(|l| (l.status, 1)),
            ),
            livestock_by_species: by_species.iter().map(SpeciesSummary::as_count).collect(),
            batch_imports_by_status: tally(BatchImportStatus::ALL, &imports),
            batch_exports_by_status: tally(BatchExportStatus::ALL, &exports),
            open_insurance_requests: state.insurance.iter().filter(|r| r.status.is_open()).count()
                as i64,
            active_vaccinations: state
                .vaccinations
                .iter()
                .filter(|v| v.status.accepts_livestock())
                .count() as i64,
            generated_at: Utc::now(),
        })
    }

    async fn livestock_by_species(&self) -> DbResult<Vec<SpeciesSummary>> {
        let state = self.state.lock().await;
        Ok(species_summaries(&state.species_rows()))
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn record(&self, entry: CreateAuditEntry) -> DbResult<AuditEntry> {
        let mut state = self.state.lock().await;
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            action: entry.action.as_str().to_string(),
            resource_type: entry.resource_type.as_str().to_string(),
            resource_id: entry.resource_id,
            changes: entry.changes,
            metadata: entry.metadata,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            timestamp: Utc::now(),
        };
        state.audit.push(entry.clone());
        Ok(entry)
    }

    async fn list(&self, filter: AuditFilter) -> DbResult<Paginated<AuditEntry>> {
        let state = self.state.lock().await;
        let items = newest_first(&state.audit, |e| filter.matches(e), |e| e.timestamp);
        Ok(filter.page_request().slice(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use farm_common::types::{Gender, SpeciesType};

    async fn species(repos: &Repositories, name: &str) -> Species {
        repos
            .species
            .create(
                CreateSpeciesRequest {
                    name: name.into(),
                    description: None,
                    species_type: SpeciesType::Pig,
                },
                None,
            )
            .await
            .unwrap()
    }

    fn animal(species_id: Uuid, code: Option<&str>) -> CreateLivestockRequest {
        CreateLivestockRequest {
            inspection_code: code.map(str::to_string),
            species_id,
            barn_id: None,
            gender: Gender::Male,
            color: None,
            weight_kg: 90.0,
            date_of_birth: None,
            origin: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_allocation_skips_manually_used_codes() {
        let repos = MemoryStore::shared().repositories();
        let pig = species(&repos, "Pig").await;
        repos
            .code_ranges
            .create(
                CreateCodeRangeRequest {
                    species_id: pig.id,
                    start_code: 1,
                    end_code: 10,
                },
                None,
            )
            .await
            .unwrap();

        repos.livestock.create(animal(pig.id, Some("000001")), None).await.unwrap();
        repos.livestock.create(animal(pig.id, Some("000003")), None).await.unwrap();

        let second = repos.livestock.create(animal(pig.id, None), None).await.unwrap();
        assert_eq!(second.inspection_code, "000002");
        let fourth = repos.livestock.create(animal(pig.id, None), None).await.unwrap();
        assert_eq!(fourth.inspection_code, "000004");

        let range = repos.code_ranges.list(CodeRangeFilter::default()).await.unwrap().items;
        assert_eq!(range[0].current_code, 5);
    }

    #[tokio::test]
    async fn test_species_in_use_cannot_be_deleted() {
        let repos = MemoryStore::shared().repositories();
        let pig = species(&repos, "Pig").await;
        repos.livestock.create(animal(pig.id, Some("L-1")), None).await.unwrap();

        let err = repos.species.delete(pig.id).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[test]
    fn test_newest_first_breaks_ties_by_insertion() {
        let now = Utc::now();
        let rows = vec![(1, now), (2, now), (3, now - Duration::seconds(5))];
        let items = newest_first(&rows, |_| true, |r| r.1);
        let order: Vec<i32> = items.iter().map(|r| r.0).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[tokio::test]
    async fn test_backdated_package_reads_expired() {
        let store = MemoryStore::shared();
        let repos = store.repositories();
        let pig = species(&repos, "Pig").await;
        let created = repos
            .procurements
            .create(
                ProcurementRequest {
                    code: "GT-1".into(),
                    name: "Spring tender".into(),
                    description: None,
                    owner: "Agriculture office".into(),
                    expired_at: Utc::now() + Duration::days(3),
                    details: vec![ProcurementDetailRequest {
                        species_id: pig.id,
                        required_quantity: 3,
                        min_weight_kg: 80.0,
                        max_weight_kg: 120.0,
                        description: None,
                    }],
                },
                None,
            )
            .await
            .unwrap();

        store
            .backdate_procurement(created.package.id, Utc::now() - Duration::minutes(1))
            .await;
        let package = repos.procurements.get(created.package.id).await.unwrap();
        assert_eq!(package.package.status, ProcurementStatus::Expired);
    }
}
