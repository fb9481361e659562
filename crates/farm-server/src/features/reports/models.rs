use std::fmt::Display;

use chrono::{DateTime, Utc};
use farm_common::types::LivestockStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::livestock::LivestockSummary;

/// Count of one status value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub status: String,
    pub count: i64,
}

/// One entry per status in `all`, zero-filled
pub fn tally<S: Copy + Eq + Display>(all: &[S], counts: &[(S, i64)]) -> Vec<Tally> {
    all.iter()
        .map(|status| Tally {
            status: status.to_string(),
            count: counts
                .iter()
                .filter(|(s, _)| s == status)
                .map(|(_, c)| *c)
                .sum(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCount {
    pub species_id: Uuid,
    pub species_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub livestock: LivestockSummary,
    pub livestock_by_species: Vec<SpeciesCount>,
    pub batch_imports_by_status: Vec<Tally>,
    pub batch_exports_by_status: Vec<Tally>,
    pub open_insurance_requests: i64,
    pub active_vaccinations: i64,
    pub generated_at: DateTime<Utc>,
}

/// A species with its animal counts per status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesSummary {
    pub species_id: Uuid,
    pub species_name: String,
    pub total: i64,
    pub by_status: Vec<Tally>,
}

/// `species LEFT JOIN livestock` grouped by species and status;
/// `status` is `None` for a species without animals
#[derive(Debug, Clone)]
pub struct SpeciesStatusRow {
    pub species_id: Uuid,
    pub species_name: String,
    pub status: Option<LivestockStatus>,
    pub count: i64,
}

/// Group rows per species, keeping first-seen order
pub fn species_summaries(rows: &[SpeciesStatusRow]) -> Vec<SpeciesSummary> {
    let mut order: Vec<(Uuid, &str)> = Vec::new();
    for row in rows {
        if !order.iter().any(|(id, _)| *id == row.species_id) {
            order.push((row.species_id, &row.species_name));
        }
    }

    order
        .into_iter()
        .map(|(species_id, name)| {
            let counts: Vec<(LivestockStatus, i64)> = rows
                .iter()
                .filter(|r| r.species_id == species_id)
                .filter_map(|r| r.status.map(|s| (s, r.count)))
                .collect();
            SpeciesSummary {
                species_id,
                species_name: name.to_string(),
                total: counts.iter().map(|(_, c)| c).sum(),
                by_status: tally(LivestockStatus::ALL, &counts),
            }
        })
        .collect()
}

impl SpeciesSummary {
    pub fn as_count(&self) -> SpeciesCount {
        SpeciesCount {
            species_id: self.species_id,
            species_name: self.species_name.clone(),
            count: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_common::types::BatchImportStatus;

    #[test]
    fn test_tally_zero_fills() {
        let rows = tally(BatchImportStatus::ALL, &[(BatchImportStatus::Completed, 3)]);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], Tally { status: "PENDING".into(), count: 0 });
        assert_eq!(rows[2].count, 3);
    }

    #[test]
    fn test_species_summaries_group_rows() {
        let cow = Uuid::new_v4();
        let goat = Uuid::new_v4();
        let rows = vec![
            SpeciesStatusRow { species_id: cow, species_name: "Bò".into(), status: Some(LivestockStatus::Healthy), count: 7 },
            SpeciesStatusRow { species_id: cow, species_name: "Bò".into(), status: Some(LivestockStatus::Sick), count: 2 },
            SpeciesStatusRow { species_id: goat, species_name: "Dê".into(), status: None, count: 0 },
        ];

        let summaries = species_summaries(&rows);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].total, 9);
        assert_eq!(summaries[0].by_status[1], Tally { status: "SICK".into(), count: 2 });
        assert_eq!(summaries[1].total, 0);
        assert!(summaries[1].by_status.iter().all(|t| t.count == 0));
    }
}
