//! Status enums and their transition tables

/// Transition table of a status field.
///
/// Aggregates only change status through [`StatusFlow::can_transition_to`];
/// a status with no outgoing transitions is terminal.
pub trait StatusFlow: Copy + Eq + std::fmt::Display + 'static {
    /// Statuses reachable from `self` in one step
    fn next_statuses(self) -> &'static [Self];

    fn can_transition_to(self, next: Self) -> bool {
        self.next_statuses().contains(&next)
    }

    fn is_terminal(self) -> bool {
        self.next_statuses().is_empty()
    }
}

text_enum! {
    /// Health and lifecycle state of a single animal
    pub enum LivestockStatus("livestock status") {
        Healthy => "HEALTHY",
        Sick => "SICK",
        Quarantined => "QUARANTINED",
        Exported => "EXPORTED",
        Dead => "DEAD",
    }
}

impl StatusFlow for LivestockStatus {
    fn next_statuses(self) -> &'static [Self] {
        use LivestockStatus::*;
        match self {
            Healthy => &[Sick, Quarantined, Exported, Dead],
            Sick => &[Healthy, Quarantined, Dead],
            Quarantined => &[Healthy, Sick, Dead],
            Exported | Dead => &[],
        }
    }
}

impl LivestockStatus {
    /// Animals that left the farm or died can no longer join batches or records
    pub fn is_on_farm(self) -> bool {
        !matches!(self, LivestockStatus::Exported | LivestockStatus::Dead)
    }
}

text_enum! {
    pub enum BatchImportStatus("batch import status") {
        Pending => "PENDING",
        Importing => "IMPORTING",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

impl StatusFlow for BatchImportStatus {
    fn next_statuses(self) -> &'static [Self] {
        use BatchImportStatus::*;
        match self {
            Pending => &[Importing, Cancelled],
            Importing => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }
}

impl BatchImportStatus {
    pub fn accepts_livestock(self) -> bool {
        matches!(self, BatchImportStatus::Pending | BatchImportStatus::Importing)
    }
}

text_enum! {
    pub enum BatchExportStatus("batch export status") {
        Pending => "PENDING",
        Exporting => "EXPORTING",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

impl StatusFlow for BatchExportStatus {
    fn next_statuses(self) -> &'static [Self] {
        use BatchExportStatus::*;
        match self {
            Pending => &[Exporting, Cancelled],
            // Exported animals already left the farm, so no cancel from here
            Exporting => &[Completed],
            Completed | Cancelled => &[],
        }
    }
}

impl BatchExportStatus {
    pub fn accepts_livestock(self) -> bool {
        matches!(self, BatchExportStatus::Pending | BatchExportStatus::Exporting)
    }
}

text_enum! {
    pub enum VaccinationStatus("vaccination status") {
        Scheduled => "SCHEDULED",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

impl StatusFlow for VaccinationStatus {
    fn next_statuses(self) -> &'static [Self] {
        use VaccinationStatus::*;
        match self {
            Scheduled => &[InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }
}

impl VaccinationStatus {
    pub fn accepts_livestock(self) -> bool {
        matches!(self, VaccinationStatus::Scheduled | VaccinationStatus::InProgress)
    }
}

text_enum! {
    pub enum MedicalRecordStatus("medical record status") {
        Treating => "TREATING",
        Recovered => "RECOVERED",
        Dead => "DEAD",
    }
}

impl StatusFlow for MedicalRecordStatus {
    fn next_statuses(self) -> &'static [Self] {
        use MedicalRecordStatus::*;
        match self {
            Treating => &[Recovered, Dead],
            Recovered | Dead => &[],
        }
    }
}

text_enum! {
    pub enum ProcurementStatus("procurement status") {
        Open => "OPEN",
        Awarded => "AWARDED",
        Closed => "CLOSED",
        Cancelled => "CANCELLED",
        Expired => "EXPIRED",
    }
}

impl StatusFlow for ProcurementStatus {
    fn next_statuses(self) -> &'static [Self] {
        use ProcurementStatus::*;
        match self {
            Open => &[Awarded, Cancelled, Expired],
            Awarded => &[Closed],
            Closed | Cancelled | Expired => &[],
        }
    }
}

text_enum! {
    pub enum OrderStatus("order status") {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

impl StatusFlow for OrderStatus {
    fn next_statuses(self) -> &'static [Self] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }
}

text_enum! {
    /// Warranty claim lifecycle
    pub enum InsuranceStatus("insurance request status") {
        New => "NEW",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

impl StatusFlow for InsuranceStatus {
    fn next_statuses(self) -> &'static [Self] {
        use InsuranceStatus::*;
        match self {
            New => &[Approved, Rejected, Cancelled],
            Approved => &[Completed],
            Rejected | Completed | Cancelled => &[],
        }
    }
}

impl InsuranceStatus {
    pub fn is_open(self) -> bool {
        matches!(self, InsuranceStatus::New | InsuranceStatus::Approved)
    }
}
