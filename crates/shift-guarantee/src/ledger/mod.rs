//! Committed-shift lifecycle: commitment, write-once settlement, cancellation, the
//! per-worker guarantee roll-ups computed from settled shifts, and the audit history.

pub mod domain;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AccountStatus, ShiftCommitment, ShiftEarningsRecord, ShiftId, ShiftStatus, WorkerId,
    WorkerStanding,
};
pub use repository::{
    AuditError, GuaranteeAuditLog, GuaranteeEvent, GuaranteeEventKind, RepositoryError,
    ShiftRepository,
};
pub use report::{
    EarningsBreakdown, EarningsTrendPoint, LocationPerformance, PerformanceReport, ReportPeriod,
};
pub use router::{
    guarantee_router, CommitShiftRequest, GuaranteeHistoryQuery, RecordEarningsRequest,
    ShiftListQuery,
};
pub use service::{
    GuaranteeService, GuaranteeServiceError, GuaranteeSummary, ShiftSettlement,
    DEFAULT_HISTORY_LIMIT,
};
