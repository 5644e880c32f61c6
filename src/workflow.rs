//! Store workflow state machine.
//!
//! Every status mutation in the API goes through this module: the status enum,
//! the legal-transition checks for both assignment entry points, the
//! unassignment targets, the recce review outcomes, and the lazy store-id
//! derivation that runs before any submission is persisted.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Lifecycle status of a store. Stored as its SCREAMING_SNAKE_CASE string.
///
/// `Completed` is representable and queryable but no workflow operation
/// produces it; it can only be set through the generic store update. That gap
/// is inherited from the business contract, not an oversight here.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreStatus {
    Uploaded,
    ManuallyAdded,
    RecceAssigned,
    RecceSubmitted,
    RecceApproved,
    RecceRejected,
    InstallationAssigned,
    InstallationSubmitted,
    Completed,
}

impl StoreStatus {
    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        value.parse::<Self>().map_err(|_| {
            ServiceError::InvalidStatus(format!("Unknown store status: {value}"))
        })
    }
}

/// The two assignable workflow stages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Recce,
    Installation,
}

impl Stage {
    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        value
            .parse::<Self>()
            .map_err(|_| ServiceError::InvalidInput(format!("Invalid assignment stage: {value}")))
    }

    /// Status a store enters when this stage is assigned.
    pub fn assigned_status(self) -> StoreStatus {
        match self {
            Stage::Recce => StoreStatus::RecceAssigned,
            Stage::Installation => StoreStatus::InstallationAssigned,
        }
    }

    /// Status a store falls back to when this stage is unassigned.
    pub fn unassigned_status(self) -> StoreStatus {
        match self {
            Stage::Recce => StoreStatus::Uploaded,
            Stage::Installation => StoreStatus::RecceApproved,
        }
    }

    /// Status a store enters when this stage's work is submitted.
    pub fn submitted_status(self) -> StoreStatus {
        match self {
            Stage::Recce => StoreStatus::RecceSubmitted,
            Stage::Installation => StoreStatus::InstallationSubmitted,
        }
    }
}

/// Which entry point is asking for an assignment.
///
/// The two live API paths enforce different preconditions and that difference
/// is part of the business contract: the direct id-list endpoint assigns
/// unconditionally (installation included, with no recce-approval check), while
/// the per-user roster spreadsheet rejects rows that are not in an assignable
/// state. Both are resolved through [`check_assignment`] so the divergence is a
/// named policy rather than two ad-hoc code paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentPolicy {
    /// `POST /stores/assign` with an explicit id list: store existence is the
    /// only precondition.
    Direct,
    /// Spreadsheet-driven per-user assignment: full per-row preconditions,
    /// failures reported per row.
    Roster,
}

/// Why an assignment was refused. The display strings are surfaced verbatim in
/// per-row error reports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Recce already in progress or finished (status: {0})")]
    RecceNotAssignable(StoreStatus),
    #[error("Recce not approved yet (status: {0})")]
    RecceNotApproved(StoreStatus),
    #[error("Installation already submitted or completed (status: {0})")]
    AlreadyInstalled(StoreStatus),
    #[error("Recce review requires a submitted recce (status: {0})")]
    NotSubmitted(StoreStatus),
}

impl From<TransitionError> for ServiceError {
    fn from(err: TransitionError) -> Self {
        ServiceError::InvalidOperation(err.to_string())
    }
}

/// Statuses from which a roster recce assignment is refused: survey work has
/// already been done or the store has moved past the recce phase.
const RECCE_LOCKED: [StoreStatus; 5] = [
    StoreStatus::RecceApproved,
    StoreStatus::RecceSubmitted,
    StoreStatus::InstallationAssigned,
    StoreStatus::InstallationSubmitted,
    StoreStatus::Completed,
];

/// Decide whether `current` permits assigning `stage` under `policy`, and if
/// so, which status the store moves to.
pub fn check_assignment(
    policy: AssignmentPolicy,
    stage: Stage,
    current: StoreStatus,
) -> Result<StoreStatus, TransitionError> {
    if policy == AssignmentPolicy::Direct {
        return Ok(stage.assigned_status());
    }

    match stage {
        Stage::Recce => {
            if RECCE_LOCKED.contains(&current) {
                return Err(TransitionError::RecceNotAssignable(current));
            }
            Ok(StoreStatus::RecceAssigned)
        }
        Stage::Installation => match current {
            StoreStatus::InstallationSubmitted | StoreStatus::Completed => {
                Err(TransitionError::AlreadyInstalled(current))
            }
            StoreStatus::RecceApproved => Ok(StoreStatus::InstallationAssigned),
            other => Err(TransitionError::RecceNotApproved(other)),
        },
    }
}

/// Outcome of a recce review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, ToSchema)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

/// Resolve a recce review against the current status. Reviews only apply to a
/// submitted recce.
pub fn check_review(
    decision: ReviewDecision,
    current: StoreStatus,
) -> Result<StoreStatus, TransitionError> {
    if current != StoreStatus::RecceSubmitted {
        return Err(TransitionError::NotSubmitted(current));
    }
    Ok(match decision {
        ReviewDecision::Approved => StoreStatus::RecceApproved,
        ReviewDecision::Rejected => StoreStatus::RecceRejected,
    })
}

/// Prefix admin remarks onto the recce notes of a rejected submission.
pub fn rejection_note(remarks: &str) -> String {
    format!("[Admin]: {} | {}", remarks, Utc::now().format("%-m/%-d/%Y"))
}

fn prefix3(value: &str) -> String {
    value.trim().chars().take(3).collect::<String>().to_uppercase()
}

/// Derive the business store id: first three characters of the trimmed city
/// and district, uppercased, followed by the uppercased dealer code.
///
/// Derivation is idempotent; callers persist the id once and never recompute
/// it for a store that already has one.
pub fn derive_store_id(city: &str, district: &str, dealer_code: &str) -> Option<String> {
    if city.trim().is_empty() || district.trim().is_empty() || dealer_code.trim().is_empty() {
        return None;
    }
    Some(format!(
        "{}{}{}",
        prefix3(city),
        prefix3(district),
        dealer_code.trim().to_uppercase()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use strum::IntoEnumIterator;
    use test_case::test_case;

    #[test]
    fn status_strings_round_trip() {
        for status in StoreStatus::iter() {
            let text = status.to_string();
            assert_eq!(StoreStatus::parse(&text).unwrap(), status);
        }
        assert_eq!(StoreStatus::Uploaded.to_string(), "UPLOADED");
        assert_eq!(
            StoreStatus::InstallationSubmitted.to_string(),
            "INSTALLATION_SUBMITTED"
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_matches!(
            StoreStatus::parse("SHIPPED"),
            Err(ServiceError::InvalidStatus(_))
        );
    }

    #[test]
    fn direct_assignment_ignores_current_status() {
        for status in StoreStatus::iter() {
            assert_eq!(
                check_assignment(AssignmentPolicy::Direct, Stage::Recce, status),
                Ok(StoreStatus::RecceAssigned)
            );
            // The direct path never checks recce approval for installation.
            assert_eq!(
                check_assignment(AssignmentPolicy::Direct, Stage::Installation, status),
                Ok(StoreStatus::InstallationAssigned)
            );
        }
    }

    #[test_case(StoreStatus::Uploaded => true)]
    #[test_case(StoreStatus::ManuallyAdded => true)]
    #[test_case(StoreStatus::RecceAssigned => true)]
    #[test_case(StoreStatus::RecceRejected => true)]
    #[test_case(StoreStatus::RecceSubmitted => false)]
    #[test_case(StoreStatus::RecceApproved => false)]
    #[test_case(StoreStatus::InstallationAssigned => false)]
    #[test_case(StoreStatus::InstallationSubmitted => false)]
    #[test_case(StoreStatus::Completed => false)]
    fn roster_recce_assignability(current: StoreStatus) -> bool {
        check_assignment(AssignmentPolicy::Roster, Stage::Recce, current).is_ok()
    }

    #[test]
    fn roster_installation_requires_approved_recce() {
        assert_eq!(
            check_assignment(
                AssignmentPolicy::Roster,
                Stage::Installation,
                StoreStatus::RecceApproved
            ),
            Ok(StoreStatus::InstallationAssigned)
        );
        assert_matches!(
            check_assignment(
                AssignmentPolicy::Roster,
                Stage::Installation,
                StoreStatus::RecceSubmitted
            ),
            Err(TransitionError::RecceNotApproved(StoreStatus::RecceSubmitted))
        );
        assert_matches!(
            check_assignment(
                AssignmentPolicy::Roster,
                Stage::Installation,
                StoreStatus::Completed
            ),
            Err(TransitionError::AlreadyInstalled(StoreStatus::Completed))
        );
    }

    #[test]
    fn unassignment_targets() {
        assert_eq!(Stage::Recce.unassigned_status(), StoreStatus::Uploaded);
        assert_eq!(
            Stage::Installation.unassigned_status(),
            StoreStatus::RecceApproved
        );
    }

    #[test]
    fn review_requires_submitted_recce() {
        assert_eq!(
            check_review(ReviewDecision::Approved, StoreStatus::RecceSubmitted),
            Ok(StoreStatus::RecceApproved)
        );
        assert_eq!(
            check_review(ReviewDecision::Rejected, StoreStatus::RecceSubmitted),
            Ok(StoreStatus::RecceRejected)
        );
        assert_matches!(
            check_review(ReviewDecision::Approved, StoreStatus::Uploaded),
            Err(TransitionError::NotSubmitted(StoreStatus::Uploaded))
        );
    }

    #[test]
    fn store_id_derivation() {
        assert_eq!(
            derive_store_id("Mumbai", "Mumbai Suburban", "DLR001").as_deref(),
            Some("MUMMUMDLR001")
        );
        // Trimming and case folding happen before the prefix is taken.
        assert_eq!(
            derive_store_id("  pune ", " Haveli ", "dlr9").as_deref(),
            Some("PUNHAVDLR9")
        );
        // Short components keep whatever characters they have.
        assert_eq!(derive_store_id("Ib", "Od", "d1").as_deref(), Some("IBODD1"));
        assert_eq!(derive_store_id("", "Mumbai Suburban", "DLR001"), None);
        assert_eq!(derive_store_id("Mumbai", "  ", "DLR001"), None);
    }

    #[test]
    fn store_id_derivation_is_stable() {
        let first = derive_store_id("Mumbai", "Mumbai Suburban", "DLR001");
        let second = derive_store_id("Mumbai", "Mumbai Suburban", "DLR001");
        assert_eq!(first, second);
    }

    #[test]
    fn rejection_note_carries_remark_and_date() {
        let note = rejection_note("redo photo");
        assert!(note.starts_with("[Admin]: redo photo | "));
    }
}
