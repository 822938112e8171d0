//! Domain types for lab requests.

use crate::availability::{AvailabilityQuery, LineItem};
use crate::error::LabError;
use crate::types::{ConversationId, Deletion, RequestId, StockItemId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason stored on requests rejected by the expiration check.
pub const EXPIRED_REASON: &str = "Request expired before it was processed";

/// Status of a lab request.
///
/// ```text
/// PENDING ──approve──▶ APPROVED ──complete──▶ COMPLETED
///    │                    │
///    └──reject/expire─────┴──reject/expire──▶ REJECTED
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Awaiting review
    Pending,
    /// Accepted by lab staff
    Approved,
    /// Refused, administratively or by expiration
    Rejected,
    /// Session held and resources returned
    Completed,
}

impl RequestStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }

    /// Whether the request is in the `COMPLETED` state.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether the request is in the `REJECTED` state.
    #[must_use]
    pub const fn is_rejected(self) -> bool {
        matches!(self, Self::Rejected)
    }

    /// Lower-case name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reactive line with its preparation details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactiveLine {
    /// Referenced reactive
    pub id: StockItemId,
    /// Requested quantity, in the reactive's unit
    pub amount: f64,
    /// Unit the requester expressed the amount in
    #[serde(default)]
    pub unit: Option<String>,
    /// Required grade (analytical, technical, ...)
    #[serde(default)]
    pub quality: Option<String>,
    /// Required concentration
    #[serde(default)]
    pub concentration: Option<String>,
    /// Solvent to prepare it in
    #[serde(default)]
    pub solvent: Option<String>,
}

/// A lab request: resources asked for one lab session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Request id
    pub id: RequestId,
    /// Human-friendly sequential number
    pub number: i64,
    /// User who asked
    pub requestant: UserId,
    /// Staff member handling it
    #[serde(default)]
    pub assigned: Option<UserId>,
    /// Current status
    pub status: RequestStatus,
    /// Creation time; the expiration clock starts here
    pub creation_date: DateTime<Utc>,
    /// Date of the lab session
    pub usage_date: DateTime<Utc>,
    /// Equipment lines
    #[serde(default)]
    pub equipments: Vec<LineItem<u32>>,
    /// Material lines
    #[serde(default)]
    pub materials: Vec<LineItem<u32>>,
    /// Reactive lines
    #[serde(default)]
    pub reactives: Vec<ReactiveLine>,
    /// Conversation thread attached to the request
    #[serde(default)]
    pub conversation: Option<ConversationId>,
    /// Free-form notes from the requester
    #[serde(default)]
    pub observations: Option<String>,
    /// Why the request was rejected
    #[serde(default)]
    pub rejection_reason: Option<String>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete state
    #[serde(default)]
    pub deletion: Deletion,
    /// Optimistic concurrency version, bumped by every successful save
    #[serde(default)]
    pub version: i64,
}

impl Request {
    /// Lines grouped for the availability checker.
    #[must_use]
    pub fn availability_query(&self) -> AvailabilityQuery {
        lines_query(&self.equipments, &self.materials, &self.reactives)
    }

    /// Whether `creation_date + ttl` lies strictly before `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl_seconds: i64) -> bool {
        self.creation_date + Duration::seconds(ttl_seconds) < now
    }

    /// Whether the expiration check would reject this request now.
    ///
    /// Only live, non-terminal requests expire.
    #[must_use]
    pub fn should_expire(&self, now: DateTime<Utc>, ttl_seconds: i64) -> bool {
        self.deletion.is_active() && !self.status.is_terminal() && self.is_expired(now, ttl_seconds)
    }

    /// Apply the expiration rule.
    ///
    /// Returns the request unchanged when it should not expire, or the
    /// rejected request and `true` when it did.
    #[must_use]
    pub fn reconcile_expiration(mut self, now: DateTime<Utc>, ttl_seconds: i64) -> (Self, bool) {
        if !self.should_expire(now, ttl_seconds) {
            return (self, false);
        }
        self.status = RequestStatus::Rejected;
        self.rejection_reason = Some(EXPIRED_REASON.to_string());
        self.updated_at = now;
        (self, true)
    }
}

/// Payload for creating a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRequest {
    /// Date of the lab session
    pub usage_date: DateTime<Utc>,
    /// Equipment lines
    #[serde(default)]
    pub equipments: Vec<LineItem<u32>>,
    /// Material lines
    #[serde(default)]
    pub materials: Vec<LineItem<u32>>,
    /// Reactive lines
    #[serde(default)]
    pub reactives: Vec<ReactiveLine>,
    /// Free-form notes
    #[serde(default)]
    pub observations: Option<String>,
}

impl NewRequest {
    /// Lines grouped for the availability checker.
    #[must_use]
    pub fn availability_query(&self) -> AvailabilityQuery {
        lines_query(&self.equipments, &self.materials, &self.reactives)
    }
}

/// Partial update of a request. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestPatch {
    /// New session date
    #[serde(default)]
    pub usage_date: Option<DateTime<Utc>>,
    /// Replacement equipment lines
    #[serde(default)]
    pub equipments: Option<Vec<LineItem<u32>>>,
    /// Replacement material lines
    #[serde(default)]
    pub materials: Option<Vec<LineItem<u32>>>,
    /// Replacement reactive lines
    #[serde(default)]
    pub reactives: Option<Vec<ReactiveLine>>,
    /// Replacement notes
    #[serde(default)]
    pub observations: Option<String>,
}

impl RequestPatch {
    /// `request` with this patch applied.
    #[must_use]
    pub fn merged_into(self, mut request: Request) -> Request {
        if let Some(usage_date) = self.usage_date {
            request.usage_date = usage_date;
        }
        if let Some(equipments) = self.equipments {
            request.equipments = equipments;
        }
        if let Some(materials) = self.materials {
            request.materials = materials;
        }
        if let Some(reactives) = self.reactives {
            request.reactives = reactives;
        }
        if let Some(observations) = self.observations {
            request.observations = Some(observations);
        }
        request
    }
}

fn lines_query(
    equipments: &[LineItem<u32>],
    materials: &[LineItem<u32>],
    reactives: &[ReactiveLine],
) -> AvailabilityQuery {
    AvailabilityQuery {
        equipments: equipments.to_vec(),
        materials: materials.to_vec(),
        reactives: reactives
            .iter()
            .map(|line| LineItem::new(line.id, line.amount))
            .collect(),
    }
}

/// Reject lines that ask for nothing (or for a non-finite reactive amount).
///
/// # Errors
///
/// [`LabError::Validation`] naming the first offending line.
pub fn validate_amounts(query: &AvailabilityQuery) -> Result<(), LabError> {
    if let Some(line) = query.equipments.iter().find(|line| line.amount == 0) {
        return Err(LabError::Validation(format!(
            "Equipment {} amount must be greater than zero",
            line.id
        )));
    }
    if let Some(line) = query.materials.iter().find(|line| line.amount == 0) {
        return Err(LabError::Validation(format!(
            "Material {} amount must be greater than zero",
            line.id
        )));
    }
    if let Some(line) = query
        .reactives
        .iter()
        .find(|line| !line.amount.is_finite() || line.amount <= 0.0)
    {
        return Err(LabError::Validation(format!(
            "Reactive {} amount must be a positive number",
            line.id
        )));
    }
    Ok(())
}

/// State the request reducer works on.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState {
    /// The request being changed
    pub request: Request,
    /// Rejection produced by the last action, if any
    pub last_error: Option<LabError>,
}

impl RequestState {
    /// Wrap a loaded request.
    #[must_use]
    pub const fn new(request: Request) -> Self {
        Self {
            request,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labdesk_testing::epoch;

    const WEEK: i64 = 7 * 86_400;

    fn request(status: RequestStatus) -> Request {
        Request {
            id: RequestId::new(),
            number: 1,
            requestant: UserId::new(),
            assigned: None,
            status,
            creation_date: epoch(),
            usage_date: epoch() + Duration::days(3),
            equipments: vec![LineItem::new(StockItemId::new(), 1)],
            materials: Vec::new(),
            reactives: Vec::new(),
            conversation: None,
            observations: None,
            rejection_reason: None,
            updated_at: epoch(),
            deletion: Deletion::Active,
            version: 0,
        }
    }

    #[test]
    fn terminal_predicates_mean_what_they_say() {
        assert!(RequestStatus::Completed.is_completed());
        assert!(!RequestStatus::Pending.is_completed());
        assert!(RequestStatus::Rejected.is_rejected());
        assert!(!RequestStatus::Approved.is_rejected());
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::Approved.is_terminal());
    }

    #[test]
    fn expiry_is_strict() {
        let req = request(RequestStatus::Pending);
        assert!(!req.is_expired(epoch() + Duration::seconds(WEEK), WEEK));
        assert!(req.is_expired(epoch() + Duration::seconds(WEEK + 1), WEEK));
    }

    #[test]
    fn reconcile_rejects_old_pending_request() {
        let now = epoch() + Duration::days(8);
        let (req, expired) = request(RequestStatus::Pending).reconcile_expiration(now, WEEK);

        assert!(expired);
        assert_eq!(req.status, RequestStatus::Rejected);
        assert_eq!(req.rejection_reason.as_deref(), Some(EXPIRED_REASON));
        assert_eq!(req.updated_at, now);
    }

    #[test]
    fn reconcile_leaves_terminal_requests_alone() {
        let now = epoch() + Duration::days(365);
        for status in [RequestStatus::Completed, RequestStatus::Rejected] {
            let original = request(status);
            let (req, expired) = original.clone().reconcile_expiration(now, WEEK);
            assert!(!expired);
            assert_eq!(req, original);
        }
    }

    #[test]
    fn reconcile_leaves_deleted_requests_alone() {
        let mut original = request(RequestStatus::Pending);
        original.deletion = Deletion::Deleted {
            by: UserId::new(),
            at: epoch(),
        };

        let (_, expired) = original.reconcile_expiration(epoch() + Duration::days(30), WEEK);
        assert!(!expired);
    }

    #[test]
    fn patch_keeps_absent_fields() {
        let original = request(RequestStatus::Pending);
        let material = LineItem::new(StockItemId::new(), 3);
        let patch = RequestPatch {
            materials: Some(vec![material]),
            ..RequestPatch::default()
        };

        let merged = patch.merged_into(original.clone());
        assert_eq!(merged.equipments, original.equipments);
        assert_eq!(merged.materials, vec![material]);
        assert_eq!(merged.usage_date, original.usage_date);
    }

    #[test]
    fn zero_amounts_are_rejected() {
        let query = AvailabilityQuery {
            equipments: vec![LineItem::new(StockItemId::new(), 0)],
            ..AvailabilityQuery::default()
        };
        assert!(matches!(
            validate_amounts(&query),
            Err(LabError::Validation(_))
        ));

        let nan = AvailabilityQuery {
            reactives: vec![LineItem::new(StockItemId::new(), f64::NAN)],
            ..AvailabilityQuery::default()
        };
        assert!(validate_amounts(&nan).is_err());
    }

    #[test]
    fn status_serializes_upper_case() {
        let json = serde_json::to_value(RequestStatus::Pending).unwrap_or_default();
        assert_eq!(json, serde_json::json!("PENDING"));
    }
}
