use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Policy governing whether a package is derived for a session.
///
/// `Propose` and `Auto` both require explicit per-item approval before
/// execution; `Auto` only changes the default stamped onto descendant
/// follow-up sessions (which is forced back to `Propose` on creation).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    None,
    Propose,
    Auto,
}

impl ResolutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Propose => "propose",
            Self::Auto => "auto",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "none" => Some(Self::None),
            "propose" => Some(Self::Propose),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Approved,
    Rejected,
    Created,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Mission,
    FollowUp,
    Document,
    Crm,
    Event,
    Quote,
    Project,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrmKind {
    Company,
    Contact,
    Deal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrmAction {
    Create,
    Update,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CrmDetails {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.phone.is_none()
            && self.website.is_none()
            && self.amount.is_none()
            && self.stage.is_none()
            && self.notes.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MissionData {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mission_refs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FollowUpData {
    pub title: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub agenda: Vec<String>,
    #[serde(default)]
    pub participant_ids: Vec<String>,
    #[serde(default)]
    pub unresolved: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentData {
    pub doc_type: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub agent_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrmItemData {
    pub kind: CrmKind,
    pub action: CrmAction,
    pub name: String,
    #[serde(default)]
    pub details: CrmDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub starts_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub attendee_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteLineData {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteData {
    pub customer_name: String,
    #[serde(default)]
    pub description: String,
    pub lines: Vec<QuoteLineData>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectData {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mission_ids: Vec<String>,
}

/// Type-specific payload of a resolution item.
///
/// Serializes as `{"type": "...", "data": {...}}`, which is also the wire
/// shape the derivation model is asked to produce.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ItemData {
    Mission(MissionData),
    FollowUp(FollowUpData),
    Document(DocumentData),
    Crm(CrmItemData),
    Event(EventData),
    Quote(QuoteData),
    Project(ProjectData),
}

impl ItemData {
    pub fn item_type(&self) -> ItemType {
        match self {
            Self::Mission(_) => ItemType::Mission,
            Self::FollowUp(_) => ItemType::FollowUp,
            Self::Document(_) => ItemType::Document,
            Self::Crm(_) => ItemType::Crm,
            Self::Event(_) => ItemType::Event,
            Self::Quote(_) => ItemType::Quote,
            Self::Project(_) => ItemType::Project,
        }
    }
}

/// One proposed action within a package.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolutionItem {
    pub id: String,
    pub status: ItemStatus,
    #[serde(flatten)]
    pub data: ItemData,
    #[serde(default)]
    pub source_excerpt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResolutionItem {
    pub fn pending(id: impl Into<String>, data: ItemData, source_excerpt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Pending,
            data,
            source_excerpt: source_excerpt.into(),
            created_id: None,
            error: None,
        }
    }

    pub fn item_type(&self) -> ItemType {
        self.data.item_type()
    }
}

/// The set of proposed actions derived from one closed session.
///
/// Item order is significant: it is the execution order and the only
/// mechanism for resolving same-batch references (a `project` item may
/// name `mission` items created earlier in the same pass).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolutionPackage {
    pub id: String,
    pub session_id: String,
    pub mode: ResolutionMode,
    pub items: Vec<ResolutionItem>,
}

impl ResolutionPackage {
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        mode: ResolutionMode,
        items: Vec<ResolutionItem>,
    ) -> Self {
        Self { id: id.into(), session_id: session_id.into(), mode, items }
    }

    pub fn item(&self, item_id: &str) -> Option<&ResolutionItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    fn item_mut(&mut self, item_id: &str) -> Result<&mut ResolutionItem, DomainError> {
        self.items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| DomainError::ItemNotFound(item_id.to_string()))
    }

    /// Ids of items eligible for execution, in package order.
    pub fn approved_item_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Approved)
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn approve(&mut self, item_id: &str) -> Result<(), DomainError> {
        self.transition(item_id, ItemStatus::Approved)
    }

    pub fn reject(&mut self, item_id: &str) -> Result<(), DomainError> {
        self.transition(item_id, ItemStatus::Rejected)
    }

    /// Approves every pending item and returns their ids in package order.
    pub fn approve_all_pending(&mut self) -> Vec<String> {
        let mut approved = Vec::new();
        for item in &mut self.items {
            if item.status == ItemStatus::Pending {
                item.status = ItemStatus::Approved;
                approved.push(item.id.clone());
            }
        }
        approved
    }

    /// Records a successful execution: `Approved -> Created`, sets the
    /// created entity id and clears any prior failure message.
    pub fn mark_created(
        &mut self,
        item_id: &str,
        created_id: impl Into<String>,
    ) -> Result<(), DomainError> {
        let item = self.item_mut(item_id)?;
        if item.status != ItemStatus::Approved {
            return Err(DomainError::InvalidItemTransition {
                item_id: item_id.to_string(),
                from: item.status,
                to: ItemStatus::Created,
            });
        }
        item.status = ItemStatus::Created;
        item.created_id = Some(created_id.into());
        item.error = None;
        Ok(())
    }

    /// Records a failed execution. Status stays `Approved` so a later
    /// re-run retries just this item.
    pub fn mark_failed(&mut self, item_id: &str, message: impl Into<String>) -> Result<(), DomainError> {
        let item = self.item_mut(item_id)?;
        item.error = Some(message.into());
        Ok(())
    }

    fn transition(&mut self, item_id: &str, to: ItemStatus) -> Result<(), DomainError> {
        let item = self.item_mut(item_id)?;
        if item.status != ItemStatus::Pending {
            return Err(DomainError::InvalidItemTransition {
                item_id: item_id.to_string(),
                from: item.status,
                to,
            });
        }
        item.status = to;
        Ok(())
    }

    /// Structural invariants: unique item ids, and `created_id` populated
    /// if and only if the item has reached `Created`.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut seen = std::collections::HashSet::new();
        for item in &self.items {
            if !seen.insert(item.id.as_str()) {
                return Err(DomainError::InvariantViolation(format!(
                    "duplicate item id `{}`",
                    item.id
                )));
            }
            let created = item.status == ItemStatus::Created;
            if created != item.created_id.is_some() {
                return Err(DomainError::InvariantViolation(format!(
                    "item `{}` has status {:?} but created_id {:?}",
                    item.id, item.status, item.created_id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mission_item(id: &str) -> ResolutionItem {
        ResolutionItem::pending(
            id,
            ItemData::Mission(MissionData {
                title: "Prepare onboarding runbook".to_string(),
                description: "Draft the runbook discussed in the session".to_string(),
                agent_id: "agent-ops".to_string(),
                priority: "high".to_string(),
                scheduled_at: None,
                mission_refs: Vec::new(),
            }),
            "we should write this down as a runbook",
        )
    }

    fn package(items: Vec<ResolutionItem>) -> ResolutionPackage {
        ResolutionPackage::new("pkg-1", "sess-1", ResolutionMode::Propose, items)
    }

    #[test]
    fn approve_moves_pending_item_to_approved() {
        let mut pkg = package(vec![mission_item("m1")]);
        pkg.approve("m1").expect("approve pending item");
        assert_eq!(pkg.item("m1").unwrap().status, ItemStatus::Approved);
    }

    #[test]
    fn approve_rejects_non_pending_item() {
        let mut pkg = package(vec![mission_item("m1")]);
        pkg.reject("m1").expect("reject pending item");

        let error = pkg.approve("m1").expect_err("rejected item cannot be approved");
        assert!(matches!(error, DomainError::InvalidItemTransition { .. }));
    }

    #[test]
    fn approve_all_pending_skips_already_decided_items() {
        let mut pkg = package(vec![mission_item("m1"), mission_item("m2"), mission_item("m3")]);
        pkg.reject("m2").expect("reject m2");

        let approved = pkg.approve_all_pending();

        assert_eq!(approved, vec!["m1".to_string(), "m3".to_string()]);
        assert_eq!(pkg.item("m2").unwrap().status, ItemStatus::Rejected);
    }

    #[test]
    fn mark_created_sets_created_id_and_clears_error() {
        let mut pkg = package(vec![mission_item("m1")]);
        pkg.approve("m1").unwrap();
        pkg.mark_failed("m1", "roster unavailable").unwrap();

        pkg.mark_created("m1", "mission-42").expect("mark created");

        let item = pkg.item("m1").unwrap();
        assert_eq!(item.status, ItemStatus::Created);
        assert_eq!(item.created_id.as_deref(), Some("mission-42"));
        assert_eq!(item.error, None);
    }

    #[test]
    fn mark_created_requires_approved_status() {
        let mut pkg = package(vec![mission_item("m1")]);
        let error = pkg.mark_created("m1", "mission-42").expect_err("pending item");
        assert!(matches!(error, DomainError::InvalidItemTransition { .. }));
    }

    #[test]
    fn mark_failed_keeps_item_approved_for_retry() {
        let mut pkg = package(vec![mission_item("m1")]);
        pkg.approve("m1").unwrap();
        pkg.mark_failed("m1", "pipeline not configured").unwrap();

        let item = pkg.item("m1").unwrap();
        assert_eq!(item.status, ItemStatus::Approved);
        assert_eq!(item.error.as_deref(), Some("pipeline not configured"));
        assert_eq!(pkg.approved_item_ids(), vec!["m1".to_string()]);
    }

    #[test]
    fn validate_rejects_duplicate_item_ids() {
        let pkg = package(vec![mission_item("m1"), mission_item("m1")]);
        let error = pkg.validate().expect_err("duplicate ids");
        assert!(matches!(error, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn validate_requires_created_id_exactly_when_created() {
        let mut pkg = package(vec![mission_item("m1")]);
        pkg.approve("m1").unwrap();
        pkg.mark_created("m1", "mission-7").unwrap();
        pkg.validate().expect("created item with created_id is valid");

        pkg.items[0].created_id = None;
        assert!(pkg.validate().is_err());
    }

    #[test]
    fn item_serializes_with_type_and_data_shape() {
        let item = mission_item("m1");
        let value = serde_json::to_value(&item).expect("serialize item");

        assert_eq!(value["type"], "mission");
        assert_eq!(value["data"]["title"], "Prepare onboarding runbook");
        assert_eq!(value["status"], "pending");
    }
}
