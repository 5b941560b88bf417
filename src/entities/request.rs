//! Service request adapter.

use crate::error::Result;
use crate::stats::StatsProjector;
use crate::transform::{
    project_row, str_field, ts_field, FieldDefault, FieldSpec, RowTransform,
};
use crate::types::{row_id, EntityId, RawRow, Timestamp, ViewEntity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EntityAdapter;

const FIELDS: &[FieldSpec] = &[
    FieldSpec {
        target: "title",
        sources: &["title", "summary"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "status",
        sources: &["status"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "priority",
        sources: &["priority"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "site_id",
        sources: &["site_id"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "zone",
        sources: &["zones.name", "zone_name"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "assignee_id",
        sources: &["assignee_id", "assigned_to"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "created_at",
        sources: &["created_at", "inserted_at"],
        default: FieldDefault::Null,
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Open,
    InProgress,
    Done,
    Cancelled,
}

impl RequestStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "in_progress" => RequestStatus::InProgress,
            "done" | "completed" => RequestStatus::Done,
            "cancelled" | "canceled" => RequestStatus::Cancelled,
            _ => RequestStatus::Open,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "open",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Done => "done",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

/// A maintenance or service request raised against a site zone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: EntityId,
    pub title: String,
    pub status: RequestStatus,
    pub priority: String,
    pub site_id: String,
    pub zone: String,
    pub assignee_id: String,
    pub created_at: Timestamp,
}

impl ViewEntity for ServiceRequest {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn recency_key(&self) -> Timestamp {
        self.created_at
    }

    fn field(&self, column: &str) -> Option<Value> {
        match column {
            "id" => Some(Value::String(self.id.0.clone())),
            "title" => Some(Value::String(self.title.clone())),
            "status" => Some(Value::String(self.status.as_str().to_string())),
            "priority" => Some(Value::String(self.priority.clone())),
            "site_id" => Some(Value::String(self.site_id.clone())),
            "zone" => Some(Value::String(self.zone.clone())),
            "assignee_id" => Some(Value::String(self.assignee_id.clone())),
            "created_at" => Some(Value::from(self.created_at.0)),
            _ => None,
        }
    }
}

/// Counts by status over the visible requests.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestStats {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub done: usize,
    pub cancelled: usize,
}

pub struct RequestAdapter;

impl RowTransform for RequestAdapter {
    type Entity = ServiceRequest;

    fn transform(&self, row: &RawRow) -> Result<ServiceRequest> {
        let id = row_id(row)?;
        let fields = project_row(row, FIELDS);
        Ok(ServiceRequest {
            id,
            title: str_field(&fields, "title"),
            status: RequestStatus::parse(&str_field(&fields, "status")),
            priority: str_field(&fields, "priority"),
            site_id: str_field(&fields, "site_id"),
            zone: str_field(&fields, "zone"),
            assignee_id: str_field(&fields, "assignee_id"),
            created_at: ts_field(&fields, "created_at").unwrap_or_default(),
        })
    }
}

impl StatsProjector<ServiceRequest> for RequestAdapter {
    type Stats = RequestStats;

    fn project(&self, entities: &[ServiceRequest]) -> RequestStats {
        let mut stats = RequestStats {
            total: entities.len(),
            ..Default::default()
        };
        for request in entities {
            match request.status {
                RequestStatus::Open => stats.open += 1,
                RequestStatus::InProgress => stats.in_progress += 1,
                RequestStatus::Done => stats.done += 1,
                RequestStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}

impl EntityAdapter for RequestAdapter {
    fn table(&self) -> &'static str {
        "requests"
    }

    fn capacity(&self) -> usize {
        100
    }
}
