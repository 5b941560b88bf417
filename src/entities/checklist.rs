//! Checklist run adapter.

use crate::error::Result;
use crate::stats::{mean, StatsProjector};
use crate::transform::{
    f64_field, i64_field, project_row, str_field, ts_field, FieldDefault, FieldSpec, RowTransform,
};
use crate::types::{row_id, EntityId, RawRow, Timestamp, ViewEntity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EntityAdapter;

const FIELDS: &[FieldSpec] = &[
    FieldSpec {
        target: "checklist",
        sources: &["checklists.name", "checklist_name"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "site_id",
        sources: &["site_id"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "status",
        sources: &["status"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "progress_pct",
        sources: &["progress_pct", "progress"],
        default: FieldDefault::Zero,
    },
    FieldSpec {
        target: "completed_items",
        sources: &["completed_items"],
        default: FieldDefault::Zero,
    },
    FieldSpec {
        target: "total_items",
        sources: &["total_items", "items_count"],
        default: FieldDefault::Zero,
    },
    FieldSpec {
        target: "scheduled_for",
        sources: &["scheduled_for", "created_at"],
        default: FieldDefault::Null,
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
}

impl RunStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "running" | "in_progress" => RunStatus::Running,
            "completed" | "done" => RunStatus::Completed,
            _ => RunStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
        }
    }
}

/// One scheduled execution of a checklist at a site.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChecklistRun {
    pub id: EntityId,
    pub checklist: String,
    pub site_id: String,
    pub status: RunStatus,
    pub progress_pct: f64,
    pub completed_items: i64,
    pub total_items: i64,
    pub scheduled_for: Timestamp,
}

impl ViewEntity for ChecklistRun {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn recency_key(&self) -> Timestamp {
        self.scheduled_for
    }

    fn field(&self, column: &str) -> Option<Value> {
        match column {
            "id" => Some(Value::String(self.id.0.clone())),
            "checklist" => Some(Value::String(self.checklist.clone())),
            "site_id" => Some(Value::String(self.site_id.clone())),
            "status" => Some(Value::String(self.status.as_str().to_string())),
            "scheduled_for" => Some(Value::from(self.scheduled_for.0)),
            _ => None,
        }
    }
}

/// Counts by status plus mean progress over the visible runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChecklistStats {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub avg_progress: f64,
}

pub struct ChecklistAdapter;

impl RowTransform for ChecklistAdapter {
    type Entity = ChecklistRun;

    fn transform(&self, row: &RawRow) -> Result<ChecklistRun> {
        let id = row_id(row)?;
        let fields = project_row(row, FIELDS);
        Ok(ChecklistRun {
            id,
            checklist: str_field(&fields, "checklist"),
            site_id: str_field(&fields, "site_id"),
            status: RunStatus::parse(&str_field(&fields, "status")),
            progress_pct: f64_field(&fields, "progress_pct"),
            completed_items: i64_field(&fields, "completed_items"),
            total_items: i64_field(&fields, "total_items"),
            scheduled_for: ts_field(&fields, "scheduled_for").unwrap_or_default(),
        })
    }
}

impl StatsProjector<ChecklistRun> for ChecklistAdapter {
    type Stats = ChecklistStats;

    fn project(&self, entities: &[ChecklistRun]) -> ChecklistStats {
        let mut stats = ChecklistStats {
            total: entities.len(),
            avg_progress: mean(entities.iter().map(|run| run.progress_pct)),
            ..Default::default()
        };
        for run in entities {
            match run.status {
                RunStatus::Pending => stats.pending += 1,
                RunStatus::Running => stats.running += 1,
                RunStatus::Completed => stats.completed += 1,
            }
        }
        stats
    }
}

impl EntityAdapter for ChecklistAdapter {
    fn table(&self) -> &'static str {
        "checklist_runs"
    }

    fn capacity(&self) -> usize {
        100
    }
}
