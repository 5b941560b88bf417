//! Inventory count adapter.

use crate::error::Result;
use crate::stats::StatsProjector;
use crate::transform::{
    f64_field, i64_field, project_row, str_field, ts_field, FieldDefault, FieldSpec, RowTransform,
};
use crate::types::{row_id, EntityId, RawRow, Timestamp, ViewEntity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EntityAdapter;

const FIELDS: &[FieldSpec] = &[
    FieldSpec {
        target: "site_id",
        sources: &["site_id"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "location",
        sources: &["locations.name", "location_name"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "status",
        sources: &["status"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "counted_items",
        sources: &["counted_items"],
        default: FieldDefault::Zero,
    },
    FieldSpec {
        target: "expected_items",
        sources: &["expected_items"],
        default: FieldDefault::Zero,
    },
    FieldSpec {
        target: "variance",
        sources: &["variance"],
        default: FieldDefault::Zero,
    },
    FieldSpec {
        target: "counted_at",
        sources: &["counted_at", "created_at"],
        default: FieldDefault::Null,
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountStatus {
    Draft,
    InProgress,
    Finalized,
}

impl CountStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "in_progress" => CountStatus::InProgress,
            "finalized" | "completed" => CountStatus::Finalized,
            _ => CountStatus::Draft,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CountStatus::Draft => "draft",
            CountStatus::InProgress => "in_progress",
            CountStatus::Finalized => "finalized",
        }
    }
}

/// A stock count session for one storage location.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InventoryCount {
    pub id: EntityId,
    pub site_id: String,
    pub location: String,
    pub status: CountStatus,
    pub counted_items: i64,
    pub expected_items: i64,
    pub variance: f64,
    pub counted_at: Timestamp,
}

impl ViewEntity for InventoryCount {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn recency_key(&self) -> Timestamp {
        self.counted_at
    }

    fn field(&self, column: &str) -> Option<Value> {
        match column {
            "id" => Some(Value::String(self.id.0.clone())),
            "site_id" => Some(Value::String(self.site_id.clone())),
            "location" => Some(Value::String(self.location.clone())),
            "status" => Some(Value::String(self.status.as_str().to_string())),
            "counted_at" => Some(Value::from(self.counted_at.0)),
            _ => None,
        }
    }
}

/// Counts by status plus variance totals over the visible count sessions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryStats {
    pub total: usize,
    pub draft: usize,
    pub in_progress: usize,
    pub finalized: usize,
    pub items_counted: i64,
    pub total_variance: f64,
}

pub struct InventoryAdapter;

impl RowTransform for InventoryAdapter {
    type Entity = InventoryCount;

    fn transform(&self, row: &RawRow) -> Result<InventoryCount> {
        let id = row_id(row)?;
        let fields = project_row(row, FIELDS);
        Ok(InventoryCount {
            id,
            site_id: str_field(&fields, "site_id"),
            location: str_field(&fields, "location"),
            status: CountStatus::parse(&str_field(&fields, "status")),
            counted_items: i64_field(&fields, "counted_items"),
            expected_items: i64_field(&fields, "expected_items"),
            variance: f64_field(&fields, "variance"),
            counted_at: ts_field(&fields, "counted_at").unwrap_or_default(),
        })
    }
}

impl StatsProjector<InventoryCount> for InventoryAdapter {
    type Stats = InventoryStats;

    fn project(&self, entities: &[InventoryCount]) -> InventoryStats {
        let mut stats = InventoryStats {
            total: entities.len(),
            ..Default::default()
        };
        for count in entities {
            match count.status {
                CountStatus::Draft => stats.draft += 1,
                CountStatus::InProgress => stats.in_progress += 1,
                CountStatus::Finalized => stats.finalized += 1,
            }
            stats.items_counted += count.counted_items;
            stats.total_variance += count.variance;
        }
        stats
    }
}

impl EntityAdapter for InventoryAdapter {
    fn table(&self) -> &'static str {
        "inventory_counts"
    }

    fn capacity(&self) -> usize {
        500
    }
}
