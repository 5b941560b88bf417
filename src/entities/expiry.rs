//! Expiry report adapter.

use crate::error::Result;
use crate::stats::StatsProjector;
use crate::transform::{
    f64_field, project_row, str_field, ts_field, FieldDefault, FieldSpec, RowTransform,
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
        target: "product",
        sources: &["products.name", "product_name"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "quantity",
        sources: &["quantity", "qty"],
        default: FieldDefault::Zero,
    },
    FieldSpec {
        target: "status",
        sources: &["status"],
        default: FieldDefault::EmptyString,
    },
    FieldSpec {
        target: "expires_at",
        sources: &["expires_at", "expiry_date"],
        default: FieldDefault::Null,
    },
    FieldSpec {
        target: "reported_at",
        sources: &["reported_at", "created_at"],
        default: FieldDefault::Null,
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Fresh,
    Expiring,
    Expired,
}

impl ExpiryStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "expiring" | "warning" => ExpiryStatus::Expiring,
            "expired" => ExpiryStatus::Expired,
            _ => ExpiryStatus::Fresh,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryStatus::Fresh => "fresh",
            ExpiryStatus::Expiring => "expiring",
            ExpiryStatus::Expired => "expired",
        }
    }
}

/// A product batch flagged for expiry tracking at a site.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpiryReport {
    pub id: EntityId,
    pub site_id: String,
    pub product: String,
    pub quantity: f64,
    pub status: ExpiryStatus,
    pub expires_at: Timestamp,
    pub reported_at: Timestamp,
}

impl ViewEntity for ExpiryReport {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn recency_key(&self) -> Timestamp {
        self.reported_at
    }

    fn field(&self, column: &str) -> Option<Value> {
        match column {
            "id" => Some(Value::String(self.id.0.clone())),
            "site_id" => Some(Value::String(self.site_id.clone())),
            "product" => Some(Value::String(self.product.clone())),
            "status" => Some(Value::String(self.status.as_str().to_string())),
            "expires_at" => Some(Value::from(self.expires_at.0)),
            "reported_at" => Some(Value::from(self.reported_at.0)),
            _ => None,
        }
    }
}

/// Urgency buckets plus total flagged quantity over the visible reports.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpiryStats {
    pub total: usize,
    pub fresh: usize,
    pub expiring: usize,
    pub expired: usize,
    pub total_quantity: f64,
}

pub struct ExpiryAdapter;

impl RowTransform for ExpiryAdapter {
    type Entity = ExpiryReport;

    fn transform(&self, row: &RawRow) -> Result<ExpiryReport> {
        let id = row_id(row)?;
        let fields = project_row(row, FIELDS);
        Ok(ExpiryReport {
            id,
            site_id: str_field(&fields, "site_id"),
            product: str_field(&fields, "product"),
            quantity: f64_field(&fields, "quantity"),
            status: ExpiryStatus::parse(&str_field(&fields, "status")),
            expires_at: ts_field(&fields, "expires_at").unwrap_or_default(),
            reported_at: ts_field(&fields, "reported_at").unwrap_or_default(),
        })
    }
}

impl StatsProjector<ExpiryReport> for ExpiryAdapter {
    type Stats = ExpiryStats;

    fn project(&self, entities: &[ExpiryReport]) -> ExpiryStats {
        let mut stats = ExpiryStats {
            total: entities.len(),
            ..Default::default()
        };
        for report in entities {
            match report.status {
                ExpiryStatus::Fresh => stats.fresh += 1,
                ExpiryStatus::Expiring => stats.expiring += 1,
                ExpiryStatus::Expired => stats.expired += 1,
            }
            stats.total_quantity += report.quantity;
        }
        stats
    }
}

impl EntityAdapter for ExpiryAdapter {
    fn table(&self) -> &'static str {
        "expiry_reports"
    }

    fn capacity(&self) -> usize {
        500
    }
}
