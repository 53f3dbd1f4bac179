//! Read-side session report built from a [`SessionTally`].

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::aggregator::{CountedItem, SessionTally};
use crate::types::{CountSession, SessionStatus};

/// One line of a count report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportLine {
    pub key: String,
    pub name: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub unit: Option<String>,
    pub quantity: i64,
    /// True when no product is known for the item.
    pub unknown: bool,
}

/// Visible items of a session, sorted for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionReport {
    pub session_id: String,
    pub title: String,
    pub status: SessionStatus,
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
    pub lines: Vec<ReportLine>,
    pub total_items: usize,
    pub total_quantity: i64,
    pub total_scans: usize,
}

impl SessionReport {
    /// Known products by name, then unknown barcodes by barcode.
    pub fn build(session: &CountSession, tally: &SessionTally) -> Self {
        let mut lines: Vec<ReportLine> = tally.visible().map(line_for).collect();
        lines.sort_by(|a, b| match (a.unknown, b.unknown) {
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            _ => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.key.cmp(&b.key)),
        });

        SessionReport {
            session_id: session.id.clone(),
            title: session.title.clone(),
            status: session.status,
            generated_at: Utc::now(),
            total_items: lines.len(),
            total_quantity: lines.iter().map(|l| l.quantity).sum(),
            total_scans: tally.total_scans,
            lines,
        }
    }
}

fn line_for(item: &CountedItem) -> ReportLine {
    ReportLine {
        key: item.key.clone(),
        name: item.display_name().to_string(),
        sku: item.product.as_ref().and_then(|p| p.sku.clone()),
        barcode: item
            .barcode
            .clone()
            .or_else(|| item.product.as_ref().and_then(|p| p.barcode.clone())),
        unit: item.product.as_ref().map(|p| p.unit.clone()),
        quantity: item.quantity,
        unknown: item.product.is_none(),
    }
}
