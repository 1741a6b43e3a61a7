//! Applies a [`ReconcileDiff`] write-by-write (failure semantics).

use diesel::{Connection, SqliteConnection};

use crate::models::NewSalesRecordRow;
use crate::repo;

use super::diff::ReconcileDiff;

/// How many writes of each kind landed, and how many failed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyStats {
    pub inserted: usize,
    pub updated: usize,
    pub sold: usize,
    pub failures: usize,
}

/// Persist the diff. Each vehicle's write stands alone so a failure is
/// logged, counted, and skipped; the run carries on with the next row. A sold
/// transition pairs the status flip with its sales record in one immediate
/// transaction, since a flipped row without a record would silently lose the
/// sale.
pub fn apply_diff(conn: &mut SqliteConnection, diff: &ReconcileDiff) -> ApplyStats {
    let mut stats = ApplyStats::default();

    for row in &diff.inserts {
        match repo::upsert_vehicle_active(conn, row) {
            Ok(_) => stats.inserted += 1,
            Err(e) => {
                tracing::error!(identifier = %row.identifier, error = %e, "vehicle insert failed");
                stats.failures += 1;
            }
        }
    }

    for row in &diff.updates {
        match repo::replace_vehicle_row(conn, row) {
            Ok(()) => stats.updated += 1,
            Err(e) => {
                tracing::error!(identifier = %row.identifier, error = %e, "vehicle update failed");
                stats.failures += 1;
            }
        }
    }

    for transition in &diff.sold {
        let record = NewSalesRecordRow {
            tenant_id: transition.tenant_id.clone(),
            identifier: transition.identifier.clone(),
            year: transition.year,
            make: transition.make.clone(),
            model: transition.model.clone(),
            sale_price: transition.sale_price,
            sale_date: transition.sale_date.clone(),
            days_to_sale: transition.days_to_sale,
            acquisition_cost: None,
            gross_profit: None,
            margin_percent: None,
        };

        let result = conn.immediate_transaction::<_, crate::repo::RepoError, _>(|tx| {
            repo::mark_sold(tx, transition.id)?;
            repo::insert_sales_record(tx, &record)?;
            Ok(())
        });

        match result {
            Ok(()) => stats.sold += 1,
            Err(e) => {
                tracing::error!(identifier = %transition.identifier, error = %e, "sold transition failed");
                stats.failures += 1;
            }
        }
    }

    stats
}
