//! Award reconciliation: brings award rows back in line with their transactions.

use std::time::Instant;

use sea_orm::{ConnectionTrait, DatabaseConnection, Statement, TransactionTrait};
use tracing::info;

use crate::error::AppResult;
use crate::lookups::award_types::AwardKind;

/// Awards touched per UPDATE statement.
pub(crate) const ID_CHUNK: usize = 1_000;

const STALE_AWARDS_SQL: &str = "\
SELECT CAST(aw.id AS BIGINT) AS id FROM awards AS aw \
WHERE (aw.certified_date IS NULL AND aw.latest_transaction_id IS NOT NULL) \
OR aw.certified_date != (\
SELECT txn.action_date FROM transaction_normalized AS txn \
WHERE txn.id = aw.latest_transaction_id)";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub awards_selected: usize,
    pub awards_updated: u64,
    pub categories_updated: u64,
}

pub async fn run_update_awards(db: &DatabaseConnection) -> AppResult<UpdateSummary> {
    info!("Starting updates to award data...");
    let backend = db.get_database_backend();

    let rows = db
        .query_all(Statement::from_string(backend, STALE_AWARDS_SQL))
        .await?;
    let ids = rows
        .iter()
        .map(|row| row.try_get::<i64>("", "id"))
        .collect::<Result<Vec<_>, _>>()?;
    info!(count = ids.len(), sample = ?&ids[..ids.len().min(10)], "awards to update");

    let mut summary = UpdateSummary {
        awards_selected: ids.len(),
        ..Default::default()
    };
    if ids.is_empty() {
        info!("FINISHED");
        return Ok(summary);
    }

    let txn = db.begin().await?;
    let (awards_updated, categories_updated) = recalculate_awards(&txn, &ids).await?;
    summary.awards_updated = awards_updated;
    summary.categories_updated = categories_updated;
    txn.commit().await?;
    info!("FINISHED");
    Ok(summary)
}

/// Rebuilds totals, latest transaction, certified date and category of `ids`.
/// Returns the award rows and category rows updated.
pub(crate) async fn recalculate_awards<C: ConnectionTrait>(
    conn: &C,
    ids: &[i64],
) -> AppResult<(u64, u64)> {
    let backend = conn.get_database_backend();

    let started = Instant::now();
    let mut awards_updated = 0;
    for chunk in ids.chunks(ID_CHUNK) {
        let id_list = id_list(chunk);
        let result = conn
            .execute(Statement::from_string(backend, award_totals_sql(&id_list)))
            .await?;
        awards_updated += result.rows_affected();
        conn.execute(Statement::from_string(backend, certified_date_sql(&id_list)))
            .await?;
    }
    info!(
        seconds = started.elapsed().as_secs_f64(),
        awards = awards_updated,
        "updated awards from their latest transactions"
    );

    let started = Instant::now();
    let mut categories_updated = 0;
    for chunk in ids.chunks(ID_CHUNK) {
        let result = conn
            .execute(Statement::from_string(backend, category_sql(&id_list(chunk))))
            .await?;
        categories_updated += result.rows_affected();
    }
    info!(
        seconds = started.elapsed().as_secs_f64(),
        awards = categories_updated,
        "updated award categories"
    );

    Ok((awards_updated, categories_updated))
}

pub(crate) fn id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn award_totals_sql(id_list: &str) -> String {
    format!(
        "UPDATE awards SET \
latest_transaction_id = (SELECT t.id FROM transaction_normalized AS t WHERE t.award_id = awards.id \
ORDER BY t.action_date DESC, t.id DESC LIMIT 1), \
total_obligation = (SELECT SUM(t.federal_action_obligation) FROM transaction_normalized AS t \
WHERE t.award_id = awards.id), \
period_of_performance_start_date = (SELECT MIN(t.period_of_performance_start_date) \
FROM transaction_normalized AS t WHERE t.award_id = awards.id), \
period_of_performance_current_end_date = (SELECT MAX(t.period_of_performance_current_end_date) \
FROM transaction_normalized AS t WHERE t.award_id = awards.id) \
WHERE id IN ({})",
        id_list
    )
}

fn certified_date_sql(id_list: &str) -> String {
    format!(
        "UPDATE awards SET certified_date = (SELECT t.action_date FROM transaction_normalized AS t \
WHERE t.id = awards.latest_transaction_id) WHERE id IN ({})",
        id_list
    )
}

fn category_sql(id_list: &str) -> String {
    let arms: String = [
        (AwardKind::Contract, "contract"),
        (AwardKind::Grant, "grant"),
        (AwardKind::DirectPayment, "direct payment"),
        (AwardKind::Loan, "loans"),
        (AwardKind::Other, "other"),
    ]
    .iter()
    .map(|(kind, category)| {
        let codes = kind
            .codes()
            .iter()
            .map(|(code, _)| format!("'{}'", code))
            .collect::<Vec<_>>()
            .join(", ");
        format!("WHEN type IN ({}) THEN '{}' ", codes, category)
    })
    .collect();
    format!(
        "UPDATE awards SET category = CASE {}ELSE NULL END WHERE id IN ({})",
        arms, id_list
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_case_covers_every_family() {
        let sql = category_sql("1, 2");
        assert!(sql.contains("WHEN type IN ('A', 'B', 'C', 'D') THEN 'contract'"), "{}", sql);
        assert!(sql.contains("THEN 'loans'"));
        assert!(sql.ends_with("WHERE id IN (1, 2)"));
    }

    #[test]
    fn id_lists_are_comma_separated() {
        assert_eq!(id_list(&[3, 1, 2]), "3, 1, 2");
    }
}
