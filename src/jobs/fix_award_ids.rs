//! Award id repair: regroups transactions filed under the wrong generated award id.
//!
//! `wrong_award_ids` lists `(transaction_id, award_id, correct_generated_unique_award_id)`.
//! Each group of transactions sharing a corrected id is moved onto one award,
//! the awards left empty are deleted, and the surviving awards are recalculated.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use sea_orm::sea_query::{Alias, Expr, Query, SelectStatement};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, Statement, TransactionTrait,
};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::jobs::update_awards::{id_list, recalculate_awards, ID_CHUNK};

const WRONG_AWARD_IDS_SQL: &str = "\
SELECT CAST(transaction_id AS BIGINT) AS transaction_id, CAST(award_id AS BIGINT) AS award_id, \
correct_generated_unique_award_id FROM wrong_award_ids";

/// Tables whose `award_id` follows a transaction onto its corrected award.
const AWARD_REFERENCES: [&str; 3] =
    ["transaction_normalized", "subaward", "financial_accounts_by_awards"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixSummary {
    pub transactions: usize,
    pub awards_kept: usize,
    pub awards_relabeled: usize,
    pub awards_deleted: usize,
    pub awards_updated: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct WrongTransaction {
    transaction_id: i64,
    award_id: i64,
}

pub async fn run_fix_award_ids(db: &DatabaseConnection) -> AppResult<FixSummary> {
    info!("Starting generated unique award id fix...");
    let overall = Instant::now();
    let txn = db.begin().await?;
    let backend = txn.get_database_backend();

    let rows = txn
        .query_all(Statement::from_string(backend, WRONG_AWARD_IDS_SQL))
        .await?;
    let mut groups: BTreeMap<String, Vec<WrongTransaction>> = BTreeMap::new();
    for row in &rows {
        let correct: String = row.try_get("", "correct_generated_unique_award_id")?;
        groups.entry(correct).or_default().push(WrongTransaction {
            transaction_id: row.try_get("", "transaction_id")?,
            award_id: row.try_get("", "award_id")?,
        });
    }
    info!(transactions = rows.len(), groups = groups.len(), "bad transactions grouped");

    let mut summary = FixSummary {
        transactions: rows.len(),
        ..Default::default()
    };
    if groups.is_empty() {
        txn.commit().await?;
        info!("FINISHED");
        return Ok(summary);
    }

    let started = Instant::now();
    let mut kept_ids = Vec::with_capacity(groups.len());
    let mut stale_ids = BTreeSet::new();
    for (correct_id, group) in &groups {
        let (kept, current_id) = consolidated_award(&txn, correct_id, group).await?;
        if current_id.as_deref() != Some(correct_id.as_str()) {
            if summary.awards_relabeled == 0 {
                info!(old = ?current_id, new = %correct_id, "example of a relabeled award");
            }
            relabel_award(&txn, kept, correct_id).await?;
            summary.awards_relabeled += 1;
        }

        let transaction_ids: Vec<i64> = group.iter().map(|t| t.transaction_id).collect();
        let old_award_ids: BTreeSet<i64> = group.iter().map(|t| t.award_id).collect();
        repoint_references(&txn, kept, correct_id, &transaction_ids, &old_award_ids).await?;

        stale_ids.extend(old_award_ids.into_iter().filter(|id| *id != kept));
        kept_ids.push(kept);
    }
    // an award kept for one group may have been emptied by another
    for kept in &kept_ids {
        stale_ids.remove(kept);
    }
    info!(
        seconds = started.elapsed().as_secs_f64(),
        awards = kept_ids.len(),
        "references now point at consolidated awards"
    );

    let started = Instant::now();
    for award_id in &stale_ids {
        if let Some(table) = referencing_table(&txn, *award_id).await? {
            return Err(AppError::InternalError(format!(
                "Attempted to delete award {} but {} still references it",
                award_id, table
            )));
        }
        let delete = Query::delete()
            .from_table(Alias::new("awards"))
            .and_where(Expr::col(Alias::new("id")).eq(*award_id))
            .to_owned();
        txn.execute(backend.build(&delete)).await?;
    }
    summary.awards_deleted = stale_ids.len();
    info!(
        seconds = started.elapsed().as_secs_f64(),
        deleted = stale_ids.len(),
        "stale awards deleted"
    );

    let (awards_updated, _) = recalculate_awards(&txn, &kept_ids).await?;
    update_subaward_totals(&txn, &kept_ids).await?;
    summary.awards_kept = kept_ids.len();
    summary.awards_updated = awards_updated;

    txn.commit().await?;
    info!(seconds = overall.elapsed().as_secs_f64(), "FINISHED");
    Ok(summary)
}

/// The award a group lands on: the one already carrying the corrected id,
/// otherwise the newest award among the group's current awards.
async fn consolidated_award(
    txn: &DatabaseTransaction,
    correct_id: &str,
    group: &[WrongTransaction],
) -> AppResult<(i64, Option<String>)> {
    let backend = txn.get_database_backend();
    let by_generated_id = award_lookup()
        .and_where(Expr::col(Alias::new("generated_unique_award_id")).eq(correct_id))
        .to_owned();
    if let Some(row) = txn.query_one(backend.build(&by_generated_id)).await? {
        return Ok((row.try_get("", "id")?, row.try_get("", "generated_unique_award_id")?));
    }

    let newest = group
        .iter()
        .map(|t| t.award_id)
        .max()
        .ok_or_else(|| AppError::InternalError(format!("no transactions for {}", correct_id)))?;
    let by_id = award_lookup()
        .and_where(Expr::col(Alias::new("id")).eq(newest))
        .to_owned();
    let row = txn
        .query_one(backend.build(&by_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Award {} not found", newest)))?;
    Ok((row.try_get("", "id")?, row.try_get("", "generated_unique_award_id")?))
}

fn award_lookup() -> SelectStatement {
    Query::select()
        .expr_as(Expr::cust("CAST(id AS BIGINT)"), Alias::new("id"))
        .column(Alias::new("generated_unique_award_id"))
        .from(Alias::new("awards"))
        .to_owned()
}

async fn relabel_award(
    txn: &DatabaseTransaction,
    award_id: i64,
    correct_id: &str,
) -> AppResult<()> {
    let update = Query::update()
        .table(Alias::new("awards"))
        .value(Alias::new("generated_unique_award_id"), correct_id)
        .and_where(Expr::col(Alias::new("id")).eq(award_id))
        .to_owned();
    txn.execute(txn.get_database_backend().build(&update)).await?;
    Ok(())
}

async fn repoint_references(
    txn: &DatabaseTransaction,
    award_id: i64,
    correct_id: &str,
    transaction_ids: &[i64],
    old_award_ids: &BTreeSet<i64>,
) -> AppResult<()> {
    let backend = txn.get_database_backend();
    let transactions = Query::update()
        .table(Alias::new("transaction_normalized"))
        .value(Alias::new("award_id"), award_id)
        .value(Alias::new("generated_unique_award_id"), correct_id)
        .and_where(Expr::col(Alias::new("id")).is_in(transaction_ids.iter().copied()))
        .to_owned();
    txn.execute(backend.build(&transactions)).await?;

    for table in &AWARD_REFERENCES[1..] {
        let update = Query::update()
            .table(Alias::new(*table))
            .value(Alias::new("award_id"), award_id)
            .and_where(Expr::col(Alias::new("award_id")).is_in(old_award_ids.iter().copied()))
            .to_owned();
        txn.execute(backend.build(&update)).await?;
    }
    Ok(())
}

async fn referencing_table(
    txn: &DatabaseTransaction,
    award_id: i64,
) -> AppResult<Option<&'static str>> {
    let backend = txn.get_database_backend();
    for table in AWARD_REFERENCES {
        let count = Query::select()
            .expr_as(Expr::cust("CAST(COUNT(*) AS BIGINT)"), Alias::new("total"))
            .from(Alias::new(table))
            .and_where(Expr::col(Alias::new("award_id")).eq(award_id))
            .to_owned();
        let references: i64 = match txn.query_one(backend.build(&count)).await? {
            Some(row) => row.try_get("", "total")?,
            None => 0,
        };
        if references > 0 {
            warn!(award_id, table, references, "stale award is still referenced");
            return Ok(Some(table));
        }
    }
    Ok(None)
}

/// Recounts `subaward_count` and `total_subaward_amount` from the subaward table.
async fn update_subaward_totals(txn: &DatabaseTransaction, ids: &[i64]) -> AppResult<u64> {
    let backend = txn.get_database_backend();
    let started = Instant::now();
    let mut updated = 0;
    for chunk in ids.chunks(ID_CHUNK) {
        let result = txn
            .execute(Statement::from_string(backend, subaward_totals_sql(&id_list(chunk))))
            .await?;
        updated += result.rows_affected();
    }
    info!(
        seconds = started.elapsed().as_secs_f64(),
        awards = updated,
        "updated subaward totals"
    );
    Ok(updated)
}

fn subaward_totals_sql(id_list: &str) -> String {
    format!(
        "UPDATE awards SET \
subaward_count = (SELECT COUNT(*) FROM subaward AS s WHERE s.award_id = awards.id), \
total_subaward_amount = (SELECT SUM(s.amount) FROM subaward AS s WHERE s.award_id = awards.id) \
WHERE id IN ({})",
        id_list
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbBackend;

    #[test]
    fn subaward_totals_are_scoped_to_the_ids() {
        let sql = subaward_totals_sql("4, 9");
        assert!(sql.contains("subaward_count = (SELECT COUNT(*)"), "{}", sql);
        assert!(sql.ends_with("WHERE id IN (4, 9)"));
    }

    #[test]
    fn award_lookups_bind_the_generated_id() {
        let lookup = award_lookup()
            .and_where(Expr::col(Alias::new("generated_unique_award_id")).eq("CONT_AWD_1'2"))
            .to_owned();
        let statement = DbBackend::Postgres.build(&lookup);
        assert!(statement.sql.contains(r#""generated_unique_award_id" = $1"#), "{}", statement.sql);
        assert!(statement.values.is_some());
    }
}
