//! Relinks File C account rows (`financial_accounts_by_awards`) to File D awards.
//!
//! Every link is cleared first. A row is then relinked only when exactly one
//! award matches its identifiers.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, Statement, TransactionTrait,
};
use tracing::info;

use crate::error::AppResult;
use crate::jobs::update_awards::ID_CHUNK;

const UNLINK_SQL: &str = "UPDATE financial_accounts_by_awards SET award_id = NULL";

/// Awards with a recipient whose piid, or exactly one of fain / uri, match
/// the account row, parent piid included.
const AWARD_MATCHES_SQL: &str = "\
SELECT DISTINCT CAST(faba.financial_accounts_by_awards_id AS BIGINT) AS faba_id, \
CAST(a.id AS BIGINT) AS award_id \
FROM financial_accounts_by_awards AS faba, awards AS a \
LEFT OUTER JOIN awards AS pa ON pa.id = a.parent_award_id \
WHERE a.recipient_id IS NOT NULL \
AND (a.piid IS NOT NULL OR (a.fain IS NOT NULL AND a.uri IS NULL) \
OR (a.uri IS NOT NULL AND a.fain IS NULL)) \
AND (faba.piid IS NOT NULL OR (faba.fain IS NOT NULL AND faba.uri IS NULL) \
OR (faba.uri IS NOT NULL AND faba.fain IS NULL)) \
AND COALESCE(a.piid, '') = COALESCE(faba.piid, '') \
AND COALESCE(a.fain, '') = COALESCE(faba.fain, '') \
AND COALESCE(a.uri, '') = COALESCE(faba.uri, '') \
AND COALESCE(pa.piid, '') = COALESCE(faba.parent_award_id, '')";

/// Account rows carrying both fain and uri, matched through assistance transactions.
const TRANSACTION_MATCHES_SQL: &str = "\
SELECT DISTINCT CAST(faba.financial_accounts_by_awards_id AS BIGINT) AS faba_id, \
CAST(tn.award_id AS BIGINT) AS award_id \
FROM financial_accounts_by_awards AS faba \
JOIN transaction_fabs AS tf ON tf.fain = faba.fain AND tf.uri = faba.uri \
JOIN transaction_normalized AS tn ON tn.id = tf.transaction_id \
WHERE faba.fain IS NOT NULL AND faba.uri IS NOT NULL";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSummary {
    pub unlinked: u64,
    pub candidates: usize,
    pub linked: u64,
    pub ambiguous: usize,
}

pub async fn run_link_file_c(db: &DatabaseConnection) -> AppResult<LinkSummary> {
    info!("Starting File C to File D linkage...");
    let overall = Instant::now();
    let txn = db.begin().await?;
    let backend = txn.get_database_backend();
    let mut summary = LinkSummary {
        unlinked: txn
            .execute(Statement::from_string(backend, UNLINK_SQL))
            .await?
            .rows_affected(),
        ..Default::default()
    };
    info!(rows = summary.unlinked, "File C rows unlinked");

    let mut candidates: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    for (label, sql) in [
        ("award identifiers", AWARD_MATCHES_SQL),
        ("fain and uri", TRANSACTION_MATCHES_SQL),
    ] {
        let started = Instant::now();
        let pairs = matches(&txn, sql).await?;
        info!(
            source = label,
            links = pairs.len(),
            seconds = started.elapsed().as_secs_f64(),
            "potential links found"
        );
        for (faba_id, award_id) in pairs {
            candidates.entry(faba_id).or_default().insert(award_id);
        }
    }
    summary.candidates = candidates.len();

    let links = unique_links(&candidates);
    summary.ambiguous = candidates.len() - links.values().map(Vec::len).sum::<usize>();
    summary.linked = apply_links(&txn, &links).await?;

    txn.commit().await?;
    info!(
        linked = summary.linked,
        ambiguous = summary.ambiguous,
        seconds = overall.elapsed().as_secs_f64(),
        "FINISHED"
    );
    Ok(summary)
}

async fn matches(txn: &DatabaseTransaction, sql: &str) -> AppResult<Vec<(i64, i64)>> {
    let rows = txn
        .query_all(Statement::from_string(txn.get_database_backend(), sql))
        .await?;
    rows.iter()
        .map(|row| -> AppResult<(i64, i64)> {
            Ok((row.try_get("", "faba_id")?, row.try_get("", "award_id")?))
        })
        .collect()
}

/// Award id → account rows, keeping only rows with a single candidate award.
fn unique_links(candidates: &BTreeMap<i64, BTreeSet<i64>>) -> BTreeMap<i64, Vec<i64>> {
    let mut links: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for (faba_id, awards) in candidates {
        if let (1, Some(award_id)) = (awards.len(), awards.first()) {
            links.entry(*award_id).or_default().push(*faba_id);
        }
    }
    links
}

async fn apply_links(
    txn: &DatabaseTransaction,
    links: &BTreeMap<i64, Vec<i64>>,
) -> AppResult<u64> {
    let backend = txn.get_database_backend();
    let mut linked = 0;
    for (award_id, faba_ids) in links {
        for chunk in faba_ids.chunks(ID_CHUNK) {
            let update = Query::update()
                .table(Alias::new("financial_accounts_by_awards"))
                .value(Alias::new("award_id"), *award_id)
                .and_where(
                    Expr::col(Alias::new("financial_accounts_by_awards_id"))
                        .is_in(chunk.iter().copied()),
                )
                .to_owned();
            linked += txn.execute(backend.build(&update)).await?.rows_affected();
        }
    }
    Ok(linked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_with_several_candidates_stay_unlinked() {
        let candidates = BTreeMap::from([
            (1, BTreeSet::from([10])),
            (2, BTreeSet::from([10, 11])),
            (3, BTreeSet::from([10])),
            (4, BTreeSet::from([12])),
        ]);
        let links = unique_links(&candidates);
        assert_eq!(links, BTreeMap::from([(10, vec![1, 3]), (12, vec![4])]));
    }
}
