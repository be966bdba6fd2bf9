//! Mile balance and transaction ledger queries.
//!
//! Balance changes are single conditional `UPDATE ... RETURNING` statements;
//! callers pair them with [`append_transaction`] inside one transaction.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::{
    kinds::TransactionKind,
    models::{MileTransaction, NewMileTransaction},
    schema::{mile_transactions, users},
};

/// Maximum number of entries returned by [`recent_transactions`].
pub const HISTORY_LIMIT: i64 = 100;

/// Current cached balance of a user.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn balance(conn: &mut DbConnection, user_id: i32) -> QueryResult<Option<i32>> {
    users::table
        .find(user_id)
        .select(users::miles)
        .first(conn)
        .await
        .optional()
}

/// Add `amount` to a balance when the result still fits, returning the new
/// balance.
///
/// `None` means the user is missing or the balance would pass `i32::MAX`;
/// nothing is written in either case.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn credit(conn: &mut DbConnection, user_id: i32, amount: i32) -> QueryResult<Option<i32>> {
    diesel::update(
        users::table
            .filter(users::id.eq(user_id))
            .filter(users::miles.le(i32::MAX.saturating_sub(amount))),
    )
    .set(users::miles.eq(users::miles + amount))
    .returning(users::miles)
    .get_result(conn)
    .await
    .optional()
}

/// Subtract `amount` when the balance covers it, returning the new balance.
///
/// `None` means the user is missing or the balance is short; nothing is
/// written in either case.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn debit(conn: &mut DbConnection, user_id: i32, amount: i32) -> QueryResult<Option<i32>> {
    diesel::update(
        users::table
            .filter(users::id.eq(user_id))
            .filter(users::miles.ge(amount)),
    )
    .set(users::miles.eq(users::miles - amount))
    .returning(users::miles)
    .get_result(conn)
    .await
    .optional()
}

/// Append a ledger entry.
///
/// # Errors
/// Returns any error produced by the insertion query.
#[must_use = "handle the result"]
pub async fn append_transaction(
    conn: &mut DbConnection,
    entry: &NewMileTransaction<'_>,
) -> QueryResult<MileTransaction> {
    diesel::insert_into(mile_transactions::table)
        .values(entry)
        .returning(MileTransaction::as_returning())
        .get_result(conn)
        .await
}

/// The newest [`HISTORY_LIMIT`] ledger entries of a user.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn recent_transactions(
    conn: &mut DbConnection,
    user_id: i32,
) -> QueryResult<Vec<MileTransaction>> {
    mile_transactions::table
        .filter(mile_transactions::user_id.eq(user_id))
        .order((
            mile_transactions::created_at.desc(),
            mile_transactions::id.desc(),
        ))
        .limit(HISTORY_LIMIT)
        .select(MileTransaction::as_select())
        .load(conn)
        .await
}

/// Cached balance compared with the balance derived from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub cached: i64,
    pub projected: i64,
}

impl Reconciliation {
    #[must_use]
    pub const fn is_consistent(&self) -> bool { self.cached == self.projected }
}

/// Recompute a user's balance from the full ledger.
///
/// Entries with an unrecognised kind are reported as an error rather than
/// skipped.
///
/// # Errors
/// Returns any error produced by the queries or a `DeserializationError`
/// for an unknown stored kind.
#[must_use = "handle the result"]
pub async fn reconcile(conn: &mut DbConnection, user_id: i32) -> QueryResult<Option<Reconciliation>> {
    let Some(cached) = balance(conn, user_id).await? else {
        return Ok(None);
    };
    let entries: Vec<(String, i32)> = mile_transactions::table
        .filter(mile_transactions::user_id.eq(user_id))
        .select((mile_transactions::kind, mile_transactions::amount))
        .load(conn)
        .await?;
    let mut projected = 0i64;
    for (kind, amount) in entries {
        let kind: TransactionKind = kind
            .parse()
            .map_err(|e| diesel::result::Error::DeserializationError(Box::new(e)))?;
        projected += kind.signed(amount);
    }
    Ok(Some(Reconciliation {
        cached: i64::from(cached),
        projected,
    }))
}
