//! The Miles ledger.
//!
//! Every balance change runs inside one database transaction together with
//! its ledger entry, while holding the process-wide [`Ledger`] gate. Debits
//! are conditional updates, so a short balance never goes negative even if
//! another process writes concurrently.

use diesel_async::AsyncConnection;
use serde::Deserialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::{
    access::{Principal, require_admin},
    db::{self, DbConnection},
    error::{ServiceError, ServiceResult},
    kinds::{RelatedKind, TransactionKind},
    models::NewMileTransaction,
    views::TransactionView,
};

/// Serializes ledger transactions issued by this process.
#[derive(Debug, Default)]
pub struct Ledger {
    gate: Mutex<()>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Wait for exclusive access to the ledger.
    pub async fn lock(&self) -> MutexGuard<'_, ()> { self.gate.lock().await }
}

/// One balance change and the ledger entry that records it.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub user_id: i32,
    pub kind: TransactionKind,
    pub amount: i32,
    pub description: &'a str,
    pub related_id: Option<i32>,
    pub related_type: Option<RelatedKind>,
}

/// Apply `entry` on a connection that is already inside a transaction.
///
/// Returns the new balance.
///
/// # Errors
/// Returns `InsufficientBalance` for a debit the balance cannot cover,
/// `Validation` for a credit that would overflow the balance and `NotFound`
/// when the user does not exist.
pub(crate) async fn post_entry(conn: &mut DbConnection, entry: &Entry<'_>) -> ServiceResult<i32> {
    let balance = match entry.kind {
        TransactionKind::Earn | TransactionKind::Purchase => {
            match db::ledger::credit(conn, entry.user_id, entry.amount).await? {
                Some(balance) => balance,
                None if db::ledger::balance(conn, entry.user_id).await?.is_none() => {
                    return Err(ServiceError::not_found("user"));
                }
                None => {
                    return Err(ServiceError::Validation(format!(
                        "balance cannot exceed {} miles",
                        i32::MAX
                    )));
                }
            }
        }
        TransactionKind::Spend => match db::ledger::debit(conn, entry.user_id, entry.amount).await? {
            Some(balance) => balance,
            None if db::ledger::balance(conn, entry.user_id).await?.is_none() => {
                return Err(ServiceError::not_found("user"));
            }
            None => return Err(ServiceError::InsufficientBalance),
        },
    };
    db::ledger::append_transaction(
        conn,
        &NewMileTransaction {
            user_id: entry.user_id,
            amount: entry.amount,
            kind: entry.kind.as_str(),
            description: entry.description,
            related_id: entry.related_id,
            related_type: entry.related_type.map(RelatedKind::as_str),
            created_at: db::now(),
        },
    )
    .await?;
    Ok(balance)
}

fn positive(amount: Option<i32>) -> ServiceResult<i32> {
    match amount {
        Some(n) if n > 0 => Ok(n),
        Some(_) => Err(ServiceError::Validation(
            "amount must be a positive integer".to_owned(),
        )),
        None => Err(ServiceError::missing("amount")),
    }
}

/// Record one entry under the gate in its own transaction.
///
/// # Errors
/// Propagates the failures of [`post_entry`]; nothing is written on error.
pub async fn record(conn: &mut DbConnection, ledger: &Ledger, entry: Entry<'_>) -> ServiceResult<i32> {
    let _gate = ledger.lock().await;
    let balance = conn
        .transaction::<_, ServiceError, _>(|conn| Box::pin(async move { post_entry(conn, &entry).await }))
        .await
        .inspect_err(|err| {
            if matches!(err, ServiceError::InsufficientBalance) {
                warn!(user_id = entry.user_id, amount = entry.amount, "debit refused");
            }
        })?;
    info!(
        user_id = entry.user_id,
        kind = %entry.kind,
        amount = entry.amount,
        balance,
        "ledger entry recorded"
    );
    Ok(balance)
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct TopUpInput {
    pub amount: Option<i32>,
    pub payment_intent_id: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct SpendInput {
    pub amount: Option<i32>,
    pub description: Option<String>,
    pub related_id: Option<i32>,
    pub related_type: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GrantInput {
    pub user_id: Option<i32>,
    pub amount: Option<i32>,
    pub description: Option<String>,
}

/// The caller's current balance.
///
/// # Errors
/// Returns `NotFound` when the caller's account vanished.
pub async fn balance(conn: &mut DbConnection, who: &Principal) -> ServiceResult<i32> {
    db::ledger::balance(conn, who.user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("user"))
}

/// The caller's newest ledger entries.
///
/// # Errors
/// Returns any database or decoding error.
pub async fn transactions(conn: &mut DbConnection, who: &Principal) -> ServiceResult<Vec<TransactionView>> {
    db::ledger::recent_transactions(conn, who.user_id)
        .await?
        .iter()
        .map(TransactionView::from_row)
        .collect()
}

/// Buy Miles.
///
/// No payment verification happens here: the payment intent id is only
/// logged.
///
/// # Errors
/// Returns `Validation` for a missing or non-positive amount.
pub async fn top_up(
    conn: &mut DbConnection,
    ledger: &Ledger,
    who: &Principal,
    input: TopUpInput,
) -> ServiceResult<i32> {
    let amount = positive(input.amount)?;
    warn!(
        user_id = who.user_id,
        payment_intent = input.payment_intent_id.as_deref().unwrap_or("<none>"),
        "mile purchase accepted without payment verification"
    );
    let description = format!("Mile purchase ({amount} Miles)");
    record(
        conn,
        ledger,
        Entry {
            user_id: who.user_id,
            kind: TransactionKind::Purchase,
            amount,
            description: &description,
            related_id: None,
            related_type: Some(RelatedKind::Other),
        },
    )
    .await
}

/// Spend Miles from the caller's balance.
///
/// # Errors
/// Returns `Validation` for bad input and `InsufficientBalance` when the
/// balance is short.
pub async fn spend(
    conn: &mut DbConnection,
    ledger: &Ledger,
    who: &Principal,
    input: SpendInput,
) -> ServiceResult<i32> {
    let amount = positive(input.amount)?;
    let description = super::required("description", input.description)?;
    let related_type = input
        .related_type
        .as_deref()
        .map(str::parse::<RelatedKind>)
        .transpose()?;
    record(
        conn,
        ledger,
        Entry {
            user_id: who.user_id,
            kind: TransactionKind::Spend,
            amount,
            description: &description,
            related_id: input.related_id,
            related_type,
        },
    )
    .await
}

/// Award Miles to any user.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers, `Validation` for bad input and
/// `NotFound` for an unknown user.
pub async fn grant(
    conn: &mut DbConnection,
    ledger: &Ledger,
    who: &Principal,
    input: GrantInput,
) -> ServiceResult<i32> {
    require_admin(who)?;
    let user_id = input.user_id.ok_or_else(|| ServiceError::missing("userId"))?;
    let amount = positive(input.amount)?;
    let description = super::optional_text(input.description)
        .unwrap_or_else(|| "Granted by an administrator".to_owned());
    record(
        conn,
        ledger,
        Entry {
            user_id,
            kind: TransactionKind::Earn,
            amount,
            description: &description,
            related_id: None,
            related_type: Some(RelatedKind::Other),
        },
    )
    .await
}
