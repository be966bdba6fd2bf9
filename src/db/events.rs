//! Event and participation queries.

use chrono::NaiveDateTime;
use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::{
    models::{Event, EventChanges, EventParticipant, NewEvent, User},
    schema::{event_participants, events, users},
};

/// Events in chronological order, optionally limited to an inclusive range.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_events(
    conn: &mut DbConnection,
    range: Option<(NaiveDateTime, NaiveDateTime)>,
) -> QueryResult<Vec<Event>> {
    let mut query = events::table
        .order((events::starts_at.asc(), events::id.asc()))
        .select(Event::as_select())
        .into_boxed();
    if let Some((start, end)) = range {
        query = query.filter(events::starts_at.between(start, end));
    }
    query.load(conn).await
}

/// Look up an event by primary key.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_event(conn: &mut DbConnection, event_id: i32) -> QueryResult<Option<Event>> {
    events::table
        .find(event_id)
        .select(Event::as_select())
        .first(conn)
        .await
        .optional()
}

/// Insert a new event.
///
/// # Errors
/// Returns any error produced by the insertion query.
#[must_use = "handle the result"]
pub async fn create_event(conn: &mut DbConnection, event: &NewEvent<'_>) -> QueryResult<Event> {
    diesel::insert_into(events::table)
        .values(event)
        .returning(Event::as_returning())
        .get_result(conn)
        .await
}

/// Apply a partial update to an event.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn update_event(
    conn: &mut DbConnection,
    event_id: i32,
    changes: &EventChanges,
) -> QueryResult<Option<Event>> {
    if changes.is_empty() {
        return find_event(conn, event_id).await;
    }
    diesel::update(events::table.find(event_id))
        .set(changes)
        .returning(Event::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// Delete an event; participations cascade.
///
/// # Errors
/// Returns any error produced by the delete query.
#[must_use = "handle the result"]
pub async fn delete_event(conn: &mut DbConnection, event_id: i32) -> QueryResult<usize> {
    diesel::delete(events::table.find(event_id)).execute(conn).await
}

/// Participants with their users for the given events in registration order.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn participants_for_events(
    conn: &mut DbConnection,
    event_ids: &[i32],
) -> QueryResult<Vec<(EventParticipant, User)>> {
    if event_ids.is_empty() {
        return Ok(Vec::new());
    }
    event_participants::table
        .inner_join(users::table)
        .filter(event_participants::event_id.eq_any(event_ids))
        .order((
            event_participants::registered_at.asc(),
            event_participants::user_id.asc(),
        ))
        .select((EventParticipant::as_select(), User::as_select()))
        .load(conn)
        .await
}

/// Whether `user_id` is registered for the event.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn is_participant(
    conn: &mut DbConnection,
    event_id: i32,
    user_id: i32,
) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        event_participants::table
            .filter(event_participants::event_id.eq(event_id))
            .filter(event_participants::user_id.eq(user_id)),
    ))
    .get_result(conn)
    .await
}

/// Register a participant; duplicates are ignored.
///
/// # Errors
/// Returns any error produced by the insertion query.
#[must_use = "handle the result"]
pub async fn add_participant(
    conn: &mut DbConnection,
    participant: &EventParticipant,
) -> QueryResult<usize> {
    diesel::insert_into(event_participants::table)
        .values(participant)
        .on_conflict_do_nothing()
        .execute(conn)
        .await
}

/// Cancel a registration.
///
/// # Errors
/// Returns any error produced by the delete query.
#[must_use = "handle the result"]
pub async fn remove_participant(
    conn: &mut DbConnection,
    event_id: i32,
    user_id: i32,
) -> QueryResult<usize> {
    diesel::delete(
        event_participants::table
            .filter(event_participants::event_id.eq(event_id))
            .filter(event_participants::user_id.eq(user_id)),
    )
    .execute(conn)
    .await
}
