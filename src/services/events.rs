//! Events and participation.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::info;

use super::{non_blank, non_negative, optional_text, referenced, required, users_by_id};
use crate::{
    access::{Principal, require_admin},
    db::{self, DbConnection},
    error::{ServiceError, ServiceResult},
    models::{Event, EventChanges, EventParticipant, NewEvent},
    views::{EventView, ParticipantView, UserSummary},
};

#[derive(Deserialize, Debug, Default, Clone, Copy)]
pub struct PricingInput {
    pub visitor: Option<i32>,
    pub member: Option<i32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub flyer_image_url: Option<String>,
    pub date: Option<String>,
    pub venue: Option<String>,
    pub pricing: Option<PricingInput>,
}

/// Optional inclusive date window; both ends must be present to filter.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Parse an RFC 3339 instant or a bare `YYYY-MM-DD` date.
///
/// A bare date resolves to its first second, or its last when `end_of_day`
/// is set.
fn parse_instant(field: &str, raw: &str, end_of_day: bool) -> ServiceResult<NaiveDateTime> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.naive_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|day| {
            if end_of_day {
                day.and_hms_opt(23, 59, 59)
            } else {
                day.and_hms_opt(0, 0, 0)
            }
        })
        .ok_or_else(|| ServiceError::Validation(format!("{field} is not a valid date")))
}

impl EventRange {
    fn window(&self) -> ServiceResult<Option<(NaiveDateTime, NaiveDateTime)>> {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => Ok(Some((
                parse_instant("startDate", start, false)?,
                parse_instant("endDate", end, true)?,
            ))),
            _ => Ok(None),
        }
    }
}

async fn project(
    conn: &mut DbConnection,
    who: &Principal,
    events: Vec<Event>,
) -> ServiceResult<Vec<EventView>> {
    let ids: Vec<i32> = events.iter().map(|e| e.id).collect();
    let creators = users_by_id(conn, events.iter().map(|e| e.created_by)).await?;
    let participants = db::events::participants_for_events(conn, &ids).await?;
    events
        .iter()
        .map(|event| -> ServiceResult<EventView> {
            let registered = participants
                .iter()
                .filter(|(p, _)| p.event_id == event.id)
                .map(|(p, user)| ParticipantView {
                    user: UserSummary::from(user),
                    registered_at: p.registered_at.and_utc(),
                })
                .collect();
            let creator = referenced(&creators, event.created_by)?;
            Ok(EventView::build(event, creator, registered).for_viewer(who.user_id))
        })
        .collect()
}

async fn event_view(conn: &mut DbConnection, who: &Principal, event_id: i32) -> ServiceResult<EventView> {
    let event = db::events::find_event(conn, event_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("event"))?;
    project(conn, who, vec![event])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::not_found("event"))
}

/// Events in chronological order, optionally within an inclusive window.
///
/// # Errors
/// Returns `Validation` for unparseable dates.
pub async fn list_events(
    conn: &mut DbConnection,
    who: &Principal,
    range: &EventRange,
) -> ServiceResult<Vec<EventView>> {
    let events = db::events::list_events(conn, range.window()?).await?;
    project(conn, who, events).await
}

/// One event, annotated with the caller's registration.
///
/// # Errors
/// Returns `NotFound` for unknown ids.
pub async fn get_event(conn: &mut DbConnection, who: &Principal, event_id: i32) -> ServiceResult<EventView> {
    event_view(conn, who, event_id).await
}

/// Create an event.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `Validation` for missing
/// fields, bad dates or negative prices.
pub async fn create_event(
    conn: &mut DbConnection,
    who: &Principal,
    input: EventInput,
) -> ServiceResult<EventView> {
    require_admin(who)?;
    let title = required("title", input.title)?;
    let description = required("description", input.description)?;
    let date = required("date", input.date)?;
    let starts_at = parse_instant("date", &date, false)?;
    let venue = required("venue", input.venue)?;
    let pricing = input.pricing.unwrap_or_default();
    let flyer = optional_text(input.flyer_image_url);
    let event = db::events::create_event(
        conn,
        &NewEvent {
            title: &title,
            description: &description,
            flyer_image_url: flyer.as_deref(),
            starts_at,
            venue: &venue,
            visitor_price: non_negative("pricing.visitor", pricing.visitor.unwrap_or_default())?,
            member_price: non_negative("pricing.member", pricing.member.unwrap_or_default())?,
            created_by: who.user_id,
            created_at: db::now(),
        },
    )
    .await?;
    info!(event_id = event.id, "event created");
    event_view(conn, who, event.id).await
}

/// Apply a partial update.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers, `NotFound` for unknown ids and
/// `Validation` for bad dates or negative prices.
pub async fn update_event(
    conn: &mut DbConnection,
    who: &Principal,
    event_id: i32,
    input: EventInput,
) -> ServiceResult<EventView> {
    require_admin(who)?;
    let pricing = input.pricing.unwrap_or_default();
    let changes = EventChanges {
        title: non_blank("title", input.title)?,
        description: input.description,
        flyer_image_url: input.flyer_image_url,
        starts_at: input
            .date
            .as_deref()
            .map(|d| parse_instant("date", d, false))
            .transpose()?,
        venue: non_blank("venue", input.venue)?,
        visitor_price: pricing
            .visitor
            .map(|p| non_negative("pricing.visitor", p))
            .transpose()?,
        member_price: pricing
            .member
            .map(|p| non_negative("pricing.member", p))
            .transpose()?,
    };
    if db::events::update_event(conn, event_id, &changes).await?.is_none() {
        return Err(ServiceError::not_found("event"));
    }
    event_view(conn, who, event_id).await
}

/// Delete an event and its registrations.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `NotFound` for unknown ids.
pub async fn delete_event(conn: &mut DbConnection, who: &Principal, event_id: i32) -> ServiceResult<()> {
    require_admin(who)?;
    super::found(db::events::delete_event(conn, event_id).await?, "event")?;
    info!(event_id, "event deleted");
    Ok(())
}

/// Register the caller, or cancel an existing registration.
///
/// # Errors
/// Returns `NotFound` for unknown ids.
pub async fn toggle_participation(
    conn: &mut DbConnection,
    who: &Principal,
    event_id: i32,
) -> ServiceResult<EventView> {
    if db::events::find_event(conn, event_id).await?.is_none() {
        return Err(ServiceError::not_found("event"));
    }
    if db::events::is_participant(conn, event_id, who.user_id).await? {
        db::events::remove_participant(conn, event_id, who.user_id).await?;
        info!(event_id, user_id = who.user_id, "registration cancelled");
    } else {
        db::events::add_participant(
            conn,
            &EventParticipant {
                event_id,
                user_id: who.user_id,
                registered_at: db::now(),
            },
        )
        .await?;
        info!(event_id, user_id = who.user_id, "registered for event");
    }
    event_view(conn, who, event_id).await
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("2025-06-01T10:30:00Z", false, "2025-06-01 10:30:00")]
    #[case("2025-06-01T10:30:00+09:00", false, "2025-06-01 01:30:00")]
    #[case("2025-06-01", false, "2025-06-01 00:00:00")]
    #[case("2025-06-30", true, "2025-06-30 23:59:59")]
    fn instants_accept_timestamps_and_dates(
        #[case] raw: &str,
        #[case] end_of_day: bool,
        #[case] expected: &str,
    ) {
        let parsed = parse_instant("date", raw, end_of_day).expect("valid date");
        assert_eq!(parsed.to_string(), expected);
    }

    #[rstest]
    fn garbage_dates_name_the_field() {
        let err = parse_instant("startDate", "next tuesday", false).expect_err("invalid");
        assert_eq!(err.to_string(), "startDate is not a valid date");
    }

    #[rstest]
    fn half_open_range_does_not_filter() {
        let range = EventRange {
            start_date: Some("2025-01-01".into()),
            end_date: None,
        };
        assert_eq!(range.window().expect("window"), None);
    }
}
