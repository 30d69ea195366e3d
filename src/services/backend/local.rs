// Local backend
// Timetable and bookings kept in a SQLite file, for offline editing and demos

use std::sync::{Mutex, MutexGuard};

use anyhow::Context;
use chrono::{Duration, NaiveDateTime};
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use super::{BookingBackend, TimetableBackend, SEARCH_LIMIT};
use crate::errors::{BusinessError, ClientError, ClientResult};
use crate::models::booking::{AcceptRejectStatus, AgreementRequest, Booking, FieldError, SearchHit};
use crate::models::commit::{CommitRequest, CommitResponse, MoveToSession};
use crate::models::entry::{DayEntries, ScheduleEntry, TimetableData};
use crate::services::database::Database;
use crate::services::timetable::find_entry_mut;

pub struct LocalBackend {
    db: Mutex<Database>,
    conference_id: String,
}

impl LocalBackend {
    pub fn new(db: Database, conference_id: &str) -> anyhow::Result<Self> {
        db.initialize_schema()?;
        Ok(Self {
            db: Mutex::new(db),
            conference_id: conference_id.to_string(),
        })
    }

    pub fn open(path: &str, conference_id: &str) -> anyhow::Result<Self> {
        Self::new(Database::new(path)?, conference_id)
    }

    fn db(&self) -> ClientResult<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| ClientError::Transport("Local store lock poisoned".to_string()))
    }

    /// Replace the stored timetable with `data`, returning the number of entries written
    pub fn import_timetable(&self, data: &TimetableData) -> anyhow::Result<usize> {
        let mut db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("Local store lock poisoned"))?;
        let tx = db
            .connection_mut()
            .transaction()
            .context("Failed to start import transaction")?;
        tx.execute("DELETE FROM entries", [])
            .context("Failed to clear entries")?;
        let mut written = 0;
        for (day, entries) in data {
            written += write_day(&tx, day, entries).context("Failed to write imported day")?;
        }
        tx.commit().context("Failed to commit import")?;
        log::info!("Imported {} entries over {} days", written, data.len());
        Ok(written)
    }

    fn load_day(&self, db: &Database, day: &str) -> ClientResult<DayEntries> {
        let mut stmt = db
            .connection()
            .prepare("SELECT parent_id, payload FROM entries WHERE day = ?1 ORDER BY parent_id IS NOT NULL, rowid")?;
        let rows = stmt.query_map([day], |row| {
            Ok((row.get::<_, Option<String>>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut entries = DayEntries::new();
        for row in rows {
            let (parent, payload) = row?;
            let entry: ScheduleEntry = serde_json::from_str(&payload)?;
            match parent {
                None => {
                    entries.insert(entry.id.clone(), entry);
                }
                Some(parent) => match entries.get_mut(&parent) {
                    Some(session) => {
                        session.entries.insert(entry.id.clone(), entry);
                    }
                    None => log::warn!("Entry {} points at missing parent {}", entry.id, parent),
                },
            }
        }
        Ok(entries)
    }

    fn save_day(&self, db: &mut Database, day: &str, entries: &DayEntries) -> ClientResult<()> {
        let tx = db.connection_mut().transaction()?;
        tx.execute("DELETE FROM entries WHERE day = ?1", [day])?;
        write_day(&tx, day, entries)?;
        tx.commit()?;
        Ok(())
    }

    fn load_booking(&self, db: &Database, id: &str) -> ClientResult<Booking> {
        let payload: Option<String> = db
            .connection()
            .query_row(
                "SELECT payload FROM bookings WHERE id = ?1 AND conference = ?2",
                params![id, self.conference_id],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(payload) => Ok(serde_json::from_str(&payload)?),
            None => Err(ClientError::NotFound(format!("Booking {}", id))),
        }
    }

    fn save_booking(&self, db: &Database, booking: &Booking) -> ClientResult<()> {
        db.connection().execute(
            "INSERT OR REPLACE INTO bookings (id, conference, booking_type, payload, updated_at)
             VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP)",
            params![
                booking.id,
                self.conference_id,
                booking.booking_type,
                serde_json::to_string(booking)?
            ],
        )?;
        Ok(())
    }

    fn next_booking_id(&self, db: &Database) -> ClientResult<String> {
        let max: Option<i64> = db.connection().query_row(
            "SELECT MAX(CAST(id AS INTEGER)) FROM bookings",
            [],
            |row| row.get(0),
        )?;
        Ok((max.unwrap_or(0) + 1).to_string())
    }

    fn update_booking(&self, id: &str, change: impl FnOnce(&mut Booking) -> ClientResult<()>) -> ClientResult<Booking> {
        let db = self.db()?;
        let mut booking = self.load_booking(&db, id)?;
        change(&mut booking)?;
        self.save_booking(&db, &booking)?;
        Ok(booking)
    }

    fn insert_booking(&self, booking_type: &str, params: &Value, status: &str) -> ClientResult<Booking> {
        reject_markup(params)?;
        let db = self.db()?;
        let mut booking = Booking::new(self.next_booking_id(&db)?, booking_type);
        seed_capabilities(&mut booking);
        booking.booking_params = params.clone();
        booking.status_message = status.to_string();
        self.save_booking(&db, &booking)?;
        log::info!("Stored {} booking {}", booking_type, booking.id);
        Ok(booking)
    }
}

fn write_day(conn: &rusqlite::Connection, day: &str, entries: &DayEntries) -> rusqlite::Result<usize> {
    let mut written = 0;
    let mut insert = conn.prepare(
        "INSERT OR REPLACE INTO entries (id, day, parent_id, payload) VALUES (?1, ?2, ?3, ?4)",
    )?;
    let to_json = |entry: &ScheduleEntry| {
        serde_json::to_string(entry).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
    };

    for entry in entries.values() {
        let mut top = entry.clone();
        top.entries = DayEntries::new();
        insert.execute(params![top.id, day, Option::<String>::None, to_json(&top)?])?;
        written += 1;
        for child in entry.entries.values() {
            insert.execute(params![child.id, day, Some(&entry.id), to_json(child)?])?;
            written += 1;
        }
    }
    Ok(written)
}

/// Move an entry and everything nested in it by `delta`
fn shift_entry(entry: &mut ScheduleEntry, delta: Duration) {
    entry.reschedule(entry.start() + delta, entry.end() + delta);
    for child in entry.entries.values_mut() {
        shift_entry(child, delta);
    }
}

/// Shift every entry of `container` starting at or after `from`, except `skip`
fn shift_after(container: &mut DayEntries, skip: &str, from: NaiveDateTime, delta: Duration) -> usize {
    let mut shifted = 0;
    for entry in container.values_mut() {
        if entry.id != skip && entry.start() >= from {
            shift_entry(entry, delta);
            shifted += 1;
        }
    }
    shifted
}

/// Shift the later siblings of a moved session child. A session that no
/// longer holds its children grows, and the day's entries after it follow.
fn shift_inside_session(
    entries: &mut DayEntries,
    session_id: &str,
    moved_id: &str,
    old_end: NaiveDateTime,
    delta: Duration,
) -> usize {
    let Some(session) = entries.get_mut(session_id) else {
        return 0;
    };
    let mut shifted = shift_after(&mut session.entries, moved_id, old_end, delta);

    let session_end = session.end();
    let latest = session
        .entries
        .values()
        .map(ScheduleEntry::end)
        .max()
        .unwrap_or(session_end);
    if latest > session_end {
        let start = session.start();
        session.reschedule(start, latest);
        shifted += shift_after(entries, session_id, session_end, latest - session_end);
    }
    shifted
}

/// Capabilities the local store grants each plugin type
fn seed_capabilities(booking: &mut Booking) {
    booking.has_start = true;
    booking.has_stop = true;
    booking.can_be_started = true;
    booking.permission_to_start = true;
    booking.permission_to_stop = true;
    booking.requires_server_call_for_start = true;
    booking.requires_server_call_for_stop = true;
    booking.has_check_status = true;
    booking.status_class = "statusMessageOther".to_string();
    match booking.booking_type.as_str() {
        "CERNMCU" => booking.has_start_stop_all = true,
        "Vidyo" => {
            booking.has_connect = true;
            booking.has_disconnect = true;
        }
        "EVO" => booking.requires_client_call_for_start = true,
        "WebEx" => booking.has_accept_reject = true,
        _ => {}
    }
}

/// Refuse parameters containing markup, like the server's sanitizer
fn reject_markup(params: &Value) -> ClientResult<()> {
    let Some(fields) = params.as_object() else {
        return Ok(());
    };
    let invalid_fields: Vec<String> = fields
        .iter()
        .filter(|(_, value)| value.as_str().is_some_and(|s| s.contains('<') || s.contains('>')))
        .map(|(field, _)| field.clone())
        .collect();
    if invalid_fields.is_empty() {
        Ok(())
    } else {
        Err(ClientError::Business(BusinessError::Sanitization { invalid_fields }))
    }
}

impl TimetableBackend for LocalBackend {
    fn fetch_timetable(&self) -> ClientResult<TimetableData> {
        let db = self.db()?;
        let days: Vec<String> = {
            let mut stmt = db
                .connection()
                .prepare("SELECT DISTINCT day FROM entries ORDER BY day")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            let days = rows.collect::<Result<_, _>>()?;
            days
        };

        let mut data = TimetableData::new();
        for day in days {
            let entries = self.load_day(&db, &day)?;
            data.insert(day, entries);
        }
        Ok(data)
    }

    fn fetch_day(&self, day: &str) -> ClientResult<DayEntries> {
        let db = self.db()?;
        self.load_day(&db, day)
    }

    fn commit_move(&self, request: &CommitRequest) -> ClientResult<CommitResponse> {
        if request.end < request.start {
            return Err(ClientError::Business(BusinessError::rejected(
                "move",
                "The entry cannot end before it starts",
            )));
        }

        let mut db = self.db()?;
        let mut entries = self.load_day(&db, &request.day)?;
        let entry = find_entry_mut(&mut entries, &request.entry_id)
            .ok_or_else(|| ClientError::NotFound(format!("Entry {}", request.entry_id)))?;
        let old_end = entry.end();
        entry.reschedule(request.start, request.end);
        let moved = entry.clone();

        if !request.shift_later {
            self.save_day(&mut db, &request.day, &entries)?;
            log::info!("Moved entry {} to {}", moved.id, moved.start());
            return Ok(CommitResponse::Entry(moved));
        }

        let delta = request.end - old_end;
        let parent = entries
            .values()
            .find(|e| e.entries.contains_key(&moved.id))
            .map(|e| e.id.clone());
        let shifted = match parent {
            Some(parent) => shift_inside_session(&mut entries, &parent, &moved.id, old_end, delta),
            None => shift_after(&mut entries, &moved.id, old_end, delta),
        };
        self.save_day(&mut db, &request.day, &entries)?;
        log::info!(
            "Moved entry {} and shifted {} later entries by {} min",
            moved.id,
            shifted,
            delta.num_minutes()
        );
        Ok(CommitResponse::Day {
            day: request.day.clone(),
            entries,
        })
    }

    fn move_to_session(&self, request: &MoveToSession) -> ClientResult<DayEntries> {
        let mut db = self.db()?;
        let mut entries = self.load_day(&db, &request.day)?;

        let mut entry = entries
            .remove(&request.entry_id)
            .ok_or_else(|| ClientError::NotFound(format!("Entry {}", request.entry_id)))?;
        if entry.is_session() {
            return Err(ClientError::Business(BusinessError::rejected(
                "moveToSession",
                "A session cannot be moved into another session",
            )));
        }

        let session = entries
            .values_mut()
            .find(|e| {
                e.is_session()
                    && e.session_id.as_deref() == Some(request.session_id.as_str())
                    && e.session_slot_id.as_deref() == Some(request.session_slot_id.as_str())
            })
            .ok_or_else(|| {
                ClientError::NotFound(format!(
                    "Session {} slot {}",
                    request.session_id, request.session_slot_id
                ))
            })?;

        entry.session_id = Some(request.session_id.clone());
        entry.session_slot_id = Some(request.session_slot_id.clone());
        session.entries.insert(entry.id.clone(), entry);

        self.save_day(&mut db, &request.day, &entries)?;
        log::info!(
            "Moved entry {} into session {}",
            request.entry_id,
            request.session_id
        );
        Ok(entries)
    }
}

impl BookingBackend for LocalBackend {
    fn list_bookings(&self) -> ClientResult<Vec<Booking>> {
        let db = self.db()?;
        let mut stmt = db
            .connection()
            .prepare("SELECT payload FROM bookings WHERE conference = ?1 ORDER BY CAST(id AS INTEGER)")?;
        let rows = stmt.query_map([&self.conference_id], |row| row.get::<_, String>(0))?;
        let mut bookings = Vec::new();
        for payload in rows {
            bookings.push(serde_json::from_str(&payload?)?);
        }
        Ok(bookings)
    }

    fn create_booking(&self, booking_type: &str, params: &Value) -> ClientResult<Booking> {
        self.insert_booking(booking_type, params, "Booking created")
    }

    fn edit_booking(&self, id: &str, params: &Value) -> ClientResult<Booking> {
        reject_markup(params)?;
        self.update_booking(id, |booking| {
            booking.booking_params = params.clone();
            booking.status_message = "Booking modified".to_string();
            Ok(())
        })
    }

    fn remove_booking(&self, id: &str) -> ClientResult<()> {
        let db = self.db()?;
        let removed = db.connection().execute(
            "DELETE FROM bookings WHERE id = ?1 AND conference = ?2",
            params![id, self.conference_id],
        )?;
        if removed == 0 {
            return Err(ClientError::NotFound(format!("Booking {}", id)));
        }
        log::info!("Removed booking {}", id);
        Ok(())
    }

    fn start_booking(&self, id: &str) -> ClientResult<Booking> {
        self.update_booking(id, |booking| {
            if !booking.can_be_started {
                return Err(ClientError::Business(BusinessError::rejected(
                    "start",
                    "The booking cannot be started now",
                )));
            }
            booking.can_be_started = false;
            booking.can_be_stopped = true;
            booking.status_message = "Started".to_string();
            booking.status_class = "statusMessageOK".to_string();
            Ok(())
        })
    }

    fn stop_booking(&self, id: &str) -> ClientResult<Booking> {
        self.update_booking(id, |booking| {
            if !booking.can_be_stopped {
                return Err(ClientError::Business(BusinessError::rejected(
                    "stop",
                    "The booking is not running",
                )));
            }
            booking.can_be_stopped = false;
            booking.can_be_started = true;
            booking.status_message = "Stopped".to_string();
            booking.status_class = "statusMessageOther".to_string();
            Ok(())
        })
    }

    fn check_status(&self, id: &str) -> ClientResult<Booking> {
        let db = self.db()?;
        self.load_booking(&db, id)
    }

    fn accept_booking(&self, id: &str) -> ClientResult<Booking> {
        self.update_booking(id, |booking| {
            booking.accept_reject_status = AcceptRejectStatus::Accepted;
            booking.status_message = "Accepted".to_string();
            Ok(())
        })
    }

    fn reject_booking(&self, id: &str, reason: &str) -> ClientResult<Booking> {
        self.update_booking(id, |booking| {
            booking.accept_reject_status = AcceptRejectStatus::Rejected;
            booking.status_message = format!("Rejected: {}", reason);
            Ok(())
        })
    }

    fn attach_booking(&self, booking_type: &str, params: &Value) -> ClientResult<Booking> {
        self.insert_booking(booking_type, params, "Booking attached")
    }

    fn search(&self, booking_type: &str, query: &str) -> ClientResult<Vec<SearchHit>> {
        let db = self.db()?;
        let mut stmt = db
            .connection()
            .prepare("SELECT payload FROM bookings WHERE booking_type = ?1 ORDER BY CAST(id AS INTEGER)")?;
        let rows = stmt.query_map([booking_type], |row| row.get::<_, String>(0))?;

        let needle = query.to_lowercase();
        let mut hits = Vec::new();
        for payload in rows {
            let booking: Booking = serde_json::from_str(&payload?)?;
            let field = |key: &str| {
                booking
                    .booking_params
                    .get(key)
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            let name = field("roomName").unwrap_or_else(|| booking.id.clone());
            if !name.to_lowercase().contains(&needle) {
                continue;
            }
            hits.push(SearchHit {
                id: booking.id.clone(),
                name,
                description: field("roomDescription"),
                owner: field("owner"),
            });
            if hits.len() == SEARCH_LIMIT {
                break;
            }
        }
        Ok(hits)
    }

    fn send_agreement(&self, request: &AgreementRequest) -> ClientResult<()> {
        let mut errors = Vec::new();
        if request.unique_id_list.is_empty() {
            errors.push(FieldError::new("uniqueIdList", "Select at least one speaker"));
        }
        if request.from_email.trim().is_empty() {
            errors.push(FieldError::new("from", "A sender address is required"));
        }
        if !errors.is_empty() {
            return Err(ClientError::Validation(errors));
        }
        log::info!(
            "Agreement request for {} speaker(s) recorded locally",
            request.unique_id_list.len()
        );
        Ok(())
    }

    fn accept_agreement(&self, auth_key: &str) -> ClientResult<()> {
        log::info!("Agreement {} accepted", auth_key);
        Ok(())
    }

    fn reject_agreement(&self, auth_key: &str, reason: &str) -> ClientResult<()> {
        log::info!("Agreement {} rejected: {}", auth_key, reason);
        Ok(())
    }
}
