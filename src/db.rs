use crate::{
    auth::{CredentialVerifier, DbUser, Role, User},
    error::AppError,
};
use chrono::NaiveDate;
use sqlx::{Pool, Sqlite};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};

use crate::models::{Chore, ChoresSnapshot, CompletionMap, DbChore, DbWeek, Week, WeekView};

#[derive(sqlx::FromRow)]
struct DbCredential {
    username: Option<String>,
    password: Option<String>,
    role: Option<String>,
}

/// Checks a username/password pair against the user directory. Both an
/// unknown username and a wrong password come back as InvalidCredentials.
#[instrument(skip(pool, verifier, password))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    verifier: &dyn CredentialVerifier,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    info!("Authenticating user");
    let row = sqlx::query_as::<_, DbCredential>(
        "SELECT username, password, role FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let stored = row.password.clone().unwrap_or_default();
            if verifier.verify(password, &stored)? {
                Ok(User::from(DbUser {
                    username: row.username,
                    role: row.role,
                }))
            } else {
                Err(AppError::InvalidCredentials)
            }
        }
        _ => Err(AppError::InvalidCredentials),
    }
}

/// Same credential check as `authenticate_user`, but the caller must hold
/// the admin role. A kid with the right password gets Forbidden, not
/// InvalidCredentials.
#[instrument(skip(pool, verifier, password))]
pub async fn require_admin(
    pool: &Pool<Sqlite>,
    verifier: &dyn CredentialVerifier,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = authenticate_user(pool, verifier, username, password).await?;

    if user.role != Role::Admin {
        return Err(AppError::Forbidden(format!(
            "User {} does not have the admin role",
            username
        )));
    }

    Ok(user)
}

#[instrument(skip(pool, verifier, password))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    verifier: &dyn CredentialVerifier,
    username: &str,
    password: &str,
    role: &str,
) -> Result<(), AppError> {
    info!("Creating new user");

    let existing: Option<(String,)> =
        sqlx::query_as("SELECT username FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;

    if existing.is_some() {
        return Err(AppError::Validation(format!(
            "Username '{}' already exists",
            username
        )));
    }

    let hashed_password = verifier.hash(password)?;

    sqlx::query("INSERT INTO users (username, password, role) VALUES (?, ?, ?)")
        .bind(username)
        .bind(hashed_password)
        .bind(role)
        .execute(pool)
        .await?;

    Ok(())
}

/// Kid roster plus the admin, in storage order.
#[instrument(skip(pool))]
pub async fn get_all_users(pool: &Pool<Sqlite>) -> Result<Vec<User>, AppError> {
    let rows = sqlx::query_as::<_, DbUser>("SELECT username, role FROM users ORDER BY rowid")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(User::from).collect())
}

/// Seeds the three household accounts on first boot. Default passwords
/// match the usernames unless overridden via SEED_PASSWORD_<USERNAME>.
#[instrument(skip_all)]
pub async fn seed_users(
    pool: &Pool<Sqlite>,
    verifier: &dyn CredentialVerifier,
) -> Result<(), AppError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Ok(());
    }

    for (username, role) in [("dkc", "kid"), ("skc", "kid"), ("admin", "admin")] {
        let password = std::env::var(format!("SEED_PASSWORD_{}", username.to_uppercase()))
            .unwrap_or_else(|_| username.to_string());
        create_user(pool, verifier, username, &password, role).await?;
    }

    info!("Seeded initial users");
    Ok(())
}

/// A user's current, editable chore list in the order it was last saved.
/// Users with no saved list get an empty vec, not an error.
#[instrument(skip(pool))]
pub async fn get_live_chores(pool: &Pool<Sqlite>, username: &str) -> Result<Vec<Chore>, AppError> {
    let rows = sqlx::query_as::<_, DbChore>(
        "SELECT chore_id, name, rating_type FROM chores WHERE username = ? ORDER BY id",
    )
    .bind(username)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Chore::from).collect())
}

/// Replaces a user's entire live chore list in one transaction. Blank-name
/// entries are dropped before persisting; duplicate chore ids are rejected
/// outright rather than silently trusted.
#[instrument(skip(pool, chores))]
pub async fn replace_chores(
    pool: &Pool<Sqlite>,
    username: &str,
    chores: &[Chore],
) -> Result<(), AppError> {
    info!("Replacing chore list");

    let kept: Vec<&Chore> = chores
        .iter()
        .filter(|c| !c.name.trim().is_empty())
        .collect();

    let mut seen = HashSet::new();
    for chore in &kept {
        if !seen.insert(chore.id) {
            return Err(AppError::Validation(format!(
                "Duplicate chore id {} in list for {}",
                chore.id, username
            )));
        }
    }

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM chores WHERE username = ?")
        .bind(username)
        .execute(&mut *tx)
        .await?;

    for chore in kept {
        sqlx::query("INSERT INTO chores (username, chore_id, name, rating_type) VALUES (?, ?, ?, ?)")
            .bind(username)
            .bind(chore.id)
            .bind(&chore.name)
            .bind(chore.rating_type.as_str())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(())
}

/// The full completion ledger for one user: day -> chore id -> value.
/// Values come back exactly as stored; the ledger never validates them
/// against the chore's rating type.
#[instrument(skip(pool))]
pub async fn get_completions(
    pool: &Pool<Sqlite>,
    username: &str,
) -> Result<CompletionMap, AppError> {
    let rows: Vec<(String, i64, Option<String>)> =
        sqlx::query_as("SELECT day, chore_id, completed FROM completions WHERE username = ?")
            .bind(username)
            .fetch_all(pool)
            .await?;

    let mut completions: CompletionMap = HashMap::new();
    for (day, chore_id, completed) in rows {
        let value = match completed {
            Some(raw) => serde_json::from_str(&raw)?,
            None => serde_json::Value::Null,
        };
        completions.entry(day).or_default().insert(chore_id, value);
    }

    Ok(completions)
}

/// Upserts one completion value. Writing an existing (day, chore) key
/// overwrites it.
#[instrument(skip(pool, value))]
pub async fn set_completion(
    pool: &Pool<Sqlite>,
    username: &str,
    day: &str,
    chore_id: i64,
    value: &serde_json::Value,
) -> Result<(), AppError> {
    info!("Recording completion");
    let raw = serde_json::to_string(value)?;

    sqlx::query(
        "INSERT INTO completions (username, day, chore_id, completed) VALUES (?, ?, ?, ?)
         ON CONFLICT (username, day, chore_id) DO UPDATE SET completed = excluded.completed",
    )
    .bind(username)
    .bind(day)
    .bind(chore_id)
    .bind(raw)
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_note(pool: &Pool<Sqlite>, username: &str) -> Result<String, AppError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT note FROM notes WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|(note,)| note).unwrap_or_default())
}

#[instrument(skip(pool, note))]
pub async fn set_note(pool: &Pool<Sqlite>, username: &str, note: &str) -> Result<(), AppError> {
    info!("Saving note");
    sqlx::query(
        "INSERT INTO notes (username, note) VALUES (?, ?)
         ON CONFLICT (username) DO UPDATE SET note = excluded.note",
    )
    .bind(username)
    .bind(note)
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn list_weeks(pool: &Pool<Sqlite>) -> Result<Vec<Week>, AppError> {
    let rows =
        sqlx::query_as::<_, DbWeek>("SELECT start_date, frozen FROM weeks ORDER BY start_date DESC")
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(Week::from).collect())
}

fn validate_start_date(start_date: &str) -> Result<(), AppError> {
    let parsed = NaiveDate::parse_from_str(start_date, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidDateFormat(start_date.to_string()))?;

    // chrono accepts unpadded parts; the registry key must be the exact
    // YYYY-MM-DD spelling or week lookups would never match
    if parsed.format("%Y-%m-%d").to_string() != start_date {
        return Err(AppError::InvalidDateFormat(start_date.to_string()));
    }

    Ok(())
}

/// Registers a new week in the OPEN state. Duplicate start dates are
/// rejected before any write; the weeks primary key backs this up at the
/// storage layer.
#[instrument(skip(pool))]
pub async fn create_week(pool: &Pool<Sqlite>, start_date: &str) -> Result<Week, AppError> {
    info!("Creating week");
    validate_start_date(start_date)?;

    let existing: Option<(String,)> =
        sqlx::query_as("SELECT start_date FROM weeks WHERE start_date = ?")
            .bind(start_date)
            .fetch_optional(pool)
            .await?;

    if existing.is_some() {
        return Err(AppError::AlreadyExists(format!(
            "Week {} already exists",
            start_date
        )));
    }

    sqlx::query("INSERT INTO weeks (start_date, frozen) VALUES (?, FALSE)")
        .bind(start_date)
        .execute(pool)
        .await?;

    Ok(Week {
        start_date: start_date.to_string(),
        frozen: false,
    })
}

/// Freezes a week: captures every user's current live chore list into the
/// week's snapshot and flips the frozen flag, all in one transaction so
/// readers never see a half-written snapshot. Freezing an already-frozen
/// week re-snapshots (last freeze wins). Later live-list edits do not touch
/// a frozen week.
#[instrument(skip(pool))]
pub async fn freeze_week(pool: &Pool<Sqlite>, start_date: &str) -> Result<(), AppError> {
    info!("Freezing week");

    let mut tx = pool.begin().await?;

    let existing: Option<(String,)> =
        sqlx::query_as("SELECT start_date FROM weeks WHERE start_date = ?")
            .bind(start_date)
            .fetch_optional(&mut *tx)
            .await?;

    if existing.is_none() {
        return Err(AppError::NotFound(format!(
            "Week {} not found",
            start_date
        )));
    }

    let usernames: Vec<(String,)> = sqlx::query_as("SELECT username FROM users ORDER BY rowid")
        .fetch_all(&mut *tx)
        .await?;

    let mut snapshot: ChoresSnapshot = HashMap::new();
    for (username,) in usernames {
        let rows = sqlx::query_as::<_, DbChore>(
            "SELECT chore_id, name, rating_type FROM chores WHERE username = ? ORDER BY id",
        )
        .bind(&username)
        .fetch_all(&mut *tx)
        .await?;

        let chores: Vec<Chore> = rows.into_iter().map(Chore::from).collect();
        if !chores.is_empty() {
            snapshot.insert(username, chores);
        }
    }

    let blob = serde_json::to_string(&snapshot)?;

    sqlx::query("UPDATE weeks SET frozen = TRUE, chores_snapshot = ? WHERE start_date = ?")
        .bind(blob)
        .bind(start_date)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}

/// The key query: which chore list applies to user U in week W? A frozen
/// week with a snapshot entry for the user answers from the snapshot; in
/// every other case (no week given, week unknown, week still open, or no
/// entry for this user) the live list applies.
#[instrument(skip(pool))]
pub async fn resolve_chores_for_week(
    pool: &Pool<Sqlite>,
    username: &str,
    start_date: Option<&str>,
) -> Result<Vec<Chore>, AppError> {
    if let Some(start_date) = start_date {
        let row: Option<(bool, Option<String>)> =
            sqlx::query_as("SELECT frozen, chores_snapshot FROM weeks WHERE start_date = ?")
                .bind(start_date)
                .fetch_optional(pool)
                .await?;

        if let Some((true, Some(blob))) = row {
            let snapshot: ChoresSnapshot = serde_json::from_str(&blob)?;
            if let Some(chores) = snapshot.get(username) {
                return Ok(chores.clone());
            }
        }
    }

    get_live_chores(pool, username).await
}

/// Everything the board shows for one user. Completions and the note are
/// never week-scoped: every week shares the one ledger and note slot.
#[instrument(skip(pool))]
pub async fn get_week_view(
    pool: &Pool<Sqlite>,
    username: &str,
    start_date: Option<&str>,
) -> Result<WeekView, AppError> {
    let chores = resolve_chores_for_week(pool, username, start_date).await?;
    let completions = get_completions(pool, username).await?;
    let note = get_note(pool, username).await?;

    Ok(WeekView {
        chores,
        completions,
        note,
    })
}

/// Wipes every completion and every note for all users. Chore lists and
/// the week registry are left alone.
#[instrument(skip(pool))]
pub async fn reset_all(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    info!("Resetting all completions and notes");

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM completions").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM notes").execute(&mut *tx).await?;

    tx.commit().await?;

    Ok(())
}
