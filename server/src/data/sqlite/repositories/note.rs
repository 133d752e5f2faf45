//! Note repository for SQLite operations
//!
//! Reads always exclude soft-deleted rows. Mutations check ownership inside
//! the same transaction that writes, and hand back the snapshots the write
//! path needs to publish invalidations.

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::data::sqlite::SqliteError;
use crate::data::types::{
    NewNote, NoteChange, NoteFilter, NotePage, NoteRow, NoteUpdate, Visibility,
};
use crate::utils::sql::escape_like_pattern;
use crate::utils::time::now_micros;

const NOTE_COLUMNS: &str =
    "id, owner_id, title, content, visibility, language, created_at, updated_at, deleted_at";

type NoteTuple = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    i64,
    i64,
    Option<i64>,
);

fn note_from_tuple(
    (id, owner_id, title, content, visibility, language, created_at, updated_at, deleted_at): NoteTuple,
) -> NoteRow {
    let visibility = Visibility::parse(&visibility).unwrap_or_else(|| {
        tracing::warn!(%id, %visibility, "Unknown visibility in database, treating as private");
        Visibility::Private
    });
    NoteRow {
        id,
        owner_id,
        title,
        content,
        visibility,
        language,
        created_at,
        updated_at,
        deleted_at,
    }
}

/// Create a note with a generated UUID
pub async fn create_note(pool: &SqlitePool, note: &NewNote) -> Result<NoteRow, SqliteError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_micros();

    sqlx::query(
        "INSERT INTO notes (id, owner_id, title, content, visibility, language, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&note.owner_id)
    .bind(&note.title)
    .bind(&note.content)
    .bind(note.visibility.as_str())
    .bind(&note.language)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(NoteRow {
        id,
        owner_id: note.owner_id.clone(),
        title: note.title.clone(),
        content: note.content.clone(),
        visibility: note.visibility,
        language: note.language.clone(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

/// Get a non-deleted note by ID
pub async fn get_note(pool: &SqlitePool, id: &str) -> Result<Option<NoteRow>, SqliteError> {
    let row = sqlx::query_as::<_, NoteTuple>(&format!(
        "SELECT {NOTE_COLUMNS} FROM notes WHERE id = ? AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(note_from_tuple))
}

/// Load a live note inside `tx` and check that `owner_id` owns it
async fn owned_note(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    owner_id: &str,
) -> Result<NoteRow, SqliteError> {
    let row = sqlx::query_as::<_, NoteTuple>(&format!(
        "SELECT {NOTE_COLUMNS} FROM notes WHERE id = ? AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    let note = row
        .map(note_from_tuple)
        .ok_or_else(|| SqliteError::NotFound(id.to_string()))?;

    if note.owner_id != owner_id {
        return Err(SqliteError::AccessDenied(id.to_string()));
    }
    Ok(note)
}

/// Replace title, content, visibility and language of an owned note
pub async fn update_note(
    pool: &SqlitePool,
    id: &str,
    update: &NoteUpdate,
) -> Result<NoteChange, SqliteError> {
    let mut tx = pool.begin().await?;
    let before = owned_note(&mut tx, id, &update.owner_id).await?;
    let now = now_micros().max(before.updated_at);

    sqlx::query(
        "UPDATE notes SET title = ?, content = ?, visibility = ?, language = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&update.title)
    .bind(&update.content)
    .bind(update.visibility.as_str())
    .bind(&update.language)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let after = NoteRow {
        title: update.title.clone(),
        content: update.content.clone(),
        visibility: update.visibility,
        language: update.language.clone(),
        updated_at: now,
        ..before.clone()
    };
    Ok(NoteChange { before, after })
}

/// Soft delete an owned note. Returns the note as it was before deletion.
pub async fn soft_delete_note(
    pool: &SqlitePool,
    id: &str,
    owner_id: &str,
) -> Result<NoteRow, SqliteError> {
    let mut tx = pool.begin().await?;
    let note = owned_note(&mut tx, id, owner_id).await?;
    let now = now_micros();

    sqlx::query("UPDATE notes SET deleted_at = ?, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(note)
}

/// Filtered, paginated query. `page` is zero-based.
///
/// The count and the page are read in one transaction so they describe the
/// same snapshot. A page past the end is empty, not an error.
pub async fn query_notes(
    pool: &SqlitePool,
    filter: &NoteFilter,
    page: u32,
    size: u32,
) -> Result<NotePage, SqliteError> {
    let mut conditions = vec!["deleted_at IS NULL"];
    let mut binds: Vec<String> = Vec::new();

    if let Some(text) = &filter.text {
        conditions.push("(title LIKE ? ESCAPE '\\' OR content LIKE ? ESCAPE '\\')");
        let pattern = format!("%{}%", escape_like_pattern(text));
        binds.push(pattern.clone());
        binds.push(pattern);
    }
    if let Some(visibility) = filter.visibility {
        conditions.push("visibility = ?");
        binds.push(visibility.as_str().to_string());
    }
    if let Some(owner_id) = &filter.owner_id {
        conditions.push("owner_id = ?");
        binds.push(owner_id.clone());
    }
    if let Some(language) = &filter.language {
        conditions.push("language = ?");
        binds.push(language.clone());
    }
    let where_clause = conditions.join(" AND ");

    let mut tx = pool.begin().await?;

    let count_sql = format!("SELECT COUNT(*) FROM notes WHERE {where_clause}");
    let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
    for value in &binds {
        count_query = count_query.bind(value);
    }
    let (total,) = count_query.fetch_one(&mut *tx).await?;

    let select_sql = format!(
        "SELECT {NOTE_COLUMNS} FROM notes WHERE {where_clause} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    let mut select_query = sqlx::query_as::<_, NoteTuple>(&select_sql);
    for value in &binds {
        select_query = select_query.bind(value);
    }
    let rows = select_query
        .bind(i64::from(size))
        .bind(i64::from(page) * i64::from(size))
        .fetch_all(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(NotePage {
        records: rows.into_iter().map(note_from_tuple).collect(),
        total: total.max(0) as u64,
    })
}

/// Distinct non-null languages of non-deleted notes, sorted
pub async fn list_distinct_languages(pool: &SqlitePool) -> Result<Vec<String>, SqliteError> {
    let languages = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT language FROM notes WHERE deleted_at IS NULL AND language IS NOT NULL ORDER BY language",
    )
    .fetch_all(pool)
    .await?;
    Ok(languages)
}
