//! Image Repository
//!
//! The `images` table is a metadata register: it never touches the version
//! log or the filesystem.

use super::{RepoError, RepoResult};
use shared::models::{CurrentState, ImageCreate, ImageRecord};
use sqlx::{Executor, Sqlite};

const SELECT_IMAGE: &str = "SELECT id, session_id, original_filename, original_size, original_path, \
     current_path, current_size, width, height, format, thumbnail_path, exif, \
     gps_latitude, gps_longitude, gps_altitude, created_at, updated_at FROM images";

pub async fn insert<'e, E>(executor: E, data: &ImageCreate) -> RepoResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO images (id, session_id, original_filename, original_size, original_path, \
         current_path, current_size, width, height, format, thumbnail_path, exif, \
         gps_latitude, gps_longitude, gps_altitude, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
    )
    .bind(&data.id)
    .bind(&data.session_id)
    .bind(&data.original_filename)
    .bind(data.original_size)
    .bind(&data.original_path)
    .bind(&data.state.path)
    .bind(data.state.size)
    .bind(data.state.width)
    .bind(data.state.height)
    .bind(&data.state.format)
    .bind(&data.thumbnail_path)
    .bind(&data.exif)
    .bind(data.gps.map(|g| g.latitude))
    .bind(data.gps.map(|g| g.longitude))
    .bind(data.gps.and_then(|g| g.altitude))
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> RepoResult<Option<ImageRecord>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_IMAGE} WHERE id = ?");
    let record = sqlx::query_as::<_, ImageRecord>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(record)
}

pub async fn list_by_session<'e, E>(executor: E, session_id: &str) -> RepoResult<Vec<ImageRecord>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_IMAGE} WHERE session_id = ? ORDER BY created_at");
    let records = sqlx::query_as::<_, ImageRecord>(&sql)
        .bind(session_id)
        .fetch_all(executor)
        .await?;
    Ok(records)
}

pub async fn list_all<'e, E>(executor: E) -> RepoResult<Vec<ImageRecord>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_IMAGE} ORDER BY created_at");
    let records = sqlx::query_as::<_, ImageRecord>(&sql)
        .fetch_all(executor)
        .await?;
    Ok(records)
}

/// Replace the current-state register in a single statement.
///
/// Path, size, dimensions and format change together or not at all.
pub async fn adopt<'e, E>(executor: E, id: &str, state: &CurrentState) -> RepoResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "UPDATE images SET current_path = ?1, current_size = ?2, width = ?3, height = ?4, \
         format = ?5, updated_at = ?6 WHERE id = ?7",
    )
    .bind(&state.path)
    .bind(state.size)
    .bind(state.width)
    .bind(state.height)
    .bind(&state.format)
    .bind(shared::util::now_millis())
    .bind(id)
    .execute(executor)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("image {id}")));
    }
    Ok(())
}

pub async fn set_thumbnail<'e, E>(executor: E, id: &str, path: Option<&str>) -> RepoResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("UPDATE images SET thumbnail_path = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(path)
        .bind(shared::util::now_millis())
        .bind(id)
        .execute(executor)
        .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("image {id}")));
    }
    Ok(())
}

/// Delete an image row; its history rows go with it (ON DELETE CASCADE).
pub async fn delete<'e, E>(executor: E, id: &str) -> RepoResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("DELETE FROM images WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected() > 0)
}
