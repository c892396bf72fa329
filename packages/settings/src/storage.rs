// ABOUTME: Storage operations for section settings
// ABOUTME: Database CRUD over the (section, key)-keyed setting table

use setkeep_storage::StorageError;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::codec::{decode_column, encode_column};
use crate::types::{Setting, SettingType};

#[derive(Clone)]
pub struct SettingStorage {
    pool: SqlitePool,
}

impl SettingStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get a single setting by section and key
    pub async fn find(&self, section: &str, key: &str) -> Result<Option<Setting>, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;
        queries::find(&mut conn, section, key).await
    }

    /// Get every setting in a section, ordered by position
    pub async fn find_by_section(&self, section: &str) -> Result<Vec<Setting>, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;
        queries::find_by_section(&mut conn, section).await
    }

    /// Distinct section names
    pub async fn list_sections(&self) -> Result<Vec<String>, StorageError> {
        sqlx::query_scalar("SELECT DISTINCT section FROM setting ORDER BY section")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)
    }

    /// Highest position used in a section
    pub async fn max_position(&self, section: &str) -> Result<Option<i64>, StorageError> {
        sqlx::query_scalar("SELECT MAX(position) FROM setting WHERE section = ?")
            .bind(section)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::Sqlx)
    }

    /// Insert a new setting; an unset position appends to the end of its section
    pub async fn insert(&self, setting: &mut Setting) -> Result<(), StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;
        queries::insert(&mut conn, setting).await
    }

    /// Administrative edit of every attribute of an existing setting
    pub async fn update(&self, setting: &mut Setting) -> Result<bool, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;
        queries::update(&mut conn, setting).await
    }

    /// Replace only the value of an existing setting
    pub async fn update_value(
        &self,
        section: &str,
        key: &str,
        value: Option<&str>,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(r#"UPDATE setting SET value = ? WHERE section = ? AND "key" = ?"#)
            .bind(value)
            .bind(section)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        debug!(section, key, rows = result.rows_affected(), "Updated setting value");
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, section: &str, key: &str) -> Result<bool, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;
        Ok(queries::delete(&mut conn, section, key).await? > 0)
    }
}

/// Row-level statements usable on a pooled connection or inside a transaction
pub(crate) mod queries {
    use super::*;

    const SELECT_COLUMNS: &str =
        r#"SELECT section, "key", name, hint, value, type_key, position, variants, rules FROM setting"#;

    pub async fn find(
        conn: &mut SqliteConnection,
        section: &str,
        key: &str,
    ) -> Result<Option<Setting>, StorageError> {
        let row = sqlx::query(&format!(r#"{} WHERE section = ? AND "key" = ?"#, SELECT_COLUMNS))
            .bind(section)
            .bind(key)
            .fetch_optional(&mut *conn)
            .await
            .map_err(StorageError::Sqlx)?;

        row.map(row_to_setting).transpose()
    }

    pub async fn find_by_section(
        conn: &mut SqliteConnection,
        section: &str,
    ) -> Result<Vec<Setting>, StorageError> {
        let rows = sqlx::query(&format!(
            r#"{} WHERE section = ? ORDER BY position ASC, "key" ASC"#,
            SELECT_COLUMNS
        ))
        .bind(section)
        .fetch_all(&mut *conn)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.into_iter().map(row_to_setting).collect()
    }

    pub async fn insert(conn: &mut SqliteConnection, setting: &mut Setting) -> Result<(), StorageError> {
        // max(position) + 1 is computed in the same statement as the write
        let position: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO setting (section, "key", name, hint, value, type_key, position, variants, rules)
            VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                COALESCE(?7, (SELECT COALESCE(MAX(position), 0) + 1 FROM setting WHERE section = ?1)),
                ?8, ?9
            )
            RETURNING position
            "#,
        )
        .bind(&setting.section)
        .bind(&setting.key)
        .bind(&setting.name)
        .bind(&setting.hint)
        .bind(&setting.value)
        .bind(setting.type_key.code())
        .bind(setting.requested_position())
        .bind(encode_column(setting.variants.as_ref()))
        .bind(encode_column(setting.rules.as_ref()))
        .fetch_one(&mut *conn)
        .await
        .map_err(StorageError::Sqlx)?;

        setting.position = Some(position);
        debug!(section = %setting.section, key = %setting.key, position, "Inserted setting");
        Ok(())
    }

    pub async fn update(conn: &mut SqliteConnection, setting: &mut Setting) -> Result<bool, StorageError> {
        let position = match setting.requested_position() {
            Some(position) => position,
            None => next_position(conn, &setting.section).await?,
        };

        let result = sqlx::query(
            r#"
            UPDATE setting
            SET name = ?, hint = ?, value = ?, type_key = ?, position = ?, variants = ?, rules = ?
            WHERE section = ? AND "key" = ?
            "#,
        )
        .bind(&setting.name)
        .bind(&setting.hint)
        .bind(&setting.value)
        .bind(setting.type_key.code())
        .bind(position)
        .bind(encode_column(setting.variants.as_ref()))
        .bind(encode_column(setting.rules.as_ref()))
        .bind(&setting.section)
        .bind(&setting.key)
        .execute(&mut *conn)
        .await
        .map_err(StorageError::Sqlx)?;

        setting.position = Some(position);
        Ok(result.rows_affected() > 0)
    }

    pub async fn next_position(conn: &mut SqliteConnection, section: &str) -> Result<i64, StorageError> {
        sqlx::query_scalar("SELECT COALESCE(MAX(position), 0) + 1 FROM setting WHERE section = ?")
            .bind(section)
            .fetch_one(&mut *conn)
            .await
            .map_err(StorageError::Sqlx)
    }

    pub async fn exists_at_position(
        conn: &mut SqliteConnection,
        section: &str,
        position: i64,
    ) -> Result<bool, StorageError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM setting WHERE section = ? AND position = ?")
                .bind(section)
                .bind(position)
                .fetch_one(&mut *conn)
                .await
                .map_err(StorageError::Sqlx)?;
        Ok(count > 0)
    }

    /// Move every setting at or after `position` one slot down
    pub async fn shift_positions(
        conn: &mut SqliteConnection,
        section: &str,
        position: i64,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query(
            "UPDATE setting SET position = position + 1 WHERE position >= ? AND section = ?",
        )
        .bind(position)
        .bind(section)
        .execute(&mut *conn)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(result.rows_affected())
    }

    pub async fn delete(
        conn: &mut SqliteConnection,
        section: &str,
        key: &str,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query(r#"DELETE FROM setting WHERE section = ? AND "key" = ?"#)
            .bind(section)
            .bind(key)
            .execute(&mut *conn)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(result.rows_affected())
    }

    /// Helper to convert row to Setting
    fn row_to_setting(row: SqliteRow) -> Result<Setting, StorageError> {
        let type_code: i64 = row.try_get("type_key").map_err(StorageError::Sqlx)?;
        let type_key = i16::try_from(type_code)
            .ok()
            .and_then(|code| SettingType::try_from(code).ok())
            .ok_or_else(|| StorageError::Database(format!("unknown type_key {}", type_code)))?;

        Ok(Setting {
            section: row.try_get("section").map_err(StorageError::Sqlx)?,
            key: row.try_get("key").map_err(StorageError::Sqlx)?,
            name: row.try_get("name").map_err(StorageError::Sqlx)?,
            hint: row.try_get("hint").map_err(StorageError::Sqlx)?,
            value: row.try_get("value").map_err(StorageError::Sqlx)?,
            type_key,
            position: row.try_get("position").map_err(StorageError::Sqlx)?,
            variants: decode_column(row.try_get("variants").map_err(StorageError::Sqlx)?),
            rules: decode_column(row.try_get("rules").map_err(StorageError::Sqlx)?),
        })
    }
}
