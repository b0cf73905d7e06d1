//! `postmeta` key/value access.
//!
//! WordPress keeps no unique index on `(post_id, meta_key)`, so duplicates
//! exist in the wild. Reads take the oldest row for a key (first match wins)
//! and writes update that same row, inserting only when the key is absent.
//!
//! Every function takes a plain connection so it runs equally inside a
//! transaction (`&mut *tx`) or on a pooled connection.

use std::collections::BTreeMap;

use sqlx::MySqlConnection;

use woo_backoffice_core::PostId;

use super::{RepositoryError, Tables};

/// Read one meta value.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get(
    conn: &mut MySqlConnection,
    tables: &Tables,
    post_id: PostId,
    key: &str,
) -> Result<Option<String>, RepositoryError> {
    let sql = format!(
        "SELECT meta_value FROM {} WHERE post_id = ? AND meta_key = ? ORDER BY meta_id LIMIT 1",
        tables.postmeta()
    );
    let value: Option<Option<String>> = sqlx::query_scalar(&sql)
        .bind(post_id)
        .bind(key)
        .fetch_optional(conn)
        .await?;
    Ok(value.flatten())
}

/// Read every meta value of a post. Duplicate keys keep the oldest row.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn all(
    conn: &mut MySqlConnection,
    tables: &Tables,
    post_id: PostId,
) -> Result<BTreeMap<String, String>, RepositoryError> {
    let sql = format!(
        "SELECT meta_key, meta_value FROM {} WHERE post_id = ? ORDER BY meta_id",
        tables.postmeta()
    );
    let rows: Vec<(Option<String>, Option<String>)> =
        sqlx::query_as(&sql).bind(post_id).fetch_all(conn).await?;

    let mut map = BTreeMap::new();
    for (key, value) in rows {
        if let Some(key) = key {
            map.entry(key).or_insert_with(|| value.unwrap_or_default());
        }
    }
    Ok(map)
}

/// Write a meta value, updating the existing row if there is one.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn set(
    conn: &mut MySqlConnection,
    tables: &Tables,
    post_id: PostId,
    key: &str,
    value: &str,
) -> Result<(), RepositoryError> {
    let postmeta = tables.postmeta();
    let existing: Option<u64> = sqlx::query_scalar(&format!(
        "SELECT meta_id FROM {postmeta} WHERE post_id = ? AND meta_key = ? ORDER BY meta_id LIMIT 1"
    ))
    .bind(post_id)
    .bind(key)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(meta_id) => {
            sqlx::query(&format!(
                "UPDATE {postmeta} SET meta_value = ? WHERE meta_id = ?"
            ))
            .bind(value)
            .bind(meta_id)
            .execute(&mut *conn)
            .await?;
        }
        None => insert(conn, tables, post_id, key, value).await?,
    }
    Ok(())
}

/// Append a meta row without looking for an existing one.
///
/// Used for freshly created posts, where no row can exist yet.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(
    conn: &mut MySqlConnection,
    tables: &Tables,
    post_id: PostId,
    key: &str,
    value: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!(
        "INSERT INTO {} (post_id, meta_key, meta_value) VALUES (?, ?, ?)",
        tables.postmeta()
    ))
    .bind(post_id)
    .bind(key)
    .bind(value)
    .execute(conn)
    .await?;
    Ok(())
}

/// Remove every row for a key.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete(
    conn: &mut MySqlConnection,
    tables: &Tables,
    post_id: PostId,
    key: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE post_id = ? AND meta_key = ?",
        tables.postmeta()
    ))
    .bind(post_id)
    .bind(key)
    .execute(conn)
    .await?;
    Ok(())
}

/// Variation attributes from `attribute_pa_*` / `attribute_*` keys.
///
/// The key prefix is stripped; the first key producing a given attribute
/// name wins, so `attribute_pa_color` shadows a later `attribute_color`.
#[must_use]
pub fn attributes(meta: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    // Taxonomy attributes first so they take precedence over custom ones.
    for prefix in ["attribute_pa_", "attribute_"] {
        for (key, value) in meta {
            let Some(name) = key.strip_prefix(prefix) else {
                continue;
            };
            if name.is_empty() || name.starts_with("pa_") {
                continue;
            }
            attrs
                .entry(name.to_string())
                .or_insert_with(|| value.clone());
        }
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_strip_prefix_and_keep_first() {
        let meta = BTreeMap::from([
            ("attribute_pa_color".to_string(), "rojo".to_string()),
            ("attribute_color".to_string(), "azul".to_string()),
            ("attribute_talla".to_string(), "M".to_string()),
            ("_sku".to_string(), "ABC1234".to_string()),
        ]);
        let attrs = attributes(&meta);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["color"], "rojo");
        assert_eq!(attrs["talla"], "M");
    }

    #[test]
    fn test_attributes_empty() {
        assert!(attributes(&BTreeMap::new()).is_empty());
    }
}
