//! Mail-item repository.
//!
//! Labels live in `mail_item_labels` and are written inside the same
//! transaction as the row they describe; reads re-attach them afterwards.

use std::collections::{HashMap, HashSet};

use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::models::{Category, MailItem, MailItemPatch, NewMailItem};

/// Optional list filters; ANDed together when both are present.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub category: Option<Category>,
    pub search: Option<String>,
}

/// Insert a mail item with its labels. The server assigns the id and
/// upload timestamp; the returned record includes the labels as stored
/// (trimmed, deduplicated).
pub async fn create(
    pool: &PgPool,
    user_id: &str,
    new: NewMailItem,
) -> Result<MailItem, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let mut item = sqlx::query_as::<_, MailItem>(
        "INSERT INTO mail_items
             (user_id, title, summary, category, reminder_date, image_url, file_name, extracted_text)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(user_id)
    .bind(&new.title)
    .bind(&new.summary)
    .bind(new.category.as_str())
    .bind(new.reminder_date)
    .bind(&new.image_url)
    .bind(&new.file_name)
    .bind(&new.extracted_text)
    .fetch_one(&mut *tx)
    .await?;

    replace_labels(&mut tx, item.id, &new.categories, false).await?;
    replace_labels(&mut tx, item.id, &new.custom_categories, true).await?;
    tx.commit().await?;

    attach_labels(pool, std::slice::from_mut(&mut item)).await?;
    Ok(item)
}

pub async fn get(pool: &PgPool, user_id: &str, id: i64) -> Result<Option<MailItem>, sqlx::Error> {
    let item = sqlx::query_as::<_, MailItem>(
        "SELECT * FROM mail_items WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match item {
        Some(mut item) => {
            attach_labels(pool, std::slice::from_mut(&mut item)).await?;
            Ok(Some(item))
        }
        None => Ok(None),
    }
}

/// Look an item up by its stored serving path. Backs the ownership check
/// when serving `/uploads/{name}`.
pub async fn find_by_image_url(
    pool: &PgPool,
    user_id: &str,
    image_url: &str,
) -> Result<Option<MailItem>, sqlx::Error> {
    sqlx::query_as::<_, MailItem>(
        "SELECT * FROM mail_items WHERE user_id = $1 AND image_url = $2",
    )
    .bind(user_id)
    .bind(image_url)
    .fetch_optional(pool)
    .await
}

/// Newest first; category filter and escaped ILIKE search are optional.
pub async fn list(
    pool: &PgPool,
    user_id: &str,
    filter: &ListFilter,
) -> Result<Vec<MailItem>, sqlx::Error> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT * FROM mail_items WHERE user_id = ");
    qb.push_bind(user_id);

    if let Some(category) = filter.category {
        qb.push(" AND category = ");
        qb.push_bind(category.as_str());
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR summary ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR category ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR COALESCE(extracted_text, '') ILIKE ");
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\')");
    }
    qb.push(" ORDER BY upload_date DESC, id DESC");

    let mut items = qb.build_query_as::<MailItem>().fetch_all(pool).await?;
    attach_labels(pool, &mut items).await?;
    Ok(items)
}

/// Partial merge then re-fetch. `None` when the row does not exist or
/// belongs to someone else; nothing is written in that case.
pub async fn update(
    pool: &PgPool,
    user_id: &str,
    id: i64,
    patch: &MailItemPatch,
) -> Result<Option<MailItem>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let owned: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM mail_items WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
    if owned.is_none() {
        return Ok(None);
    }

    if patch.touches_columns() {
        sqlx::query(
            "UPDATE mail_items SET
                 title = COALESCE($3, title),
                 summary = COALESCE($4, summary),
                 category = COALESCE($5, category),
                 reminder_date = CASE WHEN $6 THEN $7 ELSE reminder_date END
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(patch.title.as_deref())
        .bind(patch.summary.as_deref())
        .bind(patch.category.map(Category::as_str))
        .bind(patch.reminder_date.is_some())
        .bind(patch.reminder_date.flatten())
        .execute(&mut *tx)
        .await?;
    }

    if let Some(labels) = &patch.categories {
        replace_labels(&mut tx, id, labels, false).await?;
    }
    if let Some(labels) = &patch.custom_categories {
        replace_labels(&mut tx, id, labels, true).await?;
    }
    tx.commit().await?;

    get(pool, user_id, id).await
}

/// True when a row was removed.
pub async fn delete(pool: &PgPool, user_id: &str, id: i64) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM mail_items WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Delete any of the caller's rows among `ids`; other users' ids are
/// silently ignored. Returns the number actually removed.
pub async fn delete_many(pool: &PgPool, user_id: &str, ids: &[i64]) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }
    let res = sqlx::query("DELETE FROM mail_items WHERE user_id = $1 AND id = ANY($2)")
        .bind(user_id)
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

/// Replace one kind of label (standard or custom) for an item. A label
/// also present in the other kind flips to the incoming kind rather than
/// violating the `(mail_item_id, label)` primary key.
async fn replace_labels(
    tx: &mut Transaction<'_, Postgres>,
    item_id: i64,
    labels: &[String],
    is_custom: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM mail_item_labels WHERE mail_item_id = $1 AND is_custom = $2")
        .bind(item_id)
        .bind(is_custom)
        .execute(&mut **tx)
        .await?;

    let mut seen = HashSet::new();
    for label in labels {
        let label = label.trim();
        if label.is_empty() || !seen.insert(label.to_ascii_lowercase()) {
            continue;
        }
        sqlx::query(
            "INSERT INTO mail_item_labels (mail_item_id, label, is_custom)
             VALUES ($1, $2, $3)
             ON CONFLICT (mail_item_id, label) DO UPDATE SET is_custom = EXCLUDED.is_custom",
        )
        .bind(item_id)
        .bind(label)
        .bind(is_custom)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Fill the label vectors for a batch of rows with one query.
async fn attach_labels(pool: &PgPool, items: &mut [MailItem]) -> Result<(), sqlx::Error> {
    if items.is_empty() {
        return Ok(());
    }
    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let rows: Vec<(i64, String, bool)> = sqlx::query_as(
        "SELECT mail_item_id, label, is_custom FROM mail_item_labels
         WHERE mail_item_id = ANY($1)
         ORDER BY label",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_item: HashMap<i64, (Vec<String>, Vec<String>)> = HashMap::new();
    for (item_id, label, is_custom) in rows {
        let entry = by_item.entry(item_id).or_default();
        if is_custom {
            entry.1.push(label);
        } else {
            entry.0.push(label);
        }
    }
    for item in items {
        if let Some((standard, custom)) = by_item.remove(&item.id) {
            item.categories = standard;
            item.custom_categories = custom;
        }
    }
    Ok(())
}

/// Escape `%`, `_` and the escape character itself for use in ILIKE.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_neutralises_wildcards() {
        assert_eq!(escape_like("100%_done"), "100\\%\\_done");
        assert_eq!(escape_like(r"back\slash"), r"back\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
