use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

/// Attributes of one entity, keyed by attribute name.
pub type EntityAttributes = Map<String, Value>;

/// Entity-attribute-value metadata store backed by the `entities` table.
///
/// Each attribute is one row; values are stored as JSON text so lists and
/// numbers survive the round trip. A value that is not valid JSON is read
/// back as a plain string.
#[derive(Clone)]
pub struct EntityStore {
    pool: SqlitePool,
}

impl EntityStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_entity(
        &self,
        key: &str,
        namespace: &str,
    ) -> Result<Option<EntityAttributes>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT attribute, value FROM entities WHERE namespace = ? AND entity_key = ? ORDER BY attribute"
        )
        .bind(namespace)
        .bind(key)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(
            rows.into_iter()
                .map(|(attribute, value)| (attribute, decode_value(&value)))
                .collect(),
        ))
    }

    pub async fn get_all_entities(
        &self,
        namespace: &str,
    ) -> Result<BTreeMap<String, EntityAttributes>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            "SELECT entity_key, attribute, value FROM entities WHERE namespace = ? ORDER BY entity_key, attribute"
        )
        .bind(namespace)
        .fetch_all(&self.pool)
        .await?;

        let mut entities: BTreeMap<String, EntityAttributes> = BTreeMap::new();
        for (key, attribute, value) in rows {
            entities
                .entry(key)
                .or_default()
                .insert(attribute, decode_value(&value));
        }

        Ok(entities)
    }

    pub async fn set_attribute(
        &self,
        namespace: &str,
        key: &str,
        attribute: &str,
        value: &Value,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO entities (namespace, entity_key, attribute, value, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(namespace, entity_key, attribute)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(namespace)
        .bind(key)
        .bind(attribute)
        .bind(value.to_string())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes every attribute of `attributes`; attributes not mentioned are left untouched.
    pub async fn put_entity(
        &self,
        namespace: &str,
        key: &str,
        attributes: &EntityAttributes,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();

        for (attribute, value) in attributes {
            sqlx::query(
                r#"
                INSERT INTO entities (namespace, entity_key, attribute, value, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(namespace, entity_key, attribute)
                DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
            )
            .bind(namespace)
            .bind(key)
            .bind(attribute)
            .bind(value.to_string())
            .bind(&now)
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Returns the number of attribute rows removed.
    pub async fn delete_entity(&self, namespace: &str, key: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM entities WHERE namespace = ? AND entity_key = ?")
            .bind(namespace)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn decode_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_value() {
        assert_eq!(decode_value("300"), json!(300));
        assert_eq!(decode_value("[\"pending\",\"cancelled\"]"), json!(["pending", "cancelled"]));
        assert_eq!(decode_value("\"Pending\""), json!("Pending"));
        assert_eq!(decode_value("not json"), json!("not json"));
    }
}
