//! PostgreSQL-backed record store.
//!
//! Batch inserts go through a single UNNEST statement per batch with
//! `ON CONFLICT … DO NOTHING` on the tenant-scoped natural key, so re-imports
//! of already-persisted rows are skipped inside the database rather than
//! round-tripped row by row. Batch updates run as one transaction. All
//! membership lookups use `= ANY($n)` array parameters.
//!
//! Source values arrive normalized by the import engine (dates as ISO,
//! numbers as plain decimals, booleans as true/false), so the text → typed
//! casts here are mechanical.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::{NewRecord, RecordStore, RecordUpdate};
use crate::error::StoreError;
use crate::models::{EntityKind, StoredRecord};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cast {
    Text,
    Numeric,
    Date,
    Int,
    Boolean,
}

#[derive(Debug, Clone, Copy)]
struct ColumnDef {
    canonical: &'static str,
    column: &'static str,
    cast: Cast,
}

const fn col(canonical: &'static str, column: &'static str, cast: Cast) -> ColumnDef {
    ColumnDef {
        canonical,
        column,
        cast,
    }
}

const CONSTITUENT_COLUMNS: &[ColumnDef] = &[
    col("prefix", "prefix", Cast::Text),
    col("firstName", "first_name", Cast::Text),
    col("middleName", "middle_name", Cast::Text),
    col("lastName", "last_name", Cast::Text),
    col("suffix", "suffix", Cast::Text),
    col("email", "email", Cast::Text),
    col("phone", "phone", Cast::Text),
    col("addressLine1", "address_line1", Cast::Text),
    col("addressLine2", "address_line2", Cast::Text),
    col("city", "city", Cast::Text),
    col("state", "state", Cast::Text),
    col("postalCode", "postal_code", Cast::Text),
    col("country", "country", Cast::Text),
    col("constituentType", "constituent_type", Cast::Text),
    col("classYear", "class_year", Cast::Int),
    col("schoolCollege", "school_college", Cast::Text),
    col("estimatedCapacity", "estimated_capacity", Cast::Numeric),
    col("capacitySource", "capacity_source", Cast::Text),
    col("assignedOfficerId", "assigned_officer_id", Cast::Text),
    col("portfolioTier", "portfolio_tier", Cast::Text),
];

const GIFT_COLUMNS: &[ColumnDef] = &[
    col("amount", "amount", Cast::Numeric),
    col("giftDate", "gift_date", Cast::Date),
    col("giftType", "gift_type", Cast::Text),
    col("fundName", "fund_name", Cast::Text),
    col("fundCode", "fund_code", Cast::Text),
    col("campaign", "campaign", Cast::Text),
    col("appeal", "appeal", Cast::Text),
    col("recognitionAmount", "recognition_amount", Cast::Numeric),
    col("isAnonymous", "is_anonymous", Cast::Boolean),
    col("isMatching", "is_matching", Cast::Boolean),
    col("matchingCompany", "matching_company", Cast::Text),
    col("tributeType", "tribute_type", Cast::Text),
    col("tributeName", "tribute_name", Cast::Text),
];

const CONTACT_COLUMNS: &[ColumnDef] = &[
    col("contactDate", "contact_date", Cast::Date),
    col("contactType", "contact_type", Cast::Text),
    col("subject", "subject", Cast::Text),
    col("notes", "notes", Cast::Text),
    col("outcome", "outcome", Cast::Text),
    col("nextAction", "next_action", Cast::Text),
    col("nextActionDate", "next_action_date", Cast::Date),
];

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Constituent => "constituents",
        EntityKind::Gift => "gifts",
        EntityKind::Contact => "contacts",
    }
}

fn columns(kind: EntityKind) -> &'static [ColumnDef] {
    match kind {
        EntityKind::Constituent => CONSTITUENT_COLUMNS,
        EntityKind::Gift => GIFT_COLUMNS,
        EntityKind::Contact => CONTACT_COLUMNS,
    }
}

/// `NULLIF(expr, '')` with the column's typed cast applied.
fn cast_expr(expr: &str, cast: Cast) -> String {
    match cast {
        Cast::Text => format!("NULLIF({expr}, '')"),
        Cast::Numeric => format!("NULLIF({expr}, '')::numeric"),
        Cast::Date => format!("NULLIF({expr}, '')::date"),
        // Via numeric so "1985.0" style values survive the cast.
        Cast::Int => format!("NULLIF({expr}, '')::numeric::int"),
        Cast::Boolean => format!("NULLIF({expr}, '')::boolean"),
    }
}

/// Select-list rendering every canonical column back to text.
fn select_list(kind: EntityKind) -> String {
    let mut exprs: Vec<String> = match kind {
        EntityKind::Constituent => vec!["id".into(), "external_id".into()],
        _ => vec![
            "g.id".into(),
            "g.external_id".into(),
            "c.external_id AS constituent_external_id".into(),
        ],
    };
    let qualifier = if kind == EntityKind::Constituent { "" } else { "g." };
    for def in columns(kind) {
        let expr = match def.cast {
            Cast::Text => format!("{qualifier}{}", def.column),
            _ => format!("{qualifier}{}::text", def.column),
        };
        exprs.push(expr);
    }
    exprs.join(", ")
}

fn record_from_row(kind: EntityKind, row: &sqlx::postgres::PgRow) -> Result<StoredRecord, sqlx::Error> {
    let id: Uuid = row.try_get(0)?;
    let external_id: Option<String> = row.try_get(1)?;

    let mut fields = BTreeMap::new();
    if let Some(key) = &external_id {
        fields.insert("externalId".to_string(), key.clone());
    }

    let mut index = 2;
    if kind != EntityKind::Constituent {
        let owner_key: Option<String> = row.try_get(index)?;
        if let Some(key) = owner_key {
            fields.insert("constituentExternalId".to_string(), key);
        }
        index += 1;
    }
    for def in columns(kind) {
        let value: Option<String> = row.try_get(index)?;
        if let Some(value) = value {
            fields.insert(def.canonical.to_string(), value);
        }
        index += 1;
    }

    Ok(StoredRecord {
        id,
        external_id,
        fields,
    })
}

fn escape_like(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_records(
        &self,
        kind: EntityKind,
        where_clause: &str,
        tenant: Uuid,
        values: &[String],
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let sql = if kind == EntityKind::Constituent {
            format!(
                "SELECT {} FROM constituents WHERE {}",
                select_list(kind),
                where_clause
            )
        } else {
            format!(
                "SELECT {} FROM {} g JOIN constituents c ON c.id = g.constituent_id WHERE {}",
                select_list(kind),
                table(kind),
                where_clause
            )
        };

        let rows = sqlx::query(&sql)
            .bind(tenant)
            .bind(values)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| record_from_row(kind, row).map_err(StoreError::from))
            .collect()
    }

}

/// Build one sparse UPDATE statement. Returns `None` when the update
/// carries no storable fields.
fn update_statement(kind: EntityKind, update: &RecordUpdate) -> Option<(String, Vec<String>)> {
    let defs = columns(kind);
    let mut sets = Vec::new();
    let mut values = Vec::new();

    for (field, value) in &update.fields {
        let Some(def) = defs.iter().find(|d| d.canonical == field.as_str()) else {
            log::warn!("ignoring unknown field `{}` in {} update", field, kind);
            continue;
        };
        let param = format!("${}", values.len() + 1);
        sets.push(format!("{} = {}", def.column, cast_expr(&param, def.cast)));
        values.push(value.clone());
    }
    if sets.is_empty() {
        return None;
    }
    sets.push("updated_at = NOW()".to_string());

    let sql = format!(
        "UPDATE {} SET {} WHERE id = ${} AND tenant_id = ${}",
        table(kind),
        sets.join(", "),
        values.len() + 1,
        values.len() + 2,
    );
    Some((sql, values))
}

impl RecordStore for PgStore {
    async fn find_id_by_external_id(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        external_id: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        let sql = format!(
            "SELECT id FROM {} WHERE tenant_id = $1 AND external_id = $2",
            table(kind)
        );
        let id = sqlx::query_scalar(&sql)
            .bind(tenant)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn find_ids_by_external_ids(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        external_ids: &[String],
    ) -> Result<HashMap<String, Uuid>, StoreError> {
        if external_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT external_id, id FROM {} WHERE tenant_id = $1 AND external_id = ANY($2)",
            table(kind)
        );
        let rows: Vec<(String, Uuid)> = sqlx::query_as(&sql)
            .bind(tenant)
            .bind(external_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    async fn fetch_by_external_ids(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        external_ids: &[String],
    ) -> Result<Vec<StoredRecord>, StoreError> {
        if external_ids.is_empty() {
            return Ok(Vec::new());
        }
        let where_clause = if kind == EntityKind::Constituent {
            "tenant_id = $1 AND external_id = ANY($2)"
        } else {
            "g.tenant_id = $1 AND g.external_id = ANY($2)"
        };
        self.fetch_records(kind, where_clause, tenant, external_ids)
            .await
    }

    async fn find_constituents_by_emails(
        &self,
        tenant: Uuid,
        emails: &[String],
    ) -> Result<Vec<StoredRecord>, StoreError> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_records(
            EntityKind::Constituent,
            "tenant_id = $1 AND lower(email) = ANY($2)",
            tenant,
            emails,
        )
        .await
    }

    async fn find_constituents_by_last_name_prefix(
        &self,
        tenant: Uuid,
        prefix: &str,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let pattern = vec![format!("{}%", escape_like(&prefix.to_lowercase()))];
        self.fetch_records(
            EntityKind::Constituent,
            "tenant_id = $1 AND lower(last_name) LIKE ANY($2)",
            tenant,
            &pattern,
        )
        .await
    }

    async fn list_external_ids(
        &self,
        tenant: Uuid,
        kind: EntityKind,
    ) -> Result<Vec<String>, StoreError> {
        let sql = format!(
            "SELECT external_id FROM {} WHERE tenant_id = $1 AND external_id IS NOT NULL",
            table(kind)
        );
        let keys = sqlx::query_scalar(&sql)
            .bind(tenant)
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }

    async fn insert_batch(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        records: &[NewRecord],
    ) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        let defs = columns(kind);
        let with_ref = kind.references_constituent();

        // Columnar arrays for UNNEST.
        let mut external_ids: Vec<Option<String>> = Vec::with_capacity(records.len());
        let mut constituent_ids: Vec<Option<Uuid>> = Vec::with_capacity(records.len());
        let mut value_columns: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(records.len()); defs.len()];
        for record in records {
            external_ids.push(record.external_id.clone());
            if with_ref {
                constituent_ids.push(record.constituent_id);
            }
            for (i, def) in defs.iter().enumerate() {
                value_columns[i].push(record.fields.get(def.canonical).cloned());
            }
        }

        let mut insert_cols = vec!["tenant_id", "external_id"];
        let mut select_exprs = vec!["$1".to_string(), "t.external_id".to_string()];
        let mut unnest_params = vec!["$2::text[]".to_string()];
        let mut t_cols = vec!["external_id"];
        if with_ref {
            insert_cols.push("constituent_id");
            select_exprs.push("t.constituent_id".to_string());
            unnest_params.push("$3::uuid[]".to_string());
            t_cols.push("constituent_id");
        }
        let first_value_param = unnest_params.len() + 2;
        for (i, def) in defs.iter().enumerate() {
            insert_cols.push(def.column);
            select_exprs.push(cast_expr(&format!("t.{}", def.column), def.cast));
            unnest_params.push(format!("${}::text[]", first_value_param + i));
            t_cols.push(def.column);
        }

        let sql = format!(
            "INSERT INTO {} ({}) SELECT {} FROM UNNEST({}) AS t({}) \
             ON CONFLICT (tenant_id, external_id) DO NOTHING",
            table(kind),
            insert_cols.join(", "),
            select_exprs.join(", "),
            unnest_params.join(", "),
            t_cols.join(", "),
        );

        let mut query = sqlx::query(&sql).bind(tenant).bind(&external_ids);
        if with_ref {
            query = query.bind(&constituent_ids);
        }
        for column_values in &value_columns {
            query = query.bind(column_values);
        }

        let result = query.execute(&self.pool).await?;
        let inserted = result.rows_affected() as usize;
        if inserted < records.len() {
            log::debug!(
                "insert_batch({}): {} of {} rows inserted, {} skipped as natural-key conflicts",
                kind,
                inserted,
                records.len(),
                records.len() - inserted
            );
        }
        Ok(inserted)
    }

    async fn insert_one(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        record: &NewRecord,
    ) -> Result<usize, StoreError> {
        let defs = columns(kind);
        let with_ref = kind.references_constituent();

        let mut insert_cols = vec!["tenant_id", "external_id"];
        let mut value_exprs = vec!["$1".to_string(), "$2".to_string()];
        if with_ref {
            insert_cols.push("constituent_id");
            value_exprs.push("$3".to_string());
        }
        let first_value_param = value_exprs.len() + 1;
        for (i, def) in defs.iter().enumerate() {
            insert_cols.push(def.column);
            value_exprs.push(cast_expr(&format!("${}", first_value_param + i), def.cast));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT (tenant_id, external_id) DO NOTHING",
            table(kind),
            insert_cols.join(", "),
            value_exprs.join(", "),
        );

        let mut query = sqlx::query(&sql).bind(tenant).bind(&record.external_id);
        if with_ref {
            query = query.bind(record.constituent_id);
        }
        for def in defs {
            query = query.bind(record.fields.get(def.canonical).map(String::as_str));
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }

    async fn update_batch(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        updates: &[RecordUpdate],
    ) -> Result<(), StoreError> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for update in updates {
            let Some((sql, values)) = update_statement(kind, update) else {
                continue;
            };
            let mut query = sqlx::query(&sql);
            for value in &values {
                query = query.bind(value);
            }
            query = query.bind(update.id).bind(tenant);
            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_one(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        update: &RecordUpdate,
    ) -> Result<(), StoreError> {
        let Some((sql, values)) = update_statement(kind, update) else {
            return Ok(());
        };
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = query.bind(value);
        }
        query = query.bind(update.id).bind(tenant);

        let result = query.execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Rejected(format!(
                "no {} record {} for this tenant",
                kind, update.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_storable_field_has_a_column() {
        use crate::schema;
        for kind in [EntityKind::Constituent, EntityKind::Gift, EntityKind::Contact] {
            for spec in schema::fields(kind) {
                if spec.name == "externalId" || spec.name == "constituentExternalId" {
                    continue;
                }
                assert!(
                    columns(kind).iter().any(|c| c.canonical == spec.name),
                    "{} field {} has no column mapping",
                    kind,
                    spec.name
                );
            }
        }
    }

    #[test]
    fn cast_expressions_wrap_empty_strings_to_null() {
        assert_eq!(cast_expr("t.city", Cast::Text), "NULLIF(t.city, '')");
        assert_eq!(
            cast_expr("$4", Cast::Numeric),
            "NULLIF($4, '')::numeric"
        );
        assert_eq!(
            cast_expr("t.class_year", Cast::Int),
            "NULLIF(t.class_year, '')::numeric::int"
        );
    }

    #[test]
    fn like_prefixes_are_escaped() {
        assert_eq!(escape_like("o'br"), "o'br");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
    }
}
