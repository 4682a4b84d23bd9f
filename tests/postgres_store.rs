//! PostgreSQL integration suite.
//!
//! Provisions a disposable Postgres container per test. Skipped unless
//! `PG_INTEGRATION_TESTS` is set, so plain `cargo test` needs no Docker.

use uuid::Uuid;

use donor_import::import::{ConstituentImporter, GiftImporter};
use donor_import::mapping::{self, FieldMapping, SuggestOptions};
use donor_import::models::{EntityKind, RawRow};
use donor_import::parse::{self, ParseOptions};
use donor_import::store::PgStore;
use donor_import::store::postgres::MIGRATOR;
use donor_import::test_support::{TestDatabase, TestDatabaseError};

async fn provision() -> Option<TestDatabase> {
    match TestDatabase::new_from_env().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::Disabled) => {
            eprintln!("skipping postgres test: PG_INTEGRATION_TESTS not set");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

fn parse_rows(text: &str) -> (Vec<String>, Vec<RawRow>) {
    let outcome = parse::parse(text, &ParseOptions::default()).expect("structurally valid input");
    (outcome.headers, outcome.rows)
}

fn confirmed_mapping(headers: &[String], kind: EntityKind) -> FieldMapping {
    let suggestion = mapping::suggest(headers, kind, &SuggestOptions::default());
    let report = mapping::validate(&suggestion.mapping, kind);
    assert!(report.is_valid(), "mapping invalid: {:?}", report.errors);
    suggestion.mapping
}

#[tokio::test]
async fn migrations_apply_and_revert_cleanly() {
    let Some(db) = provision().await else { return };
    let pool = db.pool_clone();

    MIGRATOR.run(&pool).await.expect("migrations rerun");
    MIGRATOR.undo(&pool, 0).await.expect("migrations revert");

    let constituent_tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_name = 'constituents'",
    )
    .fetch_one(&pool)
    .await
    .expect("lookup succeeded");
    assert_eq!(constituent_tables, 0);

    MIGRATOR.run(&pool).await.expect("migrations reapply");
}

#[tokio::test]
async fn constituents_and_gifts_round_trip() {
    let Some(db) = provision().await else { return };
    let store = PgStore::new(db.pool_clone());
    let tenant = Uuid::new_v4();

    let (headers, rows) = parse_rows(
        "KEYID,FIRSTNM,LASTNM,EMAIL,ESTIMATED_CAPACITY\n\
         LU-1,Bob,Smith,bob@example.com,50000\n\
         LU-2,Ann,Jones,ann@example.com,120000\n",
    );
    let mapping = confirmed_mapping(&headers, EntityKind::Constituent);
    let importer = ConstituentImporter::new(&store, tenant);

    let first = importer.process(&rows, &mapping, None).await.unwrap();
    assert_eq!((first.created, first.updated), (2, 0));
    assert!(first.errors.is_empty(), "errors: {:?}", first.errors);

    // Same content again: the fingerprint path skips both rows.
    let second = importer.process(&rows, &mapping, None).await.unwrap();
    assert_eq!((second.created, second.updated, second.skipped), (0, 0, 2));

    let (headers, rows) = parse_rows(
        "gift_id,constituent_id,amount,gift_date,gift_type\n\
         G-1,LU-1,\"1,000.00\",2024-03-15,Check\n\
         G-2,LU-404,50.00,2024-04-01,Cash\n",
    );
    let mapping = confirmed_mapping(&headers, EntityKind::Gift);
    let gifts = GiftImporter::new(&store, tenant)
        .process(&rows, &mapping, None)
        .await
        .unwrap();
    assert_eq!(gifts.created, 1);
    assert_eq!(gifts.errors.len(), 1);
    assert_eq!(gifts.errors[0].row, 2);

    let amount: String =
        sqlx::query_scalar("SELECT amount::text FROM gifts WHERE tenant_id = $1 AND external_id = 'G-1'")
            .bind(tenant)
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(amount, "1000.00");
}

#[tokio::test]
async fn sparse_updates_preserve_enriched_columns() {
    let Some(db) = provision().await else { return };
    let store = PgStore::new(db.pool_clone());
    let tenant = Uuid::new_v4();

    let (headers, rows) = parse_rows("constituent_id,last_name,city\nA1,Smith,Boston\n");
    let mapping = confirmed_mapping(&headers, EntityKind::Constituent);
    let importer = ConstituentImporter::new(&store, tenant);
    importer.process(&rows, &mapping, None).await.unwrap();

    sqlx::query(
        "UPDATE constituents SET estimated_capacity = 500000 \
         WHERE tenant_id = $1 AND external_id = 'A1'",
    )
    .bind(tenant)
    .execute(db.pool())
    .await
    .unwrap();

    let (headers, rows) = parse_rows("constituent_id,last_name,city\nA1,Smith,Cambridge\n");
    let mapping = confirmed_mapping(&headers, EntityKind::Constituent);
    let result = importer.process(&rows, &mapping, None).await.unwrap();
    assert_eq!(result.updated, 1);

    let (city, capacity): (String, Option<String>) = sqlx::query_as(
        "SELECT city, estimated_capacity::text FROM constituents \
         WHERE tenant_id = $1 AND external_id = 'A1'",
    )
    .bind(tenant)
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(city, "Cambridge");
    assert_eq!(capacity.as_deref(), Some("500000.00"));
}

#[tokio::test]
async fn tenant_scoping_holds_in_the_database() {
    let Some(db) = provision().await else { return };
    let store = PgStore::new(db.pool_clone());
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();

    let (headers, rows) = parse_rows("KEYID,LASTNM\nA1,Smith\n");
    let mapping = confirmed_mapping(&headers, EntityKind::Constituent);
    ConstituentImporter::new(&store, tenant_a)
        .process(&rows, &mapping, None)
        .await
        .unwrap();
    let result = ConstituentImporter::new(&store, tenant_b)
        .process(&rows, &mapping, None)
        .await
        .unwrap();
    assert_eq!(result.created, 1);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM constituents")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(total, 2);
}
