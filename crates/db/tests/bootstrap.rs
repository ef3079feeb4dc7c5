use sqlx::PgPool;

/// Full bootstrap test: connect, verify lookup seed data and pgvector.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    larder_db::health_check(&pool).await.unwrap();

    // Verify all three lookup tables exist and have seed data.
    let tables = ["job_statuses", "task_statuses", "image_statuses"];

    for table in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert!(count.0 > 0, "{table} should have seed data, got 0 rows");
    }
}

/// Lookup names must line up with the 1-based Rust enums.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_seed_order(pool: PgPool) {
    let names: Vec<(i16, String)> =
        sqlx::query_as("SELECT id, name FROM job_statuses ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
    let expected = ["pending", "running", "completed", "failed", "cancelled"];
    for (i, (id, name)) in names.iter().enumerate() {
        assert_eq!(*id as usize, i + 1);
        assert_eq!(name, expected[i]);
    }
}

/// Verify pgvector extension is available.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pgvector_available(pool: PgPool) {
    let result: (String,) = sqlx::query_as("SELECT '[1,2,3]'::vector::text")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(result.0, "[1,2,3]");
}
