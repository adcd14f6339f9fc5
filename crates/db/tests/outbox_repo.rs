//! Integration tests for the outbox repository.
//!
//! Exercises `OutboxRepo` against a real database to verify that:
//! - Inserted rows start unprocessed and keep their payload verbatim
//! - Claims return unprocessed rows in ascending id order, capped by limit
//! - Marking is scoped to the given ids and never un-processes a row
//! - A rolled-back transaction leaves rows unprocessed

use learnhub_db::repositories::OutboxRepo;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn insert_creates_unprocessed_row(pool: PgPool) {
    let payload = json!({"enrollmentId": 123, "userId": 456, "courseId": 789});
    let id = OutboxRepo::insert(&pool, "enrollment.created", &payload)
        .await
        .unwrap();
    assert!(id > 0);

    let row = OutboxRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(row.topic, "enrollment.created");
    assert_eq!(row.payload, payload);
    assert!(!row.processed);
    assert_eq!(OutboxRepo::pending_count(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ids_increase_monotonically(pool: PgPool) {
    let first = OutboxRepo::insert(&pool, "a.one", &json!({})).await.unwrap();
    let second = OutboxRepo::insert(&pool, "a.two", &json!({})).await.unwrap();
    assert!(second > first);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn blank_topic_is_rejected_by_schema(pool: PgPool) {
    let result = OutboxRepo::insert(&pool, "  ", &json!({})).await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claim_returns_pending_in_id_order_up_to_limit(pool: PgPool) {
    let mut ids = Vec::new();
    for n in 0..5 {
        ids.push(
            OutboxRepo::insert(&pool, "lesson.completed", &json!({"n": n}))
                .await
                .unwrap(),
        );
    }

    let mut tx = pool.begin().await.unwrap();
    let claimed = OutboxRepo::claim_pending(&mut tx, 3).await.unwrap();
    let claimed_ids: Vec<i64> = claimed.iter().map(|e| e.id).collect();
    assert_eq!(claimed_ids, ids[..3].to_vec());
    tx.rollback().await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn mark_processed_only_touches_given_ids(pool: PgPool) {
    let a = OutboxRepo::insert(&pool, "quiz.submitted", &json!({})).await.unwrap();
    let b = OutboxRepo::insert(&pool, "quiz.submitted", &json!({})).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let marked = OutboxRepo::mark_processed(&mut tx, &[a]).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(marked, 1);

    assert!(OutboxRepo::find_by_id(&pool, a).await.unwrap().unwrap().processed);
    assert!(!OutboxRepo::find_by_id(&pool, b).await.unwrap().unwrap().processed);

    // Already-processed rows are not counted twice.
    let mut tx = pool.begin().await.unwrap();
    let marked = OutboxRepo::mark_processed(&mut tx, &[a, b]).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(marked, 1);
    assert_eq!(OutboxRepo::pending_count(&pool).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn mark_processed_with_no_ids_is_noop(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(OutboxRepo::mark_processed(&mut conn, &[]).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rollback_leaves_rows_unprocessed(pool: PgPool) {
    let id = OutboxRepo::insert(&pool, "certificate.issued", &json!({})).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let claimed = OutboxRepo::claim_pending(&mut tx, 10).await.unwrap();
    assert_eq!(claimed.len(), 1);
    OutboxRepo::mark_processed(&mut tx, &[id]).await.unwrap();
    tx.rollback().await.unwrap();

    assert!(!OutboxRepo::find_by_id(&pool, id).await.unwrap().unwrap().processed);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn processed_cannot_be_reset(pool: PgPool) {
    let id = OutboxRepo::insert(&pool, "course.published", &json!({})).await.unwrap();
    let mut tx = pool.begin().await.unwrap();
    OutboxRepo::mark_processed(&mut tx, &[id]).await.unwrap();
    tx.commit().await.unwrap();

    let result = sqlx::query("UPDATE outbox_events SET processed = false WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await;
    assert!(result.is_err(), "processed must be one-way");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_claims_skip_locked_rows(pool: PgPool) {
    for n in 0..4 {
        OutboxRepo::insert(&pool, "enrollment.created", &json!({"n": n}))
            .await
            .unwrap();
    }

    let mut first = pool.begin().await.unwrap();
    let a = OutboxRepo::claim_pending(&mut first, 2).await.unwrap();

    let mut second = pool.begin().await.unwrap();
    let b = OutboxRepo::claim_pending(&mut second, 10).await.unwrap();

    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 2);
    assert!(a.iter().all(|x| b.iter().all(|y| x.id != y.id)));

    first.rollback().await.unwrap();
    second.rollback().await.unwrap();
}
