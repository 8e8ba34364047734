/*!
 * Transaction helpers
 *
 * Every write that spans more than one statement runs between `begin` and
 * `finish`. `finish` commits an `Ok` body and rolls back an `Err` one, so
 * both outcomes show up in the transaction counters.
 */

use crate::errors::ServiceError;
use metrics::counter;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::{debug, warn};

/// Opens a transaction for the named operation
pub async fn begin(
    db: &DatabaseConnection,
    operation: &'static str,
) -> Result<DatabaseTransaction, ServiceError> {
    debug!(operation, "Starting database transaction");
    counter!("taxonomy_db.transaction.started", 1, "operation" => operation);
    db.begin().await.map_err(|e| {
        warn!(operation, error = %e, "Failed to open transaction");
        ServiceError::db_error(e)
    })
}

/// Commits a transaction opened with [`begin`]
pub async fn commit(txn: DatabaseTransaction, operation: &'static str) -> Result<(), ServiceError> {
    match txn.commit().await {
        Ok(()) => {
            counter!("taxonomy_db.transaction.committed", 1, "operation" => operation);
            debug!(operation, "Transaction committed");
            Ok(())
        }
        Err(e) => {
            counter!("taxonomy_db.transaction.rolled_back", 1, "operation" => operation);
            warn!(operation, error = %e, "Transaction commit failed");
            Err(ServiceError::db_error(e))
        }
    }
}

/// Rolls back a transaction opened with [`begin`]
pub async fn rollback(txn: DatabaseTransaction, operation: &'static str) {
    counter!("taxonomy_db.transaction.rolled_back", 1, "operation" => operation);
    match txn.rollback().await {
        Ok(()) => debug!(operation, "Transaction rolled back"),
        Err(e) => warn!(operation, error = %e, "Transaction rollback failed"),
    }
}

/// Commits on `Ok`, rolls back on `Err` and hands the body's result back.
pub async fn finish<T>(
    txn: DatabaseTransaction,
    operation: &'static str,
    result: Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    match result {
        Ok(value) => {
            commit(txn, operation).await?;
            Ok(value)
        }
        Err(err) => {
            debug!(operation, error = %err, "Aborting transaction");
            rollback(txn, operation).await;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use crate::entities::{category, Category};
    use assert_matches::assert_matches;
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
    use uuid::Uuid;

    async fn memory_db() -> DatabaseConnection {
        let db = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        run_migrations(&db).await.unwrap();
        db
    }

    fn root(name: &str) -> category::ActiveModel {
        let now = Utc::now();
        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            slug: Set(name.to_lowercase()),
            description: Set(None),
            parent_id: Set(None),
            content_model_id: Set(None),
            sort: Set(0),
            is_active: Set(true),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    #[tokio::test]
    async fn finish_discards_writes_of_a_failed_body() {
        let db = memory_db().await;

        let txn = begin(&db, "test.abort").await.unwrap();
        let result: Result<(), ServiceError> = async {
            root("Books").insert(&txn).await?;
            Err(ServiceError::Conflict("stop".into()))
        }
        .await;
        let outcome = finish(txn, "test.abort", result).await;

        assert_matches!(outcome, Err(ServiceError::Conflict(_)));
        assert_eq!(Category::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn finish_commits_a_successful_body() {
        let db = memory_db().await;

        let txn = begin(&db, "test.commit").await.unwrap();
        let result = root("Music").insert(&txn).await.map_err(ServiceError::from);
        let created = finish(txn, "test.commit", result).await.unwrap();

        assert!(Category::find_by_id(created.id).one(&db).await.unwrap().is_some());
    }
}
