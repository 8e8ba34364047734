// Dictionary
pub mod attributes;

// Category tree and its attribute bindings
pub mod categories;
pub mod category_bindings;

// Reusable templates
pub mod content_models;

// Content and its attribute selection
pub mod content_assignments;
pub mod contents;

use sea_orm::{sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Bumps `version` on one owner row, optionally compare-and-swapping against
/// `expected`. Run as the first statement of a replace transaction, it holds
/// the owner's row lock until commit.
pub(crate) async fn bump_version<E, C>(
    conn: &C,
    kind: &str,
    id_column: E::Column,
    version_column: E::Column,
    updated_at_column: E::Column,
    id: Uuid,
    expected: Option<i32>,
) -> Result<(), ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let mut update = E::update_many()
        .col_expr(version_column, Expr::col(version_column).add(1))
        .col_expr(updated_at_column, Expr::value(chrono::Utc::now()))
        .filter(id_column.eq(id));
    if let Some(expected) = expected {
        update = update.filter(version_column.eq(expected));
    }

    let result = update.exec(conn).await?;
    if result.rows_affected > 0 {
        return Ok(());
    }

    let exists = match expected {
        Some(_) => E::find().filter(id_column.eq(id)).one(conn).await?.is_some(),
        None => false,
    };
    Err(if exists {
        ServiceError::ConcurrentModification(id)
    } else {
        ServiceError::not_found(kind, id)
    })
}

/// Trims a required text field, rejecting blanks.
pub(crate) fn required_text(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "{} must not be blank",
            field
        )));
    }
    Ok(trimmed.to_string())
}
