use sqlx::PgPool;

use crate::database::models::user::User;
use crate::database::pool::DatabaseError;

/// Look up a user by email for credential verification
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, first_name, last_name, email, phone_number, user_role, password,
         created_at, updated_at
         FROM users
         WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}
