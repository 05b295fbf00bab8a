use axum::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::error::AppError;
use crate::users::model::{Rental, User, UserParam, UserPatch, UserWithRentals};

/// Persistence contract for user records. The core only depends on this
/// trait; `PgUserDirectory` is the production implementation and the test
/// suite substitutes an in-memory one.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Insert a fully-built user. The caller assigns id and timestamps;
    /// the email uniqueness constraint is enforced here.
    async fn create(&self, user: User) -> Result<User, AppError>;

    /// Select a single user matching the populated fields of `param`.
    /// Ties resolve to the earliest-created record.
    async fn find_one(&self, param: &UserParam) -> Result<User, AppError>;

    /// Like `find_one`, but eagerly loads the user's rental history.
    async fn find_one_with_rentals(&self, param: &UserParam)
        -> Result<UserWithRentals, AppError>;

    /// Apply only the populated fields of `patch` to the records matching
    /// `param`; `None` fields leave stored data untouched.
    async fn update_partial(&self, patch: UserPatch, param: &UserParam) -> Result<(), AppError>;
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, id_number, faculty, major, role, photo_key, \
     created_at, updated_at";

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_conditions(qb: &mut QueryBuilder<'_, Postgres>, param: &UserParam) {
    let mut cond = qb.separated(" AND ");
    if let Some(id) = param.id {
        cond.push("id = ");
        cond.push_bind_unseparated(id);
    }
    if let Some(email) = &param.email {
        cond.push("email = ");
        cond.push_bind_unseparated(email.clone());
    }
    if let Some(role) = param.role {
        cond.push("role = ");
        cond.push_bind_unseparated(role);
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn create(&self, user: User) -> Result<User, AppError> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users ({USER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.id_number)
        .bind(&user.faculty)
        .bind(&user.major)
        .bind(user.role)
        .bind(&user.photo_key)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => AppError::DuplicateEmail,
            _ => AppError::WriteFailed(e.to_string()),
        })?;
        Ok(created)
    }

    async fn find_one(&self, param: &UserParam) -> Result<User, AppError> {
        if param.is_empty() {
            return Err(AppError::ReadFailed("empty lookup parameter".into()));
        }
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE "));
        push_conditions(&mut qb, param);
        qb.push(" ORDER BY created_at ASC LIMIT 1");

        qb.build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::ReadFailed(e.to_string()))?
            .ok_or(AppError::NotFound)
    }

    async fn find_one_with_rentals(
        &self,
        param: &UserParam,
    ) -> Result<UserWithRentals, AppError> {
        let user = self.find_one(param).await?;
        let rentals = sqlx::query_as::<_, Rental>(
            r#"
            SELECT id, user_id, book_id, rented_at, returned_at
            FROM rentals
            WHERE user_id = $1
            ORDER BY rented_at ASC
            "#,
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::ReadFailed(e.to_string()))?;
        Ok(UserWithRentals { user, rentals })
    }

    async fn update_partial(&self, patch: UserPatch, param: &UserParam) -> Result<(), AppError> {
        if param.is_empty() {
            return Err(AppError::WriteFailed("empty lookup parameter".into()));
        }
        if patch.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = ");
        qb.push_bind(OffsetDateTime::now_utc());
        if let Some(name) = patch.name {
            qb.push(", name = ");
            qb.push_bind(name);
        }
        if let Some(id_number) = patch.id_number {
            qb.push(", id_number = ");
            qb.push_bind(id_number);
        }
        if let Some(faculty) = patch.faculty {
            qb.push(", faculty = ");
            qb.push_bind(faculty);
        }
        if let Some(major) = patch.major {
            qb.push(", major = ");
            qb.push_bind(major);
        }
        if let Some(photo_key) = patch.photo_key {
            qb.push(", photo_key = ");
            qb.push_bind(photo_key);
        }
        qb.push(" WHERE ");
        push_conditions(&mut qb, param);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::WriteFailed(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
