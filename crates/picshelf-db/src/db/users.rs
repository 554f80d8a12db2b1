use async_trait::async_trait;
use picshelf_core::{AppError, NewUser, User, UserUpdate};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

const USER_COLUMNS: &str =
    "id, COALESCE(name, '') AS name, COALESCE(email, '') AS email, profilePic";

/// The slice of user storage the upload glue and the reconciler depend on.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// A page of users ordered by id ascending.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError>;

    /// Apply a partial update. Returns false when no row has the given id.
    async fn update(&self, id: i64, update: &UserUpdate) -> Result<bool, AppError>;
}

/// Repository for the `users` table
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user and return its id
    #[tracing::instrument(skip(self, user), fields(db.table = "users", db.operation = "insert"))]
    pub async fn create(&self, user: &NewUser) -> Result<i64, AppError> {
        let profile_pic = user
            .profile_pic
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let result = sqlx::query("INSERT INTO users (name, email, profilePic) VALUES (?, ?, ?)")
            .bind(user.name.trim())
            .bind(user.email.trim())
            .bind(profile_pic)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Sqlite, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<Sqlite, User>(&format!(
            "SELECT {} FROM users ORDER BY id ASC LIMIT ? OFFSET ?",
            USER_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    pub async fn list_all(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<Sqlite, User>(&format!(
            "SELECT {} FROM users ORDER BY id ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    pub async fn exists(&self, id: i64) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Sqlite, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Update the non-blank fields of `update`. An empty update only checks existence.
    #[tracing::instrument(skip(self, update), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    pub async fn update(&self, id: i64, update: &UserUpdate) -> Result<bool, AppError> {
        if update.is_empty() {
            return self.exists(id).await;
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut set = builder.separated(", ");
        if let Some(name) = update.name() {
            set.push("name = ").push_bind_unseparated(name.trim().to_string());
        }
        if let Some(email) = update.email() {
            set.push("email = ").push_bind_unseparated(email.trim().to_string());
        }
        if let Some(profile_pic) = update.profile_pic_value() {
            set.push("profilePic = ")
                .push_bind_unseparated(profile_pic.trim().to_string());
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
        UserRepository::list(self, limit, offset).await
    }

    async fn update(&self, id: i64, update: &UserUpdate) -> Result<bool, AppError> {
        UserRepository::update(self, id, update).await
    }
}
