use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::models::todo::{decode_tags, Priority, TodoItem, TodoRow};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

type DBPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type DBConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::PoolError),
    #[error("database error: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("could not encode tags: {0}")]
    Tags(#[from] serde_json::Error),
    #[error("todo {id} is corrupt: {reason}")]
    CorruptRow { id: i32, reason: String },
}

impl RepositoryError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            RepositoryError::Query(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _
            ))
        )
    }
}

#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(r2d2::Error::QueryError)
    }
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: DBPool,
}

impl Database {
    pub fn connect(database_url: &str, pool_size: u32) -> Result<Self, RepositoryError> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool: DBPool = r2d2::Pool::builder()
            .max_size(pool_size)
            .connection_customizer(Box::new(SqlitePragmas))
            .connection_timeout(Duration::from_secs(10))
            .build(manager)?;
        tracing::info!(database_url, pool_size, "connected to database");
        Ok(Database { pool })
    }

    /// A private in-memory database with migrations applied.
    ///
    /// Every SQLite `:memory:` connection is its own database, so the pool
    /// holds exactly one connection that is never recycled.
    pub fn in_memory() -> Result<Self, RepositoryError> {
        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool: DBPool = r2d2::Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_customizer(Box::new(SqlitePragmas))
            .build(manager)?;
        let database = Database { pool };
        database.run_migrations()?;
        Ok(database)
    }

    pub fn run_migrations(&self) -> Result<(), RepositoryError> {
        let mut conn = self.conn()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| RepositoryError::Migration(e.to_string()))?;
        tracing::info!(count = applied.len(), "applied pending migrations");
        Ok(())
    }

    pub(crate) fn conn(&self) -> Result<DBConnection, RepositoryError> {
        Ok(self.pool.get()?)
    }
}

impl TryFrom<TodoRow> for TodoItem {
    type Error = RepositoryError;

    fn try_from(row: TodoRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |reason: String| RepositoryError::CorruptRow { id, reason };
        let priority = Priority::try_from(row.priority).map_err(|e| corrupt(e.to_string()))?;
        let tags = decode_tags(row.tags.as_deref()).map_err(|e| corrupt(e.to_string()))?;

        Ok(TodoItem {
            id: row.id,
            title: row.title,
            description: row.description,
            is_completed: row.is_completed,
            created_at: row.created_at.and_utc(),
            completed_at: row.completed_at.map(|at| at.and_utc()),
            user_id: row.user_id,
            priority,
            due_date: row.due_date.map(|at| at.and_utc()),
            tags,
            is_archived: row.is_archived,
            archived_at: row.archived_at.map(|at| at.and_utc()),
        })
    }
}
