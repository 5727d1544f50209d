use sqlx::{mysql::MySqlPoolOptions, MySql, Pool};
use std::sync::Arc;

use crate::modules::auth::crud::{MagicLinkCrud, UserCrud};
use crate::modules::auth::interface::{MagicLinkRepository, UserRepository};

pub type DbPool = Pool<MySql>;

/// Build the pool without waiting for MySQL. The first connection is opened in
/// the background, so callers may see queries wait while it is established.
pub fn init_db(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect_lazy(database_url)?;

    let warm_up = pool.clone();
    tokio::spawn(async move {
        match warm_up.acquire().await {
            Ok(_) => tracing::info!("Connected to MySQL"),
            Err(e) => tracing::warn!("Initial MySQL connection failed: {}", e),
        }
    });

    Ok(pool)
}

/// Entity-scoped access to the data store, shared by every request.
#[derive(Clone)]
pub struct Database {
    users: Arc<dyn UserRepository>,
    magic_links: Arc<dyn MagicLinkRepository>,
}

impl Database {
    pub fn new(users: Arc<dyn UserRepository>, magic_links: Arc<dyn MagicLinkRepository>) -> Self {
        Self { users, magic_links }
    }

    pub fn mysql(pool: DbPool) -> Self {
        Self::new(
            Arc::new(UserCrud::new(pool.clone())),
            Arc::new(MagicLinkCrud::new(pool)),
        )
    }

    pub fn user(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    pub fn magic_link(&self) -> &dyn MagicLinkRepository {
        self.magic_links.as_ref()
    }
}
