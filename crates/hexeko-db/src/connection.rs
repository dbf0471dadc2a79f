//! SurrealDB connection bootstrap and repository construction.

use serde::{Deserialize, Serialize};
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::error::DbError;
use crate::repository::{
    SurrealDivisionRepository, SurrealFinancerRepository, SurrealMembershipRepository,
    SurrealRoleRepository, SurrealUserRepository,
};
use crate::schema::run_migrations;

/// Where the platform database lives. Loaded from the `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// WebSocket endpoint, without scheme.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "hexeko".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// A migrated database handle that hands out repositories.
///
/// Every constructor applies pending migrations before returning, so the
/// repositories built from a manager always see the current schema.
#[derive(Clone)]
pub struct DbManager<C: Connection = Client> {
    db: Surreal<C>,
}

impl DbManager<Client> {
    /// Open the configured server, sign in as root and migrate.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let unreachable = |source: surrealdb::Error| DbError::Connection {
            url: config.url.clone(),
            source,
        };

        let db = Surreal::new::<Ws>(&config.url).await.map_err(unreachable)?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await
        .map_err(unreachable)?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(unreachable)?;

        Self::from_client(db).await
    }
}

impl<C: Connection> DbManager<C> {
    /// Adopt a client whose namespace and database are already selected.
    pub async fn from_client(db: Surreal<C>) -> Result<Self, DbError> {
        run_migrations(&db).await?;
        info!("Database ready");
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<C> {
        &self.db
    }

    pub fn divisions(&self) -> SurrealDivisionRepository<C> {
        SurrealDivisionRepository::new(self.db.clone())
    }

    pub fn financers(&self) -> SurrealFinancerRepository<C> {
        SurrealFinancerRepository::new(self.db.clone())
    }

    pub fn roles(&self) -> SurrealRoleRepository<C> {
        SurrealRoleRepository::new(self.db.clone())
    }

    pub fn memberships(&self) -> SurrealMembershipRepository<C> {
        SurrealMembershipRepository::new(self.db.clone())
    }

    pub fn users(&self) -> SurrealUserRepository<C> {
        SurrealUserRepository::new(self.db.clone())
    }
}
