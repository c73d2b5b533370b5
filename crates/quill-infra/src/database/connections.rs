#[cfg(feature = "postgres")]
use std::time::Duration;

#[cfg(feature = "postgres")]
use sea_orm::{ConnectOptions, Database, DbConn, DbErr};

/// Configuration for the blog database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub main_url: String,
    pub main_max_connections: u32,
    pub main_min_connections: u32,
    pub secondary_databases: Vec<SecondaryDbConfig>,
}

/// Configuration for a secondary database (read replicas, reporting).
#[derive(Debug, Clone)]
pub struct SecondaryDbConfig {
    pub name: String,
    pub url: String,
    pub max_connections: u32,
}

/// A named connection to a secondary database.
#[cfg(feature = "postgres")]
pub struct NamedConnection {
    pub name: String,
    pub conn: DbConn,
}

#[cfg(not(feature = "postgres"))]
pub struct NamedConnection {
    pub name: String,
}

/// Connection pools: the main blog database plus any named secondaries.
#[cfg(feature = "postgres")]
pub struct DatabaseConnections {
    /// Holds users, categories and posts.
    pub main: DbConn,
    pub secondary: Vec<NamedConnection>,
}

#[cfg(not(feature = "postgres"))]
pub struct DatabaseConnections {
    pub secondary: Vec<NamedConnection>,
}

#[cfg(feature = "postgres")]
impl DatabaseConnections {
    /// Open every configured pool. Fails on the first database that refuses.
    pub async fn init(config: &DatabaseConfig) -> Result<Self, DbErr> {
        tracing::info!("Initializing database connections...");

        let main_opts = ConnectOptions::new(&config.main_url)
            .max_connections(config.main_max_connections)
            .min_connections(config.main_min_connections)
            .connect_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(false)
            .to_owned();

        let main = Database::connect(main_opts).await?;
        tracing::info!(pool = config.main_max_connections, "Main database connected");

        let mut secondary = Vec::with_capacity(config.secondary_databases.len());
        for db_config in &config.secondary_databases {
            let opts = ConnectOptions::new(&db_config.url)
                .max_connections(db_config.max_connections)
                .min_connections(1)
                .connect_timeout(Duration::from_secs(10))
                .to_owned();

            let conn = Database::connect(opts).await?;
            tracing::info!(
                name = %db_config.name,
                pool = db_config.max_connections,
                "Secondary database connected"
            );

            secondary.push(NamedConnection {
                name: db_config.name.clone(),
                conn,
            });
        }

        Ok(Self { main, secondary })
    }
}

impl DatabaseConnections {
    /// Secondary database names in alphabetical order.
    pub fn secondary_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.secondary.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}
