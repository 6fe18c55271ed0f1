use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, warn};

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{MemoryUserStore, PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::db;
use crate::images::repo::{ImageStore, MemoryImageStore, PgImageStore};
use crate::storage::{LocalStorage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub images: Arc<dyn ImageStore>,
    pub storage: Arc<dyn StorageClient>,
    pub jwt: JwtKeys,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let storage =
            Arc::new(LocalStorage::new(&config.storage.upload_dir).await?) as Arc<dyn StorageClient>;

        let (users, images): (Arc<dyn UserStore>, Arc<dyn ImageStore>) =
            match config.database_url.as_deref() {
                Some(url) => {
                    let pool = db::connect(url).await?;
                    db::run_migrations(&pool).await?;
                    (
                        Arc::new(PgUserStore::new(pool.clone())),
                        Arc::new(PgImageStore::new(pool)),
                    )
                }
                None => {
                    warn!("DATABASE_URL not set; using in-memory stores, data is lost on exit");
                    (
                        Arc::new(MemoryUserStore::new()),
                        Arc::new(MemoryImageStore::new()),
                    )
                }
            };

        info!(upload_dir = %config.storage.upload_dir.display(), "state initialised");
        Ok(Self::from_parts(config, users, images, storage))
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        images: Arc<dyn ImageStore>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        let jwt = JwtKeys::from_config(&config.jwt);
        Self {
            config: Arc::new(config),
            users,
            images,
            storage,
            jwt,
        }
    }

    /// Fresh in-memory stores over a local upload directory.
    pub async fn in_memory(config: AppConfig) -> anyhow::Result<Self> {
        let storage = LocalStorage::new(&config.storage.upload_dir).await?;
        Ok(Self::from_parts(
            config,
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryImageStore::new()),
            Arc::new(storage),
        ))
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
