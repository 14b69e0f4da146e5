use crate::config::Config;
use crate::credentials::ServiceRoleStore;
use axum::extract::FromRef;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub service_roles: ServiceRoleStore,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for ServiceRoleStore {
    fn from_ref(state: &AppState) -> Self {
        state.service_roles.clone()
    }
}
