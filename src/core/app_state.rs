use std::sync::Arc;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::bb8::Pool;

use crate::core::{clock::ClinicClock, config::Config};

pub type DbPool = Pool<AsyncPgConnection>;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub config: Arc<Config>,
    pub clock: ClinicClock,
}

impl AppState {
    pub fn new(db_pool: DbPool, config: Config) -> Self {
        let clock = ClinicClock::new(config.clinic.utc_offset);
        Self {
            db_pool,
            config: Arc::new(config),
            clock,
        }
    }
}
