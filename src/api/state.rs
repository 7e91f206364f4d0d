use std::sync::Arc;

use crate::config::Config;
use crate::observability::Metrics;
use crate::queue::Scheduler;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scheduler: Arc<Scheduler>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Config, scheduler: Arc<Scheduler>, metrics: Arc<Metrics>) -> Self {
        Self {
            config: Arc::new(config),
            scheduler,
            metrics,
        }
    }
}
