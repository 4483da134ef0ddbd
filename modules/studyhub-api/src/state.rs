use std::sync::Arc;

use studyhub_common::{Config, Page};
use studyhub_store::{ResourceStore, VoteLedger};

use crate::auth::github::GithubOAuth;
use crate::auth::jwt::JwtService;

pub struct AppState {
    pub store: Arc<dyn ResourceStore>,
    pub ledger: VoteLedger<Arc<dyn ResourceStore>>,
    pub jwt: JwtService,
    pub github: GithubOAuth,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn ResourceStore>, config: Config) -> Self {
        Self {
            ledger: VoteLedger::new(store.clone()),
            store,
            jwt: JwtService::new(&config.session_secret),
            github: GithubOAuth::new(&config),
            config,
        }
    }

    /// Page `number` at the configured page size.
    pub fn page(&self, number: Option<u32>) -> Page {
        Page::new(number.unwrap_or(0), self.config.page_size)
    }
}
