use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    catalog::Catalog, config::Config, recommend::RecommendationGateway, scroll::FrameCache,
    session::SessionRegistry, store::Repository,
};

#[derive(Clone)]
pub struct AppState {
    pub repo: Repository,
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<SessionRegistry>,
    pub gateway: Arc<dyn RecommendationGateway>,
    pub frames: Arc<FrameCache>,
    pub config: Config,
}

impl FromRef<AppState> for Repository {
    fn from_ref(state: &AppState) -> Self {
        state.repo.clone()
    }
}

impl FromRef<AppState> for Arc<Catalog> {
    fn from_ref(state: &AppState) -> Self {
        state.catalog.clone()
    }
}

impl FromRef<AppState> for Arc<SessionRegistry> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<FrameCache> {
    fn from_ref(state: &AppState) -> Self {
        state.frames.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
