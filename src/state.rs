use crate::config::AppConfig;
use crate::errors::MemberError;
use crate::renewal::{RenewalLog, RenewalRecorder};
use crate::repository::MemberRepository;
use crate::sheet::SheetBackend;
use std::sync::Arc;

/// Handles shared by every request. Built once at start-up; holds no
/// member data.
#[derive(Clone)]
pub struct AppState {
    pub members: MemberRepository,
    pub history: RenewalLog,
}

impl AppState {
    pub async fn connect(backend: Arc<dyn SheetBackend>, config: &AppConfig) -> Result<Self, MemberError> {
        let members = MemberRepository::open(Arc::clone(&backend), config.members_tab.clone()).await?;
        let history = RenewalLog::open(backend, config.renewals_tab.clone()).await?;
        Ok(Self { members, history })
    }

    pub fn recorder(&self) -> RenewalRecorder<'_> {
        RenewalRecorder::new(&self.members, &self.history)
    }
}
