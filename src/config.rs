use std::{env, path::PathBuf};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SHEET_PATH: &str = "data/membership.json";
pub const DEFAULT_MEMBERS_TAB: &str = "Current Members";
pub const DEFAULT_RENEWALS_TAB: &str = "Renewal History";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub sheet_path: PathBuf,
    pub members_tab: String,
    pub renewals_tab: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            sheet_path: PathBuf::from(DEFAULT_SHEET_PATH),
            members_tab: DEFAULT_MEMBERS_TAB.to_string(),
            renewals_tab: DEFAULT_RENEWALS_TAB.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: lookup("PORT")
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(defaults.port),
            sheet_path: lookup("GYM_SHEET_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.sheet_path),
            members_tab: non_blank(lookup("GYM_MEMBERS_TAB")).unwrap_or(defaults.members_tab),
            renewals_tab: non_blank(lookup("GYM_RENEWALS_TAB")).unwrap_or(defaults.renewals_tab),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
