pub mod app;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod handlers;
pub mod membership;
pub mod models;
pub mod renewal;
pub mod repository;
pub mod sheet;
pub mod state;
pub mod status;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use errors::MemberError;
pub use sheet::{FileWorkbook, SheetBackend};
pub use state::AppState;
