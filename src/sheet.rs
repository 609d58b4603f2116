//! Tabular backing store.
//!
//! A workbook holds named tabs, each with a header row and data rows of
//! text cells. Row indexes passed to [`SheetBackend`] are 0-based data
//! rows; the header is never addressed by index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{fs, sync::Mutex};

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("workbook I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("workbook is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("tab not found: {0}")]
    MissingTab(String),

    #[error("cell out of range in {tab}: row {row}, column {col}")]
    OutOfRange { tab: String, row: usize, col: usize },
}

#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// Creates `tab` with `default_header` if it does not exist and
    /// returns the header row currently stored for it.
    async fn ensure_tab(&self, tab: &str, default_header: &[&str]) -> Result<Vec<String>, SheetError>;

    async fn rows(&self, tab: &str) -> Result<Vec<Vec<String>>, SheetError>;

    async fn append_row(&self, tab: &str, row: Vec<String>) -> Result<(), SheetError>;

    /// Overwrites one cell. Rows shorter than `col` are padded with blanks.
    async fn update_cell(&self, tab: &str, row: usize, col: usize, value: String) -> Result<(), SheetError>;

    async fn delete_row(&self, tab: &str, row: usize) -> Result<(), SheetError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Worksheet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Workbook {
    pub tabs: BTreeMap<String, Worksheet>,
}

impl Workbook {
    fn ensure_tab(&mut self, tab: &str, default_header: &[&str]) -> (Vec<String>, bool) {
        if let Some(sheet) = self.tabs.get(tab) {
            return (sheet.header.clone(), false);
        }
        let header: Vec<String> = default_header.iter().map(|h| h.to_string()).collect();
        self.tabs.insert(
            tab.to_string(),
            Worksheet {
                header: header.clone(),
                rows: Vec::new(),
            },
        );
        (header, true)
    }

    fn tab(&self, tab: &str) -> Result<&Worksheet, SheetError> {
        self.tabs
            .get(tab)
            .ok_or_else(|| SheetError::MissingTab(tab.to_string()))
    }

    fn tab_mut(&mut self, tab: &str) -> Result<&mut Worksheet, SheetError> {
        self.tabs
            .get_mut(tab)
            .ok_or_else(|| SheetError::MissingTab(tab.to_string()))
    }

    fn update_cell(&mut self, tab: &str, row: usize, col: usize, value: String) -> Result<(), SheetError> {
        let sheet = self.tab_mut(tab)?;
        let cells = sheet.rows.get_mut(row).ok_or_else(|| SheetError::OutOfRange {
            tab: tab.to_string(),
            row,
            col,
        })?;
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value;
        Ok(())
    }

    fn delete_row(&mut self, tab: &str, row: usize) -> Result<(), SheetError> {
        let sheet = self.tab_mut(tab)?;
        if row >= sheet.rows.len() {
            return Err(SheetError::OutOfRange {
                tab: tab.to_string(),
                row,
                col: 0,
            });
        }
        sheet.rows.remove(row);
        Ok(())
    }
}

/// Workbook persisted as pretty JSON on disk.
///
/// Contents are re-read on every call; only the path is held. The mutex
/// serializes file access within this process and nothing more.
pub struct FileWorkbook {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileWorkbook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Workbook, SheetError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Workbook::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn persist(&self, workbook: &Workbook) -> Result<(), SheetError> {
        let payload = serde_json::to_vec_pretty(workbook)?;
        fs::write(&self.path, payload).await?;
        Ok(())
    }
}

#[async_trait]
impl SheetBackend for FileWorkbook {
    async fn ensure_tab(&self, tab: &str, default_header: &[&str]) -> Result<Vec<String>, SheetError> {
        let _guard = self.lock.lock().await;
        let mut workbook = self.load().await?;
        let (header, created) = workbook.ensure_tab(tab, default_header);
        if created {
            self.persist(&workbook).await?;
        }
        Ok(header)
    }

    async fn rows(&self, tab: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let _guard = self.lock.lock().await;
        let workbook = self.load().await?;
        Ok(workbook.tab(tab)?.rows.clone())
    }

    async fn append_row(&self, tab: &str, row: Vec<String>) -> Result<(), SheetError> {
        let _guard = self.lock.lock().await;
        let mut workbook = self.load().await?;
        workbook.tab_mut(tab)?.rows.push(row);
        self.persist(&workbook).await
    }

    async fn update_cell(&self, tab: &str, row: usize, col: usize, value: String) -> Result<(), SheetError> {
        let _guard = self.lock.lock().await;
        let mut workbook = self.load().await?;
        workbook.update_cell(tab, row, col, value)?;
        self.persist(&workbook).await
    }

    async fn delete_row(&self, tab: &str, row: usize) -> Result<(), SheetError> {
        let _guard = self.lock.lock().await;
        let mut workbook = self.load().await?;
        workbook.delete_row(tab, row)?;
        self.persist(&workbook).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory workbook with failure injection.
    #[derive(Default)]
    pub struct MemorySheet {
        workbook: Mutex<Workbook>,
        pub fail: AtomicBool,
        pub fail_updates: AtomicBool,
        pub appends: AtomicUsize,
        clear_on_append: std::sync::Mutex<Option<String>>,
    }

    impl MemorySheet {
        pub fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }

        pub fn set_failing_updates(&self, failing: bool) {
            self.fail_updates.store(failing, Ordering::SeqCst);
        }

        /// Empties `tab` right after the next append to any tab, as if
        /// another user had deleted its rows in between two calls.
        pub fn clear_after_next_append(&self, tab: &str) {
            if let Ok(mut slot) = self.clear_on_append.lock() {
                *slot = Some(tab.to_string());
            }
        }

        pub fn append_count(&self) -> usize {
            self.appends.load(Ordering::SeqCst)
        }

        pub async fn snapshot(&self, tab: &str) -> Worksheet {
            self.workbook
                .lock()
                .await
                .tabs
                .get(tab)
                .cloned()
                .unwrap_or_default()
        }

        fn check(&self) -> Result<(), SheetError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(SheetError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "backing store unreachable",
                )));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SheetBackend for MemorySheet {
        async fn ensure_tab(&self, tab: &str, default_header: &[&str]) -> Result<Vec<String>, SheetError> {
            self.check()?;
            Ok(self.workbook.lock().await.ensure_tab(tab, default_header).0)
        }

        async fn rows(&self, tab: &str) -> Result<Vec<Vec<String>>, SheetError> {
            self.check()?;
            Ok(self.workbook.lock().await.tab(tab)?.rows.clone())
        }

        async fn append_row(&self, tab: &str, row: Vec<String>) -> Result<(), SheetError> {
            self.check()?;
            self.appends.fetch_add(1, Ordering::SeqCst);
            let mut workbook = self.workbook.lock().await;
            workbook.tab_mut(tab)?.rows.push(row);
            let cleared = self.clear_on_append.lock().ok().and_then(|mut slot| slot.take());
            if let Some(cleared) = cleared {
                workbook.tab_mut(&cleared)?.rows.clear();
            }
            Ok(())
        }

        async fn update_cell(&self, tab: &str, row: usize, col: usize, value: String) -> Result<(), SheetError> {
            self.check()?;
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(SheetError::MissingTab(tab.to_string()));
            }
            self.workbook.lock().await.update_cell(tab, row, col, value)
        }

        async fn delete_row(&self, tab: &str, row: usize) -> Result<(), SheetError> {
            self.check()?;
            self.workbook.lock().await.delete_row(tab, row)
        }
    }
}
