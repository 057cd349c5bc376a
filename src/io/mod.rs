pub mod csv_export;
pub mod csv_import;
pub mod file;
pub mod storage;

use thiserror::Error;

pub use csv_export::export_tasks_csv;
pub use csv_import::{import_tasks_csv, parse_tasks_csv};
pub use file::FileStorage;
pub use storage::{MemoryStorage, Storage, StorageError};

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV format error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV is missing a task name column. Found headers: {0:?}")]
    MissingColumns(Vec<String>),
    #[error("no valid tasks found in CSV ({skipped} rows skipped)")]
    NoRows { skipped: usize },
}
