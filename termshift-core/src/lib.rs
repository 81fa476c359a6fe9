// termshift-core/src/lib.rs
pub mod applier;
pub mod audit;
pub mod brand_guard;
pub mod config;
pub mod engine;
pub mod error;
pub mod record;
pub mod scanner;
pub mod session;
pub mod storage;
pub mod types;

// Re-export key types
pub use applier::ChangeApplier;
pub use audit::{AuditEntry, AuditSink, JsonlAuditLog, NoopAuditSink};
pub use brand_guard::{AllowAllBrandGuard, BrandGuard, BrandValidation, HttpBrandGuard};
pub use config::Config;
pub use error::{Result, SweepError};
pub use record::{FieldValue, Record, RichNode};
pub use scanner::RecordScanner;
pub use session::{Credential, Session};
pub use storage::{HttpRecordStore, MemoryRecordStore, RecordPage, RecordStore};
pub use types::{
    ApplyRequest, ApplyResponse, ApplyResult, EntryScanResult, FieldChange, ScanOptions,
    ScanReport, ScanRequest, ScanResponse, SelectedChange,
};
