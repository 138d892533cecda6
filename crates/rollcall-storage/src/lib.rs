// Postgres storage layer with sqlx
//
// This crate provides backend implementations for the core traits:
// - DbRecordStore: implements RecordStore over the collaborator tables
// - DbCertificateLedger: implements CertificateLedger for issued certificates
// - FsBlobStore / HttpBlobStore: implement BlobStore for rendered PDFs

pub mod blob_store;
pub mod models;
pub mod record_store;
pub mod repositories;

pub use blob_store::{FsBlobStore, HttpBlobStore};
pub use models::*;
pub use record_store::{
    create_db_certificate_ledger, create_db_record_store, DbCertificateLedger, DbRecordStore,
};
pub use repositories::*;
