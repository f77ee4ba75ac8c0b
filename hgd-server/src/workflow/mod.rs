//! Location ingestion workflow
//!
//! Turns a free-text address into a stored location record:
//! 1. Validate the request (address present, image decodable)
//! 2. Geocode the address
//! 3. Derive the subject name used for enrichment
//! 4. Enrich (best effort, never aborts)
//! 5. Assemble the record
//! 6. De-duplicate and persist (image asset first, then the record)
//!
//! Steps 1-5 touch nothing on disk, so an early failure leaves the store
//! unchanged.

pub mod ingestion;

pub use ingestion::{
    derive_subject_name, IngestionError, IngestionWorkflow, NewLocation, PlaceIdGenerator,
};
