//! Optimistic-concurrency aggregate persistence for the meal planner.
//!
//! This crate provides the persistence core:
//! - [`EntityVersion`], the opaque concurrency token exchanged as an ETag
//! - [`AggregateRoot`], the capability every persisted root implements
//! - [`Repository`], the staging port, and [`UnitOfWork`], the commit
//!   boundary that runs deferred validation and translates store conflicts
//! - [`ValidatorRegistry`] for explicit, per-type cross-aggregate rules
//! - [`InMemoryDataStore`] and [`PostgresDataStore`] backends

pub mod aggregate;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod unit_of_work;
pub mod validator;
pub mod version;

pub use common::EntityId;

pub use aggregate::{AggregateRef, AggregateRoot};
pub use error::{PersistenceError, Result};
pub use memory::InMemoryDataStore;
pub use postgres::PostgresDataStore;
pub use store::{ChangeOp, DataStore, RecordChange, StoredRecord};
pub use unit_of_work::{CommitReceipt, Repository, UnitOfWork, UnitOfWorkState};
pub use validator::{
    DeferredValidator, StagedAggregate, ValidationError, ValidationLookup, ValidatorRegistry,
};
pub use version::{EntityVersion, VersionFormatError};
