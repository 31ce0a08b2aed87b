//! Typed resource services.
//!
//! Each service borrows an [`ApiClient`](crate::ApiClient) and exposes one
//! method per REST operation. Every method takes a slice of
//! [`RequestModifier`](crate::RequestModifier)s and returns the decoded value
//! together with its [`ResponseMeta`](crate::ResponseMeta).

mod storage_moves;

pub use storage_moves::{
    ProjectRepositoryStorageMoves, RetrieveAllStorageMovesOptions, ScheduleAllStorageMovesOptions,
    ScheduleStorageMoveForProjectOptions, StorageMove, StorageMoveProject,
};
