//! Project repository storage moves.
//!
//! A storage move relocates a project's repository from one storage shard to
//! another. Moves can be listed and inspected instance-wide or per project,
//! and scheduled either for one project or for every project on a shard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ApiClient, HttpClient, ListOptions, Method, PathTemplate, RequestModifier, ResponseMeta,
    Result,
};

const STORAGE_MOVES: PathTemplate = PathTemplate::new("project_repository_storage_moves");
const STORAGE_MOVE: PathTemplate = PathTemplate::new("project_repository_storage_moves/{id}");
const PROJECT_STORAGE_MOVES: PathTemplate =
    PathTemplate::new("projects/{project}/repository_storage_moves");
const PROJECT_STORAGE_MOVE: PathTemplate =
    PathTemplate::new("projects/{project}/repository_storage_moves/{id}");

/// Status of a repository storage move.
///
/// Fields the server always sends are required: a body missing one of them
/// is a decode error rather than a zero value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageMove {
    /// Move id.
    pub id: u64,
    /// When the move was created; `None` when absent or `null`.
    pub created_at: Option<DateTime<Utc>>,
    /// Server-defined state, e.g. `scheduled`, `started`, `finished`.
    pub state: String,
    /// Shard the repository is moved from.
    pub source_storage_name: String,
    /// Shard the repository is moved to.
    pub destination_storage_name: String,
    /// Project whose repository is moved.
    pub project: StorageMoveProject,
}

/// Project summary embedded in a [`StorageMove`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageMoveProject {
    /// Project id.
    pub id: u64,
    /// Project description.
    pub description: Option<String>,
    /// Project name.
    pub name: String,
    /// Name including the namespace, e.g. `Group / Project`.
    pub name_with_namespace: Option<String>,
    /// URL path segment.
    pub path: Option<String>,
    /// Full path including the namespace, e.g. `group/project`.
    pub path_with_namespace: Option<String>,
    /// When the project was created.
    pub created_at: Option<DateTime<Utc>>,
}

/// Options for listing storage moves.
pub type RetrieveAllStorageMovesOptions = ListOptions;

/// Body of [`ProjectRepositoryStorageMoves::schedule_all_storage_moves`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleAllStorageMovesOptions {
    /// Shard whose projects are moved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_storage_name: Option<String>,
    /// Target shard; the server picks one when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_storage_name: Option<String>,
}

impl ScheduleAllStorageMovesOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source shard.
    #[must_use]
    pub fn source_storage_name(mut self, name: impl Into<String>) -> Self {
        self.source_storage_name = Some(name.into());
        self
    }

    /// Set the destination shard.
    #[must_use]
    pub fn destination_storage_name(mut self, name: impl Into<String>) -> Self {
        self.destination_storage_name = Some(name.into());
        self
    }
}

/// Body of [`ProjectRepositoryStorageMoves::schedule_storage_move_for_project`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleStorageMoveForProjectOptions {
    /// Target shard; the server picks one when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_storage_name: Option<String>,
}

impl ScheduleStorageMoveForProjectOptions {
    /// Options moving the repository to `name`.
    #[must_use]
    pub fn to_storage(name: impl Into<String>) -> Self {
        Self {
            destination_storage_name: Some(name.into()),
        }
    }
}

/// Repository storage move operations.
///
/// Obtained from [`ApiClient::project_repository_storage_moves`].
#[derive(Debug)]
pub struct ProjectRepositoryStorageMoves<'a, C> {
    client: &'a ApiClient<C>,
}

impl<C> Clone for ProjectRepositoryStorageMoves<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for ProjectRepositoryStorageMoves<'_, C> {}

impl<'a, C> ProjectRepositoryStorageMoves<'a, C> {
    pub(crate) fn new(client: &'a ApiClient<C>) -> Self {
        Self { client }
    }
}

impl<C: HttpClient> ProjectRepositoryStorageMoves<'_, C> {
    /// List every storage move visible to the caller.
    ///
    /// `GET /project_repository_storage_moves`
    ///
    /// # Errors
    ///
    /// Any request, transport, status or decode error; see [`crate::Error`].
    pub async fn retrieve_all_storage_moves(
        &self,
        options: &RetrieveAllStorageMovesOptions,
        modifiers: &[&dyn RequestModifier],
    ) -> Result<(Vec<StorageMove>, ResponseMeta)> {
        self.client
            .request(Method::Get, &STORAGE_MOVES, &[], Some(options), modifiers)
            .await
    }

    /// List the storage moves of one project.
    ///
    /// `GET /projects/{project}/repository_storage_moves`
    ///
    /// # Errors
    ///
    /// [`crate::Error::InvalidRequest`] for a zero project id, otherwise as
    /// [`Self::retrieve_all_storage_moves`].
    pub async fn retrieve_all_storage_moves_for_project(
        &self,
        project: u64,
        options: &RetrieveAllStorageMovesOptions,
        modifiers: &[&dyn RequestModifier],
    ) -> Result<(Vec<StorageMove>, ResponseMeta)> {
        self.client
            .request(
                Method::Get,
                &PROJECT_STORAGE_MOVES,
                &[("project", project)],
                Some(options),
                modifiers,
            )
            .await
    }

    /// Get a single storage move.
    ///
    /// `GET /project_repository_storage_moves/{id}`
    ///
    /// # Errors
    ///
    /// [`crate::Error::InvalidRequest`] for a zero id, [`crate::Error::Api`]
    /// with status 404 for an unknown move.
    pub async fn get_storage_move(
        &self,
        id: u64,
        modifiers: &[&dyn RequestModifier],
    ) -> Result<(StorageMove, ResponseMeta)> {
        self.client
            .request(Method::Get, &STORAGE_MOVE, &[("id", id)], None::<&()>, modifiers)
            .await
    }

    /// Get a single storage move of a project.
    ///
    /// `GET /projects/{project}/repository_storage_moves/{id}`
    ///
    /// # Errors
    ///
    /// As [`Self::get_storage_move`].
    pub async fn get_storage_move_for_project(
        &self,
        project: u64,
        id: u64,
        modifiers: &[&dyn RequestModifier],
    ) -> Result<(StorageMove, ResponseMeta)> {
        self.client
            .request(
                Method::Get,
                &PROJECT_STORAGE_MOVE,
                &[("project", project), ("id", id)],
                None::<&()>,
                modifiers,
            )
            .await
    }

    /// Schedule moves for every project on a shard.
    ///
    /// `POST /project_repository_storage_moves`. With `None` the request
    /// has no body.
    ///
    /// # Errors
    ///
    /// Any request, transport, status or decode error.
    pub async fn schedule_all_storage_moves(
        &self,
        options: Option<&ScheduleAllStorageMovesOptions>,
        modifiers: &[&dyn RequestModifier],
    ) -> Result<(Vec<StorageMove>, ResponseMeta)> {
        self.client
            .request(Method::Post, &STORAGE_MOVES, &[], options, modifiers)
            .await
    }

    /// Schedule a move for one project.
    ///
    /// `POST /projects/{project}/repository_storage_moves`
    ///
    /// # Errors
    ///
    /// [`crate::Error::InvalidRequest`] for a zero project id, otherwise as
    /// [`Self::schedule_all_storage_moves`].
    pub async fn schedule_storage_move_for_project(
        &self,
        project: u64,
        options: Option<&ScheduleStorageMoveForProjectOptions>,
        modifiers: &[&dyn RequestModifier],
    ) -> Result<(Vec<StorageMove>, ResponseMeta)> {
        self.client
            .request(
                Method::Post,
                &PROJECT_STORAGE_MOVES,
                &[("project", project)],
                options,
                modifiers,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_storage_move() {
        let value = json!({
            "id": 123,
            "created_at": "2020-05-07T04:27:17.234Z",
            "state": "scheduled",
            "source_storage_name": "default",
            "destination_storage_name": "storage2",
            "project": {
                "id": 1,
                "description": null,
                "name": "project1",
                "name_with_namespace": "John Doe2 / project1",
                "path": "project1",
                "path_with_namespace": "namespace1/project1",
                "created_at": "2020-05-07T04:27:17.016Z"
            }
        });

        let storage_move: StorageMove = serde_json::from_value(value).expect("decode");

        check!(storage_move.id == 123);
        check!(storage_move.state == "scheduled");
        check!(storage_move.destination_storage_name == "storage2");
        let_assert!(Some(created_at) = storage_move.created_at);
        check!(
            created_at
                == Utc
                    .with_ymd_and_hms(2020, 5, 7, 4, 27, 17)
                    .single()
                    .expect("timestamp")
                    + chrono::Duration::milliseconds(234)
        );
        check!(storage_move.project.id == 1);
        check!(storage_move.project.description.is_none());
        check!(storage_move.project.path_with_namespace.as_deref() == Some("namespace1/project1"));
    }

    #[test]
    fn null_created_at_is_absent() {
        let value = json!({
            "id": 7,
            "created_at": null,
            "state": "finished",
            "source_storage_name": "default",
            "destination_storage_name": "storage2",
            "project": { "id": 3, "name": "p", "created_at": null }
        });

        let storage_move: StorageMove = serde_json::from_value(value).expect("decode");
        check!(storage_move.created_at.is_none());
        check!(storage_move.project.created_at.is_none());
        check!(storage_move.project.name_with_namespace.is_none());
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let_assert!(Err(err) = serde_json::from_value::<StorageMove>(json!({"id": 1})));
        check!(err.to_string().contains("missing field"));

        let value = json!({
            "id": 1,
            "state": null,
            "source_storage_name": "default",
            "destination_storage_name": "storage2",
            "project": { "id": 3, "name": "p" }
        });
        check!(serde_json::from_value::<StorageMove>(value).is_err());

        let value = json!({
            "id": 1,
            "state": "scheduled",
            "source_storage_name": "default",
            "destination_storage_name": "storage2",
            "project": { "name": "p" }
        });
        check!(serde_json::from_value::<StorageMove>(value).is_err());
    }

    #[test]
    fn minimal_body_decodes() {
        let value = json!({
            "id": 1,
            "state": "scheduled",
            "source_storage_name": "default",
            "destination_storage_name": "storage2",
            "project": { "id": 3, "name": "p" }
        });

        let storage_move: StorageMove = serde_json::from_value(value).expect("decode");
        check!(storage_move.created_at.is_none());
        check!(storage_move.project.id == 3);
        check!(storage_move.project.path.is_none());
    }

    #[test]
    fn schedule_options_skip_unset_fields() {
        let empty = serde_json::to_value(ScheduleAllStorageMovesOptions::new()).expect("encode");
        check!(empty == json!({}));

        let options = ScheduleAllStorageMovesOptions::new()
            .source_storage_name("default")
            .destination_storage_name("storage2");
        let value = serde_json::to_value(options).expect("encode");
        check!(
            value
                == json!({
                    "source_storage_name": "default",
                    "destination_storage_name": "storage2"
                })
        );

        let value = serde_json::to_value(ScheduleStorageMoveForProjectOptions::to_storage("nfs"))
            .expect("encode");
        check!(value == json!({ "destination_storage_name": "nfs" }));
    }

    #[test]
    fn templates_expand_to_documented_paths() {
        check!(STORAGE_MOVE.expand(&[("id", 9)]).ok().as_deref() == Some("project_repository_storage_moves/9"));
        check!(
            PROJECT_STORAGE_MOVE
                .expand(&[("project", 4), ("id", 9)])
                .ok()
                .as_deref()
                == Some("projects/4/repository_storage_moves/9")
        );
        check!(PROJECT_STORAGE_MOVES.expand(&[("project", 0)]).is_err());
    }
}
