use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskbot_shared::api::{NewComment, NewProject, NewProjectMember, NewTask, NewUser, UpdateTaskStatusRequest};
use taskbot_shared::{
    Comment, CommentWithAuthor, Project, ProjectMember, ProjectMemberWithUser, Task, TaskStatus,
    TaskWithDetails, User, INITIAL_STATUS_ID, UNKNOWN,
};

use crate::backend::{Backend, PROJECTS, PROJECT_MEMBERS, TASKS, TASK_COMMENTS, TASK_STATUSES, USERS};
use crate::error::StoreError;
use crate::query::{Filter, Query};

#[derive(Debug, Deserialize)]
struct ProjectName {
    project_id: i64,
    name: String,
}

/// Data access for users, projects, tasks and comments.
///
/// Every mutation is a single round trip that returns the generated key or
/// fails. Reads that join display names never fail on the join: unresolved
/// names fall back to "Unknown".
#[derive(Clone)]
pub struct TaskRepository {
    backend: Arc<dyn Backend>,
    include_memberships: bool,
}

impl TaskRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            include_memberships: false,
        }
    }

    /// Also list projects the user joined through `project_members`.
    pub fn with_memberships(mut self, include_memberships: bool) -> Self {
        self.include_memberships = include_memberships;
        self
    }

    pub fn include_memberships(&self) -> bool {
        self.include_memberships
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // ============ Helpers ============

    async fn fetch<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, StoreError> {
        self.backend
            .select(query)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(StoreError::from))
            .collect()
    }

    async fn fetch_one<T: DeserializeOwned>(&self, query: Query) -> Result<Option<T>, StoreError> {
        Ok(self.fetch(&query.limit(1)).await?.into_iter().next())
    }

    /// Insert a row and read back its generated key
    async fn insert_returning_id<T: Serialize>(
        &self,
        table: &'static str,
        row: &T,
        key: &str,
    ) -> Result<i64, StoreError> {
        let body = serde_json::to_value(row)?;
        let rows = self.backend.insert(table, body).await?;

        rows.first()
            .and_then(|row| row.get(key))
            .and_then(Value::as_i64)
            .ok_or(StoreError::MissingRow(table))
    }

    // ============ Users ============

    /// Insert the user, or overwrite the profile of an existing one.
    pub async fn upsert_user(&self, user: NewUser) -> Result<i64, StoreError> {
        let existing = self.get_user(user.user_id).await?;
        let body = serde_json::to_value(&user)?;

        if existing.is_some() {
            let query = Query::table(USERS).eq("user_id", user.user_id);
            let updated = self.backend.update(&query, body).await?;
            if updated.is_empty() {
                return Err(StoreError::NotFound);
            }
        } else {
            self.backend.insert(USERS, body).await?;
        }

        tracing::info!("User created/updated: {}", user.user_id);
        Ok(user.user_id)
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        self.fetch_one(Query::table(USERS).eq("user_id", user_id)).await
    }

    // ============ Projects ============

    /// Name and description are stored as given; an empty name is accepted.
    pub async fn create_project(
        &self,
        name: &str,
        description: &str,
        created_by: i64,
    ) -> Result<i64, StoreError> {
        let project = NewProject {
            name: name.to_string(),
            description: description.to_string(),
            created_by,
        };

        let project_id = self
            .insert_returning_id(PROJECTS, &project, "project_id")
            .await?;

        tracing::info!("Project created: {}", project_id);
        Ok(project_id)
    }

    /// Projects the user created, plus joined ones when memberships are on.
    pub async fn list_projects_for_user(&self, user_id: i64) -> Result<Vec<Project>, StoreError> {
        let mut projects: Vec<Project> = self
            .fetch(&Query::table(PROJECTS).eq("created_by", user_id))
            .await?;

        if self.include_memberships {
            let memberships: Vec<ProjectMember> = self
                .fetch(&Query::table(PROJECT_MEMBERS).eq("user_id", user_id))
                .await?;

            let missing: BTreeSet<i64> = memberships
                .iter()
                .map(|m| m.project_id)
                .filter(|id| !projects.iter().any(|p| p.project_id == *id))
                .collect();

            if !missing.is_empty() {
                let joined: Vec<Project> = self
                    .fetch(&Query::table(PROJECTS).in_list("project_id", missing))
                    .await?;
                projects.extend(joined);
            }
        }

        projects.sort_by_key(|p| p.project_id);
        projects.dedup_by_key(|p| p.project_id);
        Ok(projects)
    }

    /// The project, if it is among those the user may see. Missing and
    /// foreign projects both read as `None`.
    pub async fn find_accessible_project(
        &self,
        user_id: i64,
        project_id: i64,
    ) -> Result<Option<Project>, StoreError> {
        let project: Option<Project> = self
            .fetch_one(Query::table(PROJECTS).eq("project_id", project_id))
            .await?;

        let Some(project) = project else {
            return Ok(None);
        };
        if project.is_owned_by(user_id) {
            return Ok(Some(project));
        }
        if !self.include_memberships {
            return Ok(None);
        }

        let membership: Option<ProjectMember> = self
            .fetch_one(
                Query::table(PROJECT_MEMBERS)
                    .eq("project_id", project_id)
                    .eq("user_id", user_id),
            )
            .await?;

        Ok(membership.map(|_| project))
    }

    /// Add a user to a project, or change the role of an existing member.
    pub async fn add_project_member(
        &self,
        project_id: i64,
        user_id: i64,
        role_in_project: &str,
    ) -> Result<(), StoreError> {
        let query = Query::table(PROJECT_MEMBERS)
            .eq("project_id", project_id)
            .eq("user_id", user_id);
        let member = NewProjectMember {
            project_id,
            user_id,
            role_in_project: role_in_project.to_string(),
        };
        let body = serde_json::to_value(&member)?;

        let existing: Option<ProjectMember> = self.fetch_one(query.clone()).await?;
        if existing.is_some() {
            self.backend.update(&query, body).await?;
        } else {
            self.backend.insert(PROJECT_MEMBERS, body).await?;
        }

        tracing::info!("User {} joined project {} as {}", user_id, project_id, role_in_project);
        Ok(())
    }

    pub async fn list_project_members(
        &self,
        project_id: i64,
    ) -> Result<Vec<ProjectMemberWithUser>, StoreError> {
        let members: Vec<ProjectMember> = self
            .fetch(&Query::table(PROJECT_MEMBERS).eq("project_id", project_id))
            .await?;

        let names = self
            .display_names(members.iter().map(|m| m.user_id))
            .await;

        Ok(members
            .into_iter()
            .map(|member| ProjectMemberWithUser {
                display_name: names
                    .get(&member.user_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                member,
            })
            .collect())
    }

    // ============ Tasks ============

    /// The task always starts in the seed status, whatever the caller holds.
    pub async fn create_task(&self, task: NewTask) -> Result<i64, StoreError> {
        let mut body = serde_json::to_value(&task)?;
        if let Value::Object(fields) = &mut body {
            fields.insert("status_id".to_string(), Value::from(INITIAL_STATUS_ID));
        }

        let rows = self.backend.insert(TASKS, body).await?;
        let task_id = rows
            .first()
            .and_then(|row| row.get("task_id"))
            .and_then(Value::as_i64)
            .ok_or(StoreError::MissingRow(TASKS))?;

        tracing::info!("Task created: {}", task_id);
        Ok(task_id)
    }

    /// Tasks the user authored or is assigned to, newest first.
    pub async fn list_tasks_for_user(&self, user_id: i64) -> Result<Vec<TaskWithDetails>, StoreError> {
        let tasks: Vec<Task> = self
            .fetch(
                &Query::table(TASKS)
                    .or(vec![
                        Filter::eq("author_id", user_id),
                        Filter::eq("assignee_id", user_id),
                    ])
                    .order_desc("created_at"),
            )
            .await?;

        Ok(self.with_details(tasks).await)
    }

    /// Join status and project names onto tasks.
    async fn with_details(&self, tasks: Vec<Task>) -> Vec<TaskWithDetails> {
        if tasks.is_empty() {
            return Vec::new();
        }

        let status_names: HashMap<i64, String> = match self.list_task_statuses().await {
            Ok(statuses) => statuses.into_iter().map(|s| (s.status_id, s.name)).collect(),
            Err(e) => {
                tracing::warn!("Could not resolve status names: {}", e);
                HashMap::new()
            }
        };

        let project_ids: BTreeSet<i64> = tasks.iter().map(|t| t.project_id).collect();
        let project_query = Query::table(PROJECTS)
            .select(&["project_id", "name"])
            .in_list("project_id", project_ids);
        let project_names: HashMap<i64, String> = match self.fetch::<ProjectName>(&project_query).await {
            Ok(projects) => projects.into_iter().map(|p| (p.project_id, p.name)).collect(),
            Err(e) => {
                tracing::warn!("Could not resolve project names: {}", e);
                HashMap::new()
            }
        };

        tasks
            .into_iter()
            .map(|task| TaskWithDetails {
                status_name: lookup(&status_names, task.status_id),
                project_name: lookup(&project_names, task.project_id),
                task,
            })
            .collect()
    }

    /// The task, if the user authored it or is assigned to it.
    pub async fn find_accessible_task(
        &self,
        user_id: i64,
        task_id: i64,
    ) -> Result<Option<TaskWithDetails>, StoreError> {
        let task: Option<Task> = self
            .fetch_one(Query::table(TASKS).eq("task_id", task_id))
            .await?;

        match task {
            Some(task) if task.involves(user_id) => {
                Ok(self.with_details(vec![task]).await.into_iter().next())
            }
            _ => Ok(None),
        }
    }

    /// Move a task to another status. The status id is not checked here;
    /// a task id that matches nothing is `StoreError::NotFound`.
    pub async fn update_task_status(&self, task_id: i64, status_id: i64) -> Result<(), StoreError> {
        let patch = UpdateTaskStatusRequest {
            status_id,
            updated_at: Utc::now(),
        };
        let query = Query::table(TASKS).eq("task_id", task_id);

        let updated = self
            .backend
            .update(&query, serde_json::to_value(&patch)?)
            .await?;

        if updated.is_empty() {
            tracing::warn!("Task {} not found for status update", task_id);
            return Err(StoreError::NotFound);
        }

        tracing::info!("Task {} status updated to {}", task_id, status_id);
        Ok(())
    }

    /// Boolean view of [`update_task_status`](Self::update_task_status).
    pub async fn update_task_status_ok(&self, task_id: i64, status_id: i64) -> bool {
        match self.update_task_status(task_id, status_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to update task {}: {}", task_id, e);
                false
            }
        }
    }

    pub async fn list_task_statuses(&self) -> Result<Vec<TaskStatus>, StoreError> {
        self.fetch(&Query::table(TASK_STATUSES).order_asc("order_index"))
            .await
    }

    // ============ Comments ============

    pub async fn add_comment(
        &self,
        task_id: i64,
        author_id: i64,
        message: &str,
    ) -> Result<i64, StoreError> {
        let comment = NewComment {
            task_id,
            author_id,
            message: message.to_string(),
        };

        let comment_id = self
            .insert_returning_id(TASK_COMMENTS, &comment, "comment_id")
            .await?;

        tracing::info!("Comment added to task {}", task_id);
        Ok(comment_id)
    }

    /// Comments oldest first, each with its author's display name.
    pub async fn list_comments(&self, task_id: i64) -> Result<Vec<CommentWithAuthor>, StoreError> {
        let comments: Vec<Comment> = self
            .fetch(
                &Query::table(TASK_COMMENTS)
                    .eq("task_id", task_id)
                    .order_asc("created_at"),
            )
            .await?;

        let names = self
            .display_names(comments.iter().map(|c| c.author_id))
            .await;

        Ok(comments
            .into_iter()
            .map(|comment| CommentWithAuthor {
                author_name: lookup(&names, comment.author_id),
                comment,
            })
            .collect())
    }

    // ============ Health ============

    /// Liveness probe: one cheap read against the status table.
    pub async fn health_check(&self) -> bool {
        let query = Query::table(TASK_STATUSES).select(&["status_id"]).limit(1);
        match self.backend.select(&query).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Store health check failed: {}", e);
                false
            }
        }
    }

    /// Display names for a set of users; unresolvable users are left out.
    async fn display_names(&self, user_ids: impl Iterator<Item = i64>) -> HashMap<i64, String> {
        let ids: BTreeSet<i64> = user_ids.collect();
        if ids.is_empty() {
            return HashMap::new();
        }

        match self.fetch::<User>(&Query::table(USERS).in_list("user_id", ids)).await {
            Ok(users) => users
                .iter()
                .filter_map(|u| u.display_name().map(|name| (u.user_id, name.to_string())))
                .collect(),
            Err(e) => {
                tracing::warn!("Could not resolve user names: {}", e);
                HashMap::new()
            }
        }
    }
}

fn lookup(names: &HashMap<i64, String>, id: i64) -> String {
    names.get(&id).cloned().unwrap_or_else(|| UNKNOWN.to_string())
}
