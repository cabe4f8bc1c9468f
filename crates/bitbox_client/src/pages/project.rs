use std::sync::Arc;

use bitbox_shared::{
    domain::{GroupId, ProjectId, StudentId},
    error::ValidationError,
    models::{Group, Project, ProjectGroup, Student, StudentGroup, MAX_MARK},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{confirm, ensure_current, settle_load};
use crate::{
    api::ApiClient,
    collection::{EntityCollection, LoadStatus},
    error::{ClientError, ErrorContext},
    forms::{FormController, GroupDraft, GroupMarkDraft},
    route::Route,
    scope::PageScope,
};

#[derive(Default)]
struct ProjectPageState {
    project: Option<Project>,
    project_status: LoadStatus,
    groups: EntityCollection<ProjectGroup>,
    groups_status: LoadStatus,
    ungrouped: EntityCollection<Student>,
    ungrouped_status: LoadStatus,
    new_group: FormController<GroupDraft>,
    group_mark: FormController<GroupMarkDraft>,
    marking_group: Option<GroupId>,
}

impl ProjectPageState {
    fn marks_editable(&self) -> bool {
        self.project
            .as_ref()
            .is_some_and(|project| project.state.allows_mark_edit())
    }

    /// A student can join a new group only if no group of this project holds them.
    fn is_selectable(&self, student_id: &StudentId) -> bool {
        self.ungrouped.contains(student_id)
            && !self
                .groups
                .iter()
                .any(|group| group.contains_student(student_id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSnapshot {
    pub project: Option<Project>,
    pub project_status: LoadStatus,
    pub groups: Vec<ProjectGroup>,
    pub groups_status: LoadStatus,
    pub ungrouped: Vec<Student>,
    pub ungrouped_status: LoadStatus,
    pub marks_editable: bool,
}

/// A project with its groups, the students not yet grouped and group marks.
pub struct ProjectPage {
    api: Arc<ApiClient>,
    project_id: ProjectId,
    scope: PageScope,
    state: Mutex<ProjectPageState>,
}

impl ProjectPage {
    pub fn new(api: Arc<ApiClient>, project_id: ProjectId) -> Self {
        Self {
            api,
            project_id,
            scope: PageScope::new(),
            state: Mutex::new(ProjectPageState::default()),
        }
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn leave(&self) {
        self.scope.leave();
    }

    pub async fn load(&self) -> Result<(), ClientError> {
        let ticket = self.scope.ticket();

        let project = async {
            let result = self.api.get_project(&self.project_id).await;
            ensure_current(&self.scope, ticket, "project")?;
            let mut state = self.state.lock().await;
            let project = settle_load(&mut state.project_status, result, "project")?;
            state.project = Some(project);
            Ok::<(), ClientError>(())
        };
        let groups = async {
            let result = self.api.list_groups(&self.project_id).await;
            ensure_current(&self.scope, ticket, "groups")?;
            let mut state = self.state.lock().await;
            let groups = settle_load(&mut state.groups_status, result, "groups")?;
            state.groups.reset(groups);
            Ok::<(), ClientError>(())
        };

        let (project, groups, ungrouped) =
            futures::join!(project, groups, self.reload_ungrouped());
        project.and(groups).and(ungrouped)
    }

    pub async fn reload_ungrouped(&self) -> Result<(), ClientError> {
        let ticket = self.scope.ticket();
        let result = self.api.students_without_group(&self.project_id).await;
        ensure_current(&self.scope, ticket, "students without group")?;

        let mut state = self.state.lock().await;
        let students = settle_load(&mut state.ungrouped_status, result, "students without group")?;
        state.ungrouped.reset(students);
        let ProjectPageState {
            ungrouped,
            new_group,
            ..
        } = &mut *state;
        new_group.edit(|draft| draft.selected.retain(|id| ungrouped.contains(id)));
        Ok(())
    }

    pub async fn snapshot(&self) -> ProjectSnapshot {
        let state = self.state.lock().await;
        ProjectSnapshot {
            project: state.project.clone(),
            project_status: state.project_status.clone(),
            groups: state.groups.items().to_vec(),
            groups_status: state.groups_status.clone(),
            ungrouped: state.ungrouped.items().to_vec(),
            ungrouped_status: state.ungrouped_status.clone(),
            marks_editable: state.marks_editable(),
        }
    }

    pub fn student_marks_route(&self, group_id: &GroupId, student_id: &StudentId) -> Route {
        Route::StudentMarks {
            group_id: group_id.clone(),
            student_id: student_id.clone(),
        }
    }

    pub async fn open_new_group(&self) {
        self.state.lock().await.new_group.open();
    }

    pub async fn close_new_group(&self) {
        self.state.lock().await.new_group.close();
    }

    pub async fn set_group_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.state.lock().await.new_group.edit(|draft| draft.name = name);
    }

    /// Checks or unchecks a student for the group being created.
    pub async fn toggle_student(&self, student_id: &StudentId, checked: bool) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        if checked && !state.is_selectable(student_id) {
            return Err(ValidationError::StudentNotSelectable {
                student_id: student_id.to_string(),
            }
            .into());
        }
        state
            .new_group
            .edit(|draft| draft.set_selected(student_id.clone(), checked));
        Ok(())
    }

    pub async fn new_group_form(&self) -> FormController<GroupDraft> {
        self.state.lock().await.new_group.clone()
    }

    /// Creates the group, then assigns the selected students to it. The group
    /// is listed only once both calls succeeded.
    pub async fn create_group(&self) -> Result<GroupId, ClientError> {
        let ticket = self.scope.ticket();
        let (body, selected) = {
            let mut state = self.state.lock().await;
            let (body, selected) = state.new_group.begin_submit()?;
            if let Some(taken) = selected.iter().find(|id| !state.is_selectable(id)) {
                let err = ClientError::from(ValidationError::StudentNotSelectable {
                    student_id: taken.to_string(),
                });
                state.new_group.fail(&err, ErrorContext::General);
                return Err(err);
            }
            (body, selected)
        };

        let created = self.api.create_group(&self.project_id, &body).await;
        let group_id = {
            let mut state = self.state.lock().await;
            confirm(
                &self.scope,
                ticket,
                &mut state.new_group,
                created,
                ErrorContext::General,
                "group creation",
            )?
        };

        let assigned = self.api.assign_students(&group_id, &selected).await;
        {
            let mut state = self.state.lock().await;
            confirm(
                &self.scope,
                ticket,
                &mut state.new_group,
                assigned,
                ErrorContext::General,
                "group assignment",
            )?;
            let students = selected
                .iter()
                .filter_map(|id| state.ungrouped.get(id).cloned())
                .map(|student| StudentGroup {
                    student,
                    mark: None,
                })
                .collect();
            state.groups.append(ProjectGroup {
                group: Group {
                    id: group_id.clone(),
                    name: body.name,
                    max_mark: i32::from(MAX_MARK),
                    project_id: self.project_id.clone(),
                    mark: None,
                },
                students,
            });
            state.new_group.succeed();
        }
        info!(%group_id, students = selected.len(), "group created");

        if let Err(err) = self.reload_ungrouped().await {
            warn!(%group_id, error = %err, "could not refresh students without group");
        }
        Ok(group_id)
    }

    /// Opens the mark editor for a group. Only a finished project takes marks.
    pub async fn open_group_mark(&self, group_id: &GroupId) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        if !state.marks_editable() {
            return Err(ClientError::InvalidState(
                "group marks can only be edited once the project is finished",
            ));
        }
        if state.group_mark.is_in_flight() {
            return Err(ClientError::InFlight);
        }
        let current = state
            .groups
            .get(group_id)
            .map(|group| group.group.mark.unwrap_or(0.0))
            .ok_or(ClientError::InvalidState("group is not part of this project"))?;
        state.group_mark.open_with(GroupMarkDraft::new(current));
        state.marking_group = Some(group_id.clone());
        Ok(())
    }

    pub async fn set_group_mark(&self, mark: f64) {
        self.state.lock().await.group_mark.edit(|draft| draft.set_mark(mark));
    }

    pub async fn group_mark_form(&self) -> FormController<GroupMarkDraft> {
        self.state.lock().await.group_mark.clone()
    }

    pub async fn submit_group_mark(&self) -> Result<f64, ClientError> {
        let ticket = self.scope.ticket();
        let (group_id, body) = {
            let mut state = self.state.lock().await;
            if !state.marks_editable() {
                return Err(ClientError::InvalidState(
                    "group marks can only be edited once the project is finished",
                ));
            }
            let group_id = state
                .marking_group
                .clone()
                .ok_or(ClientError::InvalidState("no group mark is being edited"))?;
            (group_id, state.group_mark.begin_submit()?)
        };

        let result = self.api.update_group_mark(&group_id, body.mark).await;
        let mut state = self.state.lock().await;
        confirm(
            &self.scope,
            ticket,
            &mut state.group_mark,
            result,
            ErrorContext::GroupMark,
            "group mark update",
        )?;
        if let Some(mut group) = state.groups.get(&group_id).cloned() {
            group.group.mark = Some(body.mark);
            state.groups.replace(group);
        }
        state.marking_group = None;
        state.group_mark.succeed();
        info!(%group_id, mark = body.mark, "group mark updated");
        Ok(body.mark)
    }
}
