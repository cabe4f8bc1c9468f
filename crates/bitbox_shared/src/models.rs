use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::{
    GroupId, Identified, ProjectId, ProjectState, PromotionId, StudentId, UserId,
};

pub const MIN_MARK: u8 = 0;
pub const MAX_MARK: u8 = 20;

/// Marks always land in `[MIN_MARK, MAX_MARK]`.
pub fn clamp_mark(raw: i64) -> u8 {
    raw.clamp(i64::from(MIN_MARK), i64::from(MAX_MARK)) as u8
}

pub fn clamp_group_mark(raw: f64) -> f64 {
    if raw.is_nan() {
        return f64::from(MIN_MARK);
    }
    raw.clamp(f64::from(MIN_MARK), f64::from(MAX_MARK))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: PromotionId,
    pub title: String,
    pub start_year: NaiveDate,
    pub end_year: NaiveDate,
    pub teacher_id: UserId,
}

impl Identified for Promotion {
    type Id = PromotionId;

    fn id(&self) -> &PromotionId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub notation_period_duration: i32,
    pub promotion_id: PromotionId,
    pub state: ProjectState,
}

impl Identified for Project {
    type Id = ProjectId;

    fn id(&self) -> &ProjectId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub surname: String,
    pub email: String,
}

impl Identified for Student {
    type Id = StudentId;

    fn id(&self) -> &StudentId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub max_mark: i32,
    pub project_id: ProjectId,
    #[serde(default)]
    pub mark: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentGroup {
    pub student: Student,
    #[serde(default)]
    pub mark: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectGroup {
    pub group: Group,
    pub students: Vec<StudentGroup>,
}

impl ProjectGroup {
    pub fn contains_student(&self, student_id: &StudentId) -> bool {
        self.students
            .iter()
            .any(|member| &member.student.id == student_id)
    }
}

impl Identified for ProjectGroup {
    type Id = GroupId;

    fn id(&self) -> &GroupId {
        &self.group.id
    }
}

/// Payload of `GET /groups/project/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectGroups {
    pub groups: Vec<ProjectGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentGroupMark {
    pub grader: Student,
    #[serde(default)]
    pub mark: Option<f64>,
    pub max_mark: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentGroupMarkDetails {
    pub student: Student,
    pub marks: Vec<StudentGroupMark>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalStudent {
    pub student_id: StudentId,
    pub name: String,
    pub surname: String,
}

/// What an evaluation token resolves to: the grader's own group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalGroupStudents {
    pub group_id: GroupId,
    pub students: Vec<MinimalStudent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradedStudentPostModel {
    pub student_id: StudentId,
    pub mark: u8,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPromotionPostModel {
    pub title: String,
    pub start_year: NaiveDate,
    pub end_year: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudentPostModel {
    pub name: String,
    pub surname: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedStudentPutModel {
    pub name: String,
    pub surname: String,
    pub email: String,
}

impl From<NewStudentPostModel> for UpdatedStudentPutModel {
    fn from(value: NewStudentPostModel) -> Self {
        Self {
            name: value.name,
            surname: value.surname,
            email: value.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProjectPostModel {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub notation_period_duration: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroupPostModel {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedGroupMarkPutModel {
    pub mark: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginUserPostModel {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MfaCodePostModel {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUserPostModel {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clamps_marks_into_grading_range() {
        assert_eq!(clamp_mark(-3), 0);
        assert_eq!(clamp_mark(14), 14);
        assert_eq!(clamp_mark(42), 20);
        assert_eq!(clamp_group_mark(20.5), 20.0);
        assert_eq!(clamp_group_mark(f64::NAN), 0.0);
    }

    #[test]
    fn project_group_payload_parses_backend_shape() {
        let payload = json!({
            "groups": [{
                "group": {
                    "id": "g1",
                    "name": "alpha",
                    "mark": null,
                    "max_mark": 20,
                    "project_id": "p1"
                },
                "students": [{
                    "student": {"id": "s1", "name": "ada", "surname": "lovelace", "email": "ada@example.com"},
                    "mark": 12.5
                }]
            }]
        });

        let parsed: ProjectGroups = serde_json::from_value(payload).expect("parse groups");
        assert_eq!(parsed.groups.len(), 1);
        let group = &parsed.groups[0];
        assert_eq!(group.id(), &GroupId::from("g1"));
        assert!(group.contains_student(&StudentId::from("s1")));
        assert_eq!(group.students[0].mark, Some(12.5));
    }

    #[test]
    fn project_dates_use_backend_datetime_format() {
        let payload = json!({
            "id": "p1",
            "name": "compilers",
            "description": null,
            "start_date": "2025-02-01T08:00:00",
            "end_date": "2025-03-01T18:00:00",
            "notation_period_duration": 7,
            "promotion_id": "promo",
            "state": "Finished"
        });

        let project: Project = serde_json::from_value(payload).expect("parse project");
        assert!(project.state.allows_mark_edit());
        assert_eq!(
            project.start_date.format("%Y-%m-%d %H:%M").to_string(),
            "2025-02-01 08:00"
        );
    }

    #[test]
    fn student_update_body_carries_the_new_student_fields() {
        let draft = NewStudentPostModel {
            name: "Ada".into(),
            surname: "Lovelace".into(),
            email: "ada@example.com".into(),
        };

        let body = UpdatedStudentPutModel::from(draft);
        assert_eq!(
            serde_json::to_value(&body).expect("serialize"),
            json!({"name": "Ada", "surname": "Lovelace", "email": "ada@example.com"})
        );
    }
}
