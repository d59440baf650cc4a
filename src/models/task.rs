use chrono::{DateTime, Duration, Local, Months, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::user::User;

/// Represents the lifecycle stage of a task.
/// Corresponds to the `task_stage` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_stage", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStage {
    /// Not yet scheduled.
    Backlog,
    /// Scheduled but not started.
    Todo,
    /// Currently being worked on.
    Progress,
    /// Completed.
    Done,
}

impl TaskStage {
    /// Parses the stage value carried by the shift endpoint's query
    /// parameter. Returns `None` for anything outside the enumeration.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "backlog" => Some(TaskStage::Backlog),
            "todo" => Some(TaskStage::Todo),
            "progress" => Some(TaskStage::Progress),
            "done" => Some(TaskStage::Done),
            _ => None,
        }
    }
}

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    Moderate,
    Low,
}

/// A single checklist entry on a task. Items get a server-assigned id so the
/// toggle endpoint can address one item without touching the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub task: String,
    pub checked: bool,
}

/// Checklist entry as submitted by clients. The id is present when an edit
/// wants to preserve an existing item, absent for new ones.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ChecklistItemInput {
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 500))]
    pub task: String,
    #[serde(default)]
    pub checked: bool,
}

impl From<ChecklistItemInput> for ChecklistItem {
    fn from(input: ChecklistItemInput) -> Self {
        Self {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            task: input.task,
            checked: input.checked,
        }
    }
}

/// Input structure for creating a task.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskInput {
    /// The lifecycle stage the task starts in.
    pub stage: TaskStage,

    /// The priority of the task.
    pub priority: TaskPriority,

    /// The title of the task. Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Optional email of the person the task is delegated to.
    #[validate(email)]
    pub assigned_to: Option<String>,

    /// Optional due date for the task.
    pub due_date: Option<DateTime<Utc>>,

    /// The task's checklist. Required, but may be empty.
    #[validate]
    pub checklist: Vec<ChecklistItemInput>,
}

/// Partial update for a task. Absent fields are left untouched.
///
/// `assigned_to` distinguishes three cases: absent (keep), explicit `null`
/// (clear the assignee), and a value (reassign).
#[derive(Debug, Deserialize, Validate)]
pub struct TaskUpdate {
    pub stage: Option<TaskStage>,

    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<String>>,

    pub due_date: Option<DateTime<Utc>>,

    #[validate]
    pub checklist: Option<Vec<ChecklistItemInput>>,
}

/// Deserializes `Option<Option<T>>` so an explicit JSON `null` survives as
/// `Some(None)` instead of collapsing into `None`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    /// Identifier of the user who owns the task.
    pub user_id: i32,
    /// The lifecycle stage of the task.
    pub stage: TaskStage,
    /// The priority of the task.
    pub priority: TaskPriority,
    /// The title of the task.
    pub title: String,
    /// Email of the person the task is delegated to, if any.
    pub assigned_to: Option<String>,
    /// Optional due date for the task.
    pub due_date: Option<DateTime<Utc>>,
    /// The task's checklist, stored as a JSONB column.
    pub checklist: Json<Vec<ChecklistItem>>,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the task.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new `Task` from `TaskInput` and the creator's `user_id`.
    /// Sets `created_at` and `updated_at` to the current time, assigns a new
    /// UUID, and gives every checklist item an id.
    pub fn new(input: TaskInput, user_id: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            stage: input.stage,
            priority: input.priority,
            title: input.title,
            assigned_to: input.assigned_to,
            due_date: input.due_date,
            checklist: Json(input.checklist.into_iter().map(ChecklistItem::from).collect()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user` may mutate or delete this task: the owner always can,
    /// and so can the user whose email the task is assigned to.
    pub fn can_be_managed_by(&self, user: &User) -> bool {
        self.user_id == user.id || self.assigned_to.as_deref() == Some(user.email.as_str())
    }

    /// Sets the `checked` flag of the checklist item with the given id,
    /// leaving every other item untouched. Returns `false` when no item
    /// matches.
    pub fn set_checklist_item(&mut self, check_id: Uuid, checked: bool) -> bool {
        match self.checklist.0.iter_mut().find(|item| item.id == check_id) {
            Some(item) => {
                item.checked = checked;
                true
            }
            None => false,
        }
    }

    /// Applies a partial update, field by field.
    pub fn apply_update(&mut self, update: TaskUpdate) {
        if let Some(stage) = update.stage {
            self.stage = stage;
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(assigned_to) = update.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(due_date) = update.due_date {
            self.due_date = Some(due_date);
        }
        if let Some(items) = update.checklist {
            self.checklist = Json(items.into_iter().map(ChecklistItem::from).collect());
        }
    }
}

/// Query parameters for the task list endpoint.
#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub filter: Option<String>,
}

/// Query parameters for the shift endpoint. The parameter is called `filter`
/// for compatibility with the original API's clients, but carries a stage.
#[derive(Debug, Deserialize)]
pub struct ShiftQuery {
    pub filter: Option<String>,
}

/// Body of the checklist toggle endpoint: the new `checked` state for the
/// targeted item.
#[derive(Debug, Deserialize)]
pub struct ChecklistToggle {
    pub data: bool,
}

/// Creation-date window selected by the list endpoint's `filter` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    Today,
    Week,
    Month,
}

impl TaskFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(TaskFilter::Today),
            "week" => Some(TaskFilter::Week),
            "month" => Some(TaskFilter::Month),
            _ => None,
        }
    }

    /// Start of the window, anchored at `now` in the server's local timezone:
    /// `today` begins at local midnight, `week` seven days back, and `month`
    /// one calendar month back.
    pub fn window_start(&self, now: DateTime<Local>) -> DateTime<Utc> {
        match self {
            TaskFilter::Today => now
                .with_time(NaiveTime::MIN)
                .earliest()
                .unwrap_or(now)
                .with_timezone(&Utc),
            TaskFilter::Week => (now - Duration::days(7)).with_timezone(&Utc),
            TaskFilter::Month => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(now - Duration::days(30))
                .with_timezone(&Utc),
        }
    }
}

/// Per-priority task counts in the analytics response.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub low: u64,
    pub moderate: u64,
    pub high: u64,
}

/// Per-stage task counts in the analytics response.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageBreakdown {
    pub backlog: u64,
    pub todo: u64,
    pub progress: u64,
    pub done: u64,
}

/// The analytics summary over every task visible to the caller. Since stage
/// and priority are total enumerations, each breakdown sums to the number of
/// tasks scanned.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAnalytics {
    pub priority: PriorityBreakdown,
    pub status: StageBreakdown,
    #[serde(rename = "dueDateTasks")]
    pub due_date_tasks: u64,
}

impl TaskAnalytics {
    pub fn tally(tasks: &[Task]) -> Self {
        let mut analytics = TaskAnalytics::default();
        for task in tasks {
            match task.priority {
                TaskPriority::Low => analytics.priority.low += 1,
                TaskPriority::Moderate => analytics.priority.moderate += 1,
                TaskPriority::High => analytics.priority.high += 1,
            }
            match task.stage {
                TaskStage::Backlog => analytics.status.backlog += 1,
                TaskStage::Todo => analytics.status.todo += 1,
                TaskStage::Progress => analytics.status.progress += 1,
                TaskStage::Done => analytics.status.done += 1,
            }
            if task.due_date.is_some() {
                analytics.due_date_tasks += 1;
            }
        }
        analytics
    }
}
