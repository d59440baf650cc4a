pub mod task;
pub mod user;

pub use task::{
    ChecklistItem, ChecklistItemInput, ChecklistToggle, ShiftQuery, Task, TaskAnalytics,
    TaskFilter, TaskInput, TaskListQuery, TaskPriority, TaskStage, TaskUpdate,
};
pub use user::{AssignRequest, UpdateUserRequest, User, UserProfile};
