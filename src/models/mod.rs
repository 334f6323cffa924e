pub mod label;
pub mod status;
pub mod task;
pub mod user;

pub use label::{Label, LabelInput};
pub use status::{Status, StatusInput};
pub use task::{Task, TaskData, TaskDetail, TaskInput, TaskSummary};
pub use user::{SignupInput, User, UserUpdateInput};
