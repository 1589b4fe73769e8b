//! Outgoing chat messages and the fixed texts the bot answers with.

use serde_json::Value;
use taskbot_shared::api::WebAppEnvelope;
use taskbot_shared::{CommentWithAuthor, Project, TaskStatus, TaskWithDetails};

/// Commands shown in help texts and registered with Telegram.
pub const COMMANDS: [(&str, &str); 8] = [
    ("start", "Welcome message"),
    ("mytasks", "View your tasks"),
    ("myprojects", "View your projects"),
    ("createproject", "Create new project"),
    ("createtask", "Create new task"),
    ("comments", "View comments on a task"),
    ("url", "Mini app link"),
    ("status", "Bot status"),
];

pub const DB_UNAVAILABLE: &str = "❌ Database is not available. Please try again later.";
pub const REQUEST_FAILED: &str = "❌ Database request failed. Please try again.";
pub const REGISTER_FAILED: &str = "❌ Error registering user. Please try again.";

pub const WELCOME: &str = "👋 Welcome to Task Tracker Bot!\n\n\
    📋 Available commands:\n\
    /mytasks - View your tasks\n\
    /myprojects - View your projects\n\
    /createproject <name> [description] - Create new project\n\
    /createtask - Create new task\n\
    /comments <task_id> - View comments on a task\n\
    /status - Check bot status\n\n\
    Type any command to get started!";
pub const WELCOME_WEB_APP: &str = "\n\nOr tap the button below to open the Task Tracker.";
pub const OPEN_BUTTON: &str = "🚀 Open Task Tracker";
pub const MENU_BUTTON: &str = "🎮 Open Task Tracker";

pub const NO_TASKS: &str =
    "📝 You don't have any tasks yet.\n\nUse /createtask to create your first task!";
pub const NO_PROJECTS: &str =
    "📂 You don't have any projects yet.\n\nUse /createproject to create your first project!";

pub const CREATE_PROJECT_USAGE: &str = "📝 Usage: /createproject <project_name> [description]\n\n\
    Examples:\n\
    /createproject MyNewProject\n\
    /createproject Website Development Creating a company website\n\
    /createproject Mobile App Development new mobile application project";
pub const PROJECT_FAILED: &str = "❌ Failed to create project. Please try again.";

pub const CREATE_PROJECT_FIRST: &str = "❌ You don't have any projects yet.\n\n\
    Please create a project first using:\n\
    /createproject <project_name>";
pub const INVALID_PROJECT_ID: &str = "❌ Invalid project ID. Please use a numeric project ID.";
pub const TASK_FAILED: &str = "❌ Failed to create task. Please try again.";

pub const COMMENTS_USAGE: &str = "📝 Usage: /comments <task_id>";
pub const INVALID_TASK_ID: &str = "❌ Invalid task ID. Please use a numeric task ID.";
pub const COMMENT_FAILED: &str = "❌ Failed to add comment. Please try again.";
pub const STATUS_FAILED: &str = "❌ Failed to update task status. Please try again.";

pub const NO_WEB_APP_URL: &str = "❌ Mini app URL not available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAppButton {
    pub text: String,
    pub url: String,
}

/// One chat message, optionally with a keyboard button that opens the mini app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub web_app: Option<WebAppButton>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            web_app: None,
        }
    }

    pub fn with_web_app(mut self, text: impl Into<String>, url: impl Into<String>) -> Self {
        self.web_app = Some(WebAppButton {
            text: text.into(),
            url: url.into(),
        });
        self
    }
}

/// Public address of the mini app page under a base URL.
pub fn mini_app_url(base: &str) -> String {
    format!("{}/mini-app.html", base.trim_end_matches('/'))
}

fn command_list(indent: &str) -> String {
    COMMANDS
        .iter()
        .map(|(command, description)| format!("{}/{} - {}", indent, command, description))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn unknown_command() -> String {
    format!(
        "🤖 I don't understand that command.\n\nAvailable commands:\n{}",
        command_list("")
    )
}

pub fn status(connected: bool, user_id: i64, web_app_url: Option<&str>) -> String {
    let database = if connected {
        "✅ Connected"
    } else {
        "❌ Disconnected"
    };
    let mini_app = match web_app_url {
        Some(url) => format!("✅ {}", mini_app_url(url)),
        None => "❌ Not available".to_string(),
    };

    format!(
        "🤖 Bot Status:\n\
         • Database: {}\n\
         • Mini App: {}\n\
         • User ID: {}\n\
         • Commands available:\n{}",
        database,
        mini_app,
        user_id,
        command_list("  ")
    )
}

/// First `max` characters followed by an ellipsis.
fn preview(text: &str, max: usize) -> String {
    let head: String = text.chars().take(max).collect();
    format!("{}...", head)
}

pub fn tasks(tasks: &[TaskWithDetails]) -> String {
    let mut response = String::from("📋 Your Tasks:\n\n");

    for item in tasks {
        let task = &item.task;
        response.push_str(&format!("• {} ({})\n", task.title, item.status_name));
        response.push_str(&format!("  ID: {}\n", task.task_id));
        response.push_str(&format!("  Project: {}\n", item.project_name));
        response.push_str(&format!("  Priority: {}\n", task.priority));
        if let Some(due) = task.due_date {
            response.push_str(&format!("  Due: {}\n", due.format("%Y-%m-%d")));
        }
        if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
            response.push_str(&format!("  Description: {}\n", preview(description, 50)));
        }
        response.push('\n');
    }

    response
}

pub fn projects(projects: &[Project]) -> String {
    let mut response = String::from("📁 Your Projects:\n\n");

    for project in projects {
        response.push_str(&format!("• {} (ID: {})\n", project.name, project.project_id));
        if let Some(description) = project.description.as_deref().filter(|d| !d.is_empty()) {
            response.push_str(&format!("  {}\n", description));
        }
        response.push_str(&format!(
            "  Created: {}\n\n",
            project.created_at.format("%Y-%m-%d")
        ));
    }

    response
}

pub fn create_task_instructions(projects: &[Project]) -> String {
    let list = projects
        .iter()
        .map(|p| format!("• {} (ID: {})", p.name, p.project_id))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "📝 To create a task, use:\n\
         /createtask <project_id> <task_title> [| description]\n\n\
         📁 Your available projects:\n{}\n\n\
         Example:\n\
         /createtask 1 Fix homepage layout\n\
         /createtask 2 Add user authentication | Implement login and registration",
        list
    )
}

pub fn comments(task_title: &str, comments: &[CommentWithAuthor]) -> String {
    if comments.is_empty() {
        return format!("💬 No comments on '{}' yet.", task_title);
    }

    let mut response = format!("💬 Comments on '{}':\n\n", task_title);
    for item in comments {
        response.push_str(&format!(
            "• {} ({}): {}\n",
            item.author_name,
            item.comment.created_at.format("%Y-%m-%d %H:%M"),
            item.comment.message
        ));
    }
    response
}

pub fn unknown_status(statuses: &[TaskStatus]) -> String {
    let list = statuses
        .iter()
        .map(|s| format!("{} ({})", s.name, s.status_id))
        .collect::<Vec<_>>()
        .join(", ");
    format!("❌ Unknown status. Available statuses: {}", list)
}

/// Echo of a mini app payload whose action the bot does not handle.
pub fn acknowledgment(envelope: &WebAppEnvelope) -> String {
    let message = echoed(envelope.message.as_ref());
    let time = echoed(envelope.timestamp.as_ref())
        .chars()
        .take(19)
        .collect::<String>();

    format!(
        "📨 Data received from Task Tracker!\n\n\
         • Action: {}\n\
         • Message: {}\n\
         • Time: {}",
        envelope.action.as_deref().unwrap_or("N/A"),
        message,
        time
    )
}

fn echoed(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => "N/A".to_string(),
        Some(other) => other.to_string(),
    }
}
