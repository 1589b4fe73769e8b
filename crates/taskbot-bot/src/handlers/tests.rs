use std::sync::Arc;

use serde_json::{json, Value};
use taskbot_store::{MemoryBackend, TaskRepository, PROJECTS, TASKS, TASK_COMMENTS, USERS};

use super::*;

fn sender(id: i64) -> Sender {
    Sender {
        id,
        username: Some(format!("user{}", id)),
        first_name: "Alice".to_string(),
        last_name: Some("Smith".to_string()),
    }
}

fn dispatcher() -> (Arc<MemoryBackend>, CommandDispatcher) {
    let backend = Arc::new(MemoryBackend::new());
    let repo = TaskRepository::new(backend.clone());
    (backend, CommandDispatcher::new(Some(repo), None))
}

async fn send(dispatcher: &CommandDispatcher, from: i64, text: &str) -> Reply {
    dispatcher
        .handle(&Incoming {
            sender: sender(from),
            content: Content::Text(text.to_string()),
        })
        .await
}

async fn post(dispatcher: &CommandDispatcher, from: i64, data: Value) -> Reply {
    dispatcher
        .handle(&Incoming {
            sender: sender(from),
            content: Content::WebAppData(data.to_string()),
        })
        .await
}

/// The generated id in a "... (ID: 7)" confirmation.
fn returned_id(reply: &Reply) -> i64 {
    let start = reply.text.find("(ID: ").expect("reply carries an id") + 5;
    let end = start + reply.text[start..].find(')').unwrap();
    reply.text[start..end].parse().unwrap()
}

#[tokio::test]
async fn website_scenario_end_to_end() {
    let (backend, dispatcher) = dispatcher();

    let created = send(&dispatcher, 42, "/createproject Website").await;
    assert!(created.text.starts_with("✅ Project 'Website' created successfully!"));
    let project_id = returned_id(&created);

    let project = &backend.rows(PROJECTS)[0];
    assert_eq!(project["name"], json!("Website"));
    assert_eq!(project["description"], json!(""));
    assert_eq!(project["created_by"], json!(42));

    let created = send(&dispatcher, 42, &format!("/createtask {} Fix homepage", project_id)).await;
    assert!(created.text.starts_with("✅ Task 'Fix homepage' created successfully!"));
    let task_id = returned_id(&created);

    let task = &backend.rows(TASKS)[0];
    assert_eq!(task["task_id"], json!(task_id));
    assert_eq!(task["status_id"], json!(1));
    assert_eq!(task["author_id"], json!(42));
    assert_eq!(task["project_id"], json!(project_id));
    assert_eq!(task["priority"], json!("medium"));

    let listing = send(&dispatcher, 42, "/mytasks").await;
    assert_eq!(listing.text.matches("• ").count(), 1);
    assert!(listing.text.contains("• Fix homepage (To Do)\n"));
    assert!(listing.text.contains("  Project: Website\n"));
}

#[tokio::test]
async fn start_registers_once_and_offers_the_mini_app() {
    let backend = Arc::new(MemoryBackend::new());
    let repo = TaskRepository::new(backend.clone());
    let dispatcher = CommandDispatcher::new(Some(repo), Some("https://demo.tuna.am".to_string()));

    let first = send(&dispatcher, 42, "/start").await;
    send(&dispatcher, 42, "/start").await;

    assert!(first.text.starts_with(reply::WELCOME));
    assert_eq!(
        first.web_app.map(|button| button.url),
        Some("https://demo.tuna.am/mini-app.html".to_string())
    );

    let users = backend.rows(USERS);
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["full_name"], json!("Alice Smith"));
    assert_eq!(users[0]["username"], json!("user42"));
}

#[tokio::test]
async fn createproject_without_arguments_never_touches_the_store() {
    let (backend, dispatcher) = dispatcher();

    let reply = send(&dispatcher, 42, "/createproject").await;

    assert_eq!(reply.text, reply::CREATE_PROJECT_USAGE);
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn createproject_keeps_the_rest_as_description() {
    let (backend, dispatcher) = dispatcher();

    send(&dispatcher, 42, "/createproject Website Development Creating a company website").await;

    let project = &backend.rows(PROJECTS)[0];
    assert_eq!(project["name"], json!("Website"));
    assert_eq!(project["description"], json!("Development Creating a company website"));
}

#[tokio::test]
async fn empty_listings_get_their_own_messages() {
    let (_, dispatcher) = dispatcher();

    assert_eq!(send(&dispatcher, 7, "/mytasks").await.text, reply::NO_TASKS);
    assert_eq!(send(&dispatcher, 7, "/myprojects").await.text, reply::NO_PROJECTS);
    assert_eq!(send(&dispatcher, 7, "/createtask").await.text, reply::CREATE_PROJECT_FIRST);
}

#[tokio::test]
async fn createtask_without_title_lists_projects() {
    let (_, dispatcher) = dispatcher();
    send(&dispatcher, 42, "/createproject Website").await;

    let reply = send(&dispatcher, 42, "/createtask 1").await;

    assert!(reply.text.starts_with("📝 To create a task, use:"));
    assert!(reply.text.contains("• Website (ID: 1)"));
}

#[tokio::test]
async fn createtask_rejects_non_numeric_project_id() {
    let (backend, dispatcher) = dispatcher();

    let reply = send(&dispatcher, 42, "/createtask abc Fix homepage").await;

    assert_eq!(reply.text, reply::INVALID_PROJECT_ID);
    assert!(backend.rows(TASKS).is_empty());
}

#[tokio::test]
async fn createtask_on_a_foreign_project_is_rejected() {
    let (backend, dispatcher) = dispatcher();
    let project_id = returned_id(&send(&dispatcher, 1, "/createproject Private").await);

    let foreign = send(&dispatcher, 2, &format!("/createtask {} Sneaky task", project_id)).await;
    let missing = send(&dispatcher, 2, "/createtask 999 Ghost task").await;

    assert_eq!(foreign.text, "❌ Project not found or you don't have access to it.");
    assert_eq!(missing.text, foreign.text);
    assert!(backend.rows(TASKS).is_empty());
}

#[tokio::test]
async fn members_may_add_tasks_when_memberships_count() {
    let backend = Arc::new(MemoryBackend::new());
    let repo = TaskRepository::new(backend.clone()).with_memberships(true);
    let dispatcher = CommandDispatcher::new(Some(repo.clone()), None);

    send(&dispatcher, 1, "/start").await;
    send(&dispatcher, 2, "/start").await;
    let project_id = returned_id(&send(&dispatcher, 1, "/createproject Shared").await);
    repo.add_project_member(project_id, 2, "member").await.unwrap();

    let reply = send(&dispatcher, 2, &format!("/createtask {} Review copy | Check the wording", project_id)).await;

    assert!(reply.text.starts_with("✅ Task 'Review copy' created"));
    assert_eq!(backend.rows(TASKS)[0]["description"], json!("Check the wording"));
}

#[tokio::test]
async fn degraded_mode_answers_without_a_store() {
    let dispatcher = CommandDispatcher::new(None, None);

    for command in ["/start", "/mytasks", "/myprojects", "/createproject X", "/createtask 1 T"] {
        assert_eq!(send(&dispatcher, 42, command).await.text, reply::DB_UNAVAILABLE);
    }

    let status = send(&dispatcher, 42, "/status").await;
    assert!(status.text.contains("• Database: ❌ Disconnected"));
    assert!(status.text.contains("• User ID: 42"));
    assert_eq!(send(&dispatcher, 42, "/url").await.text, reply::NO_WEB_APP_URL);
}

#[tokio::test]
async fn store_failures_become_replies_and_the_bot_keeps_going() {
    let (backend, dispatcher) = dispatcher();

    backend.set_available(false);
    let failed = send(&dispatcher, 42, "/createproject Website").await;
    let listing = send(&dispatcher, 42, "/mytasks").await;
    let status = send(&dispatcher, 42, "/status").await;

    assert_eq!(failed.text, reply::PROJECT_FAILED);
    assert_eq!(listing.text, reply::REQUEST_FAILED);
    assert!(status.text.contains("❌ Disconnected"));

    backend.set_available(true);
    let recovered = send(&dispatcher, 42, "/createproject Website").await;
    assert!(recovered.text.starts_with("✅"));
    assert!(send(&dispatcher, 42, "/status").await.text.contains("✅ Connected"));
}

#[tokio::test]
async fn unrecognized_text_gets_help() {
    let (_, dispatcher) = dispatcher();

    let plain = send(&dispatcher, 42, "hello there").await;
    let unknown = send(&dispatcher, 42, "/deletetask 3").await;

    assert!(plain.text.starts_with("🤖 I don't understand that command."));
    assert_eq!(unknown.text, plain.text);
}

#[tokio::test]
async fn web_app_creates_project_and_task() {
    let (backend, dispatcher) = dispatcher();

    let project = post(
        &dispatcher,
        42,
        json!({ "action": "create_project", "name": "Mobile", "description": "iOS app" }),
    )
    .await;
    let project_id = returned_id(&project);

    let task = post(
        &dispatcher,
        42,
        json!({
            "action": "create_task",
            "title": "Login screen",
            "project_id": project_id.to_string(),
            "priority": "high",
            "assignee_id": "",
            "due_date": "2024-05-01"
        }),
    )
    .await;

    assert!(task.text.starts_with("✅ Task 'Login screen' created"));
    let row = &backend.rows(TASKS)[0];
    assert_eq!(row["priority"], json!("high"));
    assert_eq!(row["due_date"], json!("2024-05-01"));
    assert_eq!(row["status_id"], json!(1));
}

#[tokio::test]
async fn web_app_status_updates_are_checked() {
    let (_, dispatcher) = dispatcher();
    let project_id = returned_id(&send(&dispatcher, 42, "/createproject Website").await);
    let task_id = returned_id(&send(&dispatcher, 42, &format!("/createtask {} Fix homepage", project_id)).await);

    let moved = post(&dispatcher, 42, json!({ "action": "update_task_status", "task_id": task_id, "status_id": 4 })).await;
    let bogus = post(&dispatcher, 42, json!({ "action": "update_task_status", "task_id": task_id, "status_id": 9 })).await;
    let foreign = post(&dispatcher, 7, json!({ "action": "update_task_status", "task_id": task_id, "status_id": 2 })).await;

    assert_eq!(moved.text, "✅ Task 'Fix homepage' moved to Done!");
    assert!(bogus.text.starts_with("❌ Unknown status. Available statuses: To Do (1)"));
    assert_eq!(foreign.text, "❌ Task not found or you don't have access to it.");
    assert!(send(&dispatcher, 42, "/mytasks").await.text.contains("(Done)"));
}

#[tokio::test]
async fn web_app_comments_show_up_in_order() {
    let (_, dispatcher) = dispatcher();
    send(&dispatcher, 42, "/start").await;
    let project_id = returned_id(&send(&dispatcher, 42, "/createproject Website").await);
    let task_id = returned_id(&send(&dispatcher, 42, &format!("/createtask {} Fix homepage", project_id)).await);

    post(&dispatcher, 42, json!({ "action": "add_comment", "task_id": task_id, "message": "first" })).await;
    let added = post(&dispatcher, 42, json!({ "action": "add_comment", "task_id": task_id, "message": "hello" })).await;
    assert!(added.text.starts_with("✅ Comment added to 'Fix homepage'!"));

    let listing = send(&dispatcher, 42, &format!("/comments {}", task_id)).await;
    let first = listing.text.find(": first").unwrap();
    let second = listing.text.find(": hello").unwrap();

    assert!(listing.text.starts_with("💬 Comments on 'Fix homepage':"));
    assert!(listing.text.contains("• Alice Smith ("));
    assert!(first < second);
    assert_eq!(
        send(&dispatcher, 7, &format!("/comments {}", task_id)).await.text,
        "❌ Task not found or you don't have access to it."
    );
}

#[tokio::test]
async fn malformed_web_app_payloads_are_answered() {
    let (backend, dispatcher) = dispatcher();

    let broken = dispatcher
        .handle(&Incoming {
            sender: sender(42),
            content: Content::WebAppData("{not json".to_string()),
        })
        .await;
    let no_action = post(&dispatcher, 42, json!({ "title": "orphan" })).await;
    let missing_field = post(&dispatcher, 42, json!({ "action": "create_task", "project_id": 1 })).await;
    let blank_name = post(&dispatcher, 42, json!({ "action": "create_project", "name": "  " })).await;

    assert!(broken.text.starts_with("❌ Error parsing data: "));
    assert!(no_action.text.starts_with("🤖 I don't understand that command."));
    assert!(missing_field.text.starts_with("❌ Invalid create_task data: "));
    assert_eq!(blank_name.text, "❌ Project name is required");
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn unknown_web_app_actions_are_acknowledged() {
    let (backend, dispatcher) = dispatcher();

    let reply = post(
        &dispatcher,
        42,
        json!({ "action": "ping", "message": "hi", "timestamp": "2024-03-01T10:00:00.000Z" }),
    )
    .await;

    assert!(reply.text.starts_with("📨 Data received from Task Tracker!"));
    assert!(reply.text.contains("• Action: ping"));
    assert!(reply.text.ends_with("• Time: 2024-03-01T10:00:00"));
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn web_app_actions_survive_numeric_timestamps() {
    let (backend, dispatcher) = dispatcher();

    let created = post(
        &dispatcher,
        42,
        json!({ "action": "create_project", "name": "Mobile", "timestamp": 1709287200000i64 }),
    )
    .await;
    let ping = post(&dispatcher, 42, json!({ "action": "ping", "timestamp": 1709287200000i64 })).await;

    assert!(created.text.starts_with("✅ Project 'Mobile' created successfully!"));
    assert_eq!(backend.rows(PROJECTS)[0]["name"], json!("Mobile"));
    assert!(ping.text.starts_with("📨 Data received from Task Tracker!"));
    assert!(ping.text.contains("• Action: ping"));
}

#[tokio::test]
async fn web_app_refuses_foreign_projects_and_tasks() {
    let (backend, dispatcher) = dispatcher();
    send(&dispatcher, 1, "/start").await;
    send(&dispatcher, 2, "/start").await;
    let project_id = returned_id(&send(&dispatcher, 1, "/createproject Private").await);
    let task_id = returned_id(&send(&dispatcher, 1, &format!("/createtask {} Secret plan", project_id)).await);

    let task = post(
        &dispatcher,
        2,
        json!({ "action": "create_task", "title": "Sneaky", "project_id": project_id }),
    )
    .await;
    let comment = post(
        &dispatcher,
        2,
        json!({ "action": "add_comment", "task_id": task_id, "message": "let me in" }),
    )
    .await;

    assert_eq!(task.text, "❌ Project not found or you don't have access to it.");
    assert_eq!(comment.text, "❌ Task not found or you don't have access to it.");
    assert_eq!(backend.rows(TASKS).len(), 1);
    assert!(backend.rows(TASK_COMMENTS).is_empty());
}
