mod common;

use anyhow::Result;
use taskboard::{
    client::{
        export::{to_csv, to_pdf},
        ClientError, Quadrant, TodoBoard, TodoForm,
    },
    todos::{
        repo_types::{Level, TaskStatus},
        TodoRepo,
    },
};
use time::{Duration, OffsetDateTime};

fn form(title: &str, urgency: Level, importance: Level) -> TodoForm {
    TodoForm {
        title: title.into(),
        urgency,
        importance,
        ..TodoForm::blank()
    }
}

#[tokio::test]
async fn board_drives_the_http_api() -> Result<()> {
    let server = common::spawn().await?;
    let mut api = server.client();
    api.register("erin@example.com", common::PASSWORD, None).await?;

    let mut board = TodoBoard::new(api);
    board.load().await?;
    assert!(board.todos().is_empty());

    let urgent = board
        .add(form("fire", Level::High, Level::High))
        .await?
        .id;
    board.add(form("someday", Level::Low, Level::Low)).await?;
    let call_back = TodoForm {
        title: "call back".into(),
        reminder: Some(OffsetDateTime::now_utc() + Duration::minutes(3)),
        ..TodoForm::blank()
    };
    board.add(call_back).await?;
    assert_eq!(board.todos()[0].title, "call back");

    assert_eq!(board.toggle_status(urgent).await?.status, TaskStatus::Done);
    assert_eq!(board.toggle_status(urgent).await?.status, TaskStatus::Todo);

    board.add_subtask(urgent, "grab extinguisher").await?;
    let sub = board.get(urgent).map(|t| t.subtasks[0].id).unwrap();
    board.set_subtask_completed(sub, true).await?;

    let local: Vec<_> = board.todos().to_vec();
    board.load().await?;
    assert_eq!(board.todos(), local.as_slice());

    let matrix = board.matrix();
    assert_eq!(matrix.quadrant(Quadrant::DoFirst).len(), 1);
    assert_eq!(matrix.quadrant(Quadrant::DontDo).len(), 1);
    assert_eq!(matrix.unplaced().len(), 1);

    let reminders = board.due_reminders(OffsetDateTime::now_utc());
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].message(), "Reminder: \"call back\" is due soon!");

    let csv = String::from_utf8(to_csv(board.todos())?)?;
    assert_eq!(csv.lines().count(), 4);
    assert!(to_pdf(board.todos()).starts_with(b"%PDF"));

    board.remove(urgent).await?;
    assert_eq!(board.todos().len(), 2);
    Ok(())
}

#[tokio::test]
async fn server_errors_surface_and_leave_the_board_alone() -> Result<()> {
    let server = common::spawn().await?;
    let mut api = server.client();
    api.register("frank@example.com", common::PASSWORD, None).await?;
    let mut board = TodoBoard::new(api);

    let err = board.add(TodoForm::blank()).await.unwrap_err();
    assert!(matches!(&err, ClientError::Api { status: 400, message } if message == "Title is required"));
    assert!(board.todos().is_empty());

    let id = board.add(form("keep", Level::Normal, Level::Normal)).await?.id;
    server
        .store
        .update(board.todos()[0].user_id, id, Default::default())
        .await?;
    let err = board.toggle_status(id).await.unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(board.get(id).map(|t| t.status), Some(TaskStatus::Todo));
    Ok(())
}
