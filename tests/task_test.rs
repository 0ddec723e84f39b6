use std::time::Duration;

use studio_room::resources::{
    classify::ClassifyError,
    task::{AssetError, AssetTasks, Spawner, TaskState},
};

use crate::common::test_utils::init_logger;

mod common;

fn tasks(timeout: Option<Duration>) -> AssetTasks<u32> {
    init_logger();
    AssetTasks::new(Spawner::new(tokio::runtime::Handle::current()), timeout)
}

#[tokio::test]
async fn finished_load_is_ready() {
    let mut tasks = tasks(None);
    let id = tasks.spawn("answer", async { Ok(42) });
    assert_eq!(tasks.state(id), Some(&TaskState::Pending));

    let (done, result) = tasks.next().await.unwrap();
    assert_eq!(done, id);
    assert_eq!(result.unwrap(), 42);
    assert_eq!(tasks.state(id), Some(&TaskState::Ready));
    assert_eq!(tasks.pending(), 0);
    assert!(tasks.next().await.is_none());
}

#[tokio::test]
async fn failed_load_keeps_the_error() {
    let mut tasks = tasks(None);
    let id = tasks.spawn("broken", async { Err(anyhow::anyhow!("404 not found")) });

    let (_, result) = tasks.next().await.unwrap();
    match result {
        Err(AssetError::Load { label, message }) => {
            assert_eq!(label, "broken");
            assert!(message.contains("404"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(matches!(tasks.state(id), Some(TaskState::Failed(_))));
}

#[tokio::test]
async fn classification_errors_stay_typed() {
    let mut tasks = tasks(None);
    tasks.spawn("headphones", async {
        Err(anyhow::Error::from(ClassifyError::MissingRequired {
            role: String::from("stand"),
        }))
    });

    let (_, result) = tasks.next().await.unwrap();
    match result {
        Err(AssetError::Classify { source, .. }) => assert_eq!(
            source,
            ClassifyError::MissingRequired {
                role: String::from("stand")
            }
        ),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn slow_load_times_out() {
    let mut tasks = tasks(Some(Duration::from_millis(20)));
    let id = tasks.spawn("slow", async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(1)
    });

    let (_, result) = tasks.next().await.unwrap();
    assert!(matches!(result, Err(AssetError::TimedOut { .. })));
    assert!(matches!(tasks.state(id), Some(TaskState::Failed(_))));
}

#[tokio::test]
async fn cancelled_load_never_delivers() {
    let mut tasks = tasks(None);
    let slow = tasks.spawn("slow", async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(1)
    });
    let fast = tasks.spawn("fast", async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(2)
    });

    assert!(tasks.cancel(slow));
    assert!(!tasks.cancel(slow));
    assert_eq!(tasks.state(slow), Some(&TaskState::Cancelled));

    let (done, result) = tasks.next().await.unwrap();
    assert_eq!(done, fast);
    assert_eq!(result.unwrap(), 2);
    assert!(tasks.next().await.is_none());
    assert_eq!(tasks.state(slow), Some(&TaskState::Cancelled));
}

#[tokio::test]
async fn cancel_all_stops_every_pending_load() {
    let mut tasks = tasks(None);
    for i in 0..3 {
        tasks.spawn(format!("load {i}"), async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(i)
        });
    }
    assert_eq!(tasks.pending(), 3);
    assert_eq!(tasks.cancel_all(), 3);
    assert_eq!(tasks.pending(), 0);

    // aborted tasks report back, but their outcome is dropped
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(tasks.poll().is_empty());
}

#[tokio::test]
async fn poll_never_blocks() {
    let mut tasks = tasks(None);
    tasks.spawn("slow", async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(1)
    });
    assert!(tasks.poll().is_empty());
    assert_eq!(tasks.pending(), 1);
}
