//! End-to-end check-in flows across the engine, storage and realtime feed

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

use checkin::checkin::{
    CategoryProgressUpdate, CheckInContext, CheckInStatus, DraftNoteUpdate, Step,
};
use checkin::realtime::{subscribe_session_changes, ChangeStream, LocalRealtimeHub};
use checkin::storage::{CheckInRepository, MemoryStore, SledStore};

mod common;

/// Apply every event that is already queued on `stream`
async fn drain(stream: &mut ChangeStream, ctx: &mut CheckInContext) -> usize {
    let mut applied = 0;
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(50), stream.next()).await
    {
        if ctx.apply_change(&event) {
            applied += 1;
        }
    }
    applied
}

#[tokio::test]
async fn test_guided_scenario_from_start_to_reflection() {
    let store = Arc::new(MemoryStore::new());
    let mut ctx = common::device(store.clone(), "u-1", common::manual_clock()).await;

    ctx.start_check_in(vec!["communication".to_string()], None)
        .await
        .unwrap();
    let session = ctx.session().unwrap();
    assert_eq!(session.progress.current_step, Step::Welcome);
    assert_eq!(session.category_progress.len(), 1);

    ctx.complete_step(Step::Welcome).await.unwrap();
    let session = ctx.session().unwrap();
    assert_eq!(session.progress.current_step, Step::CategorySelection);
    assert!(session.progress.completed_steps.contains(&Step::Welcome));

    ctx.complete_step(Step::CategorySelection).await.unwrap();
    ctx.complete_step(Step::CategoryDiscussion).await.unwrap();
    assert_eq!(ctx.session().unwrap().progress.current_step, Step::Reflection);

    ctx.update_category_progress("unknown-id", CategoryProgressUpdate::default())
        .await
        .unwrap();
    let session = ctx.session().unwrap();
    assert_eq!(session.category_progress.len(), 1);
    assert_eq!(session.category_progress[0].category_id, "communication");
    assert!(ctx.error().is_none());
}

#[tokio::test]
async fn test_storage_outage_does_not_block_navigation() {
    let store = Arc::new(MemoryStore::new());
    let clock = common::manual_clock();
    let mut ctx = common::device(store.clone(), "u-1", clock.clone()).await;
    ctx.start_check_in(vec!["finances".to_string()], Some(2))
        .await
        .unwrap();

    store.set_unavailable(true);
    ctx.complete_step(Step::Welcome).await.unwrap();
    ctx.complete_step(Step::CategorySelection).await.unwrap();

    assert_eq!(
        ctx.session().unwrap().progress.current_step,
        Step::CategoryDiscussion
    );
    assert!(ctx.error().is_some());

    store.set_unavailable(false);
    ctx.save_session().await.unwrap();
    assert!(ctx.error().is_none());

    let reloaded = common::device(store, "u-1", clock).await;
    assert_eq!(
        reloaded.session().unwrap().progress.current_step,
        Step::CategoryDiscussion
    );
}

#[tokio::test]
async fn test_partner_device_follows_realtime_changes() {
    let hub = LocalRealtimeHub::new();
    let store = Arc::new(MemoryStore::with_realtime(hub.clone()));
    let clock = common::manual_clock();

    let mut partner = common::device(store.clone(), "u-2", clock.clone()).await;
    let mut changes = subscribe_session_changes(&hub, "c-1");
    let mut driver = common::device(store.clone(), "u-1", clock.clone()).await;

    driver
        .start_check_in(vec!["intimacy".to_string()], None)
        .await
        .unwrap();
    assert!(drain(&mut changes, &mut partner).await >= 1);
    let id = driver.session().unwrap().id.clone();
    assert_eq!(partner.session().unwrap().id, id);

    let note = driver
        .add_draft_note("plan a weekend away", Some("intimacy".to_string()))
        .unwrap();
    driver.save_session().await.unwrap();
    drain(&mut changes, &mut partner).await;
    let notes = &partner.session().unwrap().draft_notes;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, note.id);

    driver.remove_draft_note(&note.id).await.unwrap();
    drain(&mut changes, &mut partner).await;
    assert!(partner.session().unwrap().draft_notes.is_empty());

    driver
        .complete_check_in(Some(5), Some("good talk".to_string()))
        .await
        .unwrap();
    drain(&mut changes, &mut partner).await;
    assert!(partner.session().is_none());
    assert_eq!(
        store.check_in(&id).unwrap().unwrap().status,
        CheckInStatus::Completed
    );
}

#[tokio::test]
async fn test_own_echo_keeps_newer_local_note_edit() {
    let hub = LocalRealtimeHub::new();
    let store = Arc::new(MemoryStore::with_realtime(hub.clone()));
    let clock = common::manual_clock();

    let mut changes = subscribe_session_changes(&hub, "c-1");
    let mut ctx = common::device(store.clone(), "u-1", clock.clone()).await;
    ctx.start_check_in(vec!["communication".to_string()], None)
        .await
        .unwrap();

    let note = ctx.add_draft_note("A", None).unwrap();
    ctx.save_session().await.unwrap();
    ctx.update_draft_note(
        &note.id,
        DraftNoteUpdate {
            content: Some("B".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    drain(&mut changes, &mut ctx).await;

    let notes = &ctx.session().unwrap().draft_notes;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].content, "B");

    ctx.save_session().await.unwrap();
    drain(&mut changes, &mut ctx).await;
    assert_eq!(ctx.session().unwrap().draft_notes[0].content, "B");
    let id = ctx.session().unwrap().id.clone();
    assert_eq!(store.list_notes(&id).await.unwrap()[0].content, "B");
}

#[tokio::test]
async fn test_session_resumes_after_restart_on_sled() {
    let (store, dir) = common::create_temp_store();
    let path = dir.path().join("checkin.db");
    let clock = common::manual_clock();

    let id = {
        let mut ctx = common::device(Arc::new(store), "u-1", clock.clone()).await;
        ctx.start_check_in(
            vec!["communication".to_string(), "chores".to_string()],
            Some(3),
        )
        .await
        .unwrap();
        ctx.complete_step(Step::Welcome).await.unwrap();
        ctx.complete_step(Step::CategorySelection).await.unwrap();
        ctx.add_draft_note("split the laundry", Some("chores".to_string()))
            .unwrap();
        ctx.update_category_progress(
            "chores",
            CategoryProgressUpdate {
                is_completed: Some(true),
                time_spent: Some(300),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        ctx.save_session().await.unwrap();
        ctx.session().unwrap().id.clone()
    };

    let store = Arc::new(SledStore::open(&path).unwrap());
    let ctx = common::device(store.clone(), "u-1", clock).await;
    let session = ctx.session().unwrap();

    assert_eq!(session.id, id);
    assert_eq!(session.progress.current_step, Step::CategoryDiscussion);
    assert_eq!(session.progress.percentage, 40);
    assert!(ctx.is_step_completed(Step::CategorySelection));
    assert_eq!(session.draft_notes.len(), 1);
    assert_eq!(session.category_progress.len(), 2);
    let chores = session.category("chores").unwrap();
    assert!(chores.is_completed);
    assert_eq!(chores.time_spent, 300);
    assert_eq!(session.base_record.mood_before, Some(3));

    assert_eq!(store.list_notes(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_abandon_then_start_fresh() {
    let store = Arc::new(MemoryStore::new());
    let clock = common::manual_clock();
    let mut ctx = common::device(store.clone(), "u-1", clock.clone()).await;

    ctx.start_check_in(vec!["trust".to_string()], None)
        .await
        .unwrap();
    let first = ctx.session().unwrap().id.clone();
    ctx.add_draft_note("half a thought", None).unwrap();
    ctx.save_session().await.unwrap();
    ctx.abandon_check_in().await.unwrap();

    assert!(store.list_notes(&first).await.unwrap().is_empty());
    let reloaded = common::device(store.clone(), "u-1", clock).await;
    assert!(reloaded.session().is_none());

    ctx.start_check_in(vec!["trust".to_string()], None)
        .await
        .unwrap();
    assert_ne!(ctx.session().unwrap().id, first);
}
