//! Behaviour shared by every store implementation.

use pretty_assertions::assert_eq;
use sdo_kernel::{
    CritiqueItem, DraftContext, SectionId, SectionStatus, SessionPolicy, WorkflowPlan,
    WorkflowState, WorkflowStatus,
};
use sdo_store::{CachedStore, FileStore, MemoryStore, SessionStore, StoreError};

fn escalated_state(id: &str) -> WorkflowState {
    let plan = WorkflowPlan::new(["disaster_assumption", "business_impact"])
        .with_dependency("business_impact", "disaster_assumption");
    let context = DraftContext::new("Test Manufacturing Co.", "Wakayama", "Ten staff, metal parts.")
        .with_extra("industry", "manufacturing");
    let mut state = WorkflowState::new(id, context, plan, 2, SessionPolicy::default());

    let section = SectionId::from("disaster_assumption");
    state.sections_status.insert(section.clone(), SectionStatus::InProgress);
    state.current_section = Some(section);
    state.status = WorkflowStatus::NeedsHuman;
    state.revision_count = 2;
    state.draft_content = Some("Draft text".to_string());
    state.critique_list = vec![
        CritiqueItem::new("Quantify the expected damage").with_reference("Seismic intensity 6+"),
        CritiqueItem::new("Name the hazard map source"),
    ];
    state
}

async fn assert_round_trip<S: SessionStore>(store: &S) {
    let state = escalated_state("round-trip");
    store.save(&state).await.unwrap();

    let loaded = store.load("round-trip").await.unwrap().expect("state stored");
    assert_eq!(loaded, state);
    assert!(loaded.check_invariants().is_ok());
}

async fn assert_rejects_stale<S: SessionStore>(store: &S) {
    let mut state = escalated_state("stale");
    store.save(&state).await.unwrap();

    state.version += 1;
    store.save(&state).await.unwrap();

    let mut stale = state.clone();
    stale.status = WorkflowStatus::Writing;
    let err = store.save(&stale).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    // the committed snapshot is untouched
    let loaded = store.load("stale").await.unwrap().unwrap();
    assert_eq!(loaded.status, WorkflowStatus::NeedsHuman);
}

#[tokio::test]
async fn memory_store_round_trip() {
    let store = MemoryStore::new();
    assert_round_trip(&store).await;
    assert_rejects_stale(&store).await;
}

#[tokio::test]
async fn file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("checkpoints")).await.unwrap();

    assert_round_trip(&store).await;
    assert_rejects_stale(&store).await;

    assert!(dir.path().join("checkpoints/round-trip.json").exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("checkpoints"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    assert_eq!(
        store.list().await.unwrap(),
        vec!["round-trip".to_string(), "stale".to_string()]
    );
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let state = escalated_state("persisted");
    {
        let store = FileStore::open(dir.path()).await.unwrap();
        store.save(&state).await.unwrap();
    }

    let reopened = FileStore::open(dir.path()).await.unwrap();
    assert_eq!(reopened.load("persisted").await.unwrap(), Some(state));
    assert!(reopened.delete("persisted").await.unwrap());
    assert_eq!(reopened.load("persisted").await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_stores_sharing_a_directory_accept_one_writer_per_version() {
    let dir = tempfile::tempdir().unwrap();
    let a = FileStore::open(dir.path()).await.unwrap();
    let b = FileStore::open(dir.path()).await.unwrap();

    for round in 0..50 {
        let id = format!("race-{round}");
        let base = escalated_state(&id);
        a.save(&base).await.unwrap();

        let mut from_a = base.clone();
        from_a.version = 1;
        from_a.draft_content = Some("from A".to_string());
        let mut from_b = base.clone();
        from_b.version = 1;
        from_b.draft_content = Some("from B".to_string());

        let (ra, rb) = tokio::join!(a.save(&from_a), b.save(&from_b));
        let winner = match (ra, rb) {
            (Ok(()), Err(StoreError::Conflict { .. })) => from_a,
            (Err(StoreError::Conflict { .. }), Ok(())) => from_b,
            other => panic!("round {round}: expected exactly one accepted save, got {other:?}"),
        };

        // the acknowledged snapshot is the one on disk
        assert_eq!(b.load(&id).await.unwrap(), Some(winner));
    }
}

#[tokio::test]
async fn file_store_rejects_path_like_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).await.unwrap();

    let err = store.load("../outside").await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidSessionId(_)));
}

#[tokio::test]
async fn cached_store_round_trip() {
    let store = CachedStore::new(MemoryStore::new(), 16);
    assert_round_trip(&store).await;
    assert_rejects_stale(&store).await;
}

#[tokio::test]
async fn cached_store_drops_entry_after_failed_save() {
    let store = CachedStore::new(MemoryStore::new(), 16);
    let mut state = escalated_state("cached");
    store.save(&state).await.unwrap();

    // write behind the cache's back, then fail a save through it
    state.version = 1;
    state.status = WorkflowStatus::Writing;
    store.inner().save(&state).await.unwrap();
    assert!(store.save(&state).await.is_err());

    let loaded = store.load("cached").await.unwrap().unwrap();
    assert_eq!(loaded.version, 1);
    assert_eq!(loaded.status, WorkflowStatus::Writing);
}
