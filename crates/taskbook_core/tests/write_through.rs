use std::sync::Arc;
use taskbook_core::{
    Applied, CoreConfig, IdStrategy, KvStore, MemoryKvStore, ServiceError, SqliteKvStore, Task,
    TaskPatch, TaskService,
};

fn config(seed: bool) -> CoreConfig {
    CoreConfig {
        seed_defaults: seed,
        id_strategy: IdStrategy::PseudoRandom,
        ..CoreConfig::default()
    }
}

fn stored_tasks(kv: &MemoryKvStore) -> Vec<Task> {
    let raw = kv.get("taskbook_v1:tasks").unwrap().unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn fresh_store_is_seeded_and_written_back() {
    let kv = Arc::new(MemoryKvStore::new());
    let service = TaskService::open(kv.clone(), &config(true));

    assert_eq!(service.lists(), vec!["Personal", "Work", "Shopping"]);
    assert_eq!(service.tags().len(), 3);
    assert_eq!(service.tasks().len(), 1);
    assert_eq!(
        kv.keys().unwrap(),
        vec!["taskbook_v1:lists", "taskbook_v1:tags", "taskbook_v1:tasks"]
    );
}

#[test]
fn each_mutation_writes_its_collection() {
    let kv = Arc::new(MemoryKvStore::new());
    let service = TaskService::open(kv.clone(), &config(false));

    let draft = service.create_draft_task("Personal").unwrap();
    assert_eq!(stored_tasks(&kv)[0].id, draft.id);

    service
        .update_task(&draft.id, TaskPatch::new().title("Water plants"))
        .unwrap();
    assert_eq!(stored_tasks(&kv)[0].title, "Water plants");

    service.add_list("Garden").unwrap();
    let lists: Vec<String> =
        serde_json::from_str(&kv.get("taskbook_v1:lists").unwrap().unwrap()).unwrap();
    assert_eq!(lists, vec!["Personal", "Garden"]);

    service
        .update_task(&draft.id, TaskPatch::new().list("Garden"))
        .unwrap();
    service.delete_list("Garden").unwrap();
    assert_eq!(stored_tasks(&kv)[0].list, "Personal");
}

#[test]
fn write_failure_is_reported_but_memory_stays_authoritative() {
    let kv = Arc::new(MemoryKvStore::new());
    let service = TaskService::open(kv.clone(), &config(false));
    let draft = service.create_draft_task("Personal").unwrap();

    kv.set_reject_writes(true);
    let err = service.toggle_done(&draft.id).unwrap_err();
    assert_eq!(err.applied(), Some(&Applied::Changed));
    assert!(service.task(&draft.id).unwrap().done);
    assert!(!stored_tasks(&kv)[0].done);

    kv.set_reject_writes(false);
    service
        .update_task(&draft.id, TaskPatch::new().title("Reconciled"))
        .unwrap();
    let stored = stored_tasks(&kv);
    assert!(stored[0].done);
    assert_eq!(stored[0].title, "Reconciled");
}

#[test]
fn failed_draft_write_still_returns_the_draft() {
    let kv = Arc::new(MemoryKvStore::new());
    let service = TaskService::open(kv.clone(), &config(false));

    kv.set_reject_writes(true);
    let err = service.create_draft_task("Personal").unwrap_err();
    let Some(Applied::Draft(draft)) = err.applied().cloned() else {
        panic!("expected the created draft, got {err:?}");
    };
    assert_eq!(service.draft_task().unwrap().id, draft.id);
    assert_eq!(service.selected_task().unwrap().id, draft.id);

    kv.set_reject_writes(false);
    assert!(service.confirm_draft(&draft.id).unwrap());
    assert_eq!(stored_tasks(&kv)[0].id, draft.id);
}

#[test]
fn failed_cascade_write_still_reports_the_fallback() {
    let kv = Arc::new(MemoryKvStore::new());
    let service = TaskService::open(kv.clone(), &config(false));
    service.add_list("Work").unwrap();
    let draft = service.create_draft_task("Work").unwrap();
    service.confirm_draft(&draft.id).unwrap();

    kv.set_reject_writes(true);
    let err = service.delete_list("Work").unwrap_err();
    match err {
        ServiceError::Persist {
            applied: Applied::ListRemoved(removal),
            source,
        } => {
            assert_eq!(removal.fallback, "Personal");
            assert_eq!(removal.reassigned, 1);
            assert!(source.to_string().contains("taskbook_v1:lists"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(service.lists(), vec!["Personal"]);
    assert_eq!(service.task(&draft.id).unwrap().list, "Personal");
    assert_eq!(stored_tasks(&kv)[0].list, "Work");
}

#[test]
fn failed_import_write_keeps_the_imported_state() {
    let kv = Arc::new(MemoryKvStore::new());
    let service = TaskService::open(kv.clone(), &config(false));
    let document = r#"{"lists":["Garden"],"tags":[],"tasks":[{"id":"g1","title":"Prune","list":"Garden"}]}"#;

    kv.set_reject_writes(true);
    let err = service.import_snapshot(document).unwrap_err();
    assert_eq!(err.applied(), Some(&Applied::Imported));
    assert_eq!(service.lists(), vec!["Garden"]);
    assert_eq!(service.task("g1").unwrap().title, "Prune");
    assert!(stored_tasks(&kv).is_empty());
}

#[test]
fn read_failure_at_open_never_overwrites_stored_data() {
    let kv = Arc::new(MemoryKvStore::new());
    let task_id = {
        let service = TaskService::open(kv.clone(), &config(false));
        service.add_list("Work").unwrap();
        let draft = service.create_draft_task("Work").unwrap();
        service.confirm_draft(&draft.id).unwrap();
        draft.id
    };

    kv.set_reject_reads(true);
    let degraded = TaskService::open(kv.clone(), &config(true));
    assert!(degraded.task(&task_id).is_none());
    kv.set_reject_reads(false);

    let lists: Vec<String> =
        serde_json::from_str(&kv.get("taskbook_v1:lists").unwrap().unwrap()).unwrap();
    assert_eq!(lists, vec!["Personal", "Work"]);
    let stored = stored_tasks(&kv);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, task_id);
    assert_eq!(stored[0].list, "Work");
}

#[test]
fn corrupt_collection_falls_back_to_default() {
    let kv = Arc::new(MemoryKvStore::new());
    kv.put("taskbook_v1:lists", "[\"Work\"]").unwrap();
    kv.put("taskbook_v1:tasks", "{ definitely not tasks").unwrap();

    let service = TaskService::open(kv.clone(), &config(false));
    assert_eq!(service.lists(), vec!["Work"]);
    assert!(service.tags().is_empty());
    assert!(service.tasks().is_empty());
}

#[test]
fn no_op_mutations_do_not_write() {
    let kv = Arc::new(MemoryKvStore::new());
    let service = TaskService::open(kv.clone(), &config(false));

    kv.set_reject_writes(true);
    assert!(!service.toggle_done("missing").unwrap());
    assert_eq!(service.add_tag("  ").unwrap(), None);
    assert!(service.delete_list("missing").unwrap().is_none());
}

#[test]
fn sqlite_backed_service_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskbook.sqlite3");

    let task_id = {
        let service = TaskService::open(SqliteKvStore::open(&path).unwrap(), &config(false));
        let draft = service.create_draft_task("Personal").unwrap();
        service
            .update_task(&draft.id, TaskPatch::new().title("Persisted"))
            .unwrap();
        service.confirm_draft(&draft.id).unwrap();
        service.add_tag("Home").unwrap();
        draft.id
    };

    let service = TaskService::open(SqliteKvStore::open(&path).unwrap(), &config(true));
    let task = service.task(&task_id).unwrap();
    assert_eq!(task.title, "Persisted");
    assert!(!task.draft);
    assert_eq!(service.tags(), vec!["Home"]);
    assert_eq!(service.lists(), vec!["Personal"]);
}

#[test]
fn concurrent_readers_see_whole_snapshots() {
    let service = Arc::new(TaskService::open(MemoryKvStore::new(), &config(false)));
    let first = r#"{"lists":["A"],"tags":["a"],"tasks":[{"id":"1","title":"a","list":"A"}]}"#;
    let second = r#"{"lists":["B"],"tags":["b"],"tasks":[{"id":"2","title":"b","list":"B"}]}"#;
    service.import_snapshot(first).unwrap();

    let writer = {
        let service = Arc::clone(&service);
        std::thread::spawn(move || {
            for round in 0..200 {
                let document = if round % 2 == 0 { second } else { first };
                service.import_snapshot(document).unwrap();
            }
        })
    };

    for _ in 0..200 {
        let state = service.snapshot();
        let list = &state.lists[0];
        assert_eq!(state.lists.len(), 1);
        assert_eq!(state.tags[0], list.to_lowercase());
        assert_eq!(&state.tasks[0].list, list);
    }
    writer.join().unwrap();
}
