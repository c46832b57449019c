//! Transactional commit: round trips, failure atomicity, retry.

mod fixtures;

use fixtures::{build_stack, open_space};
use objectspace::prelude::*;
use objectspace::Error;

#[test]
fn created_graph_round_trips_through_a_fresh_session() {
    let (registry, storage) = build_stack();

    let (project_id, task_id) = {
        let mut os = open_space(&registry, &storage);
        let project = os.create_object("project").unwrap();
        os.set_value(&project, "name", Value::Text("atlas".into())).unwrap();

        let task = os.create_object("task").unwrap();
        os.set_value(&task, "title", Value::Text("wire the codec".into())).unwrap();
        os.set_value(&task, "hours", Value::Int(6)).unwrap();
        os.set_relation(&task, "project", &project).unwrap();

        os.commit_changes().unwrap();
        assert!(!os.has_pending_changes());

        (
            project.read().unwrap().id().unwrap(),
            task.read().unwrap().id().unwrap(),
        )
    };

    let mut fresh = open_space(&registry, &storage);
    let task = fresh.get_object("task", task_id, true).unwrap().unwrap();
    {
        let guard = task.read().unwrap();
        assert_eq!(guard.get("title"), Value::Text("wire the codec".into()));
        assert_eq!(guard.get("hours"), Value::Int(6));
        assert_eq!(guard.get("project"), Value::Uuid(project_id));
        assert!(guard.created_at().is_some());
        assert!(!guard.is_deleted());
    }

    // materialization resolved the reference recursively
    let project = fresh.get_relation(&task, "project").unwrap().unwrap();
    assert_eq!(project.read().unwrap().id(), Some(project_id));
    assert_eq!(
        project.read().unwrap().get("name"),
        Value::Text("atlas".into())
    );
}

#[test]
fn failed_commit_leaves_storage_and_session_untouched() {
    let (registry, storage) = build_stack();

    let mut os = open_space(&registry, &storage);
    let project = os.create_object("project").unwrap();
    os.set_value(&project, "name", Value::Text("doomed".into())).unwrap();
    let task = os.create_object("task").unwrap();
    os.set_value(&task, "title", Value::Text("survives".into())).unwrap();

    storage.set_fail_inserts(true);
    let err = os.commit_changes();
    assert!(matches!(err, Err(Error::Storage(_))));

    // storage rolled back, nothing landed
    assert_eq!(storage.row_count("project"), 0);
    assert_eq!(storage.row_count("task"), 0);

    // in-memory pending state survives for inspection and retry
    assert!(os.has_pending_changes());
    assert_eq!(os.pending_creation_count(), 2);
    assert_eq!(
        task.read().unwrap().get("title"),
        Value::Text("survives".into())
    );

    // retry succeeds once the failure clears
    storage.set_fail_inserts(false);
    os.commit_changes().unwrap();
    assert!(!os.has_pending_changes());
    assert_eq!(storage.row_count("project"), 1);
    assert_eq!(storage.row_count("task"), 1);
}

#[test]
fn updates_to_loaded_entities_are_persisted() {
    let (registry, storage) = build_stack();

    let task_id = {
        let mut os = open_space(&registry, &storage);
        let task = os.create_object("task").unwrap();
        os.set_value(&task, "title", Value::Text("draft".into())).unwrap();
        os.commit_changes().unwrap();
        task.read().unwrap().id().unwrap()
    };

    {
        let mut os = open_space(&registry, &storage);
        let task = os.get_object("task", task_id, true).unwrap().unwrap();
        os.set_value(&task, "title", Value::Text("final".into())).unwrap();
        os.set_value(&task, "done", Value::Bool(true)).unwrap();
        os.commit_changes().unwrap();
    }

    let mut fresh = open_space(&registry, &storage);
    let task = fresh.get_object("task", task_id, true).unwrap().unwrap();
    assert_eq!(task.read().unwrap().get("title"), Value::Text("final".into()));
    assert_eq!(task.read().unwrap().get("done"), Value::Bool(true));
}

#[test]
fn commit_with_nothing_pending_is_a_clean_no_op() {
    let (registry, storage) = build_stack();
    let mut os = open_space(&registry, &storage);

    os.commit_changes().unwrap();
    assert_eq!(storage.insert_count(), 0);
    assert_eq!(storage.update_count(), 0);
}

#[test]
fn relation_set_only_in_memory_is_promoted_at_commit() {
    let (registry, storage) = build_stack();

    // the audit -> task edge is anonymous: no inverse to sync, but the
    // foreign key must still land in storage at commit
    let (audit_id, task_id) = {
        let mut os = open_space(&registry, &storage);
        let task = os.create_object("task").unwrap();
        os.set_value(&task, "title", Value::Text("inspected".into())).unwrap();
        let audit = os.create_object("audit").unwrap();
        os.set_value(&audit, "note", Value::Text("looks fine".into())).unwrap();
        os.set_relation(&audit, "subject", &task).unwrap();
        os.commit_changes().unwrap();
        (
            audit.read().unwrap().id().unwrap(),
            task.read().unwrap().id().unwrap(),
        )
    };

    let mut fresh = open_space(&registry, &storage);
    let audit = fresh.get_object("audit", audit_id, true).unwrap().unwrap();
    assert_eq!(audit.read().unwrap().get("subject"), Value::Uuid(task_id));
}
