use mlstore_core::db::open_db_in_memory;
use mlstore_core::repo::training_repo::{SqliteTrainingRepository, TrainingRepository};
use mlstore_core::{
    FieldSpec, NewProject, ProjectStoreError, ProjectType, RepoError, SqliteProjectStore,
    TrainingPayload, ValidationError,
};
use rusqlite::Connection;
use std::collections::HashSet;

fn text_project(userid: &str, classid: &str, name: &str) -> NewProject {
    NewProject::new(userid, classid, ProjectType::Text, name, "en")
}

fn row_count(conn: &Connection, table: &str, projectid: &str) -> i64 {
    let column = if table == "projects" { "id" } else { "projectid" };
    conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?1;"),
        [projectid],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn store_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    let mut request = text_project("bob", "class-a", "  animals  ");
    request.is_crowd_sourced = true;
    let created = store.store_project(&request).unwrap();

    assert!(!created.id.is_empty());
    assert_eq!(created.userid, "bob");
    assert_eq!(created.classid, "class-a");
    assert_eq!(created.kind, ProjectType::Text);
    assert_eq!(created.language, "en");
    assert!(created.labels.is_empty());
    assert!(created.is_crowd_sourced);
    assert_eq!(created.numfields, 0);

    let loaded = store.get_project(&created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn get_unknown_project_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    assert!(store.get_project("missing").unwrap().is_none());
}

#[test]
fn ids_are_unique() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    let ids: HashSet<String> = (0..20)
        .map(|index| {
            store
                .store_project(&text_project("bob", "class-a", &format!("p{index}")))
                .unwrap()
                .id
        })
        .collect();
    assert_eq!(ids.len(), 20);
}

#[test]
fn store_project_rejects_invalid_requests_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    let blank = store.store_project(&text_project("bob", "class-a", "   "));
    assert!(matches!(
        blank,
        Err(ProjectStoreError::Validation(ValidationError::BlankProjectName))
    ));

    let mut with_fields = text_project("bob", "class-a", "words");
    with_fields.fields.push(FieldSpec::number("size"));
    let err = store.store_project(&with_fields).unwrap_err();
    assert!(matches!(
        err,
        ProjectStoreError::Validation(ValidationError::FieldsNotSupported(ProjectType::Text))
    ));

    let mut bad_field = NewProject::new("bob", "class-a", ProjectType::Numbers, "sizes", "en");
    bad_field.fields.push(FieldSpec::number("ok"));
    bad_field
        .fields
        .push(FieldSpec::multichoice("colour", vec!["red".to_string()]));
    assert!(store.store_project(&bad_field).is_err());

    assert_eq!(store.count_projects_by_class_id("class-a").unwrap(), 0);
}

#[test]
fn scoped_lists_respect_tenant_boundaries() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    let first = store.store_project(&text_project("bob", "class-a", "one")).unwrap();
    let second = store.store_project(&text_project("bob", "class-a", "two")).unwrap();
    let other_user = store.store_project(&text_project("jo", "class-a", "three")).unwrap();
    store.store_project(&text_project("bob", "class-b", "four")).unwrap();

    let bob_a: Vec<String> = store
        .get_projects_by_user_id("bob", "class-a")
        .unwrap()
        .into_iter()
        .map(|project| project.id)
        .collect();
    assert_eq!(bob_a, vec![first.id.clone(), second.id.clone()]);

    let class_a: Vec<String> = store
        .get_projects_by_class_id("class-a")
        .unwrap()
        .into_iter()
        .map(|project| project.id)
        .collect();
    assert_eq!(class_a, vec![first.id, second.id, other_user.id]);

    assert!(store.get_projects_by_user_id("bob", "class-c").unwrap().is_empty());
}

#[test]
fn counts_match_list_lengths() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    for (userid, classid) in [
        ("bob", "class-a"),
        ("bob", "class-a"),
        ("jo", "class-a"),
        ("jo", "class-b"),
    ] {
        store.store_project(&text_project(userid, classid, "p")).unwrap();
    }

    for (userid, classid) in [("bob", "class-a"), ("jo", "class-a"), ("jo", "class-b"), ("x", "y")] {
        let listed = store.get_projects_by_user_id(userid, classid).unwrap().len() as u64;
        assert_eq!(store.count_projects_by_user_id(userid, classid).unwrap(), listed);
    }
    for classid in ["class-a", "class-b", "class-z"] {
        let listed = store.get_projects_by_class_id(classid).unwrap().len() as u64;
        assert_eq!(store.count_projects_by_class_id(classid).unwrap(), listed);
    }
    assert_eq!(store.count_projects_by_class_id("class-a").unwrap(), 3);
}

#[test]
fn delete_entire_project_removes_every_dependent_record() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    let mut request = NewProject::new("bob", "class-a", ProjectType::Numbers, "sizes", "en");
    request.fields = vec![
        FieldSpec::number("height"),
        FieldSpec::multichoice("colour", vec!["red".to_string(), "blue".to_string()]),
    ];
    let project = store.store_project(&request).unwrap();
    store
        .add_label_to_project("bob", "class-a", &project.id, "tall")
        .unwrap();
    store
        .store_training(&project.id, &TrainingPayload::Numbers(vec![1.0, 2.0]), "tall")
        .unwrap();

    assert!(store
        .delete_entire_project("bob", "class-a", &project.id)
        .unwrap());

    assert!(store.get_project(&project.id).unwrap().is_none());
    for table in ["projects", "project_labels", "project_fields", "training_examples"] {
        assert_eq!(row_count(&conn, table, &project.id), 0, "{table} not empty");
    }
}

#[test]
fn delete_entire_project_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    let project = store.store_project(&text_project("bob", "class-a", "p")).unwrap();
    assert!(store
        .delete_entire_project("bob", "class-a", &project.id)
        .unwrap());
    assert!(!store
        .delete_entire_project("bob", "class-a", &project.id)
        .unwrap());
    assert!(!store
        .delete_entire_project("bob", "class-a", "never-existed")
        .unwrap());
}

#[test]
fn delete_entire_project_finishes_partial_cascade() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    let project = store.store_project(&text_project("bob", "class-a", "p")).unwrap();
    store
        .store_training(&project.id, &TrainingPayload::Text("hello".to_string()), "greeting")
        .unwrap();
    conn.execute(
        "DELETE FROM training_examples WHERE projectid = ?1;",
        [project.id.as_str()],
    )
    .unwrap();

    assert!(store
        .delete_entire_project("bob", "class-a", &project.id)
        .unwrap());
    assert_eq!(row_count(&conn, "projects", &project.id), 0);
}

#[test]
fn delete_with_foreign_owner_leaves_project_untouched() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    let project = store.store_project(&text_project("bob", "class-a", "p")).unwrap();
    store
        .add_label_to_project("bob", "class-a", &project.id, "cats")
        .unwrap();
    store
        .store_training(&project.id, &TrainingPayload::Text("meow".to_string()), "cats")
        .unwrap();

    assert!(!store.delete_entire_project("eve", "class-a", &project.id).unwrap());
    assert!(!store.delete_entire_project("bob", "class-b", &project.id).unwrap());

    let loaded = store.get_project(&project.id).unwrap().unwrap();
    assert_eq!(loaded.labels, vec!["cats".to_string()]);
    assert_eq!(store.count_training(&project.id).unwrap(), 1);
}

#[test]
fn delete_entire_user_only_touches_that_user_and_class() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    store.store_project(&text_project("bob", "class-a", "one")).unwrap();
    store.store_project(&text_project("bob", "class-a", "two")).unwrap();
    let other_class = store.store_project(&text_project("bob", "class-b", "three")).unwrap();
    let other_user = store.store_project(&text_project("jo", "class-a", "four")).unwrap();

    assert_eq!(store.delete_entire_user("bob", "class-a").unwrap(), 2);
    assert_eq!(store.count_projects_by_user_id("bob", "class-a").unwrap(), 0);
    assert!(store.get_project(&other_class.id).unwrap().is_some());
    assert!(store.get_project(&other_user.id).unwrap().is_some());

    assert_eq!(store.delete_entire_user("bob", "class-a").unwrap(), 0);
}

#[test]
fn delete_projects_by_class_id_removes_all_owners() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    let bob = store.store_project(&text_project("bob", "class-a", "one")).unwrap();
    store.store_project(&text_project("jo", "class-a", "two")).unwrap();
    let kept = store.store_project(&text_project("jo", "class-b", "three")).unwrap();
    store
        .store_training(&bob.id, &TrainingPayload::Text("hi".to_string()), "greeting")
        .unwrap();

    assert_eq!(store.delete_projects_by_class_id("class-a").unwrap(), 2);
    assert_eq!(store.count_projects_by_class_id("class-a").unwrap(), 0);
    assert_eq!(row_count(&conn, "training_examples", &bob.id), 0);
    assert_eq!(store.count_projects_by_class_id("class-b").unwrap(), 1);
    assert!(store.get_project(&kept.id).unwrap().is_some());
}

#[test]
fn failed_field_insert_leaves_no_project_behind() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_boom_field
         BEFORE INSERT ON project_fields
         WHEN NEW.name = 'boom'
         BEGIN
             SELECT RAISE(ABORT, 'field rejected');
         END;",
    )
    .unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    let mut request = NewProject::new("bob", "class-a", ProjectType::Numbers, "sizes", "en");
    request.fields = vec![FieldSpec::number("a"), FieldSpec::number("boom")];
    let err = store.store_project(&request).unwrap_err();
    assert!(matches!(err, ProjectStoreError::Repo(_)));

    assert_eq!(store.count_projects_by_user_id("bob", "class-a").unwrap(), 0);
    assert!(store.get_projects_by_class_id("class-a").unwrap().is_empty());
    let field_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM project_fields;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(field_rows, 0);
}

#[test]
fn project_and_field_names_are_stored_trimmed() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    let mut request = NewProject::new("bob", "class-a", ProjectType::Numbers, "  sizes ", "en");
    request.fields = vec![FieldSpec::number(" height  ")];
    let project = store.store_project(&request).unwrap();
    assert_eq!(project.name, "sizes");

    let added = store
        .add_field("bob", "class-a", &project.id, &FieldSpec::number("  width"))
        .unwrap();
    assert_eq!(added.name, "width");

    let names: Vec<String> = store
        .get_number_project_fields("bob", "class-a", &project.id)
        .unwrap()
        .into_iter()
        .map(|field| field.name)
        .collect();
    assert_eq!(names, vec!["height".to_string(), "width".to_string()]);
}

#[test]
fn delete_sweeps_training_written_during_the_cascade() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    let mut request = NewProject::new("bob", "class-a", ProjectType::Numbers, "sizes", "en");
    request.fields = vec![FieldSpec::number("height")];
    let project = store.store_project(&request).unwrap();

    // A training write that lands after the first training step.
    conn.execute_batch(
        "CREATE TRIGGER late_training
         AFTER DELETE ON project_fields
         BEGIN
             INSERT INTO training_examples (id, projectid, kind, payload, label)
             VALUES ('late', OLD.projectid, 'numbers', '[1.0]', 'tall');
         END;",
    )
    .unwrap();

    assert!(store
        .delete_entire_project("bob", "class-a", &project.id)
        .unwrap());
    assert_eq!(row_count(&conn, "training_examples", &project.id), 0);
}

#[test]
fn delete_succeeds_when_a_field_lands_during_the_cascade() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();

    let project = store
        .store_project(&NewProject::new("bob", "class-a", ProjectType::Numbers, "sizes", "en"))
        .unwrap();
    store
        .add_label_to_project("bob", "class-a", &project.id, "tall")
        .unwrap();

    // A field write that commits after the field step, before the project
    // record is removed.
    conn.execute_batch(
        "CREATE TRIGGER late_field
         AFTER DELETE ON project_labels
         BEGIN
             INSERT INTO project_fields (id, userid, classid, projectid, name, type, sort_order)
             VALUES ('late', 'bob', 'class-a', OLD.projectid, 'late', 'number', 0);
         END;",
    )
    .unwrap();

    assert!(store
        .delete_entire_project("bob", "class-a", &project.id)
        .unwrap());
    assert!(store.get_project(&project.id).unwrap().is_none());
    assert_eq!(row_count(&conn, "project_fields", &project.id), 0);
}

#[test]
fn training_repository_refuses_deleted_project() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::sqlite(&conn).unwrap();
    let project = store.store_project(&text_project("bob", "class-a", "p")).unwrap();
    assert!(store
        .delete_entire_project("bob", "class-a", &project.id)
        .unwrap());

    let training = SqliteTrainingRepository::try_new(&conn).unwrap();
    let err = training
        .store_training(&project.id, &TrainingPayload::Text("hi".to_string()), "greeting")
        .unwrap_err();
    assert!(matches!(err, RepoError::ProjectNotFound(_)));
    assert_eq!(row_count(&conn, "training_examples", &project.id), 0);
}
