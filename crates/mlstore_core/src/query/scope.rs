//! Tenant scopes for project lookups.

use rusqlite::types::Value;

/// Which projects a lookup covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectScope<'a> {
    /// Every project in a class, regardless of owner.
    Class { classid: &'a str },
    /// Projects owned by one user within one class.
    User { userid: &'a str, classid: &'a str },
}

impl<'a> ProjectScope<'a> {
    pub fn class(classid: &'a str) -> Self {
        Self::Class { classid }
    }

    pub fn user(userid: &'a str, classid: &'a str) -> Self {
        Self::User { userid, classid }
    }

    /// Predicate over the `projects p` alias. Column order matches the
    /// `(classid, userid)` index prefix.
    fn where_clause(&self) -> &'static str {
        match self {
            Self::Class { .. } => "p.classid = ?1",
            Self::User { .. } => "p.classid = ?1 AND p.userid = ?2",
        }
    }

    pub(crate) fn bind_values(&self) -> Vec<Value> {
        match self {
            Self::Class { classid } => vec![Value::Text((*classid).to_string())],
            Self::User { userid, classid } => vec![
                Value::Text((*classid).to_string()),
                Value::Text((*userid).to_string()),
            ],
        }
    }

    /// Enumeration SQL: `select_sql` must select `FROM projects p`.
    pub(crate) fn list_sql(&self, select_sql: &str) -> String {
        format!(
            "{select_sql}
             WHERE {}
             ORDER BY p.created_at ASC, p.rowid ASC;",
            self.where_clause()
        )
    }

    pub(crate) fn count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM projects p WHERE {};",
            self.where_clause()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ProjectScope;
    use crate::db::open_db_in_memory;
    use crate::repo::project_repo::PROJECT_SELECT_SQL;
    use rusqlite::types::Value;
    use rusqlite::{params_from_iter, Connection};

    fn query_plan(conn: &Connection, sql: &str, scope: &ProjectScope<'_>) -> Vec<String> {
        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}")).unwrap();
        let mut rows = stmt.query(params_from_iter(scope.bind_values())).unwrap();
        let mut details = Vec::new();
        while let Some(row) = rows.next().unwrap() {
            details.push(row.get::<_, String>(3).unwrap());
        }
        details
    }

    #[test]
    fn scopes_bind_classid_first() {
        let scope = ProjectScope::user("alice", "class-1");
        assert_eq!(
            scope.bind_values(),
            vec![
                Value::Text("class-1".to_string()),
                Value::Text("alice".to_string()),
            ]
        );
        assert_eq!(ProjectScope::class("class-1").bind_values().len(), 1);
    }

    #[test]
    fn count_and_list_use_class_user_index() {
        let conn = open_db_in_memory().unwrap();
        for scope in [
            ProjectScope::class("class-1"),
            ProjectScope::user("alice", "class-1"),
        ] {
            let count_plan = query_plan(&conn, &scope.count_sql(), &scope);
            assert!(
                count_plan
                    .iter()
                    .any(|detail| detail.contains("idx_projects_class_user")),
                "count plan scans: {count_plan:?}"
            );

            let list_plan = query_plan(&conn, &scope.list_sql(PROJECT_SELECT_SQL), &scope);
            assert!(
                list_plan
                    .iter()
                    .any(|detail| detail.contains("idx_projects_class_user")),
                "list plan scans: {list_plan:?}"
            );
        }
    }
}
