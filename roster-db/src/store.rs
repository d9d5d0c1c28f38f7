//! SQLite implementation of the roster store traits
//!
//! One session is one SQLite transaction opened with `BEGIN IMMEDIATE`, so it
//! takes the write lock up front. Another process holding the lock makes
//! `begin` wait out the busy timeout instead of failing halfway through a
//! read-check-write sequence. Sessions of one store also queue on an
//! in-process gate so they do not tie up pooled connections while waiting.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roster_core::store::{Directory, PrStore, ReviewerStore, Session, StatsStore, UnitOfWork};
use roster_core::{
    Conflict, Error, PrStats, PrStatus, PullRequest, PullRequestShort, Resource, Result,
    ReviewerWorkload, Team, User, UserAssignmentStats,
};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{classify, internal};

/// Store handing out one SQLite transaction per unit of work
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    gate: Arc<Mutex<()>>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            gate: Arc::new(Mutex::new(())),
        }
    }
}

#[async_trait]
impl UnitOfWork for SqliteStore {
    type Session = SqliteSession;

    async fn begin(&self) -> Result<SqliteSession> {
        let gate = self.gate.clone().lock_owned().await;
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(internal)?;
        Ok(SqliteSession { tx, _gate: gate })
    }
}

/// Session over a [`SqliteStore`]; dropping it rolls the transaction back
pub struct SqliteSession {
    tx: Transaction<'static, Sqlite>,
    _gate: OwnedMutexGuard<()>,
}

#[async_trait]
impl Session for SqliteSession {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(internal)
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.map_err(internal)
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    user_id: String,
    username: String,
    team_name: String,
    is_active: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            user_id: row.user_id,
            username: row.username,
            team_name: row.team_name,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct PrRow {
    pull_request_id: String,
    pull_request_name: String,
    author_id: String,
    status: String,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
}

impl PrRow {
    fn into_pr(self, assigned_reviewers: Vec<String>) -> Result<PullRequest> {
        Ok(PullRequest {
            pull_request_id: self.pull_request_id,
            pull_request_name: self.pull_request_name,
            author_id: self.author_id,
            status: self.status.parse::<PrStatus>()?,
            assigned_reviewers,
            created_at: self.created_at,
            merged_at: self.merged_at,
        })
    }
}

const PR_COLUMNS: &str =
    "pull_request_id, pull_request_name, author_id, status, created_at, merged_at";

#[async_trait]
impl Directory for SqliteSession {
    async fn team_exists(&mut self, team_name: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE team_name = ?)")
            .bind(team_name)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(internal)
    }

    async fn create_team(&mut self, team_name: &str) -> Result<()> {
        sqlx::query("INSERT INTO teams (team_name) VALUES (?)")
            .bind(team_name)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| classify(e, || Resource::Team(team_name.to_string())))?;
        Ok(())
    }

    async fn get_team(&mut self, team_name: &str) -> Result<Team> {
        if !self.team_exists(team_name).await? {
            return Err(Error::NotFound(Resource::Team(team_name.to_string())));
        }

        let members = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, username, team_name, is_active FROM users
             WHERE team_name = ? ORDER BY user_id",
        )
        .bind(team_name)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(internal)?;

        Ok(Team {
            team_name: team_name.to_string(),
            members: members.into_iter().map(User::from).collect(),
        })
    }

    async fn get_user(&mut self, user_id: &str) -> Result<User> {
        sqlx::query_as::<_, UserRow>(
            "SELECT user_id, username, team_name, is_active FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await
        .map(User::from)
        .map_err(|e| classify(e, || Resource::User(user_id.to_string())))
    }

    async fn upsert_user(&mut self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, team_name, is_active)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                username = excluded.username,
                team_name = excluded.team_name,
                is_active = excluded.is_active
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.username)
        .bind(&user.team_name)
        .bind(user.is_active)
        .execute(&mut *self.tx)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn set_user_active(&mut self, user_id: &str, is_active: bool) -> Result<User> {
        sqlx::query_as::<_, UserRow>(
            "UPDATE users SET is_active = ? WHERE user_id = ?
             RETURNING user_id, username, team_name, is_active",
        )
        .bind(is_active)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await
        .map(User::from)
        .map_err(|e| classify(e, || Resource::User(user_id.to_string())))
    }
}

#[async_trait]
impl PrStore for SqliteSession {
    async fn pr_exists(&mut self, pr_id: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pull_requests WHERE pull_request_id = ?)")
            .bind(pr_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(internal)
    }

    async fn create_pr(&mut self, pr: &PullRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pull_requests (
                pull_request_id, pull_request_name, author_id, status, created_at, merged_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pr.pull_request_id)
        .bind(&pr.pull_request_name)
        .bind(&pr.author_id)
        .bind(pr.status.as_str())
        .bind(pr.created_at)
        .bind(pr.merged_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| classify(e, || Resource::PullRequest(pr.pull_request_id.clone())))?;
        Ok(())
    }

    async fn get_pr(&mut self, pr_id: &str) -> Result<PullRequest> {
        sqlx::query_as::<_, PrRow>(&format!(
            "SELECT {} FROM pull_requests WHERE pull_request_id = ?",
            PR_COLUMNS
        ))
        .bind(pr_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| classify(e, || Resource::PullRequest(pr_id.to_string())))?
        .into_pr(Vec::new())
    }

    async fn get_pr_with_reviewers(&mut self, pr_id: &str) -> Result<PullRequest> {
        let mut pr = self.get_pr(pr_id).await?;
        pr.assigned_reviewers = self.assigned_reviewers(pr_id).await?;
        Ok(pr)
    }

    async fn merge_pr(&mut self, pr_id: &str, merged_at: DateTime<Utc>) -> Result<PullRequest> {
        let result = sqlx::query(
            "UPDATE pull_requests SET status = 'MERGED', merged_at = COALESCE(merged_at, ?)
             WHERE pull_request_id = ?",
        )
        .bind(merged_at)
        .bind(pr_id)
        .execute(&mut *self.tx)
        .await
        .map_err(internal)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(Resource::PullRequest(pr_id.to_string())));
        }

        self.get_pr_with_reviewers(pr_id).await
    }

    async fn get_pr_author_id(&mut self, pr_id: &str) -> Result<String> {
        sqlx::query_scalar("SELECT author_id FROM pull_requests WHERE pull_request_id = ?")
            .bind(pr_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| classify(e, || Resource::PullRequest(pr_id.to_string())))
    }
}

#[async_trait]
impl ReviewerStore for SqliteSession {
    async fn assign_reviewer(&mut self, pr_id: &str, reviewer_id: &str) -> Result<()> {
        sqlx::query("INSERT INTO pr_reviewers (pull_request_id, reviewer_id) VALUES (?, ?)")
            .bind(pr_id)
            .bind(reviewer_id)
            .execute(&mut *self.tx)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn replace_reviewer(
        &mut self,
        pr_id: &str,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE pr_reviewers SET reviewer_id = ?
             WHERE pull_request_id = ? AND reviewer_id = ?",
        )
        .bind(new_reviewer_id)
        .bind(pr_id)
        .bind(old_reviewer_id)
        .execute(&mut *self.tx)
        .await
        .map_err(internal)?;

        if result.rows_affected() == 0 {
            return Err(Conflict::ReviewerNotAssigned.into());
        }
        Ok(())
    }

    async fn is_reviewer_assigned(&mut self, pr_id: &str, reviewer_id: &str) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM pr_reviewers WHERE pull_request_id = ? AND reviewer_id = ?)",
        )
        .bind(pr_id)
        .bind(reviewer_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(internal)
    }

    async fn assigned_reviewers(&mut self, pr_id: &str) -> Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT reviewer_id FROM pr_reviewers WHERE pull_request_id = ? ORDER BY rowid",
        )
        .bind(pr_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(internal)
    }

    async fn find_candidates_for_new_pr(
        &mut self,
        team_name: &str,
        author_id: &str,
    ) -> Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT user_id FROM users
             WHERE team_name = ? AND is_active = 1 AND user_id <> ?
             ORDER BY user_id",
        )
        .bind(team_name)
        .bind(author_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(internal)
    }

    async fn find_candidates_for_reassignment(
        &mut self,
        team_name: &str,
        author_id: &str,
        pr_id: &str,
    ) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT user_id FROM users
            WHERE team_name = ? AND is_active = 1 AND user_id <> ?
              AND user_id NOT IN (
                  SELECT reviewer_id FROM pr_reviewers WHERE pull_request_id = ?
              )
            ORDER BY user_id
            "#,
        )
        .bind(team_name)
        .bind(author_id)
        .bind(pr_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(internal)
    }

    async fn list_prs_by_reviewer(&mut self, reviewer_id: &str) -> Result<Vec<PullRequestShort>> {
        let rows = sqlx::query_as::<_, PrRow>(
            r#"
            SELECT p.pull_request_id, p.pull_request_name, p.author_id, p.status,
                   p.created_at, p.merged_at
            FROM pull_requests p
            JOIN pr_reviewers r ON r.pull_request_id = p.pull_request_id
            WHERE r.reviewer_id = ?
            "#,
        )
        .bind(reviewer_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(internal)?;

        let mut prs = rows
            .into_iter()
            .map(|row| row.into_pr(Vec::new()))
            .collect::<Result<Vec<_>>>()?;
        // Stored timestamps are text; order on the decoded values
        prs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.pull_request_id.cmp(&b.pull_request_id))
        });
        Ok(prs.iter().map(PullRequest::to_short).collect())
    }
}

#[async_trait]
impl StatsStore for SqliteSession {
    async fn user_assignment_stats(&mut self) -> Result<Vec<UserAssignmentStats>> {
        let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
            r#"
            SELECT u.user_id, u.username, u.team_name, COUNT(r.pull_request_id) AS assignments_count
            FROM users u
            LEFT JOIN pr_reviewers r ON r.reviewer_id = u.user_id
            GROUP BY u.user_id, u.username, u.team_name
            ORDER BY assignments_count DESC, u.user_id
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(internal)?;

        Ok(rows
            .into_iter()
            .map(
                |(user_id, username, team_name, assignments_count)| UserAssignmentStats {
                    user_id,
                    username,
                    team_name,
                    assignments_count,
                },
            )
            .collect())
    }

    async fn pr_stats(&mut self) -> Result<PrStats> {
        let (total_prs, open_prs, merged_prs): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN status = 'OPEN' THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN status = 'MERGED' THEN 1 ELSE 0 END), 0)
            FROM pull_requests
            "#,
        )
        .fetch_one(&mut *self.tx)
        .await
        .map_err(internal)?;

        Ok(PrStats {
            total_prs,
            open_prs,
            merged_prs,
        })
    }

    async fn reviewer_workload(&mut self) -> Result<Vec<ReviewerWorkload>> {
        let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
            r#"
            SELECT u.user_id, u.username, u.team_name, COUNT(p.pull_request_id) AS open_prs_count
            FROM users u
            LEFT JOIN pr_reviewers r ON r.reviewer_id = u.user_id
            LEFT JOIN pull_requests p
                ON p.pull_request_id = r.pull_request_id AND p.status = 'OPEN'
            GROUP BY u.user_id, u.username, u.team_name
            ORDER BY open_prs_count DESC, u.user_id
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(internal)?;

        Ok(rows
            .into_iter()
            .map(
                |(user_id, username, team_name, open_prs_count)| ReviewerWorkload {
                    user_id,
                    username,
                    team_name,
                    open_prs_count,
                },
            )
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, DatabaseConfig};
    use roster_core::{AssignmentEngine, DirectoryService, StatsService, TeamMember};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn setup_test_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(DatabaseConfig::new(temp_dir.path().join("test.db")))
            .await
            .unwrap();
        db.migrate().await.unwrap();
        (temp_dir, db)
    }

    async fn backend(store: &SqliteStore, members: &[&str]) {
        DirectoryService::new(store.clone())
            .create_team(
                "backend",
                members
                    .iter()
                    .map(|id| TeamMember::new(*id, format!("name-{}", id)))
                    .collect(),
            )
            .await
            .unwrap();
    }

    fn reviewers(pr: &PullRequest) -> HashSet<&str> {
        pr.assigned_reviewers.iter().map(String::as_str).collect()
    }

    #[tokio::test]
    async fn test_create_assigns_teammates() {
        let (_dir, db) = setup_test_db().await;
        let store = db.store();
        backend(&store, &["u1", "u2", "u3"]).await;
        let engine = AssignmentEngine::new(store);

        let pr = engine.create_pr("pr-1", "Add auth", "u1").await.unwrap();
        assert_eq!(reviewers(&pr), HashSet::from(["u2", "u3"]));
        assert_eq!(pr.status, PrStatus::Open);
        assert!(pr.merged_at.is_none());
    }

    #[tokio::test]
    async fn test_reassign_without_candidates() {
        let (_dir, db) = setup_test_db().await;
        let store = db.store();
        backend(&store, &["u1", "u2", "u3"]).await;
        let engine = AssignmentEngine::new(store);
        engine.create_pr("pr-1", "Add auth", "u1").await.unwrap();

        let err = engine.reassign_reviewer("pr-1", "u2").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(Conflict::NoCandidates)));

        let pr = engine.pr_status("pr-1").await.unwrap();
        assert_eq!(pr, PrStatus::Open);
    }

    #[tokio::test]
    async fn test_reassign_keeps_slot() {
        let (_dir, db) = setup_test_db().await;
        let store = db.store();
        backend(&store, &["u1", "u2", "u3"]).await;
        let engine = AssignmentEngine::new(store.clone());
        engine.create_pr("pr-1", "Add auth", "u1").await.unwrap();

        let mut s = store.begin().await.unwrap();
        s.upsert_user(&User::new("u4", "dave", "backend")).await.unwrap();
        s.commit().await.unwrap();

        let outcome = engine.reassign_reviewer("pr-1", "u2").await.unwrap();
        assert_eq!(outcome.replaced_by, "u4");
        assert_eq!(outcome.pull_request.assigned_reviewers, vec!["u4", "u3"]);
    }

    #[tokio::test]
    async fn test_merged_pr_rejects_reassignment() {
        let (_dir, db) = setup_test_db().await;
        let store = db.store();
        backend(&store, &["u1", "u2", "u3"]).await;
        let engine = AssignmentEngine::new(store);
        engine.create_pr("pr-1", "Add auth", "u1").await.unwrap();

        let merged = engine.merge_pr("pr-1").await.unwrap();
        assert_eq!(merged.status, PrStatus::Merged);
        assert_eq!(reviewers(&merged), HashSet::from(["u2", "u3"]));

        let again = engine.merge_pr("pr-1").await.unwrap();
        assert_eq!(again.merged_at, merged.merged_at);

        let err = engine.reassign_reviewer("pr-1", "u3").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(Conflict::PrMerged)));
    }

    #[tokio::test]
    async fn test_duplicate_create_assigns_nobody() {
        let (_dir, db) = setup_test_db().await;
        let store = db.store();
        backend(&store, &["u1", "u2", "u3"]).await;
        let engine = AssignmentEngine::new(store);
        engine.create_pr("pr-1", "Add auth", "u1").await.unwrap();

        let err = engine.create_pr("pr-1", "Other", "u2").await.unwrap_err();
        assert_eq!(err.code(), "PR_EXISTS");

        let u1 = engine.get_reviewer_prs("u1").await.unwrap();
        assert!(u1.is_empty());
        let u2 = engine.get_reviewer_prs("u2").await.unwrap();
        assert_eq!(u2.len(), 1);
        assert_eq!(u2[0].pull_request_name, "Add auth");
    }

    #[tokio::test]
    async fn test_dropped_session_rolls_back() {
        let (_dir, db) = setup_test_db().await;
        let store = db.store();
        backend(&store, &["u1"]).await;

        let mut s = store.begin().await.unwrap();
        s.create_pr(&PullRequest::open("pr-1", "Add auth", "u1"))
            .await
            .unwrap();
        drop(s);

        let mut s = store.begin().await.unwrap();
        assert!(!s.pr_exists("pr-1").await.unwrap());
        s.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_records() {
        let (_dir, db) = setup_test_db().await;
        let store = db.store();
        let mut s = store.begin().await.unwrap();

        assert!(matches!(
            s.get_team("ghosts").await.unwrap_err(),
            Error::NotFound(Resource::Team(_))
        ));
        assert!(matches!(
            s.get_user("u9").await.unwrap_err(),
            Error::NotFound(Resource::User(_))
        ));
        assert!(matches!(
            s.merge_pr("pr-9", Utc::now()).await.unwrap_err(),
            Error::NotFound(Resource::PullRequest(_))
        ));
        assert!(matches!(
            s.set_user_active("u9", false).await.unwrap_err(),
            Error::NotFound(Resource::User(_))
        ));
        // Unknown team is a foreign key failure, not a domain error
        assert!(matches!(
            s.upsert_user(&User::new("u9", "ghost", "ghosts"))
                .await
                .unwrap_err(),
            Error::Internal(_)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_team() {
        let (_dir, db) = setup_test_db().await;
        let store = db.store();
        backend(&store, &["u1"]).await;

        let err = DirectoryService::new(store)
            .create_team("backend", vec![TeamMember::new("u2", "bob")])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TEAM_EXISTS");
    }

    #[tokio::test]
    async fn test_stats() {
        let (_dir, db) = setup_test_db().await;
        let store = db.store();
        backend(&store, &["u1", "u2", "u3"]).await;
        let engine = AssignmentEngine::new(store.clone());
        engine.create_pr("pr-1", "Add auth", "u1").await.unwrap();
        engine.create_pr("pr-2", "Fix auth", "u2").await.unwrap();
        engine.merge_pr("pr-1").await.unwrap();

        let stats = StatsService::new(store);
        assert_eq!(
            stats.pr_stats().await.unwrap(),
            PrStats {
                total_prs: 2,
                open_prs: 1,
                merged_prs: 1
            }
        );

        let counts: Vec<_> = stats
            .user_assignment_stats()
            .await
            .unwrap()
            .into_iter()
            .map(|s| (s.user_id, s.assignments_count))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("u3".to_string(), 2),
                ("u1".to_string(), 1),
                ("u2".to_string(), 1)
            ]
        );

        let open: Vec<_> = stats
            .reviewer_workload()
            .await
            .unwrap()
            .into_iter()
            .map(|w| (w.user_id, w.open_prs_count))
            .collect();
        assert_eq!(
            open,
            vec![
                ("u1".to_string(), 1),
                ("u3".to_string(), 1),
                ("u2".to_string(), 0)
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_reassignments_do_not_race() {
        let (_dir, db) = setup_test_db().await;
        let store = db.store();
        backend(&store, &["u1", "u2", "u3"]).await;
        let engine = Arc::new(AssignmentEngine::new(store.clone()));
        engine.create_pr("pr-1", "Add auth", "u1").await.unwrap();

        let mut s = store.begin().await.unwrap();
        s.upsert_user(&User::new("u4", "dave", "backend")).await.unwrap();
        s.commit().await.unwrap();

        let a = tokio::spawn({
            let engine = engine.clone();
            async move { engine.reassign_reviewer("pr-1", "u2").await }
        });
        let b = tokio::spawn({
            let engine = engine.clone();
            async move { engine.reassign_reviewer("pr-1", "u2").await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        let ok: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].replaced_by, "u4");
        assert!(results.iter().any(|r| matches!(
            r,
            Err(Error::Conflict(Conflict::ReviewerNotAssigned))
        )));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_separate_connections_see_committed_swap() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shared.db");
        let first = Database::connect(DatabaseConfig::new(&path)).await.unwrap();
        first.migrate().await.unwrap();
        let second = Database::connect(DatabaseConfig::new(&path)).await.unwrap();

        let store = first.store();
        backend(&store, &["u1", "u2", "u3"]).await;
        let a = AssignmentEngine::new(store.clone());
        let b = AssignmentEngine::new(second.store());

        let ids: Vec<String> = (0..10).map(|n| format!("pr-{}", n)).collect();
        for id in &ids {
            a.create_pr(id, "Add auth", "u1").await.unwrap();
        }
        let mut s = store.begin().await.unwrap();
        s.upsert_user(&User::new("u4", "dave", "backend")).await.unwrap();
        s.commit().await.unwrap();

        for id in &ids {
            let (left, right) = tokio::join!(
                a.reassign_reviewer(id, "u2"),
                b.reassign_reviewer(id, "u2")
            );
            let results = [left, right];
            let ok: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
            assert_eq!(ok.len(), 1, "{}", id);
            assert_eq!(ok[0].replaced_by, "u4");
            assert!(results.iter().any(|r| matches!(
                r,
                Err(Error::Conflict(Conflict::ReviewerNotAssigned))
            )));
        }
    }

    #[tokio::test]
    async fn test_timeout_leaves_nothing_behind() {
        let (_dir, db) = setup_test_db().await;
        let store = db.store();
        backend(&store, &["u1", "u2"]).await;
        let engine = AssignmentEngine::new(store.clone()).with_timeout(Duration::from_millis(50));

        let blocker = store.begin().await.unwrap();
        let err = engine.create_pr("pr-1", "Add auth", "u1").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        drop(blocker);

        let mut s = store.begin().await.unwrap();
        assert!(!s.pr_exists("pr-1").await.unwrap());
    }
}
