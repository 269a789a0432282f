//! SQLite-based storage for the progression profile, the quest board and
//! logged work sessions.
//!
//! Provides persistent storage for:
//! - Work sessions (task/subtask timer runs and focus phases)
//! - Session statistics (daily and all-time)
//! - Key-value store holding JSON snapshots of the account and quest board

use std::path::Path;

use chrono::{DateTime, Duration, NaiveTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::data_dir;
use crate::error::{DatabaseError, Result};
use crate::events::Event;
use crate::progression::ProgressionAccount;
use crate::quest::QuestBoard;

const ACCOUNT_KEY: &str = "progression_account";
const BOARD_KEY: &str = "quest_board";
const FOCUS_LEASE_KEY: &str = "focus_lease";

/// A focus lease older than this is treated as abandoned.
pub const FOCUS_LEASE_TTL_SECS: i64 = 10;

/// Marks the profile as owned by a running focus session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct FocusLease {
    holder: Uuid,
    heartbeat: DateTime<Utc>,
}

impl FocusLease {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now - self.heartbeat < Duration::seconds(FOCUS_LEASE_TTL_SECS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Task,
    Subtask,
    Focus,
}

impl SessionKind {
    fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Task => "task",
            SessionKind::Subtask => "subtask",
            SessionKind::Focus => "focus",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "task" => Some(SessionKind::Task),
            "subtask" => Some(SessionKind::Subtask),
            "focus" => Some(SessionKind::Focus),
            _ => None,
        }
    }
}

/// One logged stretch of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSession {
    pub kind: SessionKind,
    pub task_id: Option<Uuid>,
    pub subtask_id: Option<Uuid>,
    pub label: String,
    pub seconds: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl WorkSession {
    /// Derive a session record from an engine event, if it describes one.
    pub fn from_event(event: &Event) -> Option<Self> {
        match event {
            Event::TimerStopped {
                task_id,
                subtask_id,
                label,
                started_at,
                elapsed_secs,
                at,
            } => Some(Self {
                kind: if subtask_id.is_some() {
                    SessionKind::Subtask
                } else {
                    SessionKind::Task
                },
                task_id: Some(*task_id),
                subtask_id: *subtask_id,
                label: label.clone(),
                seconds: *elapsed_secs,
                started_at: *started_at,
                ended_at: *at,
            }),
            Event::FocusCompleted { minutes, at, .. } => Some(Self::focus(minutes * 60, None, *at)),
            Event::CompletedEarly {
                seconds_spent,
                task_id,
                at,
                ..
            } => Some(Self::focus(*seconds_spent, *task_id, *at)),
            _ => None,
        }
    }

    fn focus(seconds: u64, task_id: Option<Uuid>, ended_at: DateTime<Utc>) -> Self {
        Self {
            kind: SessionKind::Focus,
            task_id,
            subtask_id: None,
            label: "Focus".into(),
            seconds,
            started_at: ended_at - Duration::seconds(seconds.min(i64::MAX as u64) as i64),
            ended_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_sessions: u64,
    pub total_work_secs: u64,
    pub total_focus_secs: u64,
    pub focus_sessions: u64,
    pub today_sessions: u64,
    pub today_work_secs: u64,
    pub today_focus_secs: u64,
}

/// SQLite database for DevQuest state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/devquest/devquest.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("devquest.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS work_sessions (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    kind        TEXT NOT NULL,
                    task_id     TEXT,
                    subtask_id  TEXT,
                    label       TEXT NOT NULL DEFAULT '',
                    seconds     INTEGER NOT NULL,
                    started_at  TEXT NOT NULL,
                    ended_at    TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_work_sessions_ended_at ON work_sessions(ended_at);
                CREATE INDEX IF NOT EXISTS idx_work_sessions_kind ON work_sessions(kind);
                CREATE INDEX IF NOT EXISTS idx_work_sessions_task_id ON work_sessions(task_id);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    // ── Work sessions ────────────────────────────────────────────────

    /// Record a work session.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(&self, session: &WorkSession) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO work_sessions (kind, task_id, subtask_id, label, seconds, started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.kind.as_str(),
                session.task_id.map(|id| id.to_string()),
                session.subtask_id.map(|id| id.to_string()),
                session.label,
                session.seconds as i64,
                timestamp(session.started_at),
                timestamp(session.ended_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Record every session described by `events`. Returns how many.
    pub fn record_events(&self, events: &[Event]) -> Result<usize> {
        let mut recorded = 0;
        for session in events.iter().filter_map(WorkSession::from_event) {
            self.record_session(&session)?;
            recorded += 1;
        }
        Ok(recorded)
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<WorkSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, task_id, subtask_id, label, seconds, started_at, ended_at
             FROM work_sessions
             ORDER BY ended_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (kind, task_id, subtask_id, label, seconds, started_at, ended_at) = row?;
            let Some(kind) = SessionKind::parse(&kind) else {
                tracing::warn!(kind, "skipping work session with unknown kind");
                continue;
            };
            sessions.push(WorkSession {
                kind,
                task_id: task_id.and_then(|s| Uuid::parse_str(&s).ok()),
                subtask_id: subtask_id.and_then(|s| Uuid::parse_str(&s).ok()),
                label,
                seconds: seconds.max(0) as u64,
                started_at: parse_timestamp(&started_at)?,
                ended_at: parse_timestamp(&ended_at)?,
            });
        }
        Ok(sessions)
    }

    pub fn stats_today(&self, now: DateTime<Utc>) -> Result<Stats> {
        let mut stats = Stats::default();
        let (count, work, focus, focus_count) = self.aggregate(Some(start_of_day(now)))?;
        stats.total_sessions = count;
        stats.total_work_secs = work;
        stats.total_focus_secs = focus;
        stats.focus_sessions = focus_count;
        stats.today_sessions = count;
        stats.today_work_secs = work;
        stats.today_focus_secs = focus;
        Ok(stats)
    }

    pub fn stats_all(&self, now: DateTime<Utc>) -> Result<Stats> {
        let (count, work, focus, focus_count) = self.aggregate(None)?;
        let (today_count, today_work, today_focus, _) = self.aggregate(Some(start_of_day(now)))?;
        Ok(Stats {
            total_sessions: count,
            total_work_secs: work,
            total_focus_secs: focus,
            focus_sessions: focus_count,
            today_sessions: today_count,
            today_work_secs: today_work,
            today_focus_secs: today_focus,
        })
    }

    /// `(sessions, task+subtask secs, focus secs, focus sessions)` since `from`.
    fn aggregate(&self, from: Option<DateTime<Utc>>) -> Result<(u64, u64, u64, u64)> {
        let from = from.map(timestamp).unwrap_or_default();
        let mut stmt = self.conn.prepare(
            "SELECT kind, COUNT(*), COALESCE(SUM(seconds), 0)
             FROM work_sessions
             WHERE ended_at >= ?1
             GROUP BY kind",
        )?;
        let rows = stmt.query_map(params![from], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let (mut count, mut work, mut focus, mut focus_count) = (0u64, 0u64, 0u64, 0u64);
        for row in rows {
            let (kind, n, secs) = row?;
            let (n, secs) = (n.max(0) as u64, secs.max(0) as u64);
            count += n;
            match SessionKind::parse(&kind) {
                Some(SessionKind::Focus) => {
                    focus += secs;
                    focus_count += n;
                }
                Some(_) => work += secs,
                None => {}
            }
        }
        Ok((count, work, focus, focus_count))
    }

    // ── Snapshots ────────────────────────────────────────────────────

    pub fn load_account(&self) -> Result<Option<ProgressionAccount>> {
        self.load_json(ACCOUNT_KEY)
    }

    pub fn save_account(&self, account: &ProgressionAccount) -> Result<()> {
        self.save_json(ACCOUNT_KEY, account)
    }

    pub fn load_board(&self) -> Result<QuestBoard> {
        Ok(self.load_json(BOARD_KEY)?.unwrap_or_default())
    }

    pub fn save_board(&self, board: &QuestBoard) -> Result<()> {
        self.save_json(BOARD_KEY, board)
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.kv_get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.kv_set(key, &json)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a value from the kv store.
    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    // ── Focus lease ──────────────────────────────────────────────────

    /// Claim or refresh the focus lease for `holder`.
    ///
    /// # Errors
    /// Returns [`DatabaseError::FocusActive`] while another holder's lease
    /// is live.
    pub fn hold_focus_lease(&self, holder: Uuid, now: DateTime<Utc>) -> Result<()> {
        let tx = self.begin_immediate()?;
        self.check_focus_lease(Some(holder), now)?;
        self.save_json(FOCUS_LEASE_KEY, &FocusLease { holder, heartbeat: now })?;
        tx.commit()?;
        Ok(())
    }

    /// Drop the lease if `holder` still owns it.
    pub fn release_focus_lease(&self, holder: Uuid) -> Result<()> {
        let tx = self.begin_immediate()?;
        let lease: Option<FocusLease> = self.load_json(FOCUS_LEASE_KEY)?;
        if lease.is_some_and(|l| l.holder == holder) {
            self.kv_delete(FOCUS_LEASE_KEY)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Whether some focus session currently owns the profile.
    pub fn focus_lease_active(&self, now: DateTime<Utc>) -> Result<bool> {
        let lease: Option<FocusLease> = self.load_json(FOCUS_LEASE_KEY)?;
        Ok(lease.is_some_and(|l| l.is_live(now)))
    }

    /// Save the account and board and log the sessions `events` describe,
    /// all in one transaction.
    ///
    /// `holder` is the focus lease the caller owns, if any. The write is
    /// refused while a live lease belongs to someone else. Returns the
    /// number of work sessions logged.
    ///
    /// # Errors
    /// Returns [`DatabaseError::FocusActive`] when the profile is leased
    /// to another focus session.
    pub fn commit_state(
        &self,
        account: &ProgressionAccount,
        board: &QuestBoard,
        events: &[Event],
        holder: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let tx = self.begin_immediate()?;
        self.check_focus_lease(holder, now)?;
        if let Some(holder) = holder {
            self.save_json(FOCUS_LEASE_KEY, &FocusLease { holder, heartbeat: now })?;
        }
        self.save_account(account)?;
        self.save_board(board)?;
        let logged = self.record_events(events)?;
        tx.commit()?;
        Ok(logged)
    }

    fn check_focus_lease(&self, holder: Option<Uuid>, now: DateTime<Utc>) -> Result<()> {
        let lease: Option<FocusLease> = self.load_json(FOCUS_LEASE_KEY)?;
        match lease {
            Some(lease) if lease.is_live(now) && Some(lease.holder) != holder => {
                Err(DatabaseError::FocusActive.into())
            }
            _ => Ok(()),
        }
    }

    fn begin_immediate(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{s}': {e}")).into())
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}
