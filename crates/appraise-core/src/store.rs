//! Durable storage for assessments, resources and follow-up questions.
//!
//! # Table design
//!
//! Three tables in one SQLite file:
//! - `assessments`: one row per tracked project, `project_name` UNIQUE.
//! - `resources`: linked documents/threads, FK to `assessments`, cascade
//!   on delete.
//! - `questions`: follow-ups raised by the oracle, FK to `assessments`.
//!
//! `content` and `content_hash` on a resource are written by a single
//! UPDATE so readers never observe a mismatched pair. Timestamps are
//! RFC 3339 text. All writes are last-writer-wins.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::error::{AppraiseError, Result};
use crate::model::{Assessment, NewAssessment, Question, Resource};
use crate::outcome::Decision;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const PRAGMAS: &str = "PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS assessments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_name TEXT NOT NULL UNIQUE,
    project_description TEXT NOT NULL,
    point_of_contact TEXT NOT NULL,
    estimated_go_live_date TEXT,
    links TEXT,
    user_id TEXT NOT NULL,
    risk INTEGER,
    confidence INTEGER,
    justification TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS resources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    assessment_id INTEGER NOT NULL REFERENCES assessments(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    assessment_id INTEGER NOT NULL REFERENCES assessments(id) ON DELETE CASCADE,
    question TEXT NOT NULL,
    answer TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_resources_assessment ON resources(assessment_id);
CREATE INDEX IF NOT EXISTS idx_questions_assessment ON questions(assessment_id);";

const ASSESSMENT_COLUMNS: &str = "id, project_name, project_description, point_of_contact, \
     estimated_go_live_date, links, user_id, risk, confidence, justification, \
     created_at, updated_at";

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Handle to the assessment database, shareable across tasks.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create the database at `path`, creating parent directories
    /// and the schema as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(PRAGMAS)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Assessments
    // -----------------------------------------------------------------------

    /// Create an assessment. A `project_name` collision fails with
    /// [`AppraiseError::DuplicateProjectName`] and leaves the existing row
    /// untouched.
    pub fn create_assessment(&self, new: &NewAssessment) -> Result<Assessment> {
        let now = Utc::now();
        let ts = now.to_rfc3339();
        let conn = self.lock();
        let inserted = conn.execute(
            "INSERT INTO assessments (
                project_name, project_description, point_of_contact,
                estimated_go_live_date, links, user_id, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                new.project_name,
                new.project_description,
                new.point_of_contact,
                new.estimated_go_live_date,
                new.links,
                new.user_id,
                ts,
                ts,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(AppraiseError::DuplicateProjectName(
                    new.project_name.clone(),
                ));
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Assessment {
            id: conn.last_insert_rowid(),
            project_name: new.project_name.clone(),
            project_description: new.project_description.clone(),
            point_of_contact: new.point_of_contact.clone(),
            estimated_go_live_date: new.estimated_go_live_date.clone(),
            links: new.links.clone(),
            user_id: new.user_id.clone(),
            risk: None,
            confidence: None,
            justification: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn assessment(&self, id: i64) -> Result<Assessment> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = ?"
        ))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(assessment_from_row(row)?),
            None => Err(AppraiseError::AssessmentNotFound(id)),
        }
    }

    /// All assessments, oldest first. The reconciliation loop iterates this.
    pub fn list_assessments(&self) -> Result<Vec<Assessment>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments ORDER BY id"
        ))?;
        let rows = stmt.query_map([], assessment_from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// Overwrite the decision fields. A plain field overwrite, so applying
    /// the same decision twice lands in the same state.
    pub fn set_decision(&self, id: i64, decision: &Decision) -> Result<()> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE assessments
             SET risk = ?, confidence = ?, justification = ?, updated_at = ?
             WHERE id = ?",
            params![
                decision.risk,
                decision.confidence,
                decision.justification,
                Utc::now().to_rfc3339(),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(AppraiseError::AssessmentNotFound(id));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------------

    pub fn insert_resource(
        &self,
        assessment_id: i64,
        url: &str,
        content: &str,
        content_hash: &str,
    ) -> Result<Resource> {
        let now = Utc::now();
        let ts = now.to_rfc3339();
        let conn = self.lock();
        conn.execute(
            "INSERT INTO resources (assessment_id, url, content, content_hash, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![assessment_id, url, content, content_hash, ts, ts],
        )?;
        Ok(Resource {
            id: conn.last_insert_rowid(),
            assessment_id,
            url: url.to_string(),
            content: content.to_string(),
            content_hash: content_hash.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn resources_for(&self, assessment_id: i64) -> Result<Vec<Resource>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, assessment_id, url, content, content_hash, created_at, updated_at
             FROM resources WHERE assessment_id = ? ORDER BY id",
        )?;
        let rows = stmt.query_map([assessment_id], resource_from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// Persist freshly fetched content and its digest in one statement, so
    /// the stored pair stays consistent.
    pub fn update_resource_content(
        &self,
        resource_id: i64,
        content: &str,
        content_hash: &str,
    ) -> Result<()> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE resources SET content = ?, content_hash = ?, updated_at = ? WHERE id = ?",
            params![content, content_hash, Utc::now().to_rfc3339(), resource_id],
        )?;
        if changed == 0 {
            return Err(AppraiseError::ResourceNotFound(resource_id));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Questions
    // -----------------------------------------------------------------------

    /// Append follow-up questions in the given order, all-or-nothing.
    pub fn insert_questions(
        &self,
        assessment_id: i64,
        questions: &[String],
    ) -> Result<Vec<Question>> {
        let now = Utc::now();
        let ts = now.to_rfc3339();
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut created = Vec::with_capacity(questions.len());
        for question in questions {
            tx.execute(
                "INSERT INTO questions (assessment_id, question, created_at, updated_at)
                 VALUES (?, ?, ?, ?)",
                params![assessment_id, question, ts, ts],
            )?;
            created.push(Question {
                id: tx.last_insert_rowid(),
                assessment_id,
                question: question.clone(),
                answer: None,
                created_at: now,
                updated_at: now,
            });
        }
        tx.commit()?;
        Ok(created)
    }

    pub fn questions_for(&self, assessment_id: i64) -> Result<Vec<Question>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, assessment_id, question, answer, created_at, updated_at
             FROM questions WHERE assessment_id = ? ORDER BY id",
        )?;
        let rows = stmt.query_map([assessment_id], question_from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn answer_question(&self, question_id: i64, answer: &str) -> Result<()> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE questions SET answer = ?, updated_at = ? WHERE id = ?",
            params![answer, Utc::now().to_rfc3339(), question_id],
        )?;
        if changed == 0 {
            return Err(AppraiseError::QuestionNotFound(question_id));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn assessment_from_row(row: &Row<'_>) -> rusqlite::Result<Assessment> {
    Ok(Assessment {
        id: row.get(0)?,
        project_name: row.get(1)?,
        project_description: row.get(2)?,
        point_of_contact: row.get(3)?,
        estimated_go_live_date: row.get(4)?,
        links: row.get(5)?,
        user_id: row.get(6)?,
        risk: row.get(7)?,
        confidence: row.get(8)?,
        justification: row.get(9)?,
        created_at: timestamp(row, 10)?,
        updated_at: timestamp(row, 11)?,
    })
}

fn resource_from_row(row: &Row<'_>) -> rusqlite::Result<Resource> {
    Ok(Resource {
        id: row.get(0)?,
        assessment_id: row.get(1)?,
        url: row.get(2)?,
        content: row.get(3)?,
        content_hash: row.get(4)?,
        created_at: timestamp(row, 5)?,
        updated_at: timestamp(row, 6)?,
    })
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<Question> {
    Ok(Question {
        id: row.get(0)?,
        assessment_id: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        created_at: timestamp(row, 4)?,
        updated_at: timestamp(row, 5)?,
    })
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
