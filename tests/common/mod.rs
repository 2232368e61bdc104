//! Shared test utilities for engine integration tests

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;

use coursetrack::curriculum::DirectoryCatalog;
use coursetrack::store::{ProgressDb, SqliteIdentityDirectory};
use coursetrack::{LearnerId, ProgressEngine, RegistrationNumber};

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// A database file and a curriculum directory inside one temp dir
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("courses")).expect("Failed to create courses dir");
        let env = Self { dir };
        // Schema and WAL mode exist before any parallel opener shows up
        env.db();
        env
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("progress.db")
    }

    pub fn courses_dir(&self) -> PathBuf {
        self.dir.path().join("courses")
    }

    /// A fresh connection to the shared database file
    pub fn db(&self) -> ProgressDb {
        self.db_with_timeout(TIMEOUT)
    }

    pub fn db_with_timeout(&self, timeout: Duration) -> ProgressDb {
        ProgressDb::open(&self.db_path(), timeout).expect("Failed to open database")
    }

    /// An engine on its own connection, as a separate process would have
    pub fn engine(&self) -> (ProgressEngine, SqliteIdentityDirectory) {
        self.engine_with_timeout(TIMEOUT)
    }

    /// An engine whose store accesses give up after `timeout`
    pub fn engine_with_timeout(&self, timeout: Duration) -> (ProgressEngine, SqliteIdentityDirectory) {
        let db = self.db_with_timeout(timeout);
        let identity = SqliteIdentityDirectory::new(db.clone());
        let engine = ProgressEngine::new(
            db,
            Arc::new(DirectoryCatalog::new(self.courses_dir())),
            Arc::new(identity.clone()),
        );
        (engine, identity)
    }

    pub fn write_course(&self, course: &Value) {
        let id = course["id"].as_str().expect("course needs an id");
        let content = serde_json::to_string_pretty(course).expect("Failed to serialize course");
        fs::write(self.courses_dir().join(format!("{}.json", id)), content)
            .expect("Failed to write course file");
    }
}

/// Course with one section holding `lectures` and an optional quiz
pub fn section_course(id: &str, lectures: &[&str], quiz: Option<Value>) -> Value {
    let lectures: Vec<Value> = lectures
        .iter()
        .map(|l| json!({ "id": l, "duration": 300 }))
        .collect();
    let mut section = json!({
        "id": "s1",
        "title": "Section 1",
        "lectures": lectures,
    });
    if let Some(quiz) = quiz {
        section["quiz"] = quiz;
    }
    json!({ "id": id, "title": format!("Course {}", id), "curriculum": [section] })
}

/// Course in the legacy flat shape: lectures listed directly, no sections
pub fn flat_course(id: &str, lectures: &[&str]) -> Value {
    let items: Vec<Value> = lectures
        .iter()
        .map(|l| json!({ "id": l, "duration": 60 }))
        .collect();
    json!({ "id": id, "title": format!("Course {}", id), "curriculum": items })
}

/// Three questions whose correct option is always 0
pub fn three_question_quiz() -> Value {
    json!([
        { "question": "Q1", "options": ["a", "b"], "correctOption": 0 },
        { "question": "Q2", "options": ["a", "b"], "correctOption": 0 },
        { "question": "Q3", "options": ["a", "b"], "correctOption": 0 },
    ])
}

/// Register `learner` with a fixed registration number
pub fn register(identity: &SqliteIdentityDirectory, learner: &str, number: &str) {
    identity
        .assign(
            &LearnerId::parse(learner).unwrap(),
            &RegistrationNumber::parse(number).unwrap(),
        )
        .expect("Failed to assign registration number");
}
