#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tempfile::{TempDir, tempdir};

pub const SALESMEN_DDL: &str = "
    CREATE TABLE salesmen (
        SalesmanKey INTEGER NOT NULL,
        id VARCHAR(10) NOT NULL,
        FirstName VARCHAR(30) NOT NULL,
        LastName VARCHAR(30),
        Commission DECIMAL(5,2),
        Active BIT,
        HireDate DATETIME,
        LastModifiedUTC DATETIME NOT NULL,
        SalesmenGUID UNIQUEIDENTIFIER NOT NULL
    );
    INSERT INTO salesmen (SalesmanKey, id, FirstName, LastModifiedUTC, SalesmenGUID)
    VALUES (1, 'S900', 'Existing', '2024-01-01', 'x');
";

pub const CUSTOMER_CLASSIFICATION_DDL: &str = "
    CREATE TABLE grower (growid VARCHAR(10), GrowName1 VARCHAR(40));
    INSERT INTO grower VALUES ('G100', 'North Farm'), ('G200', 'South Farm');
    CREATE TABLE MasterClassNames (MasterClassNamesKey INTEGER NOT NULL, ClassName VARCHAR(40));
    INSERT INTO MasterClassNames VALUES (1, 'Gold'), (2, 'Silver');
    CREATE TABLE CustClass (
        CustClassKey INTEGER NOT NULL,
        growid VARCHAR(10) NOT NULL,
        ClassificationName VARCHAR(40) NOT NULL,
        MasterClassNamesKey INTEGER NOT NULL
    );
    INSERT INTO CustClass VALUES (1, 'G100', 'Gold', 1);
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Creates a SQLite database under the workspace from a DDL script.
    pub fn database(&self, name: &str, ddl: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let conn = Connection::open(&path).expect("create database");
        conn.execute_batch(ddl).expect("seed database");
        path
    }

    pub fn artifacts(&self) -> PathBuf {
        self.temp_dir.path().join("artifacts")
    }
}
