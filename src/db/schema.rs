//! Database schema and migrations for Cabinet.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password    TEXT NOT NULL,           -- Argon2 hash
    role        TEXT NOT NULL DEFAULT 'client',  -- 'admin', 'client'
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_users_role ON users(role);
"#,
    // v2: Folders and their share list
    r#"
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    created_by  INTEGER NOT NULL REFERENCES users(id),
    permission  TEXT NOT NULL DEFAULT 'consult',  -- 'consult', 'download'
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_folders_created_by ON folders(created_by);

CREATE TABLE folder_shares (
    folder_id   INTEGER NOT NULL REFERENCES folders(id) ON DELETE CASCADE,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (folder_id, user_id)
);

CREATE INDEX idx_folder_shares_user_id ON folder_shares(user_id);
"#,
    // v3: Files, ordered by upload position within their folder
    r#"
CREATE TABLE files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    folder_id   INTEGER NOT NULL REFERENCES folders(id),
    name        TEXT NOT NULL,           -- display name
    stored_name TEXT NOT NULL UNIQUE,    -- <uuid>.<ext> in the content root
    size        INTEGER NOT NULL,
    position    INTEGER NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(folder_id, position)
);

CREATE INDEX idx_files_folder_id ON files(folder_id);
"#,
];
