//! SQLite schema definition

/// SQL schema for the sqlsage database
pub const SCHEMA_SQL: &str = r#"
-- Documents: knowledge-base entries, keyed by title
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL UNIQUE,
    content TEXT NOT NULL,
    category TEXT NOT NULL,
    url TEXT,
    content_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Chunks: embedded windows of a document, replaced wholesale on update
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    doc_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    chunk_index INTEGER NOT NULL,
    chunk_hash TEXT NOT NULL,
    chunk_text TEXT NOT NULL,
    char_start INTEGER NOT NULL,
    char_end INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    dimension INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(doc_id, chunk_index)
);

-- Rewrites: generated optimization suggestions awaiting review
CREATE TABLE IF NOT EXISTS rewrites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slow_query_id INTEGER NOT NULL,
    original_sql TEXT NOT NULL,
    optimized_sql TEXT NOT NULL,
    rationale TEXT NOT NULL,
    expected_plan_change TEXT NOT NULL,
    caveats TEXT NOT NULL,
    confidence REAL NOT NULL,
    pattern_json TEXT NOT NULL,
    model TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'accepted', 'rejected')),
    created_at TEXT NOT NULL,
    reviewed_at TEXT
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_chunks_doc ON chunks(doc_id);
CREATE INDEX IF NOT EXISTS idx_rewrites_status ON rewrites(status, confidence DESC, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_rewrites_slow_query ON rewrites(slow_query_id);
"#;
