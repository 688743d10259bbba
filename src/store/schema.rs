pub const SCHEMA_VERSION: &str = "1";

pub const SQLITE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS "_db_metadata" (
    "key" TEXT PRIMARY KEY,
    "value" TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS "stimulus_items" (
    "id" INTEGER PRIMARY KEY,
    "imageUrl" TEXT,
    "style" TEXT,
    "subject" TEXT,
    "palette" TEXT,
    "complexity" TEXT,
    "category" TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS "stimulus_items_category_idx" ON "stimulus_items" ("category");

CREATE TABLE IF NOT EXISTS "taste_sessions" (
    "id" TEXT PRIMARY KEY,
    "variant" TEXT NOT NULL,
    "statedPreferences" TEXT NOT NULL,
    "interactionCount" INTEGER NOT NULL DEFAULT 0,
    "createdAt" INTEGER NOT NULL,
    "completedAt" INTEGER
);

-- opaque versioned PreferenceSnapshot JSON
CREATE TABLE IF NOT EXISTS "preference_snapshots" (
    "sessionId" TEXT PRIMARY KEY REFERENCES "taste_sessions" ("id") ON DELETE CASCADE,
    "snapshot" TEXT NOT NULL,
    "updatedAt" INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS "choice_history" (
    "id" INTEGER PRIMARY KEY AUTOINCREMENT,
    "sessionId" TEXT NOT NULL REFERENCES "taste_sessions" ("id") ON DELETE CASCADE,
    "sequenceIndex" INTEGER NOT NULL,
    "event" TEXT NOT NULL,
    "recordedAt" INTEGER NOT NULL,
    UNIQUE ("sessionId", "sequenceIndex")
);

CREATE TABLE IF NOT EXISTS "preference_summaries" (
    "sessionId" TEXT PRIMARY KEY REFERENCES "taste_sessions" ("id") ON DELETE CASCADE,
    "summary" TEXT NOT NULL,
    "createdAt" INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS "algorithm_metrics" (
    "sessionId" TEXT PRIMARY KEY REFERENCES "taste_sessions" ("id") ON DELETE CASCADE,
    "variant" TEXT NOT NULL,
    "record" TEXT NOT NULL,
    "recordedAt" INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS "algorithm_metrics_recorded_idx" ON "algorithm_metrics" ("recordedAt");
"#;

/// Splits a script on `;`, ignoring semicolons inside quotes.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_double_quote => in_single_quote = !in_single_quote,
            '"' if !in_single_quote => in_double_quote = !in_double_quote,
            ';' if !in_single_quote && !in_double_quote => {
                push_statement(&mut statements, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    push_statement(&mut statements, &current);

    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let sql = raw
        .lines()
        .filter(|line| !line.trim().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = sql.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_schema_into_statements() {
        let statements = split_sql_statements(SQLITE_SCHEMA_SQL);
        assert_eq!(statements.len(), 9);
        assert!(statements.iter().all(|s| !s.ends_with(';')));
        assert!(statements.iter().all(|s| !s.starts_with("--")));
    }

    #[test]
    fn quoted_semicolons_stay_inside() {
        let statements = split_sql_statements("INSERT INTO t VALUES ('a;b'); SELECT 1");
        assert_eq!(statements, vec!["INSERT INTO t VALUES ('a;b')", "SELECT 1"]);
    }
}
