use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty label, duplicate position, etc.).
    ConfigValidation(String),
    /// Required column absent from an input table.
    MissingColumn { table: String, column: String },
    /// Base table is narrower than a configured carry position.
    MissingPosition { position: usize, width: usize },
    /// Duplicate base identifier under the `reject` duplicate policy.
    DuplicateKey { key: String, count: usize },
    /// IO error (CSV read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { table, column } => {
                write!(f, "{table} table: missing column '{column}'")
            }
            Self::MissingPosition { position, width } => {
                write!(
                    f,
                    "base table: no column at position {position} (table has {width} column(s))"
                )
            }
            Self::DuplicateKey { key, count } => {
                write!(f, "base table: circuit '{key}' appears {count} times (duplicates = \"reject\")")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
