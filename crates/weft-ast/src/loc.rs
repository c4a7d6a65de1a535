//! Source location tracking

use serde::{Deserialize, Serialize};
use std::fmt;

/// A source location: file and line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Loc {
    /// Source file the node came from
    pub file: String,
    /// 1-based line number
    pub line: u32,
}

impl Loc {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    pub fn dummy() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
        }
    }
}

impl Default for Loc {
    fn default() -> Self {
        Self::dummy()
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
