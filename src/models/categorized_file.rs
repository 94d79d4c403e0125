use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::TaxonomyId;

/// Kind of filesystem item being categorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    File,
    Directory,
}

impl FileType {
    /// Returns the label stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "File",
            Self::Directory => "Directory",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "File" => Ok(Self::File),
            "Directory" => Ok(Self::Directory),
            other => Err(format!("unknown file type '{other}'")),
        }
    }
}

/// A persisted categorization joined with its taxonomy display strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedFile {
    pub file_name: String,
    pub dir_path: String,
    pub file_type: FileType,
    pub taxonomy_id: TaxonomyId,
    pub category: String,
    pub subcategory: String,
    #[serde(with = "time::serde::rfc3339")]
    pub categorized_at: OffsetDateTime,
}

impl CategorizedFile {
    /// Full path of the categorized item.
    pub fn full_path(&self) -> PathBuf {
        PathBuf::from(&self.dir_path).join(&self.file_name)
    }
}
