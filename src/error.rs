use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for a single conversion run.
///
/// Parsing-level anomalies never end up here; they degrade to literal text
/// and are counted instead. These are the resource-level failures that
/// terminate a conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("markdown file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("could not read {path}: {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not load template {path}: {reason}")]
    TemplateUnreadable { path: PathBuf, reason: String },

    #[error("document assembly failed at block {index}: {source}")]
    Translation {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error("could not write {path}: {source}")]
    OutputUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConvertError {
    /// Stable process exit code for each failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InputNotFound(_) => 1,
            Self::InputUnreadable { .. } => 2,
            Self::TemplateUnreadable { .. } => 3,
            Self::Translation { .. } => 4,
            Self::OutputUnwritable { .. } => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let errors = [
            ConvertError::InputNotFound(PathBuf::from("a.md")),
            ConvertError::InputUnreadable {
                path: PathBuf::from("a.md"),
                source: io::Error::other("denied"),
            },
            ConvertError::TemplateUnreadable {
                path: PathBuf::from("t.docx"),
                reason: "not a zip".to_string(),
            },
            ConvertError::Translation {
                index: 3,
                source: io::Error::other("boom"),
            },
            ConvertError::OutputUnwritable {
                path: PathBuf::from("out.docx"),
                source: io::Error::other("locked"),
            },
        ];
        let mut codes: Vec<i32> = errors.iter().map(ConvertError::exit_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn messages_name_the_offender() {
        let err = ConvertError::InputNotFound(PathBuf::from("report.md"));
        assert!(err.to_string().contains("report.md"));

        let err = ConvertError::Translation {
            index: 7,
            source: io::Error::other("bad part"),
        };
        assert!(err.to_string().contains('7'));
    }
}
