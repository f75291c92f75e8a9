use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Output column name → cell text, for spreadsheet-style engines.
pub type Record = BTreeMap<String, String>;

/// One unit of generated output.
///
/// Line-oriented engines emit script lines; tabular engines emit records
/// keyed by output column. The pipeline never looks inside either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Line(String),
    Record(Record),
}

impl Command {
    pub fn line(text: impl Into<String>) -> Self {
        Self::Line(text.into())
    }

    pub fn as_line(&self) -> Option<&str> {
        match self {
            Self::Line(s) => Some(s),
            Self::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            Self::Line(_) => None,
        }
    }
}

impl From<Record> for Command {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(s) => f.write_str(s),
            Self::Record(r) => {
                let mut first = true;
                for (column, value) in r {
                    if !first {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}={}", column, value)?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_display_is_column_sorted() {
        let mut record = Record::new();
        record.insert("Command".to_string(), "Bg".to_string());
        record.insert("Arg1".to_string(), "room".to_string());
        let cmd = Command::from(record);
        assert_eq!(cmd.to_string(), "Arg1=room | Command=Bg");
        assert!(cmd.as_line().is_none());
    }

    #[test]
    fn line_accessors() {
        let cmd = Command::line("play music bgm_main");
        assert_eq!(cmd.as_line(), Some("play music bgm_main"));
        assert!(cmd.as_record().is_none());
    }
}
