//! Declared task outputs

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Expected filesystem type of a declared output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// A single plain file
    File,
    /// A directory tree
    Directory,
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Directory => f.write_str("directory"),
        }
    }
}

impl FromStr for OutputType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(Self::File),
            "dir" | "directory" => Ok(Self::Directory),
            other => Err(Error::configuration(format!(
                "unknown output type '{other}' (expected 'file' or 'dir')"
            ))),
        }
    }
}

/// One declared output location of a unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Output property name, unique within one task
    pub name: String,
    /// Resolved location; `None` when the declaration did not resolve to a path
    pub path: Option<PathBuf>,
    /// Expected type at `path`
    pub output_type: OutputType,
}

impl OutputSpec {
    /// Declare a file output
    #[must_use]
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            output_type: OutputType::File,
        }
    }

    /// Declare a directory output
    #[must_use]
    pub fn directory(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            output_type: OutputType::Directory,
        }
    }

    /// Declare an output whose location did not resolve
    #[must_use]
    pub fn unresolved(name: impl Into<String>, output_type: OutputType) -> Self {
        Self {
            name: name.into(),
            path: None,
            output_type,
        }
    }

    /// The resolved path, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Parses `file:<name>=<path>` or `dir:<name>=<path>`.
impl FromStr for OutputSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, rest) = s.split_once(':').ok_or_else(|| {
            Error::configuration(format!("output '{s}' must look like <file|dir>:<name>=<path>"))
        })?;
        let (name, path) = rest.split_once('=').ok_or_else(|| {
            Error::configuration(format!("output '{s}' is missing '=<path>'"))
        })?;
        if name.is_empty() {
            return Err(Error::configuration(format!("output '{s}' has an empty name")));
        }
        if path.is_empty() {
            return Err(Error::configuration(format!("output '{s}' has an empty path")));
        }
        Ok(Self {
            name: name.to_string(),
            path: Some(PathBuf::from(path)),
            output_type: kind.parse()?,
        })
    }
}

/// The ordered output declarations of one unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskOutputs {
    specs: Vec<OutputSpec>,
}

impl TaskOutputs {
    /// Create an empty set of outputs
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a declaration, keeping declaration order
    pub fn push(&mut self, spec: OutputSpec) -> &mut Self {
        self.specs.push(spec);
        self
    }

    /// Iterate declarations in declared order
    pub fn iter(&self) -> std::slice::Iter<'_, OutputSpec> {
        self.specs.iter()
    }

    /// Look up a declaration by property name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OutputSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    /// Number of declarations
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether nothing is declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl From<Vec<OutputSpec>> for TaskOutputs {
    fn from(specs: Vec<OutputSpec>) -> Self {
        Self { specs }
    }
}

impl FromIterator<OutputSpec> for TaskOutputs {
    fn from_iter<I: IntoIterator<Item = OutputSpec>>(iter: I) -> Self {
        Self {
            specs: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TaskOutputs {
    type Item = &'a OutputSpec;
    type IntoIter = std::slice::Iter<'a, OutputSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_type_serde() {
        let json = serde_json::to_string(&OutputType::Directory).unwrap();
        assert_eq!(json, "\"directory\"");
        let parsed: OutputType = serde_json::from_str("\"file\"").unwrap();
        assert_eq!(parsed, OutputType::File);
    }

    #[test]
    fn test_unknown_output_type_is_rejected() {
        assert!(serde_json::from_str::<OutputType>("\"symlink\"").is_err());
        assert!("symlink".parse::<OutputType>().is_err());
    }

    #[test]
    fn test_parse_output_spec() {
        let spec: OutputSpec = "dir:classes=build/classes".parse().unwrap();
        assert_eq!(spec, OutputSpec::directory("classes", "build/classes"));

        let spec: OutputSpec = "file:report=out/report.txt".parse().unwrap();
        assert_eq!(spec.output_type, OutputType::File);
        assert_eq!(spec.path(), Some(Path::new("out/report.txt")));
    }

    #[test]
    fn test_parse_output_spec_rejects_malformed() {
        assert!("classes=build".parse::<OutputSpec>().is_err());
        assert!("dir:classes".parse::<OutputSpec>().is_err());
        assert!("dir:=build".parse::<OutputSpec>().is_err());
        assert!("dir:classes=".parse::<OutputSpec>().is_err());
        assert!("link:classes=build".parse::<OutputSpec>().is_err());
    }

    #[test]
    fn test_task_outputs_keep_declared_order() {
        let outputs: TaskOutputs = vec![
            OutputSpec::file("b", "b.txt"),
            OutputSpec::directory("a", "a"),
            OutputSpec::unresolved("c", OutputType::File),
        ]
        .into();

        let names: Vec<_> = outputs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(outputs.len(), 3);
        assert!(outputs.get("c").unwrap().path().is_none());
        assert!(outputs.get("missing").is_none());
    }

    #[test]
    fn test_task_outputs_serde_is_a_list() {
        let mut outputs = TaskOutputs::new();
        outputs.push(OutputSpec::file("report", "report.txt"));
        let json = serde_json::to_value(&outputs).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["output_type"], "file");
    }
}
