//! # sheetsense-oracle
//!
//! The semantic oracle contract used by the sheetsense layout analyzer.
//!
//! An oracle answers classification questions about a rectangular excerpt of
//! a sheet. It is handed an [`OracleRequest`] (task, instruction and a text
//! rendering of the cells) and replies with text that should contain JSON.
//! The analyzer never trusts that text: [`ask`] extracts and validates the
//! JSON and folds every failure into an [`OracleReply`] the caller can fall
//! back on.
//!
//! - [`Oracle`] - the collaborator trait, also implemented for closures
//! - [`CommandOracle`] - runs an external program per request
//! - [`excerpt`] - cell descriptions and large-region sampling
//! - [`response`] - tolerant JSON extraction

pub mod command;
pub mod error;
pub mod excerpt;
pub mod instructions;
pub mod response;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use command::CommandOracle;
pub use error::{OracleError, OracleResult};
pub use excerpt::{describe_cell, render_cells, SampleLimits};
pub use response::{extract_json, parse_reply};

/// The question being asked of the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleTask {
    /// Should this region be split into independent parts?
    RefineRegion,
    /// Is this region a heading?
    DetectHeading,
    /// Is this region a key/value list?
    DetectKeyValue,
    /// Is this region free text?
    DetectText,
    /// Does this region contain tables?
    DetectTable,
    /// Describe the header, footer and row groups of a table
    TableStructure,
}

impl OracleTask {
    /// Stable snake_case name, used on the wire and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            OracleTask::RefineRegion => "refine_region",
            OracleTask::DetectHeading => "detect_heading",
            OracleTask::DetectKeyValue => "detect_key_value",
            OracleTask::DetectText => "detect_text",
            OracleTask::DetectTable => "detect_table",
            OracleTask::TableStructure => "table_structure",
        }
    }
}

impl fmt::Display for OracleTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to the oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleRequest {
    /// What is being asked
    pub task: OracleTask,
    /// Task instruction, including the expected JSON shape
    pub instruction: String,
    /// Text rendering of the cells under consideration
    pub excerpt: String,
}

impl OracleRequest {
    /// Create a request using the built-in instruction for `task`
    pub fn new<S: Into<String>>(task: OracleTask, excerpt: S) -> Self {
        Self {
            task,
            instruction: instructions::instruction_for(task).to_string(),
            excerpt: excerpt.into(),
        }
    }

    /// Replace the instruction text
    pub fn with_instruction<S: Into<String>>(mut self, instruction: S) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Instruction and excerpt as a single prompt
    pub fn prompt(&self) -> String {
        format!("{}\n\nCells:\n{}", self.instruction, self.excerpt)
    }
}

/// A semantic classifier consulted by the analyzer
///
/// Implementations may block; the analyzer calls them synchronously, one
/// request at a time per region.
pub trait Oracle {
    /// Answer a request with free text that should contain JSON
    fn complete(&self, request: &OracleRequest) -> OracleResult<String>;
}

impl<F> Oracle for F
where
    F: Fn(&OracleRequest) -> OracleResult<String>,
{
    fn complete(&self, request: &OracleRequest) -> OracleResult<String> {
        self(request)
    }
}

/// Outcome of an oracle round-trip
#[derive(Debug)]
pub enum OracleReply<T> {
    /// A reply that parsed into the expected shape
    Answer(T),
    /// The oracle answered but the text held no usable JSON
    Malformed(String),
    /// The call itself failed
    Failed(OracleError),
}

impl<T> OracleReply<T> {
    /// The parsed answer, if any
    pub fn answer(self) -> Option<T> {
        match self {
            OracleReply::Answer(value) => Some(value),
            _ => None,
        }
    }
}

/// Send a request and parse the reply as `T`
pub fn ask<T: DeserializeOwned>(oracle: &dyn Oracle, request: &OracleRequest) -> OracleReply<T> {
    let raw = match oracle.complete(request) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(task = %request.task, error = %err, "oracle call failed");
            return OracleReply::Failed(err);
        }
    };
    match parse_reply::<T>(&raw) {
        Some(value) => OracleReply::Answer(value),
        None => {
            tracing::warn!(task = %request.task, "oracle reply held no usable JSON");
            OracleReply::Malformed(raw)
        }
    }
}
