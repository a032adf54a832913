//! Analysis response contract and its structural validators.
//!
//! The analysis endpoint sits on the far side of a network boundary, so
//! nothing it returns is trusted. The validators here walk an untyped
//! [`serde_json::Value`] field by field and either produce a fully valid
//! [`AnalyzeResponse`] or a [`SchemaError`] naming the first failing field.
//!
//! | Section | Shape |
//! |---------|-------|
//! | `scores` | six fixed keys, each a finite number in `[0, 100]` |
//! | `feedback` | `vocabulary`, `filler`, `clarity`, `idea` strings + `actions` string list |
//! | `assets` | `transcript_key` string |
//!
//! # Example
//!
//! ```
//! use speakmate_client::schema::{validate_response, make_empty_response};
//!
//! let value = serde_json::to_value(make_empty_response()).unwrap();
//! let response = validate_response(&value).unwrap();
//! assert_eq!(response.scores.overall(), 0.0);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Lower bound for every score.
pub const SCORE_MIN: f64 = 0.0;
/// Upper bound for every score.
pub const SCORE_MAX: f64 = 100.0;

/// The closed set of score keys, in validation order.
pub const SCORE_KEYS: [&str; 6] = [
    "vocabulary",
    "filler_control",
    "clarity_structure",
    "idea_quality",
    "pacing",
    "overall",
];

/// Failure to validate a structural value against the response contract.
///
/// `path` identifies the failing field (e.g. `["scores", "pacing"]`). An
/// empty path means the root value itself was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}{}", path_suffix(.path))]
pub struct SchemaError {
    /// What was expected at the failing field.
    pub message: String,
    /// Field path from the response root to the failing field.
    pub path: Vec<String>,
}

fn path_suffix(path: &[String]) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" @ {}", path.join("."))
    }
}

impl SchemaError {
    pub fn new(message: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            message: message.into(),
            path,
        }
    }

    /// The failing field path joined with dots, e.g. `"assets.transcript_key"`.
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

/// One of the six fixed score keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreKey {
    Vocabulary,
    FillerControl,
    ClarityStructure,
    IdeaQuality,
    Pacing,
    Overall,
}

impl ScoreKey {
    /// Every key, in the same order as [`SCORE_KEYS`].
    pub const ALL: [ScoreKey; 6] = [
        ScoreKey::Vocabulary,
        ScoreKey::FillerControl,
        ScoreKey::ClarityStructure,
        ScoreKey::IdeaQuality,
        ScoreKey::Pacing,
        ScoreKey::Overall,
    ];

    /// Wire name of the key.
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreKey::Vocabulary => "vocabulary",
            ScoreKey::FillerControl => "filler_control",
            ScoreKey::ClarityStructure => "clarity_structure",
            ScoreKey::IdeaQuality => "idea_quality",
            ScoreKey::Pacing => "pacing",
            ScoreKey::Overall => "overall",
        }
    }
}

impl fmt::Display for ScoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six analysis scores.
///
/// Fields are private: a `Scores` value is either all zeros or came out of
/// [`validate_scores`], so every score is finite and within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scores {
    vocabulary: f64,
    filler_control: f64,
    clarity_structure: f64,
    idea_quality: f64,
    pacing: f64,
    overall: f64,
}

impl Scores {
    /// All six scores set to zero.
    pub fn zero() -> Self {
        Self {
            vocabulary: 0.0,
            filler_control: 0.0,
            clarity_structure: 0.0,
            idea_quality: 0.0,
            pacing: 0.0,
            overall: 0.0,
        }
    }

    pub fn get(&self, key: ScoreKey) -> f64 {
        match key {
            ScoreKey::Vocabulary => self.vocabulary,
            ScoreKey::FillerControl => self.filler_control,
            ScoreKey::ClarityStructure => self.clarity_structure,
            ScoreKey::IdeaQuality => self.idea_quality,
            ScoreKey::Pacing => self.pacing,
            ScoreKey::Overall => self.overall,
        }
    }

    fn slot(&mut self, key: ScoreKey) -> &mut f64 {
        match key {
            ScoreKey::Vocabulary => &mut self.vocabulary,
            ScoreKey::FillerControl => &mut self.filler_control,
            ScoreKey::ClarityStructure => &mut self.clarity_structure,
            ScoreKey::IdeaQuality => &mut self.idea_quality,
            ScoreKey::Pacing => &mut self.pacing,
            ScoreKey::Overall => &mut self.overall,
        }
    }

    pub fn vocabulary(&self) -> f64 {
        self.vocabulary
    }

    pub fn filler_control(&self) -> f64 {
        self.filler_control
    }

    pub fn clarity_structure(&self) -> f64 {
        self.clarity_structure
    }

    pub fn idea_quality(&self) -> f64 {
        self.idea_quality
    }

    pub fn pacing(&self) -> f64 {
        self.pacing
    }

    pub fn overall(&self) -> f64 {
        self.overall
    }

    /// Iterate `(key, score)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (ScoreKey, f64)> + '_ {
        ScoreKey::ALL.into_iter().map(move |k| (k, self.get(k)))
    }
}

/// Written feedback for each analysis dimension plus suggested actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub vocabulary: String,
    pub filler: String,
    pub clarity: String,
    pub idea: String,
    /// Ordered list of suggested next steps.
    pub actions: Vec<String>,
}

/// Storage references produced by the analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Assets {
    /// Storage reference to the full transcript object.
    pub transcript_key: String,
}

/// A fully validated analysis result.
///
/// Deserializing goes through [`validate_response`], so an
/// `AnalyzeResponse` obtained from serde is as trustworthy as one returned
/// by the validator directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct AnalyzeResponse {
    pub scores: Scores,
    pub feedback: Feedback,
    pub assets: Assets,
}

impl AnalyzeResponse {
    /// Zero scores, empty feedback, empty transcript key.
    pub fn empty() -> Self {
        Self {
            scores: Scores::zero(),
            feedback: Feedback::default(),
            assets: Assets::default(),
        }
    }

    /// Parse JSON text and validate it.
    pub fn from_json_str(text: &str) -> crate::error::Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(validate_response(&value)?)
    }
}

impl TryFrom<Value> for AnalyzeResponse {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        validate_response(&value)
    }
}

/// Deterministic empty-but-valid response. Base of the stub and a handy
/// test fixture.
pub fn make_empty_response() -> AnalyzeResponse {
    AnalyzeResponse::empty()
}

fn child(path: &[String], key: &str) -> Vec<String> {
    let mut p = path.to_vec();
    p.push(key.to_string());
    p
}

/// Narrow to a JSON object (not null, not an array).
fn as_record<'a>(input: &'a Value, path: &[String]) -> Result<&'a Map<String, Value>, SchemaError> {
    input
        .as_object()
        .ok_or_else(|| SchemaError::new("Expected object", path.to_vec()))
}

fn string_at(record: &Map<String, Value>, path: &[String], key: &str) -> Result<String, SchemaError> {
    match record.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(SchemaError::new("Expected string", child(path, key))),
    }
}

fn string_list_at(
    record: &Map<String, Value>,
    path: &[String],
    key: &str,
) -> Result<Vec<String>, SchemaError> {
    let items = match record.get(key) {
        Some(Value::Array(items)) => items,
        _ => return Err(SchemaError::new("Expected string[]", child(path, key))),
    };
    items
        .iter()
        .map(|item| item.as_str().map(str::to_owned))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| SchemaError::new("Expected string[]", child(path, key)))
}

fn scores_at(input: &Value, path: &[String]) -> Result<Scores, SchemaError> {
    let record = as_record(input, path)?;
    let mut scores = Scores::zero();
    for key in ScoreKey::ALL {
        let value = record
            .get(key.as_str())
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite() && (SCORE_MIN..=SCORE_MAX).contains(v))
            .ok_or_else(|| {
                SchemaError::new("Expected number in [0,100]", child(path, key.as_str()))
            })?;
        *scores.slot(key) = value;
    }
    Ok(scores)
}

fn feedback_at(input: &Value, path: &[String]) -> Result<Feedback, SchemaError> {
    let record = as_record(input, path)?;
    Ok(Feedback {
        vocabulary: string_at(record, path, "vocabulary")?,
        filler: string_at(record, path, "filler")?,
        clarity: string_at(record, path, "clarity")?,
        idea: string_at(record, path, "idea")?,
        actions: string_list_at(record, path, "actions")?,
    })
}

fn assets_at(input: &Value, path: &[String]) -> Result<Assets, SchemaError> {
    let record = as_record(input, path)?;
    Ok(Assets {
        transcript_key: string_at(record, path, "transcript_key")?,
    })
}

/// A missing section validates as `null` so it reports "Expected object".
fn section<'a>(record: &'a Map<String, Value>, key: &str) -> &'a Value {
    static MISSING: Value = Value::Null;
    record.get(key).unwrap_or(&MISSING)
}

/// Validate a `scores` object. Extra keys are ignored.
pub fn validate_scores(input: &Value) -> Result<Scores, SchemaError> {
    scores_at(input, &["scores".to_string()])
}

/// Validate a `feedback` object.
pub fn validate_feedback(input: &Value) -> Result<Feedback, SchemaError> {
    feedback_at(input, &["feedback".to_string()])
}

/// Validate an `assets` object.
pub fn validate_assets(input: &Value) -> Result<Assets, SchemaError> {
    assets_at(input, &["assets".to_string()])
}

/// Validate a whole response. The first failing field wins; sections are
/// checked in the order `scores`, `feedback`, `assets`.
pub fn validate_response(input: &Value) -> Result<AnalyzeResponse, SchemaError> {
    let Some(record) = input.as_object() else {
        return Err(SchemaError::new("Expected object at root", Vec::new()));
    };
    Ok(AnalyzeResponse {
        scores: validate_scores(section(record, "scores"))?,
        feedback: validate_feedback(section(record, "feedback"))?,
        assets: validate_assets(section(record, "assets"))?,
    })
}

/// Non-failing variant of [`validate_response`]. Exactly one side of the
/// returned pair is `Some`.
pub fn try_validate_response(input: &Value) -> (Option<AnalyzeResponse>, Option<SchemaError>) {
    match validate_response(input) {
        Ok(response) => (Some(response), None),
        Err(err) => (None, Some(err)),
    }
}
