//! Authored question content and answer evaluation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Question presentation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    Mcq,
    Poll,
    TrueFalse,
    Numeric,
}

impl Default for QuestionType {
    fn default() -> Self {
        Self::Mcq
    }
}

/// Authored difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Medium
    }
}

/// A selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
}

/// A submitted or expected answer: a single option id or a set of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AnswerValue {
    /// Iterates the option ids contained in the answer.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::Multiple(vs) => vs.as_slice(),
        };
        slice.iter().map(String::as_str)
    }

    /// Key used in the option distribution of question results.
    ///
    /// Multi-select answers are sorted before joining, so equal sets share
    /// one key.
    pub fn distribution_key(&self) -> String {
        match self {
            Self::Single(v) => v.clone(),
            Self::Multiple(vs) => {
                let mut sorted: Vec<&str> = vs.iter().map(String::as_str).collect();
                sorted.sort_unstable();
                sorted.join(",")
            }
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<&str>> for AnswerValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

/// A question as stored by the content service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(alias = "_id")]
    pub id: String,
    pub concept_id: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionType,
    pub text: String,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    pub correct_answer: AnswerValue,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Authored time limit in seconds
    #[serde(default)]
    pub time_limit: u32,
    #[serde(default)]
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Question {
    /// Evaluates a submitted answer.
    ///
    /// Multi-select questions compare as sets; a scalar submission counts as
    /// a one-element set. Single-answer questions require an exact match.
    pub fn is_correct(&self, answer: &AnswerValue) -> bool {
        match (&self.correct_answer, answer) {
            (AnswerValue::Multiple(expected), submitted) => {
                let expected: BTreeSet<&str> = expected.iter().map(String::as_str).collect();
                let submitted: BTreeSet<&str> = submitted.values().collect();
                expected == submitted
            }
            (AnswerValue::Single(expected), AnswerValue::Single(submitted)) => {
                expected == submitted
            }
            (AnswerValue::Single(_), AnswerValue::Multiple(_)) => false,
        }
    }

    /// Builds the broadcast view, which carries the correct answer.
    pub fn view(&self) -> QuestionView {
        QuestionView {
            id: self.id.clone(),
            concept_id: self.concept_id.clone(),
            kind: self.kind,
            text: self.text.clone(),
            options: self.options.clone(),
            correct_answer: Some(self.correct_answer.clone()),
            difficulty: self.difficulty,
            time_limit: self.time_limit,
            points: self.points,
            explanation: self.explanation.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Question as carried by `question:pushed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub concept_id: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub text: String,
    pub options: Vec<QuestionOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<AnswerValue>,
    pub difficulty: Difficulty,
    pub time_limit: u32,
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub tags: Vec<String>,
}

impl QuestionView {
    /// Strips everything that gives the answer away.
    pub fn redacted(mut self) -> Self {
        self.correct_answer = None;
        self.explanation = None;
        self
    }
}
