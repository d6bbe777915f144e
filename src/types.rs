//! Core data types for the Lectio analysis service
//!
//! [`AnalysisResult`] is the model's JSON object exactly as it was extracted.
//! Only its shape is checked (an object with a `words` array); it is cached
//! and returned unchanged. The word and sentence structs below are a lenient
//! read-only view over it for callers that want typed access.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /api/analyze`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Latin passage to analyze
    #[serde(default)]
    pub text: String,

    /// Streaming hint; only non-streaming delivery is supported
    #[serde(default)]
    pub stream: bool,
}

/// Complete analysis of one passage, as produced by the model
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnalysisResult(Map<String, Value>);

impl AnalysisResult {
    /// Accept `value` if it is an object carrying a `words` array
    pub fn from_value(value: Value) -> std::result::Result<Self, &'static str> {
        let Value::Object(map) = value else {
            return Err("analysis must be a JSON object");
        };
        if !matches!(map.get("words"), Some(Value::Array(_))) {
            return Err("analysis must contain a `words` array");
        }
        Ok(Self(map))
    }

    /// Raw per-word entries in passage order
    pub fn words(&self) -> &[Value] {
        match self.0.get("words") {
            Some(Value::Array(words)) => words,
            _ => &[],
        }
    }

    /// Raw per-sentence entries, when the model supplied them
    pub fn sentences(&self) -> Option<&[Value]> {
        match self.0.get("sentences") {
            Some(Value::Array(sentences)) => Some(sentences),
            _ => None,
        }
    }

    /// Typed view of each word; entries that do not fit the view are skipped
    pub fn word_views(&self) -> Vec<WordAnalysis> {
        self.words()
            .iter()
            .filter_map(|word| WordAnalysis::deserialize(word).ok())
            .collect()
    }

    /// Typed view of each sentence
    pub fn sentence_views(&self) -> Vec<SentenceInfo> {
        self.sentences()
            .unwrap_or_default()
            .iter()
            .filter_map(|sentence| SentenceInfo::deserialize(sentence).ok())
            .collect()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl<'de> Deserialize<'de> for AnalysisResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Strings pass through, other scalars are rendered as text, null is absent
fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Typed view of a single word
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordAnalysis {
    /// Surface form as it appears in the passage
    #[serde(default, deserialize_with = "scalar_text")]
    pub word: Option<String>,

    /// Part-of-speech tag (noun, verb, adjective, ...)
    #[serde(default, deserialize_with = "scalar_text")]
    pub part_of_speech: Option<String>,

    /// Dictionary form
    #[serde(default, deserialize_with = "scalar_text")]
    pub lemma: Option<String>,

    /// `{short, detailed}` object or a bare gloss string
    #[serde(default)]
    pub meaning: Option<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub morphology: Morphology,

    #[serde(default, deserialize_with = "null_as_default")]
    pub relationships: Vec<Relationship>,

    #[serde(default)]
    pub related_words: Option<Value>,

    #[serde(default)]
    pub position: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WordAnalysis {
    /// Short gloss, whichever form the model used
    pub fn short_meaning(&self) -> Option<&str> {
        match self.meaning.as_ref()? {
            Value::String(gloss) => Some(gloss.as_str()),
            Value::Object(meaning) => meaning.get("short").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Grammatical features of an inflected form
///
/// Which fields are populated depends on the part of speech: case, number
/// and gender for nominal forms; person, number, tense, mood and voice for
/// verbal forms; degree for adjectives and adverbs. None of this is checked
/// against `part_of_speech`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Morphology {
    #[serde(default, deserialize_with = "scalar_text")]
    pub case: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub person: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub tense: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub mood: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub voice: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub degree: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Syntactic link from one word to another within the same result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Kind of relation (subject, object, modifier, ...)
    #[serde(rename = "type", default, deserialize_with = "scalar_text")]
    pub relation_type: Option<String>,

    /// Zero-based index into the result's `words`
    #[serde(default)]
    pub target_index: Option<Value>,

    #[serde(default, deserialize_with = "scalar_text")]
    pub description: Option<String>,

    /// `from` or `to` in the usual case; kept as sent
    #[serde(default, deserialize_with = "scalar_text")]
    pub direction: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed view of a sentence
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceInfo {
    /// Original sentence text
    #[serde(default, deserialize_with = "scalar_text")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub translation: Option<String>,
    #[serde(default)]
    pub structure: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Whether a result came from the cache or from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Value of the `X-Cache` response header
    pub fn as_header_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}
