//! Prompt construction for the Latin analysis request
//!
//! The prompt is a fixed instruction block, a fixed schema description, and
//! the passage inserted verbatim inside a quoted instruction. No escaping is
//! applied to the passage.

use serde::Serialize;

const SYSTEM_INSTRUCTION: &str = r#"You are an expert Latin philologist and grammarian.
Analyze the Latin passage you are given word by word. For every word identify
its part of speech, dictionary form (lemma), meaning, full morphology, and its
syntactic relationships to the other words of the passage. Also translate each
sentence and describe its structure.

Respond with a single JSON object and nothing else: no markdown, no code
fences, no commentary before or after the JSON."#;

const SCHEMA_DESCRIPTION: &str = r#"The JSON object must follow this schema:
{
  "words": [
    {
      "word": "surface form exactly as it appears in the passage",
      "partOfSpeech": "noun | verb | adjective | adverb | pronoun | preposition | conjunction | interjection | participle | numeral",
      "lemma": "dictionary form",
      "meaning": { "short": "one or two word gloss", "detailed": "fuller explanation of the sense in context" },
      "morphology": {
        "case": "for nouns, pronouns, adjectives, participles",
        "number": "singular | plural",
        "gender": "masculine | feminine | neuter",
        "person": "for finite verbs: 1st | 2nd | 3rd",
        "tense": "for verbs",
        "mood": "indicative | subjunctive | imperative | infinitive | participle",
        "voice": "active | passive",
        "degree": "for adjectives and adverbs: positive | comparative | superlative"
      },
      "relationships": [
        {
          "type": "subject | object | modifier | agreement | governs | complement | apposition",
          "targetIndex": 0,
          "description": "short explanation of the relationship",
          "direction": "from (this word acts on the target) | to (this word is acted upon by the target)"
        }
      ],
      "relatedWords": { "synonyms": [], "derivedForms": [], "usageExamples": [] },
      "position": { "sentenceIndex": 0, "wordIndex": 0 }
    }
  ],
  "sentences": [
    { "text": "original sentence", "translation": "English translation", "structure": "description of the clause structure" }
  ]
}
Omit morphology fields that do not apply to the part of speech.
"targetIndex" is the zero-based index of the related word in "words".
"sentenceIndex" and "wordIndex" are zero-based."#;

/// Sampling parameters sent with every model call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    /// Low temperature, nucleus sampled
    pub const ANALYSIS: GenerationConfig = GenerationConfig {
        temperature: 0.1,
        top_p: 0.8,
        top_k: 40,
        max_output_tokens: 8192,
    };
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::ANALYSIS
    }
}

/// Build the full prompt for `text`
pub fn build_prompt(text: &str) -> String {
    format!(
        "{}\n\n{}\n\nAnalyze the following Latin text: \"{}\"",
        SYSTEM_INSTRUCTION, SCHEMA_DESCRIPTION, text
    )
}
