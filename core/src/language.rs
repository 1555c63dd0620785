//! Digit → language tag and language tag → synthesis voice tables.
//!
//! The tables are plain data. A built-in table covers the Indian languages the
//! menu offers; a TOML file with the same shape can replace it:
//!
//! ```toml
//! default_language = "en-IN"
//! default_voice = "en-IN-NeerjaNeural"
//! recognition = ["hi-IN", "en-IN"]
//!
//! [digits]
//! "1" = "hi-IN"
//!
//! [names]
//! "hi-IN" = "Hindi"
//!
//! [voices]
//! hi = "hi-IN-SwaraNeural"
//! ```

use crate::{CallflowError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Clone, Debug, Deserialize)]
pub struct LanguageMap {
    /// Language used for menu prompts and when recognition does not support the caller's tag
    pub default_language: String,
    /// Voice used when the caller's language has no voice entry
    pub default_voice: String,
    /// Tags the telephony platform can recognise speech in
    #[serde(default)]
    pub recognition: BTreeSet<String>,
    /// Pressed digit → language tag
    pub digits: BTreeMap<String, String>,
    /// Language tag → spoken name for the menu
    #[serde(default)]
    pub names: BTreeMap<String, String>,
    /// Primary language subtag (`hi`) → voice identifier
    #[serde(default)]
    pub voices: BTreeMap<String, String>,
}

const BUILTIN: &[(&str, &str, &str, &str)] = &[
    ("1", "hi-IN", "Hindi", "hi-IN-SwaraNeural"),
    ("2", "mr-IN", "Marathi", "mr-IN-AarohiNeural"),
    ("3", "ta-IN", "Tamil", "ta-IN-PallaviNeural"),
    ("4", "te-IN", "Telugu", "te-IN-ShrutiNeural"),
    ("5", "bn-IN", "Bengali", "bn-IN-TanishaaNeural"),
    ("6", "kn-IN", "Kannada", "kn-IN-SapnaNeural"),
    ("7", "ml-IN", "Malayalam", "ml-IN-SobhanaNeural"),
    ("8", "pa-IN", "Punjabi", "pa-IN-GaganNeural"),
    ("9", "en-IN", "English", "en-IN-NeerjaNeural"),
];

const BUILTIN_RECOGNITION: &[&str] = &["hi-IN", "te-IN", "bn-IN", "kn-IN", "ml-IN", "pa-IN", "en-IN"];

impl Default for LanguageMap {
    fn default() -> Self {
        let mut digits = BTreeMap::new();
        let mut names = BTreeMap::new();
        let mut voices = BTreeMap::new();
        for (digit, tag, name, voice) in BUILTIN {
            digits.insert(digit.to_string(), tag.to_string());
            names.insert(tag.to_string(), name.to_string());
            voices.insert(primary_subtag(tag).to_string(), voice.to_string());
        }
        Self {
            default_language: "en-IN".to_string(),
            default_voice: "en-IN-NeerjaNeural".to_string(),
            recognition: BUILTIN_RECOGNITION.iter().map(|s| s.to_string()).collect(),
            digits,
            names,
            voices,
        }
    }
}

impl LanguageMap {
    /// Parse and validate a TOML language table
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let map: LanguageMap =
            toml::from_str(s).map_err(|e| CallflowError::LanguageTable(e.to_string()))?;
        map.validate()?;
        Ok(map)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    fn validate(&self) -> Result<()> {
        if self.digits.is_empty() {
            return Err(CallflowError::LanguageTable("no digits mapped".into()));
        }
        for (digit, tag) in &self.digits {
            let mut chars = digit.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_digit() => {}
                _ => {
                    return Err(CallflowError::LanguageTable(format!(
                        "digit key must be a single 0-9 character, got {digit:?}"
                    )))
                }
            }
            if tag.trim().is_empty() {
                return Err(CallflowError::LanguageTable(format!(
                    "empty language tag for digit {digit}"
                )));
            }
        }
        if self.default_language.trim().is_empty() || self.default_voice.trim().is_empty() {
            return Err(CallflowError::LanguageTable(
                "default_language and default_voice are required".into(),
            ));
        }
        Ok(())
    }

    pub fn language_for_digit(&self, digit: &str) -> Option<&str> {
        self.digits.get(digit.trim()).map(String::as_str)
    }

    /// True when the tag is one the menu can select
    pub fn is_known(&self, tag: &str) -> bool {
        self.digits.values().any(|t| t == tag)
    }

    pub fn voice_for(&self, tag: &str) -> &str {
        self.voices
            .get(primary_subtag(tag))
            .map(String::as_str)
            .unwrap_or(&self.default_voice)
    }

    pub fn recognition_language<'a>(&'a self, tag: &'a str) -> &'a str {
        if self.recognition.contains(tag) {
            tag
        } else {
            &self.default_language
        }
    }

    /// Spoken menu listing every mapped digit in order
    pub fn menu_prompt(&self) -> String {
        let options: Vec<String> = self
            .digits
            .iter()
            .map(|(digit, tag)| {
                let name = self.names.get(tag).map(String::as_str).unwrap_or(tag);
                format!("{digit} for {name}")
            })
            .collect();
        match options.split_first() {
            Some((first, rest)) if !rest.is_empty() => {
                format!("Welcome to Telemedicine. Press {}, {}.", first, rest.join(", "))
            }
            Some((first, _)) => format!("Welcome to Telemedicine. Press {}.", first),
            None => "Welcome to Telemedicine.".to_string(),
        }
    }
}

fn primary_subtag(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag)
}
