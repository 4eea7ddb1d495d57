//! Intention: the structured inbound event a run is created from.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The kind of event an intention describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IntentionType {
    UserQuery,
    VisualEvent,
    VoiceCommand,
    EnvironmentChange,
    Other(String),
}

impl IntentionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::UserQuery => "user_query",
            Self::VisualEvent => "visual_event",
            Self::VoiceCommand => "voice_command",
            Self::EnvironmentChange => "environment_change",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for IntentionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "user_query" => Self::UserQuery,
            "visual_event" => Self::VisualEvent,
            "voice_command" => Self::VoiceCommand,
            "environment_change" => Self::EnvironmentChange,
            _ => Self::Other(s),
        }
    }
}

impl From<IntentionType> for String {
    fn from(t: IntentionType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for IntentionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an intention was refused before a run was started.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntentionError {
    #[error("confidence must be between 0.0 and 1.0, got {0}")]
    ConfidenceOutOfRange(f64),

    #[error("description must not be empty")]
    EmptyDescription,
}

/// An immutable inbound intention. Consumed once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intention {
    pub session_id: String,
    pub intention_type: IntentionType,
    pub description: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_context: Option<String>,
    /// Epoch seconds
    pub timestamp: i64,
}

impl Intention {
    pub fn validate(&self) -> Result<(), IntentionError> {
        if !(0.0..=1.0).contains(&self.confidence) || self.confidence.is_nan() {
            return Err(IntentionError::ConfidenceOutOfRange(self.confidence));
        }
        if self.description.trim().is_empty() {
            return Err(IntentionError::EmptyDescription);
        }
        Ok(())
    }

    fn formatted_timestamp(&self) -> String {
        Utc.timestamp_opt(self.timestamp, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.timestamp.to_string())
    }

    /// The structured context handed to the Agent alongside the query.
    pub fn to_context(&self) -> serde_json::Value {
        let mut context = serde_json::json!({
            "session_id": self.session_id,
            "intention_type": self.intention_type.as_str(),
            "description": self.description,
            "confidence": format!("{:.2}", self.confidence),
            "timestamp": self.formatted_timestamp(),
        });
        if let Some(transcript) = &self.transcript {
            context["transcript"] = transcript.clone().into();
        }
        if let Some(env) = &self.environment_context {
            context["environment_context"] = env.clone().into();
        }
        context
    }

    /// Render the intention as the query text for a run.
    pub fn to_query(&self) -> String {
        let mut lines = vec![
            format!("Intention Type: {}", self.intention_type),
            format!("Description: {}", self.description),
            format!("Confidence: {:.2}", self.confidence),
        ];
        if let Some(transcript) = &self.transcript {
            lines.push(format!("User said: \"{transcript}\""));
        }
        if let Some(env) = &self.environment_context {
            lines.push(format!("Environment: {env}"));
        }
        lines.push(format!("Time: {}", self.formatted_timestamp()));

        format!(
            "Based on the following context, what should be done?\n\n{}",
            lines.join("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Intention {
        serde_json::from_value(serde_json::json!({
            "session_id": "s-1",
            "intention_type": "voice_command",
            "description": "User asks for the weather",
            "confidence": 0.876,
            "transcript": "what's the weather like",
            "timestamp": 1_700_000_000
        }))
        .unwrap()
    }

    #[test]
    fn parses_inbound_payload() {
        let intention = sample();
        assert_eq!(intention.intention_type, IntentionType::VoiceCommand);
        assert!(intention.environment_context.is_none());
        assert!(intention.validate().is_ok());
    }

    #[test]
    fn unknown_type_is_preserved() {
        let t: IntentionType = "gesture".to_string().into();
        assert_eq!(t, IntentionType::Other("gesture".into()));
        assert_eq!(t.as_str(), "gesture");
    }

    #[test]
    fn query_includes_context_lines() {
        let query = sample().to_query();
        assert!(query.starts_with("Based on the following context, what should be done?\n\n"));
        assert!(query.contains("Intention Type: voice_command"));
        assert!(query.contains("Confidence: 0.88"));
        assert!(query.contains("User said: \"what's the weather like\""));
        assert!(query.contains("Time: 2023-11-14 22:13:20"));
        assert!(!query.contains("Environment:"));
    }

    #[test]
    fn context_is_structured() {
        let context = sample().to_context();
        assert_eq!(context["session_id"], "s-1");
        assert_eq!(context["confidence"], "0.88");
        assert!(context.get("environment_context").is_none());
    }

    #[test]
    fn validation_rejects_bad_input() {
        let mut intention = sample();
        intention.confidence = 1.5;
        assert_eq!(
            intention.validate(),
            Err(IntentionError::ConfidenceOutOfRange(1.5))
        );

        let mut intention = sample();
        intention.description = "  ".into();
        assert_eq!(intention.validate(), Err(IntentionError::EmptyDescription));
    }
}
