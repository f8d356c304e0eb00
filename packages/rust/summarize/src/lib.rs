//! Transcript summarization.
//!
//! [`Transformer`] turns raw transcript text into a [`MeetingRecord`] by
//! prompting a [`Summarizer`] with a fixed extraction instruction and
//! leniently parsing the reply. The service's answer is untrusted: code
//! fences are stripped and anything that still fails to parse yields an
//! empty record rather than an error — bad model output is a per-item
//! outcome, not a fault.
//!
//! [`AnthropicClient`] is the production [`Summarizer`].

mod anthropic;

use async_trait::async_trait;
use tracing::{debug, warn};

use transync_shared::{MeetingRecord, Result};

pub use anthropic::AnthropicClient;

/// Fixed extraction instruction sent ahead of every transcript.
const EXTRACTION_PROMPT: &str = r#"Summarize this meeting transcript for work planning context.

Extract and return as JSON:
{
  "meeting_title": "Meeting name",
  "date": "YYYY-MM-DD",
  "project_client": "Client or project name",
  "attendees": ["Person1", "Person2"],
  "main_topics": ["Topic discussed"],
  "key_context": ["Important background info mentioned"],
  "implied_work": ["Things that might need follow-up even if not explicit action items"]
}

Keep it concise - this is for background context, not detailed notes.
Only include fields where you have clear information.

Transcript:
"#;

// ---------------------------------------------------------------------------
// Summarizer trait
// ---------------------------------------------------------------------------

/// A text-completion capability. Takes a full prompt, returns the raw reply.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Transformer
// ---------------------------------------------------------------------------

/// Wraps a [`Summarizer`] and normalizes its replies into [`MeetingRecord`]s.
pub struct Transformer<S> {
    service: S,
    max_input_chars: usize,
}

impl<S: Summarizer> Transformer<S> {
    pub fn new(service: S, max_input_chars: usize) -> Self {
        Self {
            service,
            max_input_chars,
        }
    }

    /// Extract a structured record from transcript text.
    ///
    /// Empty or whitespace-only input short-circuits to an empty record
    /// without invoking the service. Transport errors propagate; a reply
    /// that cannot be parsed does not.
    pub async fn transform(&self, raw_text: &str) -> Result<MeetingRecord> {
        if raw_text.trim().is_empty() {
            debug!("blank transcript, skipping summarization call");
            return Ok(MeetingRecord::default());
        }

        let truncated = truncate_chars(raw_text, self.max_input_chars);
        let prompt = format!("{EXTRACTION_PROMPT}{truncated}");

        let reply = self.service.complete(&prompt).await?;
        Ok(parse_reply(&reply))
    }
}

/// Parse a service reply into a record, tolerating code fences and garbage.
fn parse_reply(reply: &str) -> MeetingRecord {
    let body = strip_code_fence(reply);
    match serde_json::from_str::<MeetingRecord>(body) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "unparseable summarization reply, treating as empty");
            MeetingRecord::default()
        }
    }
}

/// Strip a Markdown code fence (```json … ``` or bare ``` … ```) wrapping
/// the reply, returning the inner content.
fn strip_code_fence(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        match rest.find("```") {
            Some(end) => rest[..end].trim(),
            None => rest.trim(),
        }
    } else if let Some(start) = text.find("```") {
        let rest = &text[start + "```".len()..];
        match rest.find("```") {
            Some(end) => rest[..end].trim(),
            None => rest.trim(),
        }
    } else {
        text.trim()
    }
}

/// Truncate to at most `max_chars` chars, never splitting a char.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Summarizer double: canned reply, counts calls, captures the prompt.
    /// Cheap to clone; clones share the counters.
    #[derive(Clone)]
    struct FakeSummarizer {
        reply: String,
        calls: Arc<AtomicUsize>,
        last_prompt: Arc<Mutex<String>>,
    }

    impl FakeSummarizer {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.into(),
                calls: Arc::new(AtomicUsize::new(0)),
                last_prompt: Arc::new(Mutex::new(String::new())),
            }
        }
    }

    #[async_trait]
    impl Summarizer for FakeSummarizer {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn blank_input_never_calls_the_service() {
        let fake = FakeSummarizer::new("{}");
        let transformer = Transformer::new(fake.clone(), 50_000);

        for input in ["", "   ", "\n\t\n"] {
            let record = transformer.transform(input).await.unwrap();
            assert!(record.is_empty());
        }
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn parses_plain_json_reply() {
        let fake = FakeSummarizer::new(
            r#"{"date": "2025-09-22", "main_topics": ["PRD automation"]}"#,
        );
        let transformer = Transformer::new(fake.clone(), 50_000);

        let record = transformer.transform("Speaker 1: hello").await.unwrap();
        assert_eq!(record.date.as_deref(), Some("2025-09-22"));
        assert_eq!(record.main_topics, vec!["PRD automation"]);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn strips_json_code_fence() {
        let fake = FakeSummarizer::new(
            "Here is the summary:\n```json\n{\"date\": \"2025-01-15\"}\n```\nDone.",
        );
        let transformer = Transformer::new(fake.clone(), 50_000);

        let record = transformer.transform("some transcript").await.unwrap();
        assert_eq!(record.date.as_deref(), Some("2025-01-15"));
    }

    #[tokio::test]
    async fn strips_bare_code_fence() {
        let fake = FakeSummarizer::new("```\n{\"meeting_title\": \"Weekly Sync\"}\n```");
        let transformer = Transformer::new(fake.clone(), 50_000);

        let record = transformer.transform("some transcript").await.unwrap();
        assert_eq!(record.meeting_title.as_deref(), Some("Weekly Sync"));
    }

    #[tokio::test]
    async fn garbage_reply_becomes_empty_record() {
        let fake = FakeSummarizer::new("I could not summarize this transcript, sorry.");
        let transformer = Transformer::new(fake.clone(), 50_000);

        let record = transformer.transform("some transcript").await.unwrap();
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn long_input_is_truncated_before_sending() {
        let fake = FakeSummarizer::new("{}");
        let transformer = Transformer::new(fake.clone(), 100);

        let transcript = "x".repeat(10_000);
        transformer.transform(&transcript).await.unwrap();

        let prompt = fake.last_prompt.lock().unwrap().clone();
        assert!(prompt.len() < EXTRACTION_PROMPT.len() + 200);
        assert!(prompt.starts_with(EXTRACTION_PROMPT));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "héllo wörld".repeat(50);
        let out = truncate_chars(&text, 7);
        assert_eq!(out.chars().count(), 7);
        // Must still be valid UTF-8 slicing (would panic otherwise)
        assert_eq!(out, "héllo w");
    }

    #[test]
    fn strip_fence_variants() {
        assert_eq!(strip_code_fence("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        // Unterminated fence still yields the content
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }
}
