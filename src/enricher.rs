use std::sync::OnceLock;
use std::time::Duration;

use log::{debug, info, warn};
use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::{is_known_category, CATEGORIES};
use crate::error::{EnrichError, ReplyFormatError, Result};
use crate::extractor::ProjectRecord;

const PRIMARY_LABEL: &str = "Primary Category";
const SECONDARY_LABEL: &str = "Secondary Category";
const SUMMARY_LABEL: &str = "Summary";
const LABELS: [&str; 3] = [PRIMARY_LABEL, SECONDARY_LABEL, SUMMARY_LABEL];

// The label itself, not a passing mention: optional bold markup, then a colon.
fn primary_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\**\s*primary category\s*\**\s*:").unwrap())
}

/// The three values parsed out of a completion reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    pub primary_category: String,
    pub secondary_category: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedRecord {
    pub project: ProjectRecord,
    pub primary_category: String,
    pub secondary_category: String,
    pub summary: String,
}

impl EnrichedRecord {
    pub fn new(project: ProjectRecord, enrichment: Enrichment) -> Self {
        EnrichedRecord {
            project,
            primary_category: enrichment.primary_category,
            secondary_category: enrichment.secondary_category,
            summary: enrichment.summary,
        }
    }
}

/// A text-completion backend: one prompt in, one reply out.
pub trait CompletionService {
    fn complete(&self, prompt: &str) -> std::result::Result<String, EnrichError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> std::result::Result<String, EnrichError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(EnrichError::EmptyReply)
    }
}

/// Blocking client for an OpenAI-compatible `chat/completions` endpoint.
pub struct ChatCompletionClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionClient {
    pub fn new(api_url: &str, api_key: String, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(ChatCompletionClient {
            client,
            api_url: api_url.to_string(),
            api_key,
            model: model.to_string(),
        })
    }
}

impl CompletionService for ChatCompletionClient {
    fn complete(&self, prompt: &str) -> std::result::Result<String, EnrichError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
        };

        let resp = self.client.post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(EnrichError::Status { status: status.as_u16(), body });
        }

        resp.json::<ChatResponse>()?.into_text()
    }
}

/// Builds the categorization prompt for one record.
pub fn build_prompt(record: &ProjectRecord) -> String {
    let categories = CATEGORIES.join("\n");
    format!(
        "Write a concise, informative summary of the project below and assign it a primary \
and a secondary category. Do not mention word limits or repeat these instructions.

Title: {title}
Description: {description}

Pick both categories ONLY from this list, without inventing new ones or using the same one twice. \
The primary category is the most relevant, the secondary category the next most relevant.

Categories:
{categories}

Example of a correctly formatted reply:
{primary}: FinTech (Financial Technology) @ {secondary}: Blockchain/Web3 @ {summary}: SuperPay is a payments \
platform for recurring cryptocurrency transfers built on blockchain settlement.

Reply with exactly one line in this format:
{primary}: <primary_category> @ {secondary}: <secondary_category> @ {summary}: <summary>",
        title = record.title,
        description = record.description,
        categories = categories,
        primary = PRIMARY_LABEL,
        secondary = SECONDARY_LABEL,
        summary = SUMMARY_LABEL,
    )
}

/// Parse `Primary Category: X @ Secondary Category: Y @ Summary: Z`.
///
/// Text before the first `Primary Category` label is ignored. The reply is
/// split into at most three segments, so an `@` inside the summary is kept.
/// Each value is everything after the segment's first `:`, trimmed.
pub fn parse_reply(reply: &str) -> std::result::Result<Enrichment, ReplyFormatError> {
    let start = primary_label_re()
        .find(reply)
        .map(|m| m.start())
        .ok_or(ReplyFormatError::MissingLabel(PRIMARY_LABEL))?;

    let segments: Vec<&str> = reply[start..].trim().splitn(3, '@').collect();
    if segments.len() != LABELS.len() {
        return Err(ReplyFormatError::SegmentCount(segments.len()));
    }

    let mut values = Vec::with_capacity(LABELS.len());
    for (index, (segment, expected)) in segments.iter().zip(LABELS).enumerate() {
        let (label, value) = segment
            .split_once(':')
            .ok_or(ReplyFormatError::MissingColon { index })?;

        let label = strip_markup(label);
        if !label.eq_ignore_ascii_case(expected) {
            return Err(ReplyFormatError::UnexpectedLabel {
                index,
                expected,
                found: label.to_string(),
            });
        }

        let value = strip_markup(value);
        if value.is_empty() {
            return Err(ReplyFormatError::EmptyValue(expected));
        }
        values.push(value.to_string());
    }

    let summary = values.pop().unwrap_or_default();
    let secondary_category = values.pop().unwrap_or_default();
    let primary_category = values.pop().unwrap_or_default();
    Ok(Enrichment { primary_category, secondary_category, summary })
}

// Models sometimes bold the labels: "**Summary:** ...".
fn strip_markup(s: &str) -> &str {
    s.trim().trim_matches('*').trim()
}

pub struct Enricher<'a> {
    service: &'a dyn CompletionService,
}

impl<'a> Enricher<'a> {
    pub fn new(service: &'a dyn CompletionService) -> Self {
        Enricher { service }
    }

    /// One request, no retry. The vocabulary is not enforced, only reported.
    pub fn enrich(&self, record: ProjectRecord) -> std::result::Result<EnrichedRecord, EnrichError> {
        let prompt = build_prompt(&record);
        let reply = self.service.complete(&prompt)?;
        debug!("Completion reply for {}: {}", record.source_url, reply);

        let enrichment = parse_reply(&reply)?;
        for category in [&enrichment.primary_category, &enrichment.secondary_category] {
            if !is_known_category(category) {
                warn!("Category '{}' for {} is outside the vocabulary", category, record.source_url);
            }
        }
        info!(
            "Categorized '{}' as {} / {}",
            record.title, enrichment.primary_category, enrichment.secondary_category
        );

        Ok(EnrichedRecord::new(record, enrichment))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::ScriptedService;

    fn record() -> ProjectRecord {
        ProjectRecord {
            title: "Alpha Bot".into(),
            description: "A chat assistant for hackers.".into(),
            technologies: vec!["rust".into()],
            winner_label: "No Award".into(),
            image_url: "No Image".into(),
            source_url: "https://devpost.com/software/alpha".into(),
        }
    }

    #[test]
    fn parses_well_formed_reply_verbatim() {
        let reply = "Primary Category: AI/Artificial Intelligence @ Secondary Category: Chatbots @ Summary: A chat assistant.";
        assert_eq!(
            parse_reply(reply).unwrap(),
            Enrichment {
                primary_category: "AI/Artificial Intelligence".into(),
                secondary_category: "Chatbots".into(),
                summary: "A chat assistant.".into(),
            }
        );
    }

    #[test]
    fn tolerates_preamble_markup_and_separators_in_summary() {
        let reply = "Sure! Here you go:\n**Primary Category:** Web Apps @ **Secondary Category:** Social Impact @ \
**Summary:** Connects volunteers: email help@example.org any time.\n";
        let parsed = parse_reply(reply).unwrap();
        assert_eq!(parsed.primary_category, "Web Apps");
        assert_eq!(parsed.secondary_category, "Social Impact");
        assert_eq!(parsed.summary, "Connects volunteers: email help@example.org any time.");
    }

    #[test]
    fn preamble_mentioning_the_labels_is_skipped() {
        let reply = "Here is the primary category, secondary category and summary:\n\
Primary Category: Web Apps @ Secondary Category: Chatbots @ Summary: Helps.";
        assert_eq!(
            parse_reply(reply).unwrap(),
            Enrichment {
                primary_category: "Web Apps".into(),
                secondary_category: "Chatbots".into(),
                summary: "Helps.".into(),
            }
        );
        assert_eq!(
            parse_reply("The primary category is Web Apps."),
            Err(ReplyFormatError::MissingLabel(PRIMARY_LABEL))
        );
    }

    #[test]
    fn rejects_malformed_replies() {
        assert_eq!(
            parse_reply("I cannot categorize this."),
            Err(ReplyFormatError::MissingLabel(PRIMARY_LABEL))
        );
        assert_eq!(
            parse_reply("Primary Category: Web Apps @ Summary only"),
            Err(ReplyFormatError::SegmentCount(2))
        );
        assert_eq!(
            parse_reply("Primary Category: Web Apps @ Secondary Category Chatbots @ Summary: x"),
            Err(ReplyFormatError::MissingColon { index: 1 })
        );
        assert_eq!(
            parse_reply("Primary Category: Web Apps @ Tags: Chatbots @ Summary: x"),
            Err(ReplyFormatError::UnexpectedLabel {
                index: 1,
                expected: SECONDARY_LABEL,
                found: "Tags".into(),
            })
        );
        assert_eq!(
            parse_reply("Primary Category: Web Apps @ Secondary Category: Chatbots @ Summary:   "),
            Err(ReplyFormatError::EmptyValue(SUMMARY_LABEL))
        );
    }

    #[test]
    fn prompt_carries_record_and_full_vocabulary() {
        let prompt = build_prompt(&record());
        assert!(prompt.contains("Title: Alpha Bot"));
        assert!(prompt.contains("Description: A chat assistant for hackers."));
        assert!(CATEGORIES.iter().all(|c| prompt.contains(c)));
        assert!(prompt.contains("Primary Category: <primary_category> @ Secondary Category: <secondary_category> @ Summary: <summary>"));
    }

    #[test]
    fn enrich_sends_one_request_and_merges_fields() {
        let service = ScriptedService::default()
            .reply("Primary Category: AI/Artificial Intelligence @ Secondary Category: Chatbots @ Summary: A chat assistant.");
        let enriched = Enricher::new(&service).enrich(record()).unwrap();

        assert_eq!(service.prompts.borrow().len(), 1);
        assert_eq!(enriched.project, record());
        assert_eq!(enriched.primary_category, "AI/Artificial Intelligence");
        assert_eq!(enriched.secondary_category, "Chatbots");
        assert_eq!(enriched.summary, "A chat assistant.");
    }

    #[test]
    fn enrich_accepts_categories_outside_vocabulary() {
        let service = ScriptedService::default()
            .reply("Primary Category: Space Tech @ Secondary Category: Chatbots @ Summary: Rockets.");
        let enriched = Enricher::new(&service).enrich(record()).unwrap();
        assert_eq!(enriched.primary_category, "Space Tech");
    }

    #[test]
    fn enrich_surfaces_service_and_format_errors() {
        let service = ScriptedService::default()
            .fail(EnrichError::Status { status: 429, body: "slow down".into() })
            .reply("garbage");
        let enricher = Enricher::new(&service);

        assert!(matches!(enricher.enrich(record()), Err(EnrichError::Status { status: 429, .. })));
        assert!(matches!(
            enricher.enrich(record()),
            Err(EnrichError::Format(ReplyFormatError::MissingLabel(_)))
        ));
    }

    #[test]
    fn chat_response_text_is_first_choice() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  hello  "}}]}"#,
        )
        .unwrap();
        assert_eq!(resp.into_text().unwrap(), "hello");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(empty.into_text(), Err(EnrichError::EmptyReply)));

        let null: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(null.into_text(), Err(EnrichError::EmptyReply)));
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(ChatRequest {
            model: "llama-3.3-70b-versatile",
            messages: [ChatMessage { role: "user", content: "hi" }],
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "llama-3.3-70b-versatile",
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }
}
