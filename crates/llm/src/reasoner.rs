//! Date reasoning: natural-language time phrase to a closed date interval.
//!
//! Trivial phrases ("tomorrow", "this week") are resolved in code; anything
//! else goes to the small model with a two-attempt JSON protocol and a
//! documented default of the next seven days.

use std::sync::Arc;

use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};

use call_assistant_core::DateInterval;

use crate::chat::{Chat, ChatSession};
use crate::LlmError;

/// Whether the caller wants to cancel a shift or only look at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftIntent {
    Cancel,
    View,
    Unknown,
}

impl ShiftIntent {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "cancel" => ShiftIntent::Cancel,
            "view" => ShiftIntent::View,
            _ => ShiftIntent::Unknown,
        }
    }
}

/// Outcome of one reasoning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonedDates {
    pub is_shift_query: bool,
    pub intent: ShiftIntent,
    pub interval: DateInterval,
    pub rationale: String,
}

const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a shift scheduling assistant. Your job is to interpret shift queries and determine what dates the user is interested in.

TASK: Given a user's request about their shifts, output ONLY a JSON object (no other text) with these fields:
{
    "is_shift_query": true/false,
    "intent": "cancel" if the user wants to cancel a shift, "view" if they only want to know about it,
    "start_date": "YYYY-MM-DD",
    "end_date": "YYYY-MM-DD",
    "rationale": "brief explanation"
}

DATE INTERPRETATION RULES:
- "When is my shift?" or "What shifts do I have?" -> today plus the next 7 days
- "Tomorrow" -> the day after today
- "Next week" -> next Monday through next Sunday
- "This week" -> from today until {this_sunday}
- Specific date mentioned -> that date only
- Default (no date mentioned) -> today plus the next 7 days

IMPORTANT: Always use today's date as reference. Output ONLY the JSON object, no explanation.
This Sunday is: {this_sunday}

Today's date: {today} ({day_of_week})
"#;

/// Converts a caller's time expression into a concrete `[start, end]`.
///
/// Owns its own chat session; its history is never shared with the
/// conversation model.
pub struct DateReasoner {
    session: ChatSession,
    today: NaiveDate,
    coming_sunday: NaiveDate,
}

impl DateReasoner {
    /// `today` anchors all relative phrases; `None` uses the local clock.
    /// Two reasoners given the same `today` produce identical outputs.
    pub fn new(client: Arc<dyn Chat>, today: Option<NaiveDate>) -> Self {
        let today = today.unwrap_or_else(|| Local::now().date_naive());
        let coming_sunday = coming_sunday(today);

        let system_prompt = SYSTEM_PROMPT_TEMPLATE
            .replace("{today}", &today.format("%Y-%m-%d").to_string())
            .replace("{day_of_week}", &today.format("%A").to_string())
            .replace("{this_sunday}", &coming_sunday.format("%Y-%m-%d").to_string());

        tracing::debug!(%today, %coming_sunday, "date reasoner anchored");

        Self {
            session: ChatSession::new(client, system_prompt),
            today,
            coming_sunday,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Reason a date interval out of the utterance.
    ///
    /// Never fails: after the fast path and two model attempts the
    /// documented default of `[today, today + 7]` is returned.
    pub async fn reason(&mut self, utterance: &str) -> ReasonedDates {
        if let Some(fast) = self.fast_path(utterance) {
            tracing::info!(interval = %fast.interval, "date resolved without the model");
            return fast;
        }

        for attempt in 1..=2 {
            match self.session.ask(utterance).await {
                Ok(reply) => match parse_reasoned(&reply) {
                    Ok(reasoned) => {
                        tracing::info!(attempt, interval = %reasoned.interval, "dates reasoned");
                        // Fresh history for the next call; one caller's
                        // phrasing must not color another reasoning pass.
                        self.session.clear();
                        return reasoned;
                    }
                    Err(e) => {
                        tracing::warn!(attempt, "reasoner reply rejected: {e}");
                        self.session.clear();
                    }
                },
                Err(e) => {
                    tracing::warn!(attempt, "reasoner call failed: {e}");
                    self.session.clear();
                }
            }
        }

        tracing::warn!("date reasoning failed twice, using default interval");
        self.default_dates()
    }

    /// Resolve bare keyword phrases without a model call.
    ///
    /// Matches whole utterances only; a keyword embedded in a sentence
    /// still goes to the model so the cancel/view intent is not lost.
    fn fast_path(&self, utterance: &str) -> Option<ReasonedDates> {
        let query = utterance.trim().to_lowercase();

        let interval = match query.as_str() {
            "today" | "tonight" => DateInterval::single(self.today),
            "tomorrow" | "tmr" | "tmrw" => DateInterval::single(self.today + Duration::days(1)),
            "yesterday" => DateInterval::single(self.today - Duration::days(1)),
            "this week" | "week" => DateInterval::new(self.today, self.coming_sunday).ok()?,
            "next week" => {
                let wd = i64::from(self.today.weekday().num_days_from_monday());
                let next_monday = self.today + Duration::days(7 - wd);
                DateInterval::new(next_monday, next_monday + Duration::days(6)).ok()?
            }
            _ => DateInterval::single(self.next_weekday(query.strip_prefix("next ").unwrap_or(&query))?),
        };

        Some(ReasonedDates {
            is_shift_query: true,
            intent: ShiftIntent::Unknown,
            interval,
            rationale: "resolved without the model".to_string(),
        })
    }

    /// Next occurrence of a bare weekday name, never today.
    fn next_weekday(&self, name: &str) -> Option<NaiveDate> {
        let target = match name {
            "monday" | "mon" => Weekday::Mon,
            "tuesday" | "tue" | "tues" => Weekday::Tue,
            "wednesday" | "wed" => Weekday::Wed,
            "thursday" | "thu" | "thur" | "thurs" => Weekday::Thu,
            "friday" | "fri" => Weekday::Fri,
            "saturday" | "sat" => Weekday::Sat,
            "sunday" | "sun" => Weekday::Sun,
            _ => return None,
        };

        let current = i64::from(self.today.weekday().num_days_from_monday());
        let wanted = i64::from(target.num_days_from_monday());
        let mut ahead = wanted - current;
        if ahead <= 0 {
            ahead += 7;
        }
        Some(self.today + Duration::days(ahead))
    }

    fn default_dates(&self) -> ReasonedDates {
        let interval = DateInterval::new(self.today, self.today + Duration::days(7))
            .unwrap_or_else(|_| DateInterval::single(self.today));
        ReasonedDates {
            is_shift_query: false,
            intent: ShiftIntent::Unknown,
            interval,
            rationale: "default".to_string(),
        }
    }
}

/// Date of the Sunday closing the current week (today, if today is Sunday).
fn coming_sunday(today: NaiveDate) -> NaiveDate {
    let wd = i64::from(today.weekday().num_days_from_monday());
    today + Duration::days(6 - wd)
}

/// First balanced `{...}` substring of a model reply.
fn extract_json(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in reply[start..].char_indices() {
        if in_string {
            match ch {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            if ch != '\\' {
                escaped = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&reply[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_reasoned(reply: &str) -> Result<ReasonedDates, LlmError> {
    let json = extract_json(reply)
        .ok_or_else(|| LlmError::InvalidResponse("no JSON object in reply".to_string()))?;

    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| LlmError::InvalidResponse(format!("unparseable JSON: {e}")))?;

    let is_shift_query = value
        .get("is_shift_query")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| LlmError::InvalidResponse("missing is_shift_query".to_string()))?;

    let start = required_date(&value, "start_date")?;
    let end = required_date(&value, "end_date")?;
    let interval = DateInterval::new(start, end)
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    let intent = value
        .get("intent")
        .and_then(|v| v.as_str())
        .map(ShiftIntent::parse)
        .unwrap_or(ShiftIntent::Unknown);

    let rationale = value
        .get("rationale")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(ReasonedDates {
        is_shift_query,
        intent,
        interval,
        rationale,
    })
}

fn required_date(value: &serde_json::Value, field: &str) -> Result<NaiveDate, LlmError> {
    let raw = value
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| LlmError::InvalidResponse(format!("missing {field}")))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| LlmError::InvalidResponse(format!("{field} is not YYYY-MM-DD: {raw}")))
}
