//! Request analyzer: bilingual (Thai/English) intent detection.
//!
//! Keyword detection runs a single Aho-Corasick automaton over the lowercased
//! request.  Each keyword carries a set of signal bits, so one overlapping
//! scan answers every question at once.  Times and addresses are pulled out
//! with regular expressions against the original text.

use aho_corasick::AhoCorasick;
use regex::Regex;
use serde::Serialize;

use crate::error::{Result, WorkflowError};

// ---------------------------------------------------------------------------
// Lexicon
// ---------------------------------------------------------------------------

const MEETING: u8 = 1 << 0;
const EMAIL: u8 = 1 << 1;
const POST: u8 = 1 << 2;
const TRIGGER: u8 = 1 << 3;

/// Lowercase keywords and the signals they raise.
const KEYWORDS: &[(&str, u8)] = &[
    ("ประชุม", MEETING | TRIGGER),
    ("meeting", MEETING | TRIGGER),
    ("นัดหมาย", MEETING | TRIGGER),
    ("appointment", MEETING | TRIGGER),
    ("email", EMAIL | TRIGGER),
    ("ส่ง", EMAIL | TRIGGER),
    ("แจ้ง", EMAIL | TRIGGER),
    ("โพส", POST | TRIGGER),
    ("post", POST | TRIGGER),
    ("team", POST | TRIGGER),
    ("แชร์", POST),
    ("share", POST),
    ("send", TRIGGER),
    ("notify", TRIGGER),
    ("reminder", TRIGGER),
    ("เตือน", TRIGGER),
    ("schedule", TRIGGER),
    ("กำหนด", TRIGGER),
];

const MEETING_TIME_PATTERN: &str = r"(?i)([0-9]{1,2})\s*(?:โมง|:00|am|pm)";
const ADDRESS_PATTERN: &str = r"[A-Za-z0-9_.\-]+@[A-Za-z0-9_.\-]+\.[A-Za-z0-9_]+";
const AFTERNOON_PATTERN: &str = r"(?i)บ่าย|afternoon|[0-9]{1,2}\s*โมงเย็น";

/// Meeting time used when none is stated.
pub const DEFAULT_MEETING_TIME: &str = "09:00";
/// Post time used when an afternoon marker is present.
pub const AFTERNOON_POST_TIME: &str = "13:00";
/// The only supported posting platform.
pub const POST_PLATFORM: &str = "Microsoft Teams";
/// Email subject used when no meeting is involved.
pub const DEFAULT_EMAIL_SUBJECT: &str = "แจ้งเตือนจากระบบ";

// ---------------------------------------------------------------------------
// Analysis result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingDetails {
    /// `"{h}:00"`.
    pub time: String,
    pub title: String,
    pub description: String,
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDetails {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetails {
    pub platform: String,
    pub message: String,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
}

/// What a request asks for.  A `None` field means the intent was not found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub meeting: Option<MeetingDetails>,
    pub email: Option<EmailDetails>,
    pub post: Option<PostDetails>,
}

impl AnalysisResult {
    pub fn has_meeting(&self) -> bool {
        self.meeting.is_some()
    }

    pub fn has_email(&self) -> bool {
        self.email.is_some()
    }

    pub fn has_post(&self) -> bool {
        self.post.is_some()
    }

    /// No intent was detected.
    pub fn is_empty(&self) -> bool {
        !self.has_meeting() && !self.has_email() && !self.has_post()
    }

    /// Labels of the detected components, in planning order.
    pub fn components(&self) -> Vec<&'static str> {
        let mut parts = Vec::new();
        if self.has_meeting() {
            parts.push("การประชุม");
        }
        if self.has_email() {
            parts.push("Email");
        }
        if self.has_post() {
            parts.push("Team Post");
        }
        parts
    }
}

// ---------------------------------------------------------------------------
// RequestAnalyzer
// ---------------------------------------------------------------------------

/// Compiled keyword automaton and extraction patterns.
///
/// Construction compiles everything once; analysis itself cannot fail.
#[derive(Debug, Clone)]
pub struct RequestAnalyzer {
    keywords: AhoCorasick,
    meeting_time: Regex,
    address: Regex,
    afternoon: Regex,
}

impl RequestAnalyzer {
    pub fn new() -> Result<Self> {
        let phrases: Vec<&str> = KEYWORDS.iter().map(|(phrase, _)| *phrase).collect();
        let keywords = AhoCorasick::new(&phrases).map_err(|e| {
            tracing::error!(error = %e, "failed to build aho-corasick automaton");
            WorkflowError::InvalidPattern {
                pattern: "keyword lexicon".into(),
                reason: e.to_string(),
            }
        })?;

        tracing::trace!(count = phrases.len(), "request analyzer compiled");

        Ok(Self {
            keywords,
            meeting_time: compile(MEETING_TIME_PATTERN)?,
            address: compile(ADDRESS_PATTERN)?,
            afternoon: compile(AFTERNOON_PATTERN)?,
        })
    }

    /// Detect meeting, email and post intents in `text`.
    pub fn analyze(&self, text: &str) -> AnalysisResult {
        let signals = self.signals(text);
        let addresses: Vec<String> = self
            .address
            .find_iter(text)
            .map(|m| m.as_str().to_owned())
            .collect();

        let has_meeting = signals & MEETING != 0;
        let has_email = signals & EMAIL != 0 || !addresses.is_empty();
        let has_post = signals & POST != 0;

        let meeting = has_meeting.then(|| MeetingDetails {
            time: self.meeting_time(text),
            title: meeting_title(text).to_owned(),
            description: text.to_owned(),
            attendees: addresses.clone(),
        });

        let email = has_email.then(|| EmailDetails {
            subject: if has_meeting {
                format!("การประชุม: {}", meeting_title(text))
            } else {
                DEFAULT_EMAIL_SUBJECT.to_owned()
            },
            body: email_body(text),
            recipients: addresses,
        });

        let post = has_post.then(|| PostDetails {
            platform: POST_PLATFORM.to_owned(),
            message: post_message(text),
            topic: main_topic(text).to_owned(),
            scheduled_time: self
                .afternoon
                .is_match(text)
                .then(|| AFTERNOON_POST_TIME.to_owned()),
        });

        tracing::debug!(
            meeting = has_meeting,
            email = has_email,
            post = has_post,
            "request analyzed"
        );

        AnalysisResult {
            meeting,
            email,
            post,
        }
    }

    /// Whether `text` mentions anything worth planning a workflow for.
    pub fn should_plan(&self, text: &str) -> bool {
        self.signals(text) & TRIGGER != 0
    }

    fn signals(&self, text: &str) -> u8 {
        let lowered = text.to_lowercase();
        self.keywords
            .find_overlapping_iter(&lowered)
            .fold(0, |acc, mat| acc | KEYWORDS[mat.pattern().as_usize()].1)
    }

    fn meeting_time(&self, text: &str) -> String {
        self.meeting_time
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|hour| format!("{}:00", hour.as_str()))
            .unwrap_or_else(|| DEFAULT_MEETING_TIME.to_owned())
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| WorkflowError::InvalidPattern {
        pattern: pattern.to_owned(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Ladders and templates
// ---------------------------------------------------------------------------

fn meeting_title(text: &str) -> &'static str {
    if text.contains("ประชุมทีม") {
        "ประชุมทีม"
    } else if text.contains("ประชุม") {
        "ประชุมงาน"
    } else if text.contains("meeting") {
        "Team Meeting"
    } else {
        "การประชุม"
    }
}

fn main_topic(text: &str) -> &'static str {
    if text.contains("ประชุม") {
        "การประชุม"
    } else if text.contains("โครงการ") {
        "โครงการ"
    } else if text.contains("งาน") {
        "งาน"
    } else {
        "หัวข้อทั่วไป"
    }
}

fn email_body(text: &str) -> String {
    format!(
        "สวัสดีครับ/ค่ะ\n\nขอแจ้งให้ทราบเกี่ยวกับ: {text}\n\n\
         รายละเอียดเพิ่มเติมจะแจ้งให้ทราบอีกครั้ง\n\nขอบคุณครับ/ค่ะ"
    )
}

fn post_message(text: &str) -> String {
    format!("📢 อัพเดท: {text}\n\n#TeamUpdate #Meeting")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
