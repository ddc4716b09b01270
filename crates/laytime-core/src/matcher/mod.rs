//! Pattern matching: normalized lines in, raw [`Candidate`] events out.
//!
//! Families are tried most specific first on every line:
//!
//! 1. dated event lines (`DD Mon YYYY HH:MM - description`),
//! 2. paragraph clauses with an `at|by HH:MM` anchor,
//! 3. keyword rules from the ranked [`RuleTable`].
//!
//! Each accepted match claims its byte span; later families never fire
//! inside a claimed span. A [`CandidateId`] is issued at most once.

pub mod paragraph;
pub mod rules;

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;

use crate::calendar;
use crate::domain::EventType;
use crate::obs;

pub use rules::{KeywordHit, Rule, RuleTable};

/// Which pattern family produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternFamily {
    DatedLine,
    ParagraphDated,
    ParagraphCarried,
    Keyword,
}

impl fmt::Display for PatternFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternFamily::DatedLine => write!(f, "dated_line"),
            PatternFamily::ParagraphDated => write!(f, "paragraph_dated"),
            PatternFamily::ParagraphCarried => write!(f, "paragraph_carried"),
            PatternFamily::Keyword => write!(f, "keyword"),
        }
    }
}

/// Identity of a detection at the matching stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateId {
    pub event_type: EventType,
    pub line_index: usize,
    pub offset: usize,
}

/// A provisional event, before temporal and duration resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: CandidateId,
    pub family: PatternFamily,
    /// Text the type was classified from.
    pub description: String,
    /// Source span kept for traceability and duration re-derivation.
    pub raw_text: String,
    /// Date and time captured together with the event text.
    pub inline: Option<NaiveDateTime>,
}

impl Candidate {
    pub fn event_type(&self) -> EventType {
        self.id.event_type
    }

    pub fn line_index(&self) -> usize {
        self.id.line_index
    }
}

// Header fields name things ("Anchorage: Eastern") without reporting events.
static HEADER_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:vessel|ship|port|berth|anchorage|terminal|cargo|quantity|flag|imo|country|date|master|agent|charterers?|owners?|voyage|load\s+port|discharge\s+port)\b[^:]{0,20}:",
    )
    .expect("valid header field regex")
});

/// Scans normalized lines against the ordered pattern families.
#[derive(Debug, Clone, Copy)]
pub struct PatternMatcher<'r> {
    rules: &'r RuleTable,
}

impl Default for PatternMatcher<'static> {
    fn default() -> Self {
        Self::new(RuleTable::standard())
    }
}

impl<'r> PatternMatcher<'r> {
    pub fn new(rules: &'r RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'r RuleTable {
        self.rules
    }

    /// Produce candidates in line order, most specific family first
    /// within a line.
    pub fn scan<S: AsRef<str>>(&self, lines: &[S], base_date: Option<NaiveDate>) -> Vec<Candidate> {
        let mut seen: HashSet<CandidateId> = HashSet::new();
        let mut out = Vec::new();

        for (line_index, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            let mut claimed: Vec<Range<usize>> = Vec::new();
            let mut push = |candidate: Candidate, out: &mut Vec<Candidate>| {
                if seen.insert(candidate.id) {
                    obs::emit_candidate_matched(
                        candidate.family,
                        candidate.event_type(),
                        candidate.line_index(),
                    );
                    out.push(candidate);
                }
            };

            if let Some(stamp) = calendar::find_dated_stamp(line) {
                if let Some(event_type) = self.rules.classify(&stamp.description) {
                    push(
                        Candidate {
                            id: CandidateId {
                                event_type,
                                line_index,
                                offset: stamp.span.start,
                            },
                            family: PatternFamily::DatedLine,
                            description: stamp.description.clone(),
                            raw_text: line.to_string(),
                            inline: Some(stamp.date.and_time(stamp.time)),
                        },
                        &mut out,
                    );
                }
                claimed.push(stamp.span.clone());
            }

            let carried = paragraph::carried_date(lines, line_index).or(base_date);
            for clause in paragraph::scan_line(self.rules, line, &claimed, carried) {
                let family = if clause.dated_in_sentence {
                    PatternFamily::ParagraphDated
                } else {
                    PatternFamily::ParagraphCarried
                };
                push(
                    Candidate {
                        id: CandidateId {
                            event_type: clause.event_type,
                            line_index,
                            offset: clause.span.start,
                        },
                        family,
                        description: clause.description,
                        raw_text: line[clause.span.clone()].trim().to_string(),
                        inline: Some(clause.stamp),
                    },
                    &mut out,
                );
                claimed.push(clause.span);
            }

            if HEADER_FIELD.is_match(line) {
                continue;
            }
            for hit in self.rules.keyword_hits(line, &mut claimed) {
                push(
                    Candidate {
                        id: CandidateId {
                            event_type: hit.event_type,
                            line_index,
                            offset: hit.span.start,
                        },
                        family: PatternFamily::Keyword,
                        description: line.to_string(),
                        raw_text: line.to_string(),
                        inline: None,
                    },
                    &mut out,
                );
            }
        }
        out
    }
}
