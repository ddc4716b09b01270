//! Ranked, data-driven rule table mapping event signatures to types.
//!
//! Rules are evaluated strictly in rank order. The ordering encodes the
//! tie-break policy:
//!
//! - completion terms outrank start terms,
//! - discharge and loading wording outranks generic cargo mentions,
//! - unberthing outranks berthing and departure (`departed berth`),
//! - departure outranks arrival, which outranks anchoring.
//!
//! A type may appear under more than one rank when its generic and
//! specific signatures need different priorities.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use crate::domain::EventType;

/// Declarative rule source: rank, type, ordered patterns.
const RULE_SPECS: &[(u8, EventType, &[&str])] = &[
    (
        1,
        EventType::CompletedDischarge,
        &[
            r"\bcompleted\s+(?:cargo\s+)?discharg(?:e|ing)\b",
            r"\bdischarg(?:e|ing)\s+(?:was\s+|operations?\s+)?(?:completed|finished)\b",
            r"\bfinished\s+discharg(?:e|ing)\b",
        ],
    ),
    (
        2,
        EventType::CompletedLoading,
        &[
            r"\bcompleted\s+(?:cargo\s+)?loading\b",
            r"\bloading\s+(?:was\s+|operations?\s+)?(?:completed|finished)\b",
            r"\bfinished\s+loading\b",
        ],
    ),
    (
        3,
        EventType::CompletedLoading,
        &[
            r"\bcargo\s+operations?\s+(?:were\s+|was\s+)?(?:completed|finished)\b",
            r"\bcompleted\s+cargo\s+operations?\b",
        ],
    ),
    (
        4,
        EventType::HosesDisconnected,
        &[
            r"\bhoses?\s+(?:were\s+|was\s+)?disconnected\b",
            r"\bdisconnected\s+(?:the\s+)?hoses?\b",
            r"\barms?\s+(?:were\s+|was\s+)?disconnected\b",
        ],
    ),
    (
        5,
        EventType::HosesConnected,
        &[
            r"\bhoses?\s+(?:were\s+|was\s+)?connected\b",
            r"\bconnected\s+(?:the\s+)?hoses?\b",
            r"\bhose\s+connection\b",
            r"\barms?\s+(?:were\s+|was\s+)?connected\b",
        ],
    ),
    (
        6,
        EventType::NorTendered,
        &[
            r"\bnotice\s+of\s+readiness\b",
            r"\bnor\s+(?:was\s+)?(?:tendered|accepted|re-?tendered|received)\b",
            r"\btendered\s+(?:the\s+)?nor\b",
        ],
    ),
    (
        7,
        EventType::PilotBoarded,
        &[
            r"\bpilot\s+(?:was\s+)?(?:boarded|on\s+board|embarked)\b",
            r"\bpob\b",
        ],
    ),
    (
        8,
        EventType::TugsMadeFast,
        &[
            r"\btugs?\s+(?:were\s+|was\s+)?(?:made\s+fast|fast|secured)\b",
            r"\btug\s+assistance\b",
        ],
    ),
    (
        9,
        EventType::Unberthed,
        &[
            r"\bunberth(?:ed|ing)?\b",
            r"\b(?:left|departed|departing)\s+(?:the\s+)?berth\b",
            r"\bcast\s+off\b",
            r"\blast\s+line\b",
            r"\bunmoor(?:ed|ing)\b",
        ],
    ),
    (
        10,
        EventType::CargoDischarge,
        &[
            r"\b(?:commenced|start(?:ed)?|began|begin(?:ning)?|resumed)\s+(?:cargo\s+)?discharg(?:e|ing)\b",
            r"\bdischarg(?:e|ing)\s+(?:commenced|started|resumed|operations?|cargo)\b",
            r"\bcargo\s+discharg(?:e|ing)\b",
            r"\bdischarg(?:e|ing)\s+of\s+cargo\b",
        ],
    ),
    (
        11,
        EventType::CargoLoading,
        &[
            r"\b(?:commenced|start(?:ed)?|began|begin(?:ning)?|resumed)\s+loading\b",
            r"\bloading\s+(?:commenced|started|resumed|operations?|cargo)\b",
            r"\bcargo\s+loading\b",
            r"\bload(?:ing)?\s+(?:of\s+)?cargo\b",
        ],
    ),
    (
        12,
        EventType::CargoLoading,
        &[
            r"\b(?:commenced|started|began)\s+cargo(?:\s+operations?)?\b",
            r"\bcargo\s+operations?\s+(?:commenced|started|began|resumed)\b",
        ],
    ),
    (
        13,
        EventType::Survey,
        &[
            r"\b(?:draught|draft)\s+survey\b",
            r"\bsurvey(?:or)?s?\b",
            r"\b(?:tank|hold)s?\s+inspection\b",
            r"\bullag(?:e|ing)\b",
            r"\bsampling\b",
        ],
    ),
    (
        14,
        EventType::Shifting,
        &[
            r"\bshift(?:ed|ing)\b",
            r"\bmov(?:ed|ing|e)\s+to\b",
            r"\bproceed(?:ed|ing|s)?\s+to\b",
        ],
    ),
    (
        15,
        EventType::Berthed,
        &[
            r"\bberth(?:ed|ing)\b",
            r"\balongside\b",
            r"\ball\s+fast\b",
            r"\bmade\s+fast\b",
            r"\bfirst\s+line\b",
            r"\bmoored\b",
            r"\bsecured\s+(?:to|at)\s+(?:the\s+)?berth\b",
        ],
    ),
    (
        16,
        EventType::Departed,
        &[
            r"\bdepart(?:ed|ure)\b",
            r"\bleft\s+(?:the\s+)?(?:port|terminal)\b",
            r"\bsailed\b",
            r"\bcleared\s+(?:the\s+)?port\b",
        ],
    ),
    (
        17,
        EventType::Arrived,
        &[
            r"\barriv(?:ed|al|ing)\b",
            r"\beosp\b",
            r"\bend\s+of\s+sea\s+passage\b",
            r"\bentered\s+(?:the\s+)?port\b",
            r"\breached\b",
        ],
    ),
    (
        18,
        EventType::Anchored,
        &[
            r"\banchor(?:ed|ing|age)\b",
            r"\bdrop(?:ped)?\s+anchor\b",
            r"\blet\s+go\s+anchor\b",
            r"\bat\s+anchor\b",
        ],
    ),
];

/// One ranked rule: the first matching pattern decides.
#[derive(Debug)]
pub struct Rule {
    pub rank: u8,
    pub event_type: EventType,
    patterns: Vec<Regex>,
}

impl Rule {
    /// Span of the first pattern (in declared order) that matches
    /// outside every `claimed` span.
    fn first_unclaimed(&self, text: &str, claimed: &[Range<usize>]) -> Option<Range<usize>> {
        self.patterns.iter().find_map(|re| {
            re.find_iter(text)
                .map(|m| m.range())
                .find(|span| !overlaps_any(span, claimed))
        })
    }
}

/// A keyword rule hit on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordHit {
    pub event_type: EventType,
    pub rank: u8,
    pub span: Range<usize>,
}

/// The ordered rule set.
#[derive(Debug)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

static STANDARD: Lazy<RuleTable> = Lazy::new(RuleTable::compile);

impl RuleTable {
    /// Shared instance built from the declarative rule source.
    pub fn standard() -> &'static RuleTable {
        &STANDARD
    }

    fn compile() -> Self {
        let mut rules: Vec<Rule> = RULE_SPECS
            .iter()
            .map(|(rank, event_type, patterns)| Rule {
                rank: *rank,
                event_type: *event_type,
                patterns: patterns
                    .iter()
                    .map(|p| Regex::new(&format!("(?i){p}")).expect("valid event rule regex"))
                    .collect(),
            })
            .collect();
        rules.sort_by_key(|r| r.rank);
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classify a free-text description. Highest-ranked matching rule wins.
    pub fn classify(&self, description: &str) -> Option<EventType> {
        self.rules
            .iter()
            .find(|rule| rule.first_unclaimed(description, &[]).is_some())
            .map(|rule| rule.event_type)
    }

    /// Every rule that fires on `line` outside `claimed`, at most one hit
    /// per rule. Each hit claims its span, so a lower-ranked rule whose
    /// wording is part of a higher-ranked match (`departed berth`,
    /// `tugs made fast`) does not fire again.
    pub fn keyword_hits(&self, line: &str, claimed: &mut Vec<Range<usize>>) -> Vec<KeywordHit> {
        let mut hits = Vec::new();
        for rule in &self.rules {
            if hits.iter().any(|h: &KeywordHit| h.event_type == rule.event_type) {
                continue;
            }
            if let Some(span) = rule.first_unclaimed(line, claimed) {
                claimed.push(span.clone());
                hits.push(KeywordHit {
                    event_type: rule.event_type,
                    rank: rule.rank,
                    span,
                });
            }
        }
        hits
    }
}

pub(crate) fn overlaps_any(span: &Range<usize>, claimed: &[Range<usize>]) -> bool {
    claimed
        .iter()
        .any(|c| span.start < c.end && c.start < span.end)
}
