//! Text clean-up applied before pattern matching.
//!
//! Pure `&str -> String`. Lines are trimmed and whitespace-collapsed,
//! empty lines are dropped, letter/digit look-alikes inside numerals are
//! repaired, and time, date and unit spellings are brought to the forms
//! the matcher expects (`14:30`, `10/01/2024`, `hours`).

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// `1430 hrs`. Group 1 catches a leading duration word, as in
/// `for 1000 hours`, which is left alone.
static MILITARY_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\b(?:for|lasting|after|within|took|over)\s+)?\b([01]\d|2[0-3])([0-5]\d)\s*(?:hrs|hr|hours|lt)\b",
    )
    .expect("valid military time regex")
});

static H_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([01]?\d|2[0-3])h([0-5]\d)\b").expect("valid h-separated time regex")
});

static TIME_DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}:\d{2})\s*-\s*").expect("valid time dash regex"));

static DOTTED_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4}|\d{2})\b").expect("valid dotted date regex")
});

static DASHED_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})-(\d{1,2})-(\d{4}|\d{2})\b").expect("valid dashed date regex")
});

static DASHED_NAMED_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})-([A-Za-z]{3,9})-(\d{4}|\d{2})\b").expect("valid dashed named date regex")
});

/// Unit and shorthand spellings, applied in order.
static ABBREVIATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\bhrs?\b", "hours"),
        (r"(?i)\bmins?\b", "minutes"),
        (r"(?i)\bsecs?\b", "seconds"),
        (r"(?i)\bvsl\b", "vessel"),
        (r"(?i)\bdisch\b", "discharge"),
        (r"(?i)\bm/v\b", "MV"),
        (r"(?i)\bmts\b", "MT"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("valid abbreviation regex"),
            replacement,
        )
    })
    .collect()
});

/// Normalize SoF text for matching.
pub fn normalize(text: &str) -> String {
    text.lines()
        .filter_map(normalize_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_line(line: &str) -> Option<String> {
    let line: String = line
        .chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{00a0}' | '\t' => ' ',
            other => other,
        })
        .collect();

    let collapsed = line
        .split_whitespace()
        .map(repair_numeral)
        .collect::<Vec<_>>()
        .join(" ");
    if collapsed.is_empty() {
        return None;
    }

    let mut out = MILITARY_TIME
        .replace_all(&collapsed, |caps: &Captures| match caps.get(1) {
            Some(_) => caps[0].to_string(),
            None => format!("{}:{}", &caps[2], &caps[3]),
        })
        .into_owned();
    out = H_TIME
        .replace_all(&out, |caps: &Captures| format!("{:0>2}:{}", &caps[1], &caps[2]))
        .into_owned();
    out = TIME_DASH.replace_all(&out, "$1 - ").into_owned();
    out = DOTTED_DATE.replace_all(&out, "$1/$2/$3").into_owned();
    out = DASHED_DATE.replace_all(&out, "$1/$2/$3").into_owned();
    out = DASHED_NAMED_DATE.replace_all(&out, "$1 $2 $3").into_owned();
    for (re, replacement) in ABBREVIATIONS.iter() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    Some(out.trim().to_string())
}

/// Repair OCR look-alikes (`O`/`o` for 0, `l`/`I`/`|` for 1) inside a
/// token that is otherwise a numeral such as `1O:3O` or `l4/0l/2024`.
fn repair_numeral(token: &str) -> String {
    let numeric_shape = token
        .chars()
        .all(|c| c.is_ascii_digit() || "OoIl|:/.,-".contains(c));
    if !numeric_shape || !token.chars().any(|c| c.is_ascii_digit()) {
        return token.to_string();
    }
    token
        .chars()
        .map(|c| match c {
            'O' | 'o' => '0',
            'I' | 'l' | '|' => '1',
            other => other,
        })
        .collect()
}
