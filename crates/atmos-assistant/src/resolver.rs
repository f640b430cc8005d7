//! Turns the model's raw answer into spoken text plus a location directive.
//!
//! Expected shape:
//!
//! ```text
//! Response: It's cloudy in London.
//! Location: London
//! ```
//!
//! Either line may be missing; nothing here fails. Labels are matched at the
//! start of a line only.

const RESPONSE_LABEL: &str = "response:";
const LOCATION_LABEL: &str = "location:";
const CURRENT_LOCATION_SENTINEL: &str = "CURRENT_LOCATION";

/// Which place the user asked about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocationDirective {
    /// No place implied; answer from the current context
    #[default]
    None,
    /// The user's own location
    CurrentLocation,
    NamedCity(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceQueryResult {
    pub text: String,
    pub location: LocationDirective,
}

impl VoiceQueryResult {
    pub fn new(text: impl Into<String>, location: LocationDirective) -> Self {
        Self {
            text: text.into(),
            location,
        }
    }

    /// Text-only result with no location
    pub fn text_only(text: impl Into<String>) -> Self {
        Self::new(text, LocationDirective::None)
    }
}

/// Markdown a model may wrap a label in (`**Location:**`, `## Response:`).
fn is_markup(c: char) -> bool {
    matches!(c, '*' | '_' | '#' | '>')
}

/// Lines that open with `label` (ASCII case-insensitive), ignoring
/// indentation and markdown. Yields `(line_start, value_start)` byte offsets.
fn label_lines<'a>(text: &'a str, label: &'a str) -> impl Iterator<Item = (usize, usize)> + 'a {
    text.split_inclusive('\n')
        .scan(0, |offset, line| {
            let start = *offset;
            *offset += line.len();
            Some((start, line))
        })
        .filter_map(move |(start, line)| {
            let body = line.trim_start_matches(|c: char| c.is_whitespace() || is_markup(c));
            let head = body.get(..label.len())?;
            if !head.eq_ignore_ascii_case(label) {
                return None;
            }
            let after = &body[label.len()..];
            let value = after.trim_start_matches(|c: char| c == '*' || c == '_');
            Some((start, start + line.len() - value.len()))
        })
}

fn strip_leading_label<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let trimmed = text.trim_start();
    let head = trimmed.get(..label.len())?;
    head.eq_ignore_ascii_case(label)
        .then(|| &trimmed[label.len()..])
}

/// `location` is the `(line_start, value_start)` of the Location line.
fn extract_text(raw: &str, location: Option<(usize, usize)>) -> String {
    let location_line = location.map(|(line, _)| line);
    let text = match label_lines(raw, RESPONSE_LABEL).next() {
        Some((_, start)) => {
            let end = location_line.filter(|&line| line > start).unwrap_or(raw.len());
            let mut rest = &raw[start..end];
            while let Some(inner) = strip_leading_label(rest, RESPONSE_LABEL) {
                rest = inner;
            }
            rest
        }
        None => &raw[..location_line.unwrap_or(raw.len())],
    };
    text.trim().to_string()
}

fn clean_value(value: &str) -> &str {
    let unwrap = |c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '[' | ']' | '*' | '`');
    value
        .trim_matches(unwrap)
        .trim_end_matches(['.', '!'])
        .trim_matches(unwrap)
}

fn extract_location(raw: &str, location: Option<(usize, usize)>) -> LocationDirective {
    let Some((_, start)) = location else {
        return LocationDirective::None;
    };

    let value = raw[start..]
        .lines()
        .map(clean_value)
        .find(|line| !line.is_empty())
        .unwrap_or("");

    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return LocationDirective::None;
    }

    let normalized: String = value
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();

    if normalized == CURRENT_LOCATION_SENTINEL {
        LocationDirective::CurrentLocation
    } else {
        LocationDirective::NamedCity(value.to_string())
    }
}

/// Parse a raw model answer.
///
/// Labels only count at the start of a line, so "your location: ..." inside
/// the response is just text. The last `Location:` line wins.
pub fn parse_answer(raw: &str) -> VoiceQueryResult {
    let location = label_lines(raw, LOCATION_LABEL).last();
    VoiceQueryResult {
        text: extract_text(raw, location),
        location: extract_location(raw, location),
    }
}
