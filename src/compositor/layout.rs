//! Text-layout helpers for the overlay layers.
//!
//! All functions here are pure: width measurement is injected as a closure
//! so layout stays testable without a loaded font. The conventions mirror
//! the overlay-line protocol: a `COUNTDOWN:<n>` line carries the countdown,
//! `ROUND …` lines are headers, and the beat-sequence line marks emphasized
//! tokens as `[[token]]`.

/// One run of sequence text with an emphasis flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub emphasized: bool,
}

/// Find the beat-sequence line among the overlay lines: not a `ROUND` or
/// `COUNTDOWN` header, contains at least one digit, and either spaces or an
/// emphasis marker.
pub fn find_sequence_line(lines: &[String]) -> Option<&str> {
    lines
        .iter()
        .map(String::as_str)
        .find(|line| {
            !line.starts_with("ROUND")
                && !line.starts_with("COUNTDOWN")
                && line.chars().any(|c| c.is_ascii_digit())
                && (line.contains(' ') || line.contains("[["))
        })
}

/// Extract the countdown value from a `COUNTDOWN:<n>` overlay line.
pub fn find_countdown(lines: &[String]) -> Option<&str> {
    lines
        .iter()
        .find_map(|line| line.strip_prefix("COUNTDOWN:"))
        .map(str::trim)
}

/// Remove the emphasis markers, leaving plain text.
pub fn strip_emphasis(line: &str) -> String {
    line.replace("[[", "").replace("]]", "")
}

/// Split a line into plain and `[[emphasized]]` segments, in order.
pub fn split_emphasis(line: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = line;

    while let Some(open) = rest.find("[[") {
        match rest[open..].find("]]") {
            Some(close_rel) => {
                let close = open + close_rel;
                if open > 0 {
                    segments.push(Segment {
                        text: rest[..open].to_string(),
                        emphasized: false,
                    });
                }
                segments.push(Segment {
                    text: rest[open + 2..close].to_string(),
                    emphasized: true,
                });
                rest = &rest[close + 2..];
            }
            // Unterminated marker: treat the remainder as plain text.
            None => break,
        }
    }

    if !rest.is_empty() {
        segments.push(Segment {
            text: rest.to_string(),
            emphasized: false,
        });
    }
    segments
}

/// Wrap the sequence line against `max_width`.
///
/// Tokens are joined with dashes (spaces read as dashes first); a token
/// that would push the measured width of the *cleaned* line past
/// `max_width` starts a new line. `measure` returns the pixel width of a
/// piece of text; emphasis markers are stripped before measuring.
pub fn wrap_sequence(line: &str, max_width: u32, measure: impl Fn(&str) -> u32) -> Vec<String> {
    let dashed = line.replace(' ', "-");
    let mut wrapped = Vec::new();
    let mut current = String::new();

    for item in dashed.split('-') {
        let candidate = if current.is_empty() {
            item.to_string()
        } else {
            format!("{current}-{item}")
        };

        if measure(&strip_emphasis(&candidate)) > max_width && !current.is_empty() {
            wrapped.push(current);
            current = item.to_string();
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        wrapped.push(current);
    }
    wrapped
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
