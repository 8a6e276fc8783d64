//! Output parsing — structured results from free-form model text.
//!
//! Model output is not guaranteed to be well-formed JSON or any fixed
//! grammar, so parsing is permissive about surrounding commentary and
//! strict about the payload once located. The two result shapes carry
//! different recovery policies:
//!
//! - **Ranking**: a missing or unparsable list falls back to the
//!   original candidate order — a neutral, non-crashing default.
//! - **Review record**: a missing label or invalid value is a hard
//!   failure; fabricating a rating would corrupt evaluation downstream.
//!
//! The bracketed list is read with a small quote-aware scanner. Raw
//! model text is never evaluated as code.

use tracing::warn;
use usersim_core::error::ParseError;
use usersim_core::task::{REVIEW_MAX_CHARS, ReviewRecord, STAR_LEVELS};

/// Result of parsing a ranking completion.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingParse {
    /// Candidate ids in the parsed (or fallback) order.
    pub items: Vec<String>,
    /// True when no list could be parsed and `fallback` was returned.
    pub recovered: bool,
}

/// Extract an ordered identifier list from raw ranking output.
///
/// Locates the bracketed span (first `[` to last `]`, spanning
/// newlines) and scans it for quoted identifiers. On any failure the
/// original candidate order is returned unchanged and a diagnostic is
/// recorded — the run continues.
pub fn parse_ranking(raw: &str, fallback: &[String]) -> RankingParse {
    let recovered = RankingParse {
        items: fallback.to_vec(),
        recovered: true,
    };

    let Some(start) = raw.find('[') else {
        warn!("No bracketed list in ranking output, keeping candidate order");
        return recovered;
    };
    let Some(end) = raw.rfind(']') else {
        warn!("Unterminated bracketed list in ranking output, keeping candidate order");
        return recovered;
    };
    if end <= start {
        warn!("Malformed bracketed list in ranking output, keeping candidate order");
        return recovered;
    }

    let items = scan_quoted(&raw[start + 1..end]);
    if items.is_empty() {
        warn!("Bracketed list held no identifiers, keeping candidate order");
        return recovered;
    }

    RankingParse {
        items,
        recovered: false,
    }
}

/// Scan a list body for quoted string tokens, honoring both quote styles
/// and backslash escapes. Anything between tokens is ignored.
fn scan_quoted(body: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\'' && c != '"' {
            continue;
        }
        let quote = c;
        let mut token = String::new();
        loop {
            match chars.next() {
                Some('\\') => {
                    if let Some(escaped) = chars.next() {
                        token.push(escaped);
                    }
                }
                Some(ch) if ch == quote => {
                    items.push(token);
                    break;
                }
                Some(ch) => token.push(ch),
                // Unterminated token: drop it, keep what was complete.
                None => return items,
            }
        }
    }

    items
}

/// Parse the five labeled lines of a review completion.
///
/// Each label is matched on the first line containing `label:`; the
/// value is the substring after the first colon of that line.
pub fn parse_review(raw: &str) -> std::result::Result<ReviewRecord, ParseError> {
    let stars_value = labeled_value(raw, "stars").ok_or(ParseError::MissingField("stars"))?;
    let useful_value = labeled_value(raw, "useful").ok_or(ParseError::MissingField("useful"))?;
    let funny_value = labeled_value(raw, "funny").ok_or(ParseError::MissingField("funny"))?;
    let cool_value = labeled_value(raw, "cool").ok_or(ParseError::MissingField("cool"))?;
    let review_value = labeled_value(raw, "review").ok_or(ParseError::MissingField("review"))?;

    let stars = parse_stars(&stars_value)?;
    let useful = parse_count(&useful_value, "useful")?;
    let funny = parse_count(&funny_value, "funny")?;
    let cool = parse_count(&cool_value, "cool")?;

    let mut review = review_value;
    if review.chars().count() > REVIEW_MAX_CHARS {
        review = review.chars().take(REVIEW_MAX_CHARS).collect();
    }

    Ok(ReviewRecord {
        stars,
        useful,
        funny,
        cool,
        review,
    })
}

/// The trimmed substring after the first colon of the first line
/// containing `label:`.
fn labeled_value(raw: &str, label: &str) -> Option<String> {
    let marker = format!("{label}:");
    raw.lines()
        .find(|line| line.contains(&marker))
        .and_then(|line| line.splitn(2, ':').nth(1))
        .map(|value| value.trim().to_string())
}

fn parse_stars(value: &str) -> std::result::Result<f32, ParseError> {
    let parsed: f32 = value
        .parse()
        .map_err(|_| ParseError::InvalidStars(value.to_string()))?;
    if STAR_LEVELS.iter().any(|level| (parsed - level).abs() < f32::EPSILON) {
        Ok(parsed)
    } else {
        Err(ParseError::InvalidStars(value.to_string()))
    }
}

fn parse_count(value: &str, field: &'static str) -> std::result::Result<u32, ParseError> {
    let parsed: f32 = value.parse().map_err(|_| ParseError::InvalidCount {
        field,
        value: value.to_string(),
    })?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(ParseError::InvalidCount {
            field,
            value: value.to_string(),
        });
    }
    Ok(parsed.round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<String> {
        vec!["i1".into(), "i2".into(), "i3".into()]
    }

    #[test]
    fn ranking_list_extracted_from_commentary() {
        let raw = "Based on analysis: ['i3','i1','i2'] is my ranking.";
        let parsed = parse_ranking(raw, &candidates());
        assert_eq!(parsed.items, vec!["i3", "i1", "i2"]);
        assert!(!parsed.recovered);
    }

    #[test]
    fn ranking_list_spans_newlines() {
        let raw = "Ranked list:\n[\n  \"i2\",\n  \"i3\",\n  \"i1\"\n]\nDone.";
        let parsed = parse_ranking(raw, &candidates());
        assert_eq!(parsed.items, vec!["i2", "i3", "i1"]);
    }

    #[test]
    fn no_list_falls_back_to_candidate_order() {
        let parsed = parse_ranking("I am unable to rank these items.", &candidates());
        assert_eq!(parsed.items, candidates());
        assert!(parsed.recovered);
    }

    #[test]
    fn empty_list_falls_back_to_candidate_order() {
        let parsed = parse_ranking("Here: [1, 2, 3]", &candidates());
        assert_eq!(parsed.items, candidates());
        assert!(parsed.recovered);
    }

    #[test]
    fn escaped_quotes_inside_identifiers() {
        let parsed = parse_ranking(r#"['it\'s-a', "b"]"#, &candidates());
        assert_eq!(parsed.items, vec!["it's-a", "b"]);
    }

    #[test]
    fn well_formed_review_parses() {
        let raw = "stars: 4.0\nuseful: 2\nfunny: 0\ncool: 1\nreview: Great place, loved it.";
        let record = parse_review(raw).unwrap();
        assert_eq!(record.stars, 4.0);
        assert_eq!(record.useful, 2);
        assert_eq!(record.funny, 0);
        assert_eq!(record.cool, 1);
        assert_eq!(record.review, "Great place, loved it.");
    }

    #[test]
    fn review_with_surrounding_commentary_parses() {
        let raw = "Sure, here is my response.\n\nstars: 5.0\nuseful: 3\nfunny: 1\ncool: 2\nreview: Best coffee in town.\n\nHope that helps!";
        let record = parse_review(raw).unwrap();
        assert_eq!(record.stars, 5.0);
        assert_eq!(record.review, "Best coffee in town.");
    }

    #[test]
    fn missing_stars_is_a_hard_failure() {
        let raw = "useful: 2\nfunny: 0\ncool: 1\nreview: Nice.";
        let err = parse_review(raw).unwrap_err();
        assert!(matches!(err, ParseError::MissingField("stars")));
    }

    #[test]
    fn star_value_outside_allowed_set_fails() {
        let raw = "stars: 4.5\nuseful: 2\nfunny: 0\ncool: 1\nreview: Nice.";
        assert!(matches!(
            parse_review(raw).unwrap_err(),
            ParseError::InvalidStars(_)
        ));
    }

    #[test]
    fn negative_count_fails() {
        let raw = "stars: 3.0\nuseful: -1\nfunny: 0\ncool: 1\nreview: Meh.";
        assert!(matches!(
            parse_review(raw).unwrap_err(),
            ParseError::InvalidCount { field: "useful", .. }
        ));
    }

    #[test]
    fn float_spelled_counts_are_tolerated() {
        let raw = "stars: 2.0\nuseful: 2.0\nfunny: 0.0\ncool: 1.0\nreview: Fine.";
        let record = parse_review(raw).unwrap();
        assert_eq!(record.useful, 2);
        assert_eq!(record.cool, 1);
    }

    #[test]
    fn review_text_keeps_content_after_second_colon() {
        let raw = "stars: 1.0\nuseful: 0\nfunny: 0\ncool: 0\nreview: Terrible: avoid this place.";
        let record = parse_review(raw).unwrap();
        assert_eq!(record.review, "Terrible: avoid this place.");
    }

    #[test]
    fn long_review_truncated_to_exactly_512_chars() {
        let raw = format!(
            "stars: 4.0\nuseful: 1\nfunny: 0\ncool: 0\nreview: {}",
            "x".repeat(600)
        );
        let record = parse_review(&raw).unwrap();
        assert_eq!(record.review.chars().count(), 512);
    }

    #[test]
    fn short_review_returned_unchanged() {
        let text = "y".repeat(500);
        let raw = format!("stars: 4.0\nuseful: 1\nfunny: 0\ncool: 0\nreview: {text}");
        let record = parse_review(&raw).unwrap();
        assert_eq!(record.review, text);
    }
}
