//! Core facts and verbatim evidence, drawn only from the item's own text.

use serde::Serialize;
use std::collections::HashSet;

use crate::ingest::collapse_whitespace;

/// Fragments shorter than this carry no usable claim.
pub const MIN_FACT_CHARS: usize = 12;
/// Per-fact length cap.
pub const MAX_FACT_CHARS: usize = 280;

const ELLIPSIS: char = '…';

/// Short verbatim quotation from the body, tied to `core_facts[fact_index]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvidenceExcerpt {
    pub fact_index: usize,
    pub text: String,
}

/// Up to `max` salient fragments in source order, original wording.
///
/// `key_points` are used when any are non-blank; otherwise the body is split
/// into sentences.
pub fn core_facts(key_points: &[String], body: &str, max: usize) -> Vec<String> {
    let candidates: Vec<String> = if key_points.iter().any(|k| !k.trim().is_empty()) {
        key_points.to_vec()
    } else {
        split_sentences(body)
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for c in candidates {
        let fact = collapse_whitespace(&c);
        if fact.chars().count() < MIN_FACT_CHARS {
            continue;
        }
        if !seen.insert(fact.to_lowercase()) {
            continue;
        }
        out.push(truncate_chars(&fact, MAX_FACT_CHARS));
        if out.len() == max {
            break;
        }
    }
    out
}

/// One excerpt per fact that can be located verbatim in the body, capped to `cap` chars.
pub fn evidence_excerpts(facts: &[String], body: &str, cap: usize) -> Vec<EvidenceExcerpt> {
    let haystack = collapse_whitespace(body);
    if haystack.is_empty() {
        return Vec::new();
    }
    facts
        .iter()
        .enumerate()
        .filter_map(|(i, fact)| {
            let needle = searchable(fact);
            if needle.chars().count() < MIN_FACT_CHARS {
                return None;
            }
            let start = haystack.find(needle)?;
            let span = &haystack[start..start + needle.len()];
            Some(EvidenceExcerpt {
                fact_index: i,
                text: truncate_chars(span, cap),
            })
        })
        .collect()
}

/// Split on sentence terminators (Latin and CJK) and line breaks.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\n' || ch == '\r' {
            flush(&mut cur, &mut out);
            continue;
        }
        cur.push(ch);
        let ends = match ch {
            '。' | '！' | '？' | '；' => true,
            '.' | '!' | '?' => chars.peek().map_or(true, |n| n.is_whitespace()),
            _ => false,
        };
        if ends {
            flush(&mut cur, &mut out);
        }
    }
    flush(&mut cur, &mut out);
    out
}

fn flush(cur: &mut String, out: &mut Vec<String>) {
    let t = cur.trim();
    if !t.is_empty() {
        out.push(t.to_string());
    }
    cur.clear();
}

/// Keep at most `cap` chars; a cut string ends with an ellipsis.
pub fn truncate_chars(s: &str, cap: usize) -> String {
    if s.chars().count() <= cap {
        return s.to_string();
    }
    let mut out: String = s.chars().take(cap.saturating_sub(1)).collect();
    out = out.trim_end().to_string();
    out.push(ELLIPSIS);
    out
}

/// The part of a fact worth searching for: no truncation ellipsis, no trailing terminator.
fn searchable(fact: &str) -> &str {
    fact.trim_end_matches(ELLIPSIS)
        .trim_end_matches(['.', '!', '?', '。', '！', '？', '；'])
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_latin_and_cjk_sentences() {
        let s = split_sentences("First claim here. v1.2 ships today!\n第二句话。Third?");
        assert_eq!(
            s,
            vec!["First claim here.", "v1.2 ships today!", "第二句话。", "Third?"]
        );
    }

    #[test]
    fn facts_prefer_key_points_and_keep_order() {
        let kps = vec![
            "The cache now survives restarts".to_string(),
            "short".to_string(),
            "Writes are batched every 50 ms".to_string(),
            "the cache now survives restarts".to_string(),
        ];
        let facts = core_facts(&kps, "ignored body text that is long enough.", 8);
        assert_eq!(
            facts,
            vec!["The cache now survives restarts", "Writes are batched every 50 ms"]
        );
    }

    #[test]
    fn facts_fall_back_to_body_and_respect_max() {
        let body = "Sentence number one is here. Sentence number two is here. Sentence number three is here.";
        let facts = core_facts(&[], body, 2);
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0], "Sentence number one is here.");
    }

    #[test]
    fn excerpts_are_verbatim_and_capped() {
        let body = "Intro.  The   release cuts cold start time by 40 percent on ARM servers. Outro.";
        let facts = vec![
            "The release cuts cold start time by 40 percent on ARM servers".to_string(),
            "A paraphrase that never appears in the body".to_string(),
        ];
        let ex = evidence_excerpts(&facts, body, 20);
        assert_eq!(ex.len(), 1);
        assert_eq!(ex[0].fact_index, 0);
        assert!(ex[0].text.chars().count() <= 20);
        assert!(ex[0].text.starts_with("The release cuts"));
    }

    #[test]
    fn empty_body_yields_no_excerpts() {
        let facts = vec!["Something that was claimed".to_string()];
        assert!(evidence_excerpts(&facts, "", 160).is_empty());
    }

    #[test]
    fn truncate_appends_ellipsis_within_cap() {
        assert_eq!(truncate_chars("abcdef", 10), "abcdef");
        let t = truncate_chars("abcdefghij", 5);
        assert_eq!(t, "abcd…");
        assert_eq!(t.chars().count(), 5);
    }
}
