// src/answer.rs

//! Pull a short answer out of free-form model text.
//!
//! Multiple-choice letters win over numeric answers. The rules, in order:
//! 1. the first standalone `A`-`D`
//! 2. a line starting with `A`-`D` followed by `.`, space, `)` or `:`
//! 3. the text after the last "The answer is " (either capitalisation)
//! 4. the braced content after the last `boxed`
//! 5. the last number anywhere in the text
//!
//! Candidates from rules 3-5 are normalised and reduced to their last digit
//! run; no digits means no answer.

use std::sync::LazyLock;

use regex::Regex;

static CHOICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[ABCD]\b").unwrap_or_else(|e| panic!("invalid choice regex: {e}"))
});

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d*\.?\d+").unwrap_or_else(|e| panic!("invalid number regex: {e}"))
});

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").unwrap_or_else(|e| panic!("invalid digit regex: {e}")));

pub fn extract_answer(text: &str) -> Option<String> {
    if let Some(m) = CHOICE.find(text) {
        return Some(m.as_str().to_string());
    }

    for line in text.lines().map(str::trim) {
        let mut chars = line.chars();
        if let Some(first @ ('A'..='D')) = chars.next() {
            match chars.next() {
                None | Some('.' | ' ' | ')' | ':') => return Some(first.to_string()),
                _ => {}
            }
        }
    }

    let mut candidate = if let Some(rest) = after_last(text, "The answer is ") {
        rest.trim().to_string()
    } else if let Some(rest) = after_last(text, "the answer is ") {
        rest.trim().to_string()
    } else if let Some(rest) = after_last(text, "boxed") {
        normalise(&boxed_content(rest))
    } else {
        NUMBER
            .find_iter(text)
            .last()
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };

    for suffix in ['.', '/'] {
        if candidate.ends_with(suffix) {
            candidate.pop();
        }
    }

    let mut candidate = normalise(&candidate);
    if let Some(rest) = after_last(&candidate, "boxed") {
        candidate = normalise(&boxed_content(rest));
    }

    if !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_digit()) {
        return Some(candidate);
    }
    DIGITS
        .find_iter(&candidate)
        .last()
        .map(|m| m.as_str().to_string())
}

fn after_last<'a>(text: &'a str, needle: &str) -> Option<&'a str> {
    text.rfind(needle).map(|i| &text[i + needle.len()..])
}

/// Content of the brace group at the start of `rest`, or everything up to
/// the next `$` when there is no brace.
fn boxed_content(rest: &str) -> String {
    let Some(inner) = rest.strip_prefix('{') else {
        return rest.split('$').next().unwrap_or("").trim().to_string();
    };
    let mut depth = 1usize;
    let mut out = String::new();
    for c in inner.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Strip LaTeX noise that gets in the way of comparing answers.
fn normalise(s: &str) -> String {
    s.trim()
        .replace("\\!", "")
        .replace("\\\\", "\\")
        .replace("tfrac", "frac")
        .replace("dfrac", "frac")
        .replace("\\left", "")
        .replace("\\right", "")
        .replace("\\text{", "")
        .replace('}', "")
        .replace(' ', "")
}
