//! PII log sanitizer
//!
//! Every log line that could carry patient data goes through these helpers
//! before reaching the subscriber. Documents and phone numbers are masked
//! down to their final digits; patient names are simply never logged.

/// Minimum digit-run length treated as an identifier (CPF has 11 digits,
/// phone numbers 10-11; anything 8+ is masked to be safe).
const MIN_SENSITIVE_RUN: usize = 8;

/// Digits preserved at the end of a masked run
const VISIBLE_TAIL: usize = 2;

/// Mask a document number (CPF or similar), keeping only the last digits.
///
/// `"52998224725"` becomes `"*********25"`. Short inputs are fully masked.
pub fn mask_document(doc: &str) -> String {
    let digits: Vec<char> = doc.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= VISIBLE_TAIL {
        return "*".repeat(digits.len().max(3));
    }
    let tail: String = digits[digits.len() - VISIBLE_TAIL..].iter().collect();
    format!("{}{}", "*".repeat(digits.len() - VISIBLE_TAIL), tail)
}

/// Mask a phone number, same policy as documents.
pub fn mask_phone(phone: &str) -> String {
    mask_document(phone)
}

/// Redact long digit runs anywhere in free-form text (vendor error bodies,
/// WebSocket payload excerpts) before logging it.
pub fn redact(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = String::new();

    for c in text.chars() {
        if c.is_ascii_digit() {
            run.push(c);
        } else {
            flush_run(&mut out, &mut run);
            out.push(c);
        }
    }
    flush_run(&mut out, &mut run);
    out
}

fn flush_run(out: &mut String, run: &mut String) {
    if run.is_empty() {
        return;
    }
    if run.len() >= MIN_SENSITIVE_RUN {
        out.push_str(&mask_document(run));
    } else {
        out.push_str(run);
    }
    run.clear();
}
