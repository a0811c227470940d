//! Money amounts from noisy OCR text.

use regex::Regex;
use std::sync::OnceLock;

use crate::chips::Chips;

/// Currency symbols and unit tokens stripped before parsing.
const CURRENCY_PATTERN: &str = r"(?i)[$€£]|chips?\b|bb\b";

fn currency_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CURRENCY_PATTERN).ok()).as_ref()
}

/// Characters OCR commonly produces in place of digits.
fn confusion_digit(c: char) -> Option<char> {
    match c {
        'O' | 'o' | 'Q' | 'D' => Some('0'),
        'l' | 'I' | '|' | 'i' | '!' => Some('1'),
        'S' | 's' => Some('5'),
        'B' => Some('8'),
        'Z' | 'z' => Some('2'),
        _ => None,
    }
}

fn is_runnable(c: char) -> bool {
    c.is_ascii_digit() || c == ',' || c == '.' || confusion_digit(c).is_some()
}

/// A maximal run of digit-like characters, confusions already substituted.
struct NumericRun {
    text: String,
    /// At least one character was a real digit before substitution
    has_digit: bool,
}

fn numeric_runs(text: &str) -> Vec<NumericRun> {
    let mut runs = Vec::new();
    let mut current = NumericRun { text: String::new(), has_digit: false };
    for c in text.chars() {
        if is_runnable(c) {
            current.has_digit |= c.is_ascii_digit();
            current.text.push(confusion_digit(c).unwrap_or(c));
        } else if !current.text.is_empty() {
            runs.push(std::mem::replace(
                &mut current,
                NumericRun { text: String::new(), has_digit: false },
            ));
        }
    }
    if !current.text.is_empty() {
        runs.push(current);
    }
    runs
}

/// Rewrites a digit run with `,`/`.` separators into a plain decimal string.
///
/// `1,234.50` -> `1234.50`, `1.234.567` -> `1234567`, `1,50` -> `1.50`,
/// `12,345` -> `12345`.
fn normalize_separators(run: &str) -> Option<String> {
    let run = run.trim_matches(|c| c == ',' || c == '.');
    if run.is_empty() {
        return None;
    }

    let commas = run.matches(',').count();
    let dots = run.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) | (0, 1) => run.to_string(),
        (_, 0) => {
            let tail = run.rsplit(',').next().unwrap_or("");
            if commas == 1 && (1..=2).contains(&tail.len()) {
                run.replace(',', ".")
            } else {
                run.replace(',', "")
            }
        }
        (0, _) => run.replace('.', ""),
        _ => {
            // Both present: whichever comes last is the decimal point
            let last_comma = run.rfind(',').unwrap_or(0);
            let last_dot = run.rfind('.').unwrap_or(0);
            if last_dot > last_comma {
                run.replace(',', "")
            } else {
                run.replace('.', "").replace(',', ".")
            }
        }
    };

    if normalized.matches('.').count() > 1 {
        return None;
    }
    Some(normalized)
}

/// Largest amount a table can show (ten billion units); longer digit runs
/// are misreads.
const MAX_AMOUNT: Chips = Chips::from_cents(1_000_000_000_000);

fn decimal_to_cents(s: &str) -> Option<Chips> {
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac_digits: String = frac.chars().chain("00".chars()).take(2).collect();
    let mut frac_cents: i64 = frac_digits.parse().ok()?;
    // Round half up on the third decimal
    if frac.chars().nth(2).and_then(|c| c.to_digit(10)).is_some_and(|d| d >= 5) {
        frac_cents += 1;
    }
    whole.checked_mul(100)?.checked_add(frac_cents).map(Chips::from_cents)
}

/// Parses a money amount, e.g. `$1,234.50`, `1.5 BB`, `3O0 chips`.
///
/// Returns `None` when the text holds no ASCII digit at all.
pub fn parse_money(text: &str) -> Option<Chips> {
    let stripped = currency_pattern()?.replace_all(text, " ");
    if !stripped.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let run = numeric_runs(&stripped).into_iter().find(|run| run.has_digit)?;
    let normalized = normalize_separators(&run.text)?;
    decimal_to_cents(&normalized).filter(|amount| *amount <= MAX_AMOUNT)
}

/// Parses a `SB/BB` blind pair such as `$0.50/$1` or `Blinds: 1 / 2`.
///
/// Both values must parse and the small blind may not exceed the big blind.
pub fn parse_blinds(text: &str) -> Option<(Chips, Chips)> {
    let (small, big) = text.split_once('/')?;
    let small = parse_money(small)?;
    let big = parse_money(big)?;
    if small > big || !big.is_positive() {
        return None;
    }
    Some((small, big))
}
