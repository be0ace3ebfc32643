//! numfmt.rs – renders a cell value through its Excel number format code,
//! the way the sheet shows it.
//!
//! Covers sections (`pos;neg;zero;text`), literals, thousands separators and
//! scaling commas, fixed and optional digits, percent, scientific notation,
//! and date/time tokens including 12-hour clocks and elapsed `[h]`.
//! Fractions (`# ?/?`) fall back to plain digits.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::cell::{CellValue, format_number};

/// Format code of a built-in `numFmtId`. `None` for General and for the
/// locale-dependent ids that carry no fixed code.
pub fn builtin_format_code(id: u32) -> Option<&'static str> {
    Some(match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        14 => "m/d/yyyy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yyyy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    })
}

/// Text of `value` under format `code`.
pub fn format_value(value: &CellValue, code: &str) -> String {
    match value {
        CellValue::Number(n) | CellValue::DateTime(n) => format_numeric(*n, code),
        CellValue::Text(text) => format_text(text, code),
        other => other.to_string(),
    }
}

/// True when the first section of `code` uses date or time tokens.
pub fn is_date_format(code: &str) -> bool {
    let first = split_sections(code).into_iter().next().unwrap_or_default();
    let mut chars = first.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let inner: String = chars.by_ref().take_while(|&c| c != ']').collect();
                if elapsed_unit(&inner).is_some() {
                    return true;
                }
            }
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}

/* ========================== SECTIONS / LITERALS =========================== */

/// Splits on `;` outside quotes, escapes and brackets.
fn split_sections(code: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;
    for (i, ch) in code.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '\\' | '_' | '*' => escaped = true,
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            ';' if !in_brackets => {
                sections.push(&code[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    sections.push(&code[start..]);
    sections
}

/// Byte offset and char of everything that is format syntax: quoted text,
/// `\x` escapes, `_x` / `*x` padding and `[...]` sections are left out.
fn syntax_chars(section: &str) -> Vec<(usize, char)> {
    let mut out = Vec::new();
    let mut chars = section.char_indices();
    while let Some((i, ch)) = chars.next() {
        match ch {
            '"' => {
                for (_, c) in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                for (_, c) in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                }
            }
            _ => out.push((i, ch)),
        }
    }
    out
}

/// Renders the literal parts of a format segment; `@` becomes `text`.
fn render_literal(segment: &str, text: Option<&str>) -> String {
    let mut out = String::new();
    let mut chars = segment.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => out.extend(chars.by_ref().take_while(|&c| c != '"')),
            '\\' => out.extend(chars.next()),
            '_' => {
                chars.next();
                out.push(' ');
            }
            '*' => {
                chars.next();
            }
            '[' => {
                let inner: String = chars.by_ref().take_while(|&c| c != ']').collect();
                // currency, e.g. [$€-407]
                if let Some(symbol) = inner.strip_prefix('$') {
                    out.push_str(symbol.split('-').next().unwrap_or_default());
                }
            }
            '@' => match text {
                Some(t) => out.push_str(t),
                None => out.push('@'),
            },
            _ => out.push(ch),
        }
    }
    out
}

fn format_text(text: &str, code: &str) -> String {
    let sections = split_sections(code);
    let section = match sections.as_slice() {
        [_, _, _, text_section, ..] => *text_section,
        [only] if syntax_chars(only).iter().any(|&(_, c)| c == '@') => *only,
        _ => return text.to_owned(),
    };
    render_literal(section, Some(text))
}

/* ========================== NUMBERS ======================================= */

fn format_numeric(n: f64, code: &str) -> String {
    let sections = split_sections(code);
    // (section, value to render, whether a leading '-' is still owed)
    let (section, value, signed) = match sections.as_slice() {
        [_, neg, ..] if n < 0.0 => (*neg, -n, false),
        [_, _, zero, ..] if n == 0.0 => (*zero, n, false),
        [first, ..] => (*first, n, true),
        [] => (code, n, true),
    };

    if is_date_format(section) {
        return format_datetime(value, section).unwrap_or_else(|| format_number(n));
    }

    if let Some(at) = section.to_ascii_lowercase().find("general") {
        return format!(
            "{}{}{}",
            render_literal(&section[..at], None),
            format_number(value),
            render_literal(&section[at + "general".len()..], None)
        );
    }

    let syntax = syntax_chars(section);
    let mut placeholders = syntax
        .iter()
        .filter(|(_, c)| matches!(c, '0' | '#' | '?'))
        .map(|&(i, _)| i);
    let Some(first) = placeholders.next() else {
        // literal-only section, or `@` on a number
        return render_literal(section, Some(&format_number(value)));
    };
    let last = placeholders.last().unwrap_or(first);

    // ".00" starts at the decimal point
    let start = match syntax.iter().rev().find(|&&(i, _)| i < first) {
        Some(&(i, '.')) if i + 1 == first => i,
        _ => first,
    };
    let mut end = last + 1;
    while section[end..].starts_with(',') {
        end += 1;
    }

    let pattern: String = syntax
        .iter()
        .filter(|&&(i, _)| (start..end).contains(&i))
        .map(|&(_, c)| c)
        .collect();
    let percents = syntax.iter().filter(|&&(_, c)| c == '%').count();
    let v = value.abs() * 100f64.powi(percents as i32);

    let digits = match pattern.find(['E', 'e']) {
        Some(e) => format_scientific(v, &pattern[..e], &pattern[e + 1..]),
        None => FixedSpec::parse(&pattern).render(v),
    };

    let mut out = format!(
        "{}{digits}{}",
        render_literal(&section[..start], None),
        render_literal(&section[end..], None)
    );
    if signed && value < 0.0 {
        out.insert(0, '-');
    }
    out
}

/// Digit layout of the numeric part of a section, e.g. `#,##0.00`.
#[derive(Debug, Clone, Copy)]
struct FixedSpec {
    min_int: usize,
    int_digits: usize,
    min_frac: usize,
    max_frac: usize,
    grouping: bool,
    /// Trailing commas, each dividing by 1000.
    scale: i32,
    decimal_point: bool,
}

impl FixedSpec {
    fn parse(pattern: &str) -> Self {
        let trimmed = pattern.trim_end_matches(',');
        let scale = (pattern.len() - trimmed.len()) as i32;
        let (int_pat, frac_pat) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let digits = |s: &str| s.chars().filter(|c| matches!(c, '0' | '#' | '?')).count();
        let zeros = |s: &str| s.chars().filter(|&c| c == '0').count();
        Self {
            min_int: zeros(int_pat),
            int_digits: digits(int_pat),
            min_frac: zeros(frac_pat),
            max_frac: digits(frac_pat),
            grouping: int_pat.contains(','),
            scale,
            decimal_point: trimmed.contains('.'),
        }
    }

    /// `v` must be non-negative.
    fn render(&self, v: f64) -> String {
        let v = v / 1000f64.powi(self.scale);
        let text = format!("{:.*}", self.max_frac, round_to(v, self.max_frac));
        let (int_text, frac_text) = text.split_once('.').unwrap_or((text.as_str(), ""));

        let mut int_part = if self.int_digits == 0 || (self.min_int == 0 && int_text == "0") {
            String::new()
        } else {
            int_text.to_owned()
        };
        while int_part.len() < self.min_int {
            int_part.insert(0, '0');
        }
        if self.grouping {
            int_part = group_thousands(&int_part);
        }

        let mut frac = frac_text.to_owned();
        while frac.len() > self.min_frac && frac.ends_with('0') {
            frac.pop();
        }

        let mut out = int_part;
        if self.decimal_point {
            out.push('.');
            out.push_str(&frac);
        }
        out
    }
}

fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `mantissa` e.g. `0.00`, `exponent` e.g. `+00`.
fn format_scientific(v: f64, mantissa: &str, exponent: &str) -> String {
    let digits = FixedSpec::parse(mantissa);
    let mut exp = if v == 0.0 { 0 } else { v.log10().floor() as i32 };
    let mut m = v / 10f64.powi(exp);
    if round_to(m, digits.max_frac) >= 10.0 {
        exp += 1;
        m /= 10.0;
    }
    let width = exponent
        .chars()
        .filter(|c| matches!(c, '0' | '#' | '?'))
        .count()
        .max(1);
    let sign = if exp < 0 {
        "-"
    } else if exponent.starts_with('+') {
        "+"
    } else {
        ""
    };
    format!("{}E{sign}{:0width$}", digits.render(m), exp.abs())
}

/* ========================== DATES ========================================= */

#[derive(Debug, Clone, PartialEq)]
enum DatePart {
    Lit(String),
    Year(usize),
    Month(usize),
    Day(usize),
    Hour(usize),
    Minute(usize),
    Second(usize),
    /// Digits of a second fraction (`ss.00`).
    Fraction(usize),
    AmPm { am: String, pm: String },
    /// `[h]`, `[mm]`, `[ss]`: unit and width.
    Elapsed(char, usize),
}

/// `h`, `m` or `s` when a bracket holds an elapsed-time unit.
fn elapsed_unit(inner: &str) -> Option<char> {
    let lower = inner.to_ascii_lowercase();
    let first = lower.chars().next()?;
    (matches!(first, 'h' | 'm' | 's') && lower.chars().all(|c| c == first)).then_some(first)
}

fn starts_with_ci(chars: &[char], pat: &str) -> bool {
    pat.chars()
        .enumerate()
        .all(|(k, p)| chars.get(k).is_some_and(|c| c.eq_ignore_ascii_case(&p)))
}

fn date_parts(section: &str) -> Vec<DatePart> {
    use DatePart::*;

    let chars: Vec<char> = section.chars().collect();
    let mut parts = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '"' => {
                let lit: String = chars[i + 1..].iter().take_while(|&&c| c != '"').collect();
                i += lit.chars().count() + 2;
                parts.push(Lit(lit));
            }
            '\\' => {
                if let Some(c) = chars.get(i + 1) {
                    parts.push(Lit(c.to_string()));
                }
                i += 2;
            }
            '_' => {
                parts.push(Lit(" ".to_owned()));
                i += 2;
            }
            '*' => i += 2,
            '[' => {
                let inner: String = chars[i + 1..].iter().take_while(|&&c| c != ']').collect();
                i += inner.chars().count() + 2;
                if let Some(unit) = elapsed_unit(&inner) {
                    parts.push(Elapsed(unit, inner.len()));
                }
            }
            _ if starts_with_ci(&chars[i..], "am/pm") => {
                parts.push(AmPm {
                    am: chars[i..i + 2].iter().collect(),
                    pm: chars[i + 3..i + 5].iter().collect(),
                });
                i += 5;
            }
            _ if starts_with_ci(&chars[i..], "a/p") => {
                parts.push(AmPm {
                    am: chars[i].to_string(),
                    pm: chars[i + 2].to_string(),
                });
                i += 3;
            }
            '.' if matches!(parts.last(), Some(Second(_) | Elapsed('s', _)))
                && chars.get(i + 1) == Some(&'0') =>
            {
                let run = chars[i + 1..].iter().take_while(|&&c| c == '0').count();
                parts.push(Fraction(run));
                i += run + 1;
            }
            _ => {
                let lower = ch.to_ascii_lowercase();
                if matches!(lower, 'y' | 'm' | 'd' | 'h' | 's') {
                    let run = chars[i..]
                        .iter()
                        .take_while(|c| c.to_ascii_lowercase() == lower)
                        .count();
                    parts.push(match lower {
                        'y' => Year(run),
                        'm' => Month(run),
                        'd' => Day(run),
                        'h' => Hour(run),
                        _ => Second(run),
                    });
                    i += run;
                } else {
                    parts.push(Lit(ch.to_string()));
                    i += 1;
                }
            }
        }
    }

    // `m`/`mm` right after hours or right before seconds means minutes
    for idx in 0..parts.len() {
        let n = match parts[idx] {
            Month(n) if n <= 2 => n,
            _ => continue,
        };
        let prev = parts[..idx].iter().rev().find(|p| !matches!(p, Lit(_)));
        let next = parts[idx + 1..]
            .iter()
            .find(|p| !matches!(p, Lit(_) | AmPm { .. }));
        let after_hour = matches!(prev, Some(Hour(_) | Elapsed('h', _)));
        let before_second = matches!(next, Some(Second(_) | Elapsed('s', _)));
        if after_hour || before_second {
            parts[idx] = Minute(n);
        }
    }
    parts
}

fn pad(v: impl Into<i64>, width: usize) -> String {
    format!("{:0width$}", v.into(), width = width.min(2))
}

fn format_datetime(serial: f64, section: &str) -> Option<String> {
    use DatePart::*;

    let parts = date_parts(section);
    let frac_digits = parts
        .iter()
        .find_map(|p| match p {
            Fraction(n) => Some((*n).min(3)),
            _ => None,
        })
        .unwrap_or(0);

    // rounded to the shown precision, like the sheet does
    let per_second = 10i64.pow(frac_digits as u32);
    let ticks = (serial * 86_400.0 * per_second as f64).round();
    if !ticks.is_finite() || ticks < 0.0 {
        return None;
    }
    let ticks = ticks as i64;
    let secs = ticks / per_second;
    let sub = ticks % per_second;
    let base: NaiveDateTime = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let dt = base.checked_add_signed(Duration::seconds(secs))?;

    let twelve_hour = parts.iter().any(|p| matches!(p, AmPm { .. }));
    let mut out = String::new();
    for part in &parts {
        match part {
            Lit(s) => out.push_str(s),
            Year(n) if *n <= 2 => out.push_str(&pad(dt.year() % 100, 2)),
            Year(_) => out.push_str(&format!("{:04}", dt.year())),
            Month(1) => out.push_str(&dt.month().to_string()),
            Month(2) => out.push_str(&pad(dt.month(), 2)),
            Month(3) => out.push_str(&dt.format("%b").to_string()),
            Month(5) => out.extend(dt.format("%B").to_string().chars().next()),
            Month(_) => out.push_str(&dt.format("%B").to_string()),
            Day(n) if *n <= 2 => out.push_str(&pad(dt.day(), *n)),
            Day(3) => out.push_str(&dt.format("%a").to_string()),
            Day(_) => out.push_str(&dt.format("%A").to_string()),
            Hour(n) => {
                let h = match (twelve_hour, dt.hour() % 12) {
                    (true, 0) => 12,
                    (true, h) => h,
                    (false, _) => dt.hour(),
                };
                out.push_str(&pad(h, *n));
            }
            Minute(n) => out.push_str(&pad(dt.minute(), *n)),
            Second(n) => out.push_str(&pad(dt.second(), *n)),
            Fraction(n) => {
                let digits = format!("{sub:0frac_digits$}");
                out.push('.');
                out.push_str(&digits[..(*n).min(digits.len())]);
            }
            AmPm { am, pm } => out.push_str(if dt.hour() < 12 { am } else { pm }),
            Elapsed(unit, n) => {
                let total = match unit {
                    'h' => secs / 3600,
                    'm' => secs / 60,
                    _ => secs,
                };
                out.push_str(&format!("{total:0width$}", width = *n));
            }
        }
    }
    Some(out)
}
