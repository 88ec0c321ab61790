//! Splitter for SQL scripts that switch statement terminators with `DELIMITER`.
//!
//! Routine and trigger bodies contain `;`, so scripts wrap them in `DELIMITER $$ ... $$` blocks.
//! Splitting happens in two passes: comments are stripped first, then the text is cut at every
//! `DELIMITER` line and each segment is split on the terminator active at that point.
//! Quoted strings and identifiers are never split or stripped.

pub const DEFAULT_DELIMITER: &str = ";";

const MARKER: &str = "DELIMITER";

/// Returns the new terminator if `line` is a `DELIMITER <token>` directive.
pub fn parse_marker(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let (keyword, rest) = trimmed.split_at_checked(MARKER.len())?;
    if !keyword.eq_ignore_ascii_case(MARKER) || !rest.starts_with(char::is_whitespace) {
        return None;
    }
    rest.split_whitespace().next()
}

pub fn has_delimiter_marker(sql: &str) -> bool {
    sql.lines().any(|line| parse_marker(line).is_some())
}

/// Splits a delimiter-block script into individual statements, in order.
pub fn split_statements(sql: &str) -> Vec<String> {
    let cleaned = strip_comments(sql);
    let mut delimiter = DEFAULT_DELIMITER.to_string();
    let mut segment = String::new();
    let mut statements = Vec::new();

    for line in cleaned.lines() {
        if let Some(token) = parse_marker(line) {
            push_segment(&segment, &delimiter, &mut statements);
            segment.clear();
            delimiter = token.to_string();
            continue;
        }
        segment.push_str(line);
        segment.push('\n');
    }
    push_segment(&segment, &delimiter, &mut statements);

    statements
}

fn push_segment(segment: &str, delimiter: &str, out: &mut Vec<String>) {
    for part in split_unquoted(segment, delimiter) {
        let stmt = part.trim();
        if stmt.is_empty() || stmt == delimiter {
            continue;
        }
        out.push(stmt.to_string());
    }
}

/// Tracks whether the scanner sits inside a quoted run.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
    Backtick,
}

impl Quote {
    fn opening(c: char) -> Option<Quote> {
        match c {
            '\'' => Some(Quote::Single),
            '"' => Some(Quote::Double),
            '`' => Some(Quote::Backtick),
            _ => None,
        }
    }

    fn closes_with(self, c: char) -> bool {
        matches!(
            (self, c),
            (Quote::Single, '\'') | (Quote::Double, '"') | (Quote::Backtick, '`')
        )
    }
}

/// Removes `-- `, `#` and `/* */` comments. Line structure is preserved.
pub fn strip_comments(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut quote = Quote::None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if quote != Quote::None {
            out.push(c);
            if c == '\\' && quote != Quote::Backtick {
                if let Some(escaped) = next {
                    out.push(escaped);
                    i += 2;
                    continue;
                }
            } else if quote.closes_with(c) {
                quote = Quote::None;
            }
            i += 1;
            continue;
        }

        if let Some(q) = Quote::opening(c) {
            quote = q;
            out.push(c);
            i += 1;
            continue;
        }

        let dash_comment =
            c == '-' && next == Some('-') && chars.get(i + 2).is_none_or(|c| c.is_whitespace());
        if dash_comment || c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        if c == '/' && next == Some('*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                // keep line breaks so DELIMITER lines stay on their own line
                if chars[i] == '\n' {
                    out.push('\n');
                }
                i += 1;
            }
            i += 2;
            continue;
        }

        out.push(c);
        i += 1;
    }

    out
}

/// Splits on `delimiter` outside quoted runs.
fn split_unquoted<'a>(text: &'a str, delimiter: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut quote = Quote::None;
    let mut start = 0;
    let mut escaped = false;
    let mut iter = text.char_indices();

    while let Some((idx, c)) = iter.next() {
        if quote != Quote::None {
            if escaped {
                escaped = false;
            } else if c == '\\' && quote != Quote::Backtick {
                escaped = true;
            } else if quote.closes_with(c) {
                quote = Quote::None;
            }
            continue;
        }

        if let Some(q) = Quote::opening(c) {
            quote = q;
            continue;
        }

        if text[idx..].starts_with(delimiter) {
            parts.push(&text[start..idx]);
            start = idx + delimiter.len();
            // skip the rest of a multi-char delimiter
            for _ in 1..delimiter.chars().count() {
                iter.next();
            }
        }
    }
    parts.push(&text[start..]);
    parts
}
