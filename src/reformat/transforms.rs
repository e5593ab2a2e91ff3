//! The individual reformatting transforms, in pipeline order.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Hyphen, then a single line break with optional horizontal whitespace
    // on either side.
    static ref HYPHEN_BREAK: Regex = Regex::new(r"-[^\S\n]*\n[^\S\n]*").unwrap();
    static ref BLANK_RUN: Regex = Regex::new(r"\n(?:[^\S\n]*\n){2,}").unwrap();
    static ref SPACE_RUN: Regex = Regex::new(r"[ ]{2,}").unwrap();
}

/// Characters that end a line on purpose. ASCII '.' is not one of them.
const TERMINATORS: &[char] = &[
    '。', '．', '！', '!', '？', '?', '、', '，', '…', '」', '』', '】', '）', '〉', '》', '〕',
    '］', '＞', '>', ')', ']',
];

/// Punctuation that takes a space before a following word.
const CLAUSE_PUNCTUATION: &[char] = &['.', ',', ';', ':'];

const LIST_MARKERS: &[char] = &[
    '・', '-', '—', '―', '○', '●', '◇', '◆', '▶', '▷', '■', '□', '*', '•',
];

fn is_list_marker(c: char) -> bool {
    LIST_MARKERS.contains(&c) || ('①'..='⑳').contains(&c)
}

fn is_horizontal_space(c: char) -> bool {
    c.is_whitespace() && c != '\n'
}

fn is_blank(line: &str) -> bool {
    line.chars().all(char::is_whitespace)
}

/// Remove soft hyphens (U+00AD).
pub fn remove_soft_hyphens(text: &str) -> String {
    text.replace('\u{00AD}', "")
}

/// Join a word split across a line break by a hyphen.
///
/// Only applies between two ASCII letters, so dashes before list items,
/// numbers and CJK text are kept.
pub fn join_hyphenated_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in HYPHEN_BREAK.find_iter(text) {
        let before = text[..m.start()].chars().next_back();
        let after = text[m.end()..].chars().next();
        let joinable = matches!((before, after), (Some(b), Some(a))
            if b.is_ascii_alphabetic() && a.is_ascii_alphabetic());
        if joinable {
            out.push_str(&text[last..m.start()]);
            last = m.end();
        }
    }

    out.push_str(&text[last..]);
    out
}

/// Join lines that were broken in the middle of a sentence.
///
/// A break between two non-blank lines is removed when the first line does
/// not end with a terminator and the second does not start with a list
/// marker. Leading spaces and tabs of the joined line are dropped. A space is
/// put in between after an ASCII alphanumeric, or after one of `. , ; :`
/// followed by an ASCII alphanumeric ("Fig.\n1" → "Fig. 1"). Brackets,
/// slashes and CJK text are joined without one.
pub fn join_wrapped_lines(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out = String::with_capacity(text.len());
    let mut continuation = false;

    for (i, &raw) in lines.iter().enumerate() {
        let line = if continuation {
            raw.trim_start_matches([' ', '\t'])
        } else {
            raw
        };

        let Some(&next) = lines.get(i + 1) else {
            out.push_str(line);
            break;
        };

        continuation = is_wrapped_break(raw, next);
        if !continuation {
            out.push_str(line);
            out.push('\n');
            continue;
        }

        let line = line.strip_suffix('\r').unwrap_or(line);
        out.push_str(line);

        let prev = line.chars().next_back();
        let following = next.trim_start_matches([' ', '\t']).chars().next();
        if needs_space(prev, following) {
            out.push(' ');
        }
    }

    out
}

fn is_wrapped_break(line: &str, next: &str) -> bool {
    if is_blank(line) || is_blank(next) {
        return false;
    }
    let ends_on_terminator = line
        .trim_end()
        .chars()
        .next_back()
        .map_or(false, |c| TERMINATORS.contains(&c));
    let starts_with_marker = next
        .trim_start_matches(is_horizontal_space)
        .chars()
        .next()
        .map_or(false, is_list_marker);
    !ends_on_terminator && !starts_with_marker
}

fn needs_space(prev: Option<char>, next: Option<char>) -> bool {
    match (prev, next) {
        (Some(p), _) if p.is_ascii_alphanumeric() => true,
        (Some(p), Some(n)) => CLAUSE_PUNCTUATION.contains(&p) && n.is_ascii_alphanumeric(),
        _ => false,
    }
}

/// Collapse three or more line breaks into exactly two.
///
/// Lines holding only whitespace count as blank and are removed with the
/// run.
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN.replace_all(text, "\n\n").into_owned()
}

/// Collapse runs of ASCII spaces into one. Full-width spaces are kept.
pub fn normalize_latin_spacing(text: &str) -> String {
    SPACE_RUN.replace_all(text, " ").into_owned()
}

/// Trim whitespace at both ends of every line, keeping the line count.
pub fn trim_line_edges(text: &str) -> String {
    text.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}
