use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";

/// Terminal columns a string occupies (CJK and emoji count as two).
///
/// ```
/// use gamedex::util::display_width;
///
/// assert_eq!(display_width("Hades"), 5);
/// assert_eq!(display_width("大神"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cuts `s` to at most `max_width` columns, ending with "..." when it had to
/// cut. Widths of 3 or less get a plain prefix with no ellipsis.
///
/// ```
/// use gamedex::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Portal 2", 20), "Portal 2");
/// assert_eq!(truncate_to_width("The Witcher 3: Wild Hunt", 12), "The Witch...");
/// assert_eq!(truncate_to_width("Celeste", 2), "Ce");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let room = if max_width > ELLIPSIS.len() {
        max_width - ELLIPSIS.len()
    } else {
        max_width
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > room {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    if max_width > ELLIPSIS.len() {
        Cow::Owned(format!("{}{ELLIPSIS}", &s[..end]))
    } else {
        Cow::Owned(s[..end].to_string())
    }
}

/// Removes terminal control characters and ANSI escape sequences from text
/// that came over the network (game names, descriptions, comments).
///
/// Tabs and newlines survive. Clean input is returned borrowed.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let dirty = s
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\t');
    if !dirty {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => match chars.peek() {
                // CSI: parameters until a final byte in @..~
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
                // OSC: until BEL or ESC \
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\u{7}' {
                            break;
                        }
                        if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\n' | '\t' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Block-level tags that end a line of text.
const BREAK_TAGS: &[&str] = &["br", "p", "div", "li", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol"];

/// Turns the HTML game descriptions the catalog returns into plain text.
///
/// Tags are dropped, block tags become line breaks, common entities are
/// decoded, and runs of blank lines collapse to one.
///
/// ```
/// use gamedex::util::html_to_text;
///
/// assert_eq!(
///     html_to_text("<p>Defy the god of the dead.</p><p>Rogue&#39;s gallery &amp; more</p>"),
///     "Defy the god of the dead.\n\nRogue's gallery & more"
/// );
/// ```
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(pos) = rest.find(&['<', '&'][..]) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if rest.starts_with('<') {
            let Some(close) = rest.find('>') else {
                // Unterminated tag: keep the text as-is
                out.push_str(rest);
                rest = "";
                break;
            };
            let tag = &rest[1..close];
            let closing = tag.starts_with('/');
            let name: String = tag
                .trim_start_matches('/')
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase();
            match (name.as_str(), closing) {
                ("li", false) => out.push_str("\n- "),
                ("li", true) => {}
                ("p", true) => out.push_str("\n\n"),
                (name, _) if BREAK_TAGS.contains(&name) => out.push('\n'),
                _ => {}
            }
            rest = &rest[close + 1..];
        } else {
            let (decoded, used) = decode_entity(rest);
            out.push_str(decoded.as_ref());
            rest = &rest[used..];
        }
    }
    out.push_str(rest);

    collapse_blank_lines(&out)
}

/// Decodes the entity at the start of `s`, returning the text and the bytes
/// consumed. Unknown entities pass through as a literal '&'.
fn decode_entity(s: &str) -> (Cow<'static, str>, usize) {
    let Some(end) = s.find(';').filter(|&end| end <= 10) else {
        return (Cow::Borrowed("&"), 1);
    };
    let name = &s[1..end];
    let text: Option<Cow<'static, str>> = match name {
        "amp" => Some(Cow::Borrowed("&")),
        "lt" => Some(Cow::Borrowed("<")),
        "gt" => Some(Cow::Borrowed(">")),
        "quot" => Some(Cow::Borrowed("\"")),
        "apos" => Some(Cow::Borrowed("'")),
        "nbsp" => Some(Cow::Borrowed(" ")),
        "mdash" => Some(Cow::Borrowed("-")),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()
            } else {
                name.strip_prefix('#').and_then(|dec| dec.parse().ok())
            };
            code.and_then(char::from_u32)
                .map(|c| Cow::Owned(c.to_string()))
        }
    };
    match text {
        Some(text) => (text, end + 1),
        None => (Cow::Borrowed("&"), 1),
    }
}

fn collapse_blank_lines(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut blank_run = 0;
    for line in s.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line.trim_start());
        out.push('\n');
    }
    out.trim_end().to_string()
}
