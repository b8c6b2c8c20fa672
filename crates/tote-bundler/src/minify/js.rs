//! Whitespace and comment removal for scripts.
//!
//! A single forward scan that understands strings, template literals and
//! regular expression literals well enough to leave them untouched. Names
//! are never mangled and statements are never reordered. Newlines that may
//! end a statement are kept so automatic semicolon insertion still applies.

const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "case", "do", "else", "in", "of", "new", "delete", "void",
    "throw", "yield", "await",
];

pub fn minify_js(source: &str) -> String {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut out: Vec<u8> = Vec::with_capacity(len);
    let mut i = 0;

    while i < len {
        let byte = bytes[i];
        match byte {
            b'\'' | b'"' => {
                let end = skip_string(bytes, i);
                out.extend_from_slice(&bytes[i..end]);
                i = end;
            }
            b'`' => {
                let end = skip_template(bytes, i);
                out.extend_from_slice(&bytes[i..end]);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = find(bytes, i + 2, b"*/").map(|p| p + 2).unwrap_or(len);
                let had_newline = bytes[i..end].contains(&b'\n');
                i = end;
                // A comment separates tokens like whitespace does.
                push_separator(&mut out, bytes, i, had_newline);
            }
            b'/' if regex_allowed(&out) => {
                let end = skip_regex(bytes, i);
                out.extend_from_slice(&bytes[i..end]);
                i = end;
            }
            b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => {
                let start = i;
                while i < len && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c) {
                    i += 1;
                }
                let had_newline = bytes[start..i].contains(&b'\n');
                push_separator(&mut out, bytes, i, had_newline);
            }
            _ => {
                out.push(byte);
                i += 1;
            }
        }
    }

    while out.last().is_some_and(|b| b.is_ascii_whitespace()) {
        out.pop();
    }
    String::from_utf8(out).unwrap_or_else(|_| source.to_string())
}

/// Emit whatever must stand in for a run of whitespace (or a comment)
/// between the output so far and `bytes[next..]`.
fn push_separator(out: &mut Vec<u8>, bytes: &[u8], next: usize, had_newline: bool) {
    let Some(&prev) = out.last() else {
        return;
    };
    let next_byte = next_significant(bytes, next);
    let Some(next_byte) = next_byte else {
        return;
    };

    if prev == b'\n' || prev == b' ' {
        // Already separated; upgrade a space to a newline if needed.
        if had_newline && prev == b' ' {
            out.pop();
            out.push(b'\n');
        }
        return;
    }

    if had_newline {
        if !b"{;,([".contains(&prev) && !b"});,]".contains(&next_byte) {
            out.push(b'\n');
            return;
        }
        if needs_space(prev, next_byte) {
            out.push(b' ');
        }
        return;
    }

    if needs_space(prev, next_byte) {
        out.push(b' ');
    }
}

fn next_significant(bytes: &[u8], mut i: usize) -> Option<u8> {
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = find(bytes, i + 2, b"*/").map(|p| p + 2).unwrap_or(bytes.len());
            }
            other => return Some(other),
        }
    }
    None
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$' || byte >= 0x80
}

fn needs_space(prev: u8, next: u8) -> bool {
    (is_ident_byte(prev) && is_ident_byte(next))
        || (prev == b'+' && next == b'+')
        || (prev == b'-' && next == b'-')
        || (prev == b'/' && next == b'/')
        || (prev.is_ascii_digit() && next == b'.')
}

/// Whether a `/` at this point starts a regular expression literal rather
/// than a division, judged from the previous token.
fn regex_allowed(out: &[u8]) -> bool {
    let trimmed = match out.iter().rposition(|b| !b.is_ascii_whitespace()) {
        Some(pos) => &out[..=pos],
        None => return true,
    };
    let last = trimmed[trimmed.len() - 1];
    if last == b')' || last == b']' {
        return false;
    }
    if is_ident_byte(last) {
        let start = trimmed
            .iter()
            .rposition(|b| !is_ident_byte(*b))
            .map(|p| p + 1)
            .unwrap_or(0);
        let word = &trimmed[start..];
        return REGEX_KEYWORDS.iter().any(|k| k.as_bytes() == word);
    }
    true
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// End of the template literal starting at `start`, including nested
/// `${ … }` expressions with their own strings and templates.
fn skip_template(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return i + 1,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                i += 2;
                let mut depth = 1usize;
                while i < bytes.len() && depth > 0 {
                    match bytes[i] {
                        b'{' => {
                            depth += 1;
                            i += 1;
                        }
                        b'}' => {
                            depth -= 1;
                            i += 1;
                        }
                        b'\'' | b'"' => i = skip_string(bytes, i),
                        b'`' => i = skip_template(bytes, i),
                        _ => i += 1,
                    }
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_regex(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                return i;
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_indentation() {
        let src = "// header\nfunction add(a, b) {\n    /* sum */\n    return a + b;\n}\n";
        assert_eq!(minify_js(src), "function add(a,b){return a+b;}");
    }

    #[test]
    fn keeps_statement_ending_newlines() {
        let src = "let a = 1\nlet b = a\n(b)";
        assert_eq!(minify_js(src), "let a=1\nlet b=a\n(b)");
    }

    #[test]
    fn literals_are_untouched() {
        let src = "const s = 'a  // b';\nconst t = `x  ${ y + `/* z */` }  w`;\nconst r = /a  \\/ [/]b/g.test(s);";
        let out = minify_js(src);
        assert!(out.contains("'a  // b'"));
        assert!(out.contains("`x  ${ y + `/* z */` }  w`"));
        assert!(out.contains("/a  \\/ [/]b/g.test(s)"));
    }

    #[test]
    fn division_is_not_a_regex() {
        assert_eq!(minify_js("var x = (a) / 2 / b;"), "var x=(a)/2/b;");
        assert_eq!(minify_js("return /x/.test(s)"), "return/x/.test(s)");
    }

    #[test]
    fn operators_that_would_merge_keep_a_space() {
        assert_eq!(minify_js("a + +b; c - -d; 1 .toString()"), "a+ +b;c- -d;1 .toString()");
    }
}
