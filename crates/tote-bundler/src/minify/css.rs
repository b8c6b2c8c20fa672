//! Stylesheet minification: comments and insignificant whitespace only.

pub fn minify_css(source: &str) -> String {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut out: Vec<u8> = Vec::with_capacity(len);
    let mut pending_space = false;
    let mut i = 0;

    while i < len {
        let byte = bytes[i];
        match byte {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = bytes[i + 2..]
                    .windows(2)
                    .position(|w| w == b"*/")
                    .map(|p| i + 2 + p + 2)
                    .unwrap_or(len);
                pending_space = true;
            }
            b'"' | b'\'' => {
                flush_space(&mut out, &mut pending_space, byte);
                let start = i;
                i += 1;
                while i < len && bytes[i] != byte {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i = (i + 1).min(len);
                out.extend_from_slice(&bytes[start..i]);
            }
            _ if byte.is_ascii_whitespace() => {
                pending_space = true;
                i += 1;
            }
            b':' if pending_space && in_selector(&bytes[i..]) => {
                // `a :hover` and `a:hover` select different things.
                flush_space(&mut out, &mut pending_space, b'.');
                out.push(byte);
                i += 1;
            }
            b'{' | b'}' | b';' | b',' | b'>' | b':' => {
                pending_space = false;
                if byte == b'}' && out.last() == Some(&b';') {
                    out.pop();
                }
                out.push(byte);
                i += 1;
            }
            _ => {
                flush_space(&mut out, &mut pending_space, byte);
                out.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8(out).unwrap_or_else(|_| source.to_string())
}

fn flush_space(out: &mut Vec<u8>, pending: &mut bool, next: u8) {
    if *pending {
        let glued = matches!(out.last(), None | Some(b'{' | b'}' | b';' | b',' | b'>' | b':'));
        if !glued && next != b')' {
            out.push(b' ');
        }
        *pending = false;
    }
}

/// A selector is followed by `{`; a declaration ends at `;` or `}`.
fn in_selector(rest: &[u8]) -> bool {
    rest.iter()
        .find(|b| matches!(b, b'{' | b'}' | b';'))
        .is_some_and(|b| *b == b'{')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_comments_and_whitespace() {
        let src = "/* banner */\n.a,\n.b > .c {\n  color: red;\n  margin: 0 auto;\n}\n";
        assert_eq!(minify_css(src), ".a,.b>.c{color:red;margin:0 auto}");
    }

    #[test]
    fn strings_are_preserved() {
        let src = ".a::before { content: \"a  ;  b\"; }";
        assert_eq!(minify_css(src), ".a::before{content:\"a  ;  b\"}");
    }

    #[test]
    fn descendant_pseudo_class_keeps_space() {
        assert_eq!(minify_css(".a :hover { color : red }"), ".a :hover{color:red}");
    }

    #[test]
    fn nested_blocks() {
        let src = "@media (max-width: 600px) {\n  .a { display: none; }\n}";
        assert_eq!(minify_css(src), "@media (max-width:600px){.a{display:none}}");
    }
}
