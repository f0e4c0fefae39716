//! Tokenizer for property address text.
//!
//! ```text
//! addr    := segment ("." segment)*
//! segment := name ("<" key ">")?
//! ```
//!
//! Inside `<...>` a `.` is literal and `\` escapes the next character, so
//! the raw key text is handed to the key codec untouched. An unescaped `<`
//! inside a key block is rejected.

use crate::error::{PropertyError, PropertyResult};

/// One `name<key>` segment, with the key text still escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    pub name: String,
    pub key: Option<String>,
}

pub(crate) fn parse_segments(input: &str) -> PropertyResult<Vec<Segment>> {
    let fail = |reason: &str| PropertyError::malformed(input, reason);
    let mut segments = Vec::new();
    let mut name = String::new();
    let mut key: Option<String> = None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if name.is_empty() {
                    return Err(fail("empty segment"));
                }
                segments.push(Segment {
                    name: std::mem::take(&mut name),
                    key: key.take(),
                });
            }
            '<' => {
                if name.is_empty() {
                    return Err(fail("key block without a field name"));
                }
                if key.is_some() {
                    return Err(fail("more than one key block in a segment"));
                }
                key = Some(read_key(&mut chars).ok_or_else(|| fail("unterminated key block"))?);
            }
            '>' => return Err(fail("unbalanced '>'")),
            _ if key.is_some() => return Err(fail("text after a key block")),
            _ => name.push(c),
        }
    }
    if name.is_empty() {
        return Err(fail(if segments.is_empty() { "empty address" } else { "trailing '.'" }));
    }
    segments.push(Segment { name, key });
    Ok(segments)
}

/// Consume a key block up to its closing `>`, which is not included.
/// Returns `None` if the block never closes or contains a stray `<`.
fn read_key(chars: &mut std::str::Chars<'_>) -> Option<String> {
    let mut raw = String::new();
    loop {
        match chars.next()? {
            '>' => return Some(raw),
            '<' => return None,
            '\\' => {
                raw.push('\\');
                raw.push(chars.next()?);
            }
            c => raw.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(name: &str, key: Option<&str>) -> Segment {
        Segment {
            name: name.into(),
            key: key.map(Into::into),
        }
    }

    #[test]
    fn plain_path() {
        assert_eq!(
            parse_segments("testproto.mysingle.mystring").unwrap(),
            vec![seg("testproto", None), seg("mysingle", None), seg("mystring", None)]
        );
    }

    #[test]
    fn keys_may_hold_dots_and_escaped_brackets() {
        assert_eq!(
            parse_segments("testproto<{24}root>.m<{24}a.b\\>c>.mystring").unwrap(),
            vec![
                seg("testproto", Some("{24}root")),
                seg("m", Some("{24}a.b\\>c")),
                seg("mystring", None)
            ]
        );
    }

    #[test]
    fn rejects_malformed() {
        for input in [
            "",
            ".a",
            "a.",
            "a..b",
            "a<{24}x",
            "a>b",
            "<{24}x>",
            "a<{24}x>b",
            "a<{24}x><{24}y>",
            "a<{24}x<y>",
            "a<{24}x\\",
        ] {
            assert!(
                matches!(parse_segments(input), Err(PropertyError::Malformed { .. })),
                "{input:?} should be rejected"
            );
        }
    }
}
