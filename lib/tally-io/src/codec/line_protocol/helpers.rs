use std::borrow::Cow;

use nom::{
    error::{Error, ErrorKind},
    IResult,
};

/// Delimiters that end a measurement name.
pub const MEASUREMENT_DELIMITERS: &[char] = &[',', ' '];

/// Delimiters that end a tag key, tag value, or field key.
pub const KEY_DELIMITERS: &[char] = &[',', '=', ' '];

/// Returns a parser for a non-empty run of characters up to the first unescaped delimiter.
///
/// A backslash escapes a following delimiter. A backslash in front of anything else is kept as-is.
pub fn escaped_token<'a>(delimiters: &'static [char]) -> impl Fn(&'a str) -> IResult<&'a str, Cow<'a, str>> {
    move |input: &'a str| {
        let mut end = input.len();
        let mut has_escape = false;
        let mut chars = input.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            if c == '\\' {
                if let Some(&(_, next)) = chars.peek() {
                    if delimiters.contains(&next) {
                        has_escape = true;
                        chars.next();
                    }
                }
                continue;
            }

            if delimiters.contains(&c) {
                end = i;
                break;
            }
        }

        if end == 0 {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::TakeWhile1)));
        }

        let raw = &input[..end];
        let token = if has_escape {
            Cow::Owned(unescape(raw, delimiters))
        } else {
            Cow::Borrowed(raw)
        };

        Ok((&input[end..], token))
    }
}

fn unescape(raw: &str, escapable: &[char]) -> String {
    let mut unescaped = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if escapable.contains(&next) {
                    unescaped.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        unescaped.push(c);
    }

    unescaped
}

/// Parses a double-quoted string, where `\"` and `\\` are escapes.
pub fn string_literal(input: &str) -> IResult<&str, String> {
    let Some(body) = input.strip_prefix('"') else {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
    };

    let mut value = String::new();
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((&body[i + 1..], value)),
            '\\' => match chars.next() {
                Some((_, escaped @ ('"' | '\\'))) => value.push(escaped),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => break,
            },
            c => value.push(c),
        }
    }

    // Ran out of input before the closing quote.
    Err(nom::Err::Error(Error::new(input, ErrorKind::Char)))
}

/// Appends `value` to `out`, escaping any of the given delimiters.
pub fn push_escaped(out: &mut String, value: &str, delimiters: &[char]) {
    for c in value.chars() {
        if delimiters.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Appends `value` to `out` as a double-quoted string literal.
pub fn push_string_literal(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaped_token_stops_at_delimiter() {
        let parser = escaped_token(KEY_DELIMITERS);
        assert_eq!(parser("host=esx"), Ok(("=esx", Cow::Borrowed("host"))));
        assert_eq!(parser(r"data\ center=x"), Ok(("=x", Cow::Borrowed("data center"))));
        assert!(parser("=x").is_err());
    }

    #[test]
    fn escaped_token_keeps_other_backslashes() {
        let parser = escaped_token(MEASUREMENT_DELIMITERS);
        assert_eq!(parser(r"c:\temp x=1"), Ok((" x=1", Cow::Borrowed(r"c:\temp"))));
    }

    #[test]
    fn string_literal_escapes() {
        assert_eq!(
            string_literal(r#""say \"hi\"" rest"#),
            Ok((" rest", r#"say "hi""#.to_string()))
        );
        assert!(string_literal(r#""unterminated"#).is_err());
        assert!(string_literal("bare").is_err());
    }

    #[test]
    fn escaping_is_reversible() {
        let mut out = String::new();
        push_escaped(&mut out, "a b,c=d", KEY_DELIMITERS);
        assert_eq!(out, r"a\ b\,c\=d");

        let (rest, token) = escaped_token(KEY_DELIMITERS)(&out).unwrap();
        assert_eq!(rest, "");
        assert_eq!(token, "a b,c=d");
    }
}
