//! Line protocol.
//!
//! Each line describes one metric:
//!
//! ```text
//! <measurement>[,<tag_key>=<tag_value>...] <field_key>=<field_value>[,<field_key>=<field_value>...] [<timestamp>]
//! ```
//!
//! Field values are floats by default (`12.5`, `128`), signed integers with an `i` suffix (`128i`), unsigned integers
//! with a `u` suffix (`128u`), booleans (`t`, `true`, `f`, `false`, in any case), or double-quoted strings. Timestamps
//! are nanoseconds since the Unix epoch; a line without one is stamped with the current time.

use std::borrow::Cow;

use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit1, space0},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::{many0, separated_list1},
    number::complete::double,
    sequence::{pair, preceded, separated_pair, terminated},
    IResult, Parser as _,
};
use snafu::{ResultExt as _, Snafu};
use tally_core::data_model::metric::{FieldValue, Fields, Metric, MetricError, MetricType, Tags};

mod encode;
pub use self::encode::{encode_metric, to_line};

mod helpers;
use self::helpers::*;

/// A line protocol parsing error.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ParseError {
    /// The line was not valid line protocol.
    #[snafu(display("Invalid line protocol at column {}: '{}'", column, line))]
    Syntax {
        /// The offending line.
        line: String,

        /// One-based column where parsing stopped.
        column: usize,
    },

    /// The line was valid line protocol but did not describe a valid metric.
    #[snafu(display("Line does not describe a valid metric: '{}'", line))]
    InvalidMetric {
        /// The offending line.
        line: String,

        /// Error source.
        source: MetricError,
    },
}

struct RawLine<'a> {
    measurement: Cow<'a, str>,
    tags: Vec<(Cow<'a, str>, Cow<'a, str>)>,
    fields: Vec<(Cow<'a, str>, FieldValue)>,
    timestamp: Option<u64>,
}

/// Parses a single line into a metric, stamping it with the current time if it carries no timestamp.
///
/// # Errors
///
/// If the line is not valid line protocol, or does not describe a valid metric, an error is returned.
pub fn parse_line(line: &str) -> Result<Metric, ParseError> {
    parse_line_with_default_timestamp(line, now_nanos())
}

/// Parses a single line into a metric, using `default_timestamp` if the line carries no timestamp.
///
/// Trailing line terminators are ignored.
///
/// # Errors
///
/// If the line is not valid line protocol, or does not describe a valid metric, an error is returned.
pub fn parse_line_with_default_timestamp(line: &str, default_timestamp: u64) -> Result<Metric, ParseError> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    let raw = match all_consuming(raw_line).parse(trimmed) {
        Ok((_, raw)) => raw,
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            return Err(ParseError::Syntax {
                line: trimmed.to_string(),
                column: trimmed.len() - e.input.len() + 1,
            })
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(ParseError::Syntax {
                line: trimmed.to_string(),
                column: trimmed.len() + 1,
            })
        }
    };

    let tags = raw
        .tags
        .into_iter()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect::<Tags>();
    let fields = raw
        .fields
        .into_iter()
        .map(|(k, v)| (k.into_owned(), v))
        .collect::<Fields>();

    Metric::try_from_parts(
        raw.measurement,
        tags,
        fields,
        raw.timestamp.unwrap_or(default_timestamp),
        MetricType::Untyped,
    )
    .context(InvalidMetric { line: trimmed })
}

/// Parses every line of `input`, skipping blank lines and `#` comments.
///
/// Lines are parsed independently, so one bad line does not affect the others.
pub fn parse_lines(input: &str) -> impl Iterator<Item = Result<Metric, ParseError>> + '_ {
    let default_timestamp = now_nanos();
    input
        .lines()
        .filter(|line| is_metric_line(line))
        .map(move |line| parse_line_with_default_timestamp(line, default_timestamp))
}

/// Returns `true` if the line is neither blank nor a comment.
pub fn is_metric_line(line: &str) -> bool {
    let line = line.trim_start();
    !line.is_empty() && !line.starts_with('#')
}

fn now_nanos() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .and_then(|nanos| u64::try_from(nanos).ok())
        .unwrap_or_default()
}

fn raw_line(input: &str) -> IResult<&str, RawLine<'_>> {
    let (remaining, measurement) = escaped_token(MEASUREMENT_DELIMITERS)(input)?;
    let (remaining, tags) = many0(preceded(char(','), separated_pair(key, char('='), key))).parse(remaining)?;
    let (remaining, fields) = preceded(
        char(' '),
        separated_list1(char(','), separated_pair(key, char('='), field_value)),
    )
    .parse(remaining)?;
    let (remaining, timestamp) = terminated(opt(preceded(char(' '), timestamp)), space0).parse(remaining)?;

    Ok((
        remaining,
        RawLine {
            measurement,
            tags,
            fields,
            timestamp,
        },
    ))
}

fn key(input: &str) -> IResult<&str, Cow<'_, str>> {
    escaped_token(KEY_DELIMITERS)(input)
}

fn timestamp(input: &str) -> IResult<&str, u64> {
    map_res(digit1, str::parse::<u64>).parse(input)
}

fn field_value(input: &str) -> IResult<&str, FieldValue> {
    alt((
        map(string_literal, FieldValue::String),
        map(signed_integer, FieldValue::I64),
        map(unsigned_integer, FieldValue::U64),
        map(boolean, FieldValue::Bool),
        map(double, FieldValue::F64),
    ))
    .parse(input)
}

fn signed_integer(input: &str) -> IResult<&str, i64> {
    map_res(
        terminated(recognize(pair(opt(char('-')), digit1)), char('i')),
        str::parse::<i64>,
    )
    .parse(input)
}

fn unsigned_integer(input: &str) -> IResult<&str, u64> {
    map_res(terminated(digit1, char('u')), str::parse::<u64>).parse(input)
}

fn boolean(input: &str) -> IResult<&str, bool> {
    alt((
        value(true, tag_no_case("true")),
        value(false, tag_no_case("false")),
        value(true, tag_no_case("t")),
        value(false, tag_no_case("f")),
    ))
    .parse(input)
}
