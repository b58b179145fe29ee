use addr::{parse_domain_name, parse_email_address};
use bigdecimal::BigDecimal;
use iri_string::spec::{IriSpec, UriSpec};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{net::IpAddr, str::FromStr};
use time::macros::format_description;
use uuid::Uuid;

use crate::validator::ValidationResult;

#[derive(Debug, Deserialize, Serialize, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Format {
    Date,
    #[serde(rename = "date-time", alias = "datetime")]
    DateTime,
    Time,
    Email,
    Hostname,
    /// IdnHostname is parsed but is not supported (validation always fails).
    #[serde(rename = "idn-hostname")]
    IdnHostname,
    /// IdnEmail is parsed but is not supported (validation always fails).
    #[serde(rename = "idn-email")]
    IdnEmail,
    Ipv4,
    Ipv6,
    Macaddr,
    Macaddr8,
    Uuid,
    Duration,
    Iri,
    Uri,
    #[serde(rename = "uri-reference")]
    UriReference,
    #[serde(rename = "iri-reference")]
    IriReference,
    #[serde(rename = "uri-template")]
    UriTemplate,
    #[serde(rename = "json-pointer")]
    JsonPointer,
    #[serde(rename = "regex")]
    Regex,
    #[serde(rename = "relative-json-pointer")]
    RelativeJsonPointer,
    #[serde(alias = "uint32", alias = "uint64")]
    Integer,
    Number,
    #[serde(rename = "sha256")]
    Sha256,
}

// Some are from https://github.com/JamesNK/Newtonsoft.Json.Schema/blob/master/Src/Newtonsoft.Json.Schema/Infrastructure/FormatHelpers.cs
// Some are artisinally crafted
lazy_static::lazy_static! {
    static ref DATE_RE: Regex =
        Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}\z").expect("Is a valid regex");
    static ref RELATIVE_JSON_POINTER_RE: Regex =
        Regex::new(r"^(?:0|[1-9][0-9]*)(?:#|(?:/(?:[^~/]|~0|~1)*)*)\z").expect("Is a valid regex");
    static ref URI_TEMPLATE_RE: Regex = Regex::new(
        r#"^(?:(?:[^\x00-\x20""'<>%\\^`{|}]|%[0-9a-f]{2})|\{[+#.\/;?&=,!@|]?(?:[a-z0-9_]|%[0-9a-f]{2})+(?:\:[1-9][0-9]{0,3}|\*)?(?:,(?:[a-z0-9_]|%[0-9a-f]{2})+(?:\:[1-9][0-9]{0,3}|\*)?)*\})*$"#
    )
    .expect("Is a valid regex");
    static ref ISO_8601_DURATION_RE: Regex = Regex::new(r"^P(?:\d+W|(?:(?:\d+Y(?:\d+M)?(?:\d+D)?|\d+M(?:\d+D)?|\d+D)(?:T(?:\d+H(?:\d+M)?(?:\d+S)?|\d+M(?:\d+S)?|\d+S))?)|T(?:\d+H(?:\d+M)?(?:\d+S)?|\d+M(?:\d+S)?|\d+S))$").expect("Is a valid regex");
    static ref JSON_POINTER_RE: Regex = Regex::new(r"^(\/([^~]|(~[01]))*)*$").expect("Is a valid regex");
    static ref MACADDR: Regex = Regex::new(r"^([0-9A-Fa-f]{2}[:-]?){5}[0-9A-Fa-f]{2}$").expect("Is a valid regex");
    static ref MACADDR8: Regex = Regex::new(r"^([0-9A-Fa-f]{2}[:-]?){7}[0-9A-Fa-f]{2}$").expect("Is a valid regex");
}

impl ToString for Format {
    fn to_string(&self) -> String {
        if let serde_json::Value::String(s) = serde_json::json!(self) {
            s
        } else {
            panic!("Format must serialize as JSON string")
        }
    }
}

impl Format {
    pub fn validate(&self, val: &str) -> ValidationResult {
        match self {
            Self::Date => {
                // Padding with zeroes is ignored by the underlying parser. The most efficient
                // way to check it will be to use a custom parser that won't ignore zeroes,
                // but this regex will do the trick and costs ~20% extra time in this validator.
                if !DATE_RE.is_match(val) {
                    return ValidationResult::Invalid(None);
                }
                ValidationResult::from(time::Date::parse(
                    val,
                    &format_description!("[year]-[month]-[day]"),
                ))
            }
            Self::DateTime => ValidationResult::from(time::OffsetDateTime::parse(
                val,
                &time::format_description::well_known::Rfc3339,
            )),
            Self::Time => {
                // [first] will choose the first matching format to parse the value
                // see https://time-rs.github.io/book/api/format-description.html for more info
                let full_format = format_description!(
                    version = 2,
                    "[first
                    [[hour]:[minute]:[second][optional [.[subsecond]]]Z]
                    [[hour]:[minute]:[second][optional [.[subsecond]]]z]
                    [[hour]:[minute]:[second][optional [.[subsecond]]][offset_hour]:[offset_minute]]
                    ]"
                );

                ValidationResult::from(time::Time::parse(
                    val,
                    &time::format_description::FormatItem::First(full_format),
                ))
            }
            Self::Email => ValidationResult::from(parse_email_address(val)),
            Self::Hostname => ValidationResult::from(parse_domain_name(val)),
            // The rules/test cases for these are absolutely bonkers
            // If we end up needing this let's revisit (jshearer)
            Self::IdnHostname | Self::IdnEmail => {
                ValidationResult::Invalid(Some(format!("{self:?} is not supported")))
            }
            Self::Ipv4 => {
                if val.starts_with('0') {
                    return ValidationResult::Invalid(None);
                }
                match IpAddr::from_str(val) {
                    Ok(i) => ValidationResult::from(i.is_ipv4()),
                    Err(e) => ValidationResult::Invalid(Some(e.to_string())),
                }
            }
            Self::Ipv6 => ValidationResult::from(match IpAddr::from_str(val) {
                Ok(i) => ValidationResult::from(i.is_ipv6()),
                Err(e) => ValidationResult::Invalid(Some(e.to_string())),
            }),
            Self::Macaddr => ValidationResult::from(MACADDR.is_match(val)),
            Self::Macaddr8 => ValidationResult::from(MACADDR8.is_match(val)),
            // uuid crate supports non-hyphenated inputs, jsonschema does not
            Self::Uuid if val.len() == 36 => ValidationResult::from(Uuid::parse_str(val)),
            Self::Uuid => ValidationResult::Invalid(Some(format!(
                "{val} is the wrong length (missing hyphens?)"
            ))),

            Self::Duration => ValidationResult::from(ISO_8601_DURATION_RE.is_match(val)),
            Self::Iri => ValidationResult::from(iri_string::validate::iri::<IriSpec>(val)),
            Self::Uri => ValidationResult::from(iri_string::validate::iri::<UriSpec>(val)),
            Self::UriReference => {
                ValidationResult::from(iri_string::validate::iri_reference::<UriSpec>(val))
            }
            Self::IriReference => {
                ValidationResult::from(iri_string::validate::iri_reference::<IriSpec>(val))
            }
            Self::UriTemplate => ValidationResult::from(URI_TEMPLATE_RE.is_match(val)),
            Self::JsonPointer => ValidationResult::from(JSON_POINTER_RE.is_match(val)),
            Self::Regex => ValidationResult::from(Regex::new(val)),
            Self::RelativeJsonPointer => {
                ValidationResult::from(RELATIVE_JSON_POINTER_RE.is_match(val))
            }
            Self::Integer => ValidationResult::from(
                BigDecimal::from_str(val)
                    .map(|d| d.is_integer())
                    .unwrap_or(false)
                    && !val.contains("_"),
            ),
            Self::Number => ValidationResult::from(
                BigDecimal::from_str(val).is_ok() && !val.contains("_")
                    || ["NaN", "Infinity", "-Infinity"].contains(&val),
            ),
            Self::Sha256 => ValidationResult::from(
                // See also doc::redact::Strategy::apply() for Sha256.
                val.len() == 71
                    && &val.as_bytes()[0..7] == b"sha256:"
                    && val[7..].bytes().all(|b| b.is_ascii_hexdigit()),
            ),
        }
    }

    // Detect the Format matched by a given, arbitrary string (if any).
    pub fn detect(val: &str) -> Option<Self> {
        match val {
            _ if Format::Integer.validate(val).is_ok() => Some(Format::Integer),
            _ if Format::Number.validate(val).is_ok() => Some(Format::Number),
            _ if Format::DateTime.validate(val).is_ok() => Some(Format::DateTime),
            _ if Format::Date.validate(val).is_ok() => Some(Format::Date),
            _ if Format::Uuid.validate(val).is_ok() => Some(Format::Uuid),
            _ if Format::Sha256.validate(val).is_ok() => Some(Format::Sha256),
            _ => None,
        }
    }
}
