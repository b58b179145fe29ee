//! Format vocabulary: a fixed catalogue of string formats, each recognized
//! by name and validated against a string instance, built on the crates
//! already in this workspace's dependency graph: `fancy_regex` +
//! `once_cell::sync::Lazy` for pattern matching, and `url::Url` for the
//! URI/URI-reference grammar (`identifier.rs` already depends on `url`).
//! Vendor formats like `macaddr`, `iri`, `idn-hostname`, or `sha256` are
//! deliberately out of scope; `uri-template` and `relative-json-pointer`
//! round out the catalogue alongside the core set.

use addr::{parse_domain_name, parse_email_address};
use fancy_regex::Regex;
use once_cell::sync::Lazy;
use std::net::IpAddr;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use uuid::Uuid;

/// A recognized `format` name. `parse_name` returns `None` for any
/// string not in this catalogue, so unknown formats fall through to
/// [`crate::result::FormatValidity::Unknown`] rather than being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Date,
    DateTime,
    Time,
    Duration,
    Email,
    Hostname,
    Ipv4,
    Ipv6,
    Uuid,
    Uri,
    UriReference,
    UriTemplate,
    JsonPointer,
    RelativeJsonPointer,
    Regex,
}

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap());
static JSON_POINTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\/([^~]|(~[01]))*)*$").unwrap());
static RELATIVE_JSON_POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:0|[1-9][0-9]*)(?:#|(?:/(?:[^~/]|~0|~1)*)*)$").unwrap());
static URI_TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:(?:[^\x00-\x20"'<>%\\^`{|}]|%[0-9a-f]{2})|\{[+#./;?&=,!@|]?(?:[a-z0-9_]|%[0-9a-f]{2})+(?:\:[1-9][0-9]{0,3}|\*)?(?:,(?:[a-z0-9_]|%[0-9a-f]{2})+(?:\:[1-9][0-9]{0,3}|\*)?)*\})*$"#,
    )
    .unwrap()
});
static ISO_8601_DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^P(?:\d+W|(?:(?:\d+Y(?:\d+M)?(?:\d+D)?|\d+M(?:\d+D)?|\d+D)(?:T(?:\d+H(?:\d+M)?(?:\d+S)?|\d+M(?:\d+S)?|\d+S))?)|T(?:\d+H(?:\d+M)?(?:\d+S)?|\d+M(?:\d+S)?|\d+S))$",
    )
    .unwrap()
});

impl Format {
    pub fn parse_name(name: &str) -> Option<Format> {
        match name {
            "date" => Some(Format::Date),
            "date-time" => Some(Format::DateTime),
            "time" => Some(Format::Time),
            "duration" => Some(Format::Duration),
            "email" => Some(Format::Email),
            "hostname" => Some(Format::Hostname),
            "ipv4" => Some(Format::Ipv4),
            "ipv6" => Some(Format::Ipv6),
            "uuid" => Some(Format::Uuid),
            "uri" => Some(Format::Uri),
            "uri-reference" => Some(Format::UriReference),
            "uri-template" => Some(Format::UriTemplate),
            "json-pointer" => Some(Format::JsonPointer),
            "relative-json-pointer" => Some(Format::RelativeJsonPointer),
            "regex" => Some(Format::Regex),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::Date => "date",
            Format::DateTime => "date-time",
            Format::Time => "time",
            Format::Duration => "duration",
            Format::Email => "email",
            Format::Hostname => "hostname",
            Format::Ipv4 => "ipv4",
            Format::Ipv6 => "ipv6",
            Format::Uuid => "uuid",
            Format::Uri => "uri",
            Format::UriReference => "uri-reference",
            Format::UriTemplate => "uri-template",
            Format::JsonPointer => "json-pointer",
            Format::RelativeJsonPointer => "relative-json-pointer",
            Format::Regex => "regex",
        }
    }

    /// Whether `val` satisfies this format.
    pub fn validate(&self, val: &str) -> bool {
        match self {
            Format::Date => {
                DATE_RE.is_match(val).unwrap_or(false)
                    && time::Date::parse(val, &format_description!("[year]-[month]-[day]")).is_ok()
            }
            Format::DateTime => time::OffsetDateTime::parse(val, &Rfc3339).is_ok(),
            Format::Time => {
                let full_format = format_description!(
                    version = 2,
                    "[first
                    [[hour]:[minute]:[second][optional [.[subsecond]]]Z]
                    [[hour]:[minute]:[second][optional [.[subsecond]]]z]
                    [[hour]:[minute]:[second][optional [.[subsecond]]][offset_hour]:[offset_minute]]
                    ]"
                );
                time::Time::parse(val, &time::format_description::FormatItem::First(full_format)).is_ok()
            }
            Format::Duration => ISO_8601_DURATION_RE.is_match(val).unwrap_or(false),
            Format::Email => parse_email_address(val).is_ok(),
            Format::Hostname => parse_domain_name(val).is_ok(),
            Format::Ipv4 => {
                !val.split('.').any(|octet| octet.len() > 1 && octet.starts_with('0'))
                    && matches!(IpAddr::from_str(val), Ok(IpAddr::V4(_)))
            }
            Format::Ipv6 => matches!(IpAddr::from_str(val), Ok(IpAddr::V6(_))),
            Format::Uuid if val.len() == 36 => Uuid::parse_str(val).is_ok(),
            Format::Uuid => false,
            Format::Uri => url::Url::parse(val).is_ok(),
            Format::UriReference => {
                url::Url::parse(val).is_ok() || url::Url::options().base_url(Some(&placeholder_base())).parse(val).is_ok()
            }
            Format::UriTemplate => URI_TEMPLATE_RE.is_match(val).unwrap_or(false),
            Format::JsonPointer => JSON_POINTER_RE.is_match(val).unwrap_or(false),
            Format::RelativeJsonPointer => RELATIVE_JSON_POINTER_RE.is_match(val).unwrap_or(false),
            Format::Regex => fancy_regex::Regex::new(val).is_ok(),
        }
    }
}

/// A base URL only used to test whether a string is a valid
/// *relative-or-absolute* URI reference (`uri-reference`); the authority is
/// never surfaced to callers.
fn placeholder_base() -> url::Url {
    url::Url::parse("https://json-schema.invalid/").expect("static URL is well-formed")
}
