// ── Identifier resolver ──
//
// Turns decoded QR text into a spool id. Two label formats exist in the
// wild: Spoolman's web links (`https://host/.../spool/show/123`) and the
// `web+spoolman:s-123` protocol-handler form. Anything else is rejected.

use url::Url;

use crate::error::CoreError;
use crate::model::SpoolId;

/// Resolve scanned text to a spool id. Pure; the text is not trimmed.
pub fn resolve(raw: &str) -> Result<SpoolId, CoreError> {
    from_url(raw)
        .or_else(|| from_scheme_ref(raw))
        .ok_or_else(|| CoreError::InvalidCode {
            code: raw.to_owned(),
        })
}

/// `http(s)://host/<...>/<digits>`: the last path segment must be a
/// decimal integer.
fn from_url(raw: &str) -> Option<SpoolId> {
    if !(starts_with_ignore_case(raw, "http://") || starts_with_ignore_case(raw, "https://")) {
        return None;
    }
    if raw.chars().any(char::is_whitespace) {
        return None;
    }
    let url = Url::parse(raw).ok()?;
    let last = url.path_segments()?.next_back()?;
    parse_digits(last)
}

/// `<scheme>:s-<digits>`, e.g. `web+spoolman:s-42`.
fn from_scheme_ref(raw: &str) -> Option<SpoolId> {
    let (scheme, rest) = raw.split_once(':')?;
    let mut chars = scheme.chars();
    let valid_scheme = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme {
        return None;
    }
    parse_digits(rest.strip_prefix("s-")?)
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

fn parse_digits(text: &str) -> Option<SpoolId> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<u32>().ok().map(SpoolId::new)
}
