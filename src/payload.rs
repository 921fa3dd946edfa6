//! Payloads: the exact text that gets scored, encoded into the symbol and hashed.
//!
//! The typed constructors build the conventional QR content strings for each
//! kind (`mailto:`, `tel:`, `WIFI:` and so on). Once built, a [`Payload`] is
//! never modified; anything downstream works on its `value` bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when building a payload from structured fields.
#[derive(Error, Debug, PartialEq)]
pub enum PayloadError {
    #[error("Payload value is empty")]
    Empty,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Coordinate out of range: {name}={value}")]
    CoordinateOutOfRange { name: &'static str, value: f64 },

    #[error("Event ends before it starts")]
    InvalidEventRange,
}

/// What the payload represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Url,
    Text,
    Email,
    Phone,
    Sms,
    Wifi,
    Vcard,
    Location,
    Event,
}

impl PayloadKind {
    /// Returns the lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Text => "text",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Sms => "sms",
            Self::Wifi => "wifi",
            Self::Vcard => "vcard",
            Self::Location => "location",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wi-Fi authentication type as written in the `WIFI:T:` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WifiSecurity {
    Wpa,
    Wep,
    Open,
}

impl WifiSecurity {
    fn field(&self) -> &'static str {
        match self {
            Self::Wpa => "WPA",
            Self::Wep => "WEP",
            Self::Open => "nopass",
        }
    }
}

/// Contact card fields for a vCard payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactCard {
    pub name: String,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
}

/// Calendar event fields for an event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub summary: String,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A payload to be scored, rendered and sealed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPayload")]
pub struct Payload {
    kind: PayloadKind,
    value: String,
}

/// Wire form of [`Payload`], checked by [`Payload::new`] on the way in.
#[derive(Deserialize)]
struct RawPayload {
    kind: PayloadKind,
    value: String,
}

impl TryFrom<RawPayload> for Payload {
    type Error = PayloadError;

    fn try_from(raw: RawPayload) -> Result<Self, Self::Error> {
        Payload::new(raw.kind, raw.value)
    }
}

impl Payload {
    /// Creates a payload from a raw value.
    pub fn new(kind: PayloadKind, value: impl Into<String>) -> Result<Self, PayloadError> {
        let value = value.into();
        if value.is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(Self { kind, value })
    }

    /// URL payload, stored verbatim.
    pub fn url(url: impl Into<String>) -> Result<Self, PayloadError> {
        Self::new(PayloadKind::Url, url)
    }

    /// Free text payload.
    pub fn text(text: impl Into<String>) -> Result<Self, PayloadError> {
        Self::new(PayloadKind::Text, text)
    }

    /// `mailto:` payload with optional subject and body.
    pub fn email(to: &str, subject: Option<&str>, body: Option<&str>) -> Result<Self, PayloadError> {
        require("to", to)?;
        let mut value = format!("mailto:{}", to.trim());
        let mut params = Vec::new();
        if let Some(subject) = subject.filter(|s| !s.is_empty()) {
            params.push(format!("subject={}", percent_encode(subject)));
        }
        if let Some(body) = body.filter(|s| !s.is_empty()) {
            params.push(format!("body={}", percent_encode(body)));
        }
        if !params.is_empty() {
            value.push('?');
            value.push_str(&params.join("&"));
        }
        Self::new(PayloadKind::Email, value)
    }

    /// `tel:` payload. Spaces and separators are stripped.
    pub fn phone(number: &str) -> Result<Self, PayloadError> {
        let digits = normalize_number(number);
        require("number", &digits)?;
        Self::new(PayloadKind::Phone, format!("tel:{}", digits))
    }

    /// `SMSTO:` payload.
    pub fn sms(number: &str, message: &str) -> Result<Self, PayloadError> {
        let digits = normalize_number(number);
        require("number", &digits)?;
        Self::new(PayloadKind::Sms, format!("SMSTO:{}:{}", digits, message))
    }

    /// `WIFI:` network join payload.
    pub fn wifi(
        ssid: &str,
        password: Option<&str>,
        security: WifiSecurity,
        hidden: bool,
    ) -> Result<Self, PayloadError> {
        require("ssid", ssid)?;
        let mut value = format!("WIFI:T:{};S:{};", security.field(), escape_wifi(ssid));
        if security != WifiSecurity::Open {
            let password = password.unwrap_or_default();
            require("password", password)?;
            value.push_str(&format!("P:{};", escape_wifi(password)));
        }
        if hidden {
            value.push_str("H:true;");
        }
        value.push(';');
        Self::new(PayloadKind::Wifi, value)
    }

    /// vCard 3.0 payload.
    ///
    /// Field values are escaped as vCard/iCalendar TEXT, so a line break in
    /// any field stays inside its property.
    pub fn vcard(card: &ContactCard) -> Result<Self, PayloadError> {
        require("name", &card.name)?;
        let mut lines = vec![
            "BEGIN:VCARD".to_string(),
            "VERSION:3.0".to_string(),
            format!("FN:{}", escape_text(card.name.trim())),
        ];
        if let Some(org) = &card.organization {
            lines.push(format!("ORG:{}", escape_text(org)));
        }
        if let Some(phone) = &card.phone {
            lines.push(format!("TEL:{}", normalize_number(phone)));
        }
        if let Some(email) = &card.email {
            lines.push(format!("EMAIL:{}", escape_text(email)));
        }
        if let Some(url) = &card.url {
            lines.push(format!("URL:{}", escape_text(url)));
        }
        lines.push("END:VCARD".to_string());
        Self::new(PayloadKind::Vcard, lines.join("\n"))
    }

    /// `geo:` payload.
    pub fn location(latitude: f64, longitude: f64) -> Result<Self, PayloadError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(PayloadError::CoordinateOutOfRange {
                name: "latitude",
                value: latitude,
            });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(PayloadError::CoordinateOutOfRange {
                name: "longitude",
                value: longitude,
            });
        }
        Self::new(PayloadKind::Location, format!("geo:{},{}", latitude, longitude))
    }

    /// iCalendar `VEVENT` payload.
    pub fn event(event: &CalendarEvent) -> Result<Self, PayloadError> {
        require("summary", &event.summary)?;
        if event.end < event.start {
            return Err(PayloadError::InvalidEventRange);
        }
        let mut lines = vec![
            "BEGIN:VEVENT".to_string(),
            format!("SUMMARY:{}", escape_text(event.summary.trim())),
            format!("DTSTART:{}", event.start.format("%Y%m%dT%H%M%SZ")),
            format!("DTEND:{}", event.end.format("%Y%m%dT%H%M%SZ")),
        ];
        if let Some(location) = &event.location {
            lines.push(format!("LOCATION:{}", escape_text(location)));
        }
        lines.push("END:VEVENT".to_string());
        Self::new(PayloadKind::Event, lines.join("\n"))
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    /// The exact text encoded into the symbol and the hash.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// First `max_chars` characters of the value, for logs.
    pub fn prefix(&self, max_chars: usize) -> String {
        self.value.chars().take(max_chars).collect()
    }
}

fn require(field: &'static str, value: &str) -> Result<(), PayloadError> {
    if value.trim().is_empty() {
        Err(PayloadError::MissingField(field))
    } else {
        Ok(())
    }
}

fn normalize_number(number: &str) -> String {
    number
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

fn escape_wifi(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        if matches!(c, '\\' | ';' | ',' | ':' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// vCard/iCalendar TEXT escaping: backslash, line breaks, comma, semicolon.
fn escape_text(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

fn percent_encode(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
