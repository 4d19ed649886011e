//! Pulls a lookup-worthy IPv4 address or email out of free text.
//!
//! Patterns are shape-only: `999.999.999.999` is accepted as an address. When
//! a query carries both kinds, the IPv4 match wins.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

static IPV4_PATTERN: OnceLock<Regex> = OnceLock::new();
static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn ipv4_pattern() -> &'static Regex {
    IPV4_PATTERN.get_or_init(|| {
        Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("IPv4 pattern must compile")
    })
}

fn email_pattern() -> &'static Regex {
    EMAIL_PATTERN.get_or_init(|| {
        Regex::new(r"\b[\w.-]+@[\w.-]+\.\w{2,4}\b").expect("email pattern must compile")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Ip(String),
    Email(String),
}

impl Signal {
    pub fn value(&self) -> &str {
        match self {
            Signal::Ip(value) | Signal::Email(value) => value,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Signal::Ip(_) => "ip",
            Signal::Email(_) => "email",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

pub fn extract(query: &str) -> Option<Signal> {
    if let Some(found) = ipv4_pattern().find(query) {
        return Some(Signal::Ip(found.as_str().to_string()));
    }
    email_pattern()
        .find(query)
        .map(|found| Signal::Email(found.as_str().to_string()))
}
