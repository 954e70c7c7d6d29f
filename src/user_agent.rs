//! Just enough `navigator.userAgent` parsing to pick browser-specific corrections.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserName {
    Chrome,
    Edge,
    Firefox,
    Safari,
    Unknown,
}

impl fmt::Display for BrowserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BrowserName::Chrome => "Chrome",
            BrowserName::Edge => "Edge",
            BrowserName::Firefox => "Firefox",
            BrowserName::Safari => "Safari",
            BrowserName::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserAgent {
    pub browser: BrowserName,
    pub major_version: u32,
}

fn regex(pattern: &'static str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid user agent regex: {err}"))
}

impl UserAgent {
    pub const UNKNOWN: UserAgent = UserAgent {
        browser: BrowserName::Unknown,
        major_version: 0,
    };

    /// Order matters: Edge and Chrome both claim Safari, Edge also claims Chrome.
    pub fn parse(user_agent: &str) -> Self {
        static EDGE: OnceLock<Regex> = OnceLock::new();
        static FIREFOX: OnceLock<Regex> = OnceLock::new();
        static CHROME: OnceLock<Regex> = OnceLock::new();
        static SAFARI: OnceLock<Regex> = OnceLock::new();

        let candidates: [(&OnceLock<Regex>, &'static str, BrowserName); 4] = [
            (&EDGE, r"Edg(?:e|A|iOS)?/(\d+)", BrowserName::Edge),
            (&FIREFOX, r"(?:Firefox|FxiOS)/(\d+)", BrowserName::Firefox),
            (&CHROME, r"(?:Chrome|CriOS)/(\d+)", BrowserName::Chrome),
            (&SAFARI, r"Version/(\d+)[\d.]*.*Safari/", BrowserName::Safari),
        ];

        candidates
            .iter()
            .find_map(|(cell, pattern, browser)| {
                let captures = cell.get_or_init(|| regex(pattern)).captures(user_agent)?;
                let major_version = captures.get(1)?.as_str().parse().ok()?;
                Some(UserAgent {
                    browser: *browser,
                    major_version,
                })
            })
            .unwrap_or(Self::UNKNOWN)
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.browser, self.major_version)
    }
}
