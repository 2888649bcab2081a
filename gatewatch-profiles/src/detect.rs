//! Page classification: which profile a device matches, and whether a page
//! is really the device's login form.

use gatewatch_fetch::FetchedPage;
use gatewatch_fetch::auth::hnap::UNAUTHENTICATED_RESULT;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::warn;

use crate::profile::{DeviceProfile, HintPattern};

// ============================================================================
// Hint Matching
// ============================================================================

#[derive(Debug, Clone)]
enum Matcher {
    Contains(String),
    Regex(Option<Regex>),
}

impl Matcher {
    fn is_match(&self, body: &str) -> bool {
        match self {
            Self::Contains(needle) => body.to_ascii_lowercase().contains(needle),
            Self::Regex(Some(re)) => re.is_match(body),
            Self::Regex(None) => false,
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledHint {
    path: String,
    matcher: Matcher,
    negative: bool,
    priority: u32,
}

/// Outcome of matching one profile's hints against probed pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HintScore {
    /// Positive hints that matched.
    pub matched: usize,
    /// Sum of the matched positive hints' priorities.
    pub score: u32,
    /// A negative hint matched.
    pub vetoed: bool,
}

impl HintScore {
    /// Returns true if the profile is a candidate.
    pub fn is_match(&self) -> bool {
        !self.vetoed && self.matched > 0
    }
}

/// Compiled detection hints for one profile.
///
/// Scoring depends only on the pages given, never on the order profiles or
/// hints were declared in.
#[derive(Debug, Clone)]
pub struct HintMatcher {
    hints: Vec<CompiledHint>,
}

impl HintMatcher {
    /// Compiles a profile's hints.
    ///
    /// An invalid regex never matches.
    pub fn new(profile: &DeviceProfile) -> Self {
        let hints = profile
            .hints
            .iter()
            .map(|hint| {
                let matcher = match &hint.pattern {
                    HintPattern::Contains { text } => Matcher::Contains(text.to_ascii_lowercase()),
                    HintPattern::Regex { pattern } => Matcher::Regex(match Regex::new(pattern) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            warn!(profile = %profile.id, %pattern, error = %e, "Invalid hint pattern");
                            None
                        }
                    }),
                };
                CompiledHint {
                    path: hint.path.clone(),
                    matcher,
                    negative: hint.negative,
                    priority: hint.priority,
                }
            })
            .collect();

        Self { hints }
    }

    /// Scores probed bodies keyed by path.
    ///
    /// Hints whose path was not probed (or failed) are ignored.
    pub fn evaluate(&self, bodies: &BTreeMap<String, String>) -> HintScore {
        let mut result = HintScore::default();
        for hint in &self.hints {
            let Some(body) = bodies.get(&hint.path) else {
                continue;
            };
            if !hint.matcher.is_match(body) {
                continue;
            }
            if hint.negative {
                result.vetoed = true;
            } else {
                result.matched += 1;
                result.score = result.score.saturating_add(hint.priority);
            }
        }
        result
    }
}

// ============================================================================
// Login Page Detection
// ============================================================================

/// Recognises a device silently serving its login form instead of data.
#[derive(Debug, Clone, Default)]
pub struct LoginPageDetector {
    markers: Vec<String>,
}

impl LoginPageDetector {
    /// Creates a detector with the profile's extra markers.
    pub fn for_profile(profile: &DeviceProfile) -> Self {
        Self {
            markers: profile
                .login_markers
                .iter()
                .map(|m| m.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Returns true if the page is a login page.
    pub fn is_login_page(&self, page: &FetchedPage) -> bool {
        if page.status == 401 {
            return true;
        }
        if page.is_redirect() {
            return page
                .location()
                .is_some_and(|l| l.to_ascii_lowercase().contains("login"));
        }
        if page.looks_like_login_form() || page.body.contains(UNAUTHENTICATED_RESULT) {
            return true;
        }
        if page
            .meta_refresh_target()
            .is_some_and(|t| t.to_ascii_lowercase().contains("login"))
        {
            return true;
        }

        let body = page.body.to_ascii_lowercase();
        self.markers.iter().any(|m| body.contains(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::DetectionHint;
    use crate::variant::ParserVariant;
    use gatewatch_core::CapabilitySet;
    use gatewatch_fetch::{AuthSpec, Resource};
    use url::Url;

    fn profile(hints: Vec<DetectionHint>) -> DeviceProfile {
        DeviceProfile {
            id: "p".to_string(),
            vendor: "V".to_string(),
            model: "M".to_string(),
            auth: AuthSpec::None,
            resources: vec![Resource::page("/")],
            info_resource: None,
            fallback_resource: None,
            hints,
            capabilities: CapabilitySet::default(),
            priority: 0,
            parser: ParserVariant::RawCapture,
            info: None,
            login_markers: vec!["Please log in".to_string()],
            restart: None,
        }
    }

    fn bodies(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(p, b)| ((*p).to_string(), (*b).to_string()))
            .collect()
    }

    #[test]
    fn test_score_sums_priorities() {
        let matcher = HintMatcher::new(&profile(vec![
            DetectionHint::contains("/", "SURFboard", 10),
            DetectionHint::regex("/", r"SB\d{4}", 5),
            DetectionHint::contains("/other", "missing", 50),
        ]));
        let score = matcher.evaluate(&bodies(&[("/", "ARRIS surfboard SB8200")]));
        assert_eq!(score.matched, 2);
        assert_eq!(score.score, 15);
        assert!(score.is_match());
    }

    #[test]
    fn test_negative_hint_vetoes() {
        let matcher = HintMatcher::new(&profile(vec![
            DetectionHint::contains("/", "Motorola", 10),
            DetectionHint::contains("/", "ARRIS", 1).negative(),
        ]));
        let score = matcher.evaluate(&bodies(&[("/", "Motorola ARRIS shared template")]));
        assert!(score.vetoed);
        assert!(!score.is_match());
    }

    #[test]
    fn test_invalid_regex_never_matches() {
        let matcher = HintMatcher::new(&profile(vec![DetectionHint::regex("/", "([", 10)]));
        assert!(!matcher.evaluate(&bodies(&[("/", "([")])).is_match());
    }

    fn page(status: u16, body: &str) -> FetchedPage {
        FetchedPage::new(Url::parse("http://192.168.100.1/").unwrap(), status, body)
    }

    #[test]
    fn test_login_page_signals() {
        let detector = LoginPageDetector::for_profile(&profile(vec![]));
        assert!(detector.is_login_page(&page(401, "")));
        assert!(detector.is_login_page(&page(200, r#"<form><input type="password" name="pw"></form>"#)));
        assert!(detector.is_login_page(&page(200, r#"{"GetMultipleHNAPsResponse":{"GetMultipleHNAPsResult":"UN-AUTH"}}"#)));
        assert!(detector.is_login_page(&page(200, "<p>Please LOG IN to continue</p>")));
        assert!(!detector.is_login_page(&page(200, "<table><tr><td>Downstream</td></tr></table>")));
    }
}
