//! Profile discovery.
//!
//! Discovery runs once when a device is configured: it probes every path any
//! candidate profile has a hint for, scores each candidate against the
//! probed pages and resolves the winner into a (profile, strategy) pair that
//! is cached for the life of the device configuration.

use gatewatch_fetch::{AuthStrategy, FetchContext, FetchError, Probe, ProbeResult, run_probes};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::detect::{HintMatcher, HintScore};
use crate::profile::DeviceProfile;
use crate::registry::ProfileRegistry;

// ============================================================================
// Resolved Profile
// ============================================================================

/// A profile paired with the strategy built from its auth spec.
#[derive(Clone)]
pub struct ResolvedProfile {
    /// The profile.
    pub profile: Arc<DeviceProfile>,
    /// Its authentication strategy.
    pub strategy: Arc<dyn AuthStrategy>,
}

impl ResolvedProfile {
    /// Resolves a profile chosen without discovery (pinned in config).
    pub fn from_profile(profile: Arc<DeviceProfile>) -> Self {
        let strategy = profile.auth.build();
        Self { profile, strategy }
    }

    /// Profile id.
    pub fn id(&self) -> &str {
        &self.profile.id
    }
}

impl fmt::Debug for ResolvedProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProfile")
            .field("profile", &self.profile.id)
            .field("strategy", &self.strategy.id())
            .finish()
    }
}

// ============================================================================
// Discovery Outcome
// ============================================================================

/// How one candidate fared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateScore {
    /// Profile id.
    pub profile_id: String,
    /// Declared priority.
    pub priority: i32,
    /// Hint evaluation.
    pub hints: HintScore,
}

/// The outcome of a discovery run.
#[derive(Debug)]
pub struct DiscoveryOutcome {
    /// Selected profile.
    pub selected: ResolvedProfile,
    /// Every candidate, best first; non-matching candidates last.
    pub candidates: Vec<CandidateScore>,
    /// Probe results.
    pub probes: Vec<ProbeResult>,
    /// Total duration.
    pub duration: Duration,
}

impl DiscoveryOutcome {
    /// Returns true if no profile matched and the generic one was chosen.
    pub fn is_fallback(&self) -> bool {
        self.selected.profile.is_generic()
    }

    /// Number of candidates whose hints matched.
    pub fn match_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.hints.is_match()).count()
    }
}

// ============================================================================
// Discovery Pipeline
// ============================================================================

/// Matches a device against candidate profiles.
pub struct DiscoveryPipeline {
    candidates: Vec<(Arc<DeviceProfile>, HintMatcher)>,
    generic: Arc<DeviceProfile>,
}

impl DiscoveryPipeline {
    /// Creates a pipeline over the given candidates.
    ///
    /// Raw-capture profiles are never candidates; the registry's generic
    /// profile is the fallback.
    pub fn new(candidates: Vec<Arc<DeviceProfile>>) -> Self {
        let candidates = candidates
            .into_iter()
            .filter(|p| !p.is_generic())
            .map(|p| {
                let matcher = HintMatcher::new(&p);
                (p, matcher)
            })
            .collect();

        Self {
            candidates,
            generic: ProfileRegistry::generic(),
        }
    }

    /// Creates a pipeline over the built-in profiles.
    pub fn from_registry() -> Self {
        Self::new(ProfileRegistry::all().to_vec())
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns true if there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Distinct hint paths across every candidate, sorted.
    pub fn probe_paths(&self) -> Vec<String> {
        self.candidates
            .iter()
            .flat_map(|(p, _)| p.hints.iter().map(|h| h.path.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Scores every candidate against probed bodies, best first.
    ///
    /// Matching candidates rank by declared priority, then hint score, then
    /// id, so the order never depends on declaration order.
    pub fn rank(&self, bodies: &BTreeMap<String, String>) -> Vec<CandidateScore> {
        let mut scores: Vec<CandidateScore> = self
            .candidates
            .iter()
            .map(|(profile, matcher)| CandidateScore {
                profile_id: profile.id.clone(),
                priority: profile.priority,
                hints: matcher.evaluate(bodies),
            })
            .collect();

        scores.sort_by(|a, b| {
            b.hints
                .is_match()
                .cmp(&a.hints.is_match())
                .then_with(|| b.priority.cmp(&a.priority))
                .then_with(|| b.hints.score.cmp(&a.hints.score))
                .then_with(|| a.profile_id.cmp(&b.profile_id))
        });
        scores
    }

    /// Picks the best profile for a set of probed bodies.
    pub fn select(&self, bodies: &BTreeMap<String, String>) -> (ResolvedProfile, Vec<CandidateScore>) {
        let ranked = self.rank(bodies);
        let winner = ranked
            .first()
            .filter(|c| c.hints.is_match())
            .and_then(|c| self.candidates.iter().find(|(p, _)| p.id == c.profile_id))
            .map_or_else(|| Arc::clone(&self.generic), |(p, _)| Arc::clone(p));

        (ResolvedProfile::from_profile(winner), ranked)
    }

    /// Probes a device and selects a profile.
    ///
    /// Fails only when the device answered none of the probes.
    #[instrument(skip(self, ctx, base), fields(host = %base, candidates = self.candidates.len()))]
    pub async fn discover(&self, ctx: &FetchContext, base: &Url) -> Result<DiscoveryOutcome, FetchError> {
        let start = Instant::now();
        let probes: Vec<Probe> = self.probe_paths().into_iter().map(Probe::new).collect();
        debug!(count = probes.len(), "Probing device");

        let results = run_probes(&probes, ctx, base).await;

        let bodies: BTreeMap<String, String> = results
            .iter()
            .filter_map(|r| r.page.as_ref().map(|page| (r.path.clone(), page.body.clone())))
            .collect();

        if bodies.is_empty() && !results.is_empty() {
            let reason = results
                .iter()
                .find_map(|r| r.error.clone())
                .unwrap_or_else(|| "no response".to_string());
            warn!(%reason, "Device answered no probes");
            return Err(FetchError::Network(reason));
        }

        let (selected, candidates) = self.select(&bodies);
        if selected.profile.is_generic() {
            warn!("No profile matched, falling back to raw capture");
        } else {
            info!(profile = %selected.profile.id, strategy = selected.strategy.id(), "Profile selected");
        }

        Ok(DiscoveryOutcome {
            selected,
            candidates,
            probes: results,
            duration: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::DetectionHint;
    use crate::variant::ParserVariant;
    use gatewatch_core::CapabilitySet;
    use gatewatch_fetch::{AuthSpec, Resource};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn candidate(id: &str, priority: i32, hints: Vec<DetectionHint>) -> Arc<DeviceProfile> {
        Arc::new(DeviceProfile {
            id: id.to_string(),
            vendor: "V".to_string(),
            model: id.to_string(),
            auth: AuthSpec::None,
            resources: vec![Resource::page("/status.html")],
            info_resource: None,
            fallback_resource: None,
            hints,
            capabilities: CapabilitySet::default(),
            priority,
            parser: ParserVariant::Table {
                downstream: crate::decode::table::TableLayout {
                    title: String::new(),
                    skip_rows: 0,
                    fields: crate::decode::FieldMap {
                        channel_id: 0,
                        lock: None,
                        modulation: None,
                        frequency: None,
                        power: None,
                        snr: None,
                        corrected: None,
                        uncorrected: None,
                    },
                },
                upstream: None,
            },
            info: None,
            login_markers: vec![],
            restart: None,
        })
    }

    fn bodies(body: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("/".to_string(), body.to_string())])
    }

    #[test]
    fn test_highest_priority_wins_regardless_of_order() {
        let low = candidate("low", 1, vec![DetectionHint::contains("/", "ARRIS", 50)]);
        let high = candidate("high", 10, vec![DetectionHint::contains("/", "ARRIS", 1)]);

        for order in [vec![low.clone(), high.clone()], vec![high.clone(), low.clone()]] {
            let pipeline = DiscoveryPipeline::new(order);
            let (selected, ranked) = pipeline.select(&bodies("ARRIS modem"));
            assert_eq!(selected.id(), "high");
            assert_eq!(ranked[1].profile_id, "low");
        }
    }

    #[test]
    fn test_equal_priority_uses_score_then_id() {
        let a = candidate("b_profile", 5, vec![DetectionHint::contains("/", "modem", 1)]);
        let b = candidate("a_profile", 5, vec![DetectionHint::contains("/", "modem", 1)]);
        let c = candidate("c_profile", 5, vec![
            DetectionHint::contains("/", "modem", 1),
            DetectionHint::contains("/", "cable", 1),
        ]);

        let pipeline = DiscoveryPipeline::new(vec![a, b, c]);
        let ranked = pipeline.rank(&bodies("cable modem"));
        let ids: Vec<_> = ranked.iter().map(|c| c.profile_id.as_str()).collect();
        assert_eq!(ids, vec!["c_profile", "a_profile", "b_profile"]);
    }

    #[test]
    fn test_vetoed_profile_loses() {
        let moto = candidate("moto", 10, vec![
            DetectionHint::contains("/", "Connection", 1),
            DetectionHint::contains("/", "ARRIS", 1).negative(),
        ]);
        let arris = candidate("arris", 1, vec![DetectionHint::contains("/", "ARRIS", 1)]);
        let pipeline = DiscoveryPipeline::new(vec![moto, arris]);
        let (selected, _) = pipeline.select(&bodies("ARRIS Connection Status"));
        assert_eq!(selected.id(), "arris");
    }

    #[test]
    fn test_no_match_falls_back_to_generic() {
        let pipeline = DiscoveryPipeline::new(vec![candidate(
            "x",
            1,
            vec![DetectionHint::contains("/", "nothing", 1)],
        )]);
        let (selected, _) = pipeline.select(&bodies("unrelated"));
        assert!(selected.profile.is_generic());
    }

    #[tokio::test]
    async fn test_discover_probes_each_path_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("SURFboard SB8200"))
            .expect(1)
            .mount(&server)
            .await;

        let pipeline = DiscoveryPipeline::new(vec![
            candidate("a", 1, vec![DetectionHint::contains("/", "SB8200", 1)]),
            candidate("b", 1, vec![DetectionHint::contains("/", "SB6141", 1)]),
        ]);
        let ctx = FetchContext::new().unwrap();
        let base = Url::parse(&server.uri()).unwrap();
        let outcome = pipeline.discover(&ctx, &base).await.unwrap();

        assert_eq!(outcome.selected.id(), "a");
        assert_eq!(outcome.probes.len(), 1);
        assert_eq!(outcome.match_count(), 1);
        assert!(!outcome.is_fallback());
    }
}
