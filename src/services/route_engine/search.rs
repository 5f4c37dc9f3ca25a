use super::metrics::{has_short_out_and_back_spur, overlap_ratio_default, path_length_meters};
use crate::config::EngineConfig;
use crate::constants::{
    FILLER_DISTANCE_ERROR_WEIGHT, ROUND_TRIP_POINTS_EVEN, ROUND_TRIP_POINTS_ODD,
    SEARCH_SPUR_MAX_DETOUR_METERS,
};
use crate::models::{Coordinates, TransportMode};
use crate::services::ors::{ProviderError, RoutingProvider};
use rand::RngExt;
use std::sync::Arc;

/// A transient route produced during search. Lower score is better.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: Vec<Coordinates>,
    pub distance_meters: f64,
    pub score: f64,
    pub attempt_index: usize,
}

/// Result of a search: the best surviving candidate (if any attempt
/// validated) and how many provider attempts were spent.
#[derive(Debug)]
pub struct SearchOutcome {
    pub best: Option<Candidate>,
    pub attempts: u32,
}

/// Repeatedly requests candidate loops from the provider with varying seeds
/// and point counts, scores each, and keeps the best.
pub struct CandidateSearch {
    provider: Arc<dyn RoutingProvider>,
    config: EngineConfig,
}

impl CandidateSearch {
    pub fn new(provider: Arc<dyn RoutingProvider>, config: EngineConfig) -> Self {
        Self { provider, config }
    }

    /// Search for a closed loop of `target_meters` starting and ending at
    /// `start`. Scored by relative distance error alone; a candidate at or
    /// under the acceptance threshold ends the search immediately.
    pub async fn round_trip(
        &self,
        start: Coordinates,
        target_meters: f64,
        mode: &TransportMode,
        avoid_spurs: bool,
    ) -> SearchOutcome {
        let budget = self.config.round_trip_attempts;
        let mut best: Option<Candidate> = None;
        let mut attempts = 0;

        for attempt in 0..budget {
            attempts += 1;
            let Some((path, distance)) = self
                .attempt_round_trip(start, target_meters, attempt, mode, avoid_spurs)
                .await
            else {
                continue;
            };

            let score = (distance - target_meters).abs() / target_meters;
            if score <= self.config.accept_distance_error {
                tracing::info!(
                    attempt = attempt + 1,
                    distance_m = %format!("{:.0}", distance),
                    error = %format!("{:.3}", score),
                    "Accepted round-trip candidate on attempt {} ({:.0}m, error {:.1}%)",
                    attempt + 1, distance, score * 100.0
                );
                return SearchOutcome {
                    best: Some(Candidate {
                        path,
                        distance_meters: distance,
                        score,
                        attempt_index: attempt,
                    }),
                    attempts,
                };
            }

            if best.as_ref().map(|b| score < b.score).unwrap_or(true) {
                best = Some(Candidate {
                    path,
                    distance_meters: distance,
                    score,
                    attempt_index: attempt,
                });
            }
        }

        if let Some(ref b) = best {
            tracing::info!(
                attempts = attempts,
                error = %format!("{:.3}", b.score),
                "Round-trip budget exhausted, best candidate has {:.1}% error",
                b.score * 100.0
            );
        } else {
            tracing::warn!(
                attempts = attempts,
                "Round-trip budget exhausted: 0/{} attempts produced a valid candidate",
                attempts
            );
        }

        SearchOutcome { best, attempts }
    }

    /// Search for an auxiliary loop covering a length shortfall from
    /// `anchor`. Overlap dominates the score: a filler loop exists to add
    /// distinct ground, so length accuracy is the secondary term. Always
    /// spends its whole budget.
    pub async fn filler_loop(
        &self,
        anchor: Coordinates,
        length_meters: f64,
        mode: &TransportMode,
        avoid_spurs: bool,
        patching_waypoint_route: bool,
    ) -> SearchOutcome {
        let budget = if patching_waypoint_route {
            self.config.filler_attempts_waypoint
        } else {
            self.config.filler_attempts
        };
        let mut best: Option<Candidate> = None;
        let mut attempts = 0;

        for attempt in 0..budget {
            attempts += 1;
            let Some((path, distance)) = self
                .attempt_round_trip(anchor, length_meters, attempt, mode, avoid_spurs)
                .await
            else {
                continue;
            };

            let overlap = overlap_ratio_default(&path);
            let relative_error = (distance - length_meters).abs() / length_meters;
            let score = overlap + relative_error * FILLER_DISTANCE_ERROR_WEIGHT;

            if best.as_ref().map(|b| score < b.score).unwrap_or(true) {
                best = Some(Candidate {
                    path,
                    distance_meters: distance,
                    score,
                    attempt_index: attempt,
                });
            }
        }

        tracing::debug!(
            attempts = attempts,
            found = best.is_some(),
            "Filler search finished after {} attempts",
            attempts
        );

        SearchOutcome { best, attempts }
    }

    /// One provider round-trip attempt. Returns the path and its distance,
    /// or None when the attempt must be skipped. Rate-limit responses are
    /// absorbed here: the caller simply moves to its next attempt with a
    /// fresh seed, never an immediate same-parameter retry.
    async fn attempt_round_trip(
        &self,
        start: Coordinates,
        target_meters: f64,
        attempt: usize,
        mode: &TransportMode,
        avoid_spurs: bool,
    ) -> Option<(Vec<Coordinates>, f64)> {
        let seed: u64 = rand::rng().random::<u32>() as u64;
        let points = if attempt % 2 == 0 {
            ROUND_TRIP_POINTS_EVEN
        } else {
            ROUND_TRIP_POINTS_ODD
        };

        let payload = match self
            .provider
            .round_trip(start, target_meters, points, seed, mode)
            .await
        {
            Ok(p) => p,
            Err(ProviderError::RateLimited(detail)) => {
                tracing::debug!(
                    attempt = attempt + 1,
                    "Attempt {} rate limited, moving on: {}",
                    attempt + 1,
                    detail
                );
                return None;
            }
            Err(ProviderError::RequestFailed(detail)) => {
                tracing::debug!(
                    attempt = attempt + 1,
                    "Attempt {} failed, moving on: {}",
                    attempt + 1,
                    detail
                );
                return None;
            }
        };

        if payload.path.len() < 2 {
            tracing::debug!(
                attempt = attempt + 1,
                points = payload.path.len(),
                "Attempt {} returned a degenerate path",
                attempt + 1
            );
            return None;
        }

        let distance = payload
            .distance_meters
            .or_else(|| path_length_meters(&payload.path))
            .filter(|d| d.is_finite() && *d > 0.0)?;

        if avoid_spurs
            && has_short_out_and_back_spur(&payload.path, SEARCH_SPUR_MAX_DETOUR_METERS)
        {
            tracing::debug!(
                attempt = attempt + 1,
                "Attempt {} rejected: short out-and-back spur",
                attempt + 1
            );
            return None;
        }

        Some((payload.path, distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ors::{ProviderPath, ProviderResult};
    use crate::services::route_engine::avoidance::AvoidanceArea;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn start_point() -> Coordinates {
        Coordinates::new(52.0, 4.0).unwrap()
    }

    /// Closed loop of roughly `length_meters` around `center`
    fn make_loop(center: Coordinates, length_meters: f64, n: usize) -> Vec<Coordinates> {
        let radius = length_meters / std::f64::consts::TAU;
        (0..=n)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / n as f64;
                center.local_offset(radius * angle.cos(), radius * angle.sin())
            })
            .collect()
    }

    /// Loop with a 100 m dead-end spike welded onto it
    fn make_spurred_loop(center: Coordinates, length_meters: f64) -> Vec<Coordinates> {
        let mut path = make_loop(center, length_meters, 60);
        let tip_base = path[30];
        let mut spur: Vec<Coordinates> = (1..=25)
            .map(|i| tip_base.local_offset(i as f64 * 4.0, 0.0))
            .collect();
        spur.extend((0..25).rev().map(|i| tip_base.local_offset(i as f64 * 4.0, 1.0)));
        path.splice(31..31, spur);
        path
    }

    enum StubBehavior {
        PerfectLoop,
        RateLimited,
        SpurredLoop,
        EmptyPath,
        NoDistance,
    }

    struct StubProvider {
        behavior: StubBehavior,
        round_trip_calls: Mutex<Vec<(f64, u32, u64)>>,
    }

    impl StubProvider {
        fn new(behavior: StubBehavior) -> Self {
            Self {
                behavior,
                round_trip_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RoutingProvider for StubProvider {
        async fn directions(
            &self,
            _waypoints: &[Coordinates],
            _mode: &TransportMode,
            _avoid: Option<&AvoidanceArea>,
        ) -> ProviderResult<ProviderPath> {
            Err(ProviderError::RequestFailed("not used".to_string()))
        }

        async fn round_trip(
            &self,
            start: Coordinates,
            target_meters: f64,
            points: u32,
            seed: u64,
            _mode: &TransportMode,
        ) -> ProviderResult<ProviderPath> {
            self.round_trip_calls
                .lock()
                .unwrap()
                .push((target_meters, points, seed));
            match self.behavior {
                StubBehavior::PerfectLoop => Ok(ProviderPath {
                    path: make_loop(start, target_meters, 64),
                    distance_meters: Some(target_meters),
                }),
                StubBehavior::RateLimited => {
                    Err(ProviderError::RateLimited("429".to_string()))
                }
                StubBehavior::SpurredLoop => Ok(ProviderPath {
                    path: make_spurred_loop(start, target_meters),
                    distance_meters: Some(target_meters),
                }),
                StubBehavior::EmptyPath => Ok(ProviderPath {
                    path: vec![],
                    distance_meters: Some(target_meters),
                }),
                StubBehavior::NoDistance => Ok(ProviderPath {
                    path: make_loop(start, target_meters, 64),
                    distance_meters: None,
                }),
            }
        }
    }

    fn search_over(provider: StubProvider) -> (CandidateSearch, Arc<StubProvider>) {
        let provider = Arc::new(provider);
        (
            CandidateSearch::new(provider.clone(), EngineConfig::default()),
            provider,
        )
    }

    #[tokio::test]
    async fn test_perfect_candidate_exits_on_first_attempt() {
        let (search, provider) = search_over(StubProvider::new(StubBehavior::PerfectLoop));

        let outcome = search
            .round_trip(start_point(), 5000.0, &TransportMode::Walk, true)
            .await;

        assert_eq!(outcome.attempts, 1);
        let best = outcome.best.unwrap();
        assert_eq!(best.attempt_index, 0);
        assert!(best.score <= 0.03);
        assert_eq!(provider.round_trip_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_exhausts_budget_without_candidate() {
        let (search, provider) = search_over(StubProvider::new(StubBehavior::RateLimited));

        let outcome = search
            .round_trip(start_point(), 5000.0, &TransportMode::Walk, true)
            .await;

        assert!(outcome.best.is_none());
        assert_eq!(outcome.attempts, 10);
        // Every attempt carries a fresh seed: never the same parameters twice
        let calls = provider.round_trip_calls.lock().unwrap();
        assert_eq!(calls.len(), 10);
    }

    #[tokio::test]
    async fn test_point_count_alternates_across_attempts() {
        let (search, provider) = search_over(StubProvider::new(StubBehavior::RateLimited));

        search
            .round_trip(start_point(), 5000.0, &TransportMode::Walk, true)
            .await;

        let calls = provider.round_trip_calls.lock().unwrap();
        for (i, (_, points, _)) in calls.iter().enumerate() {
            let expected = if i % 2 == 0 { 6 } else { 8 };
            assert_eq!(*points, expected, "attempt {} should use {} points", i, expected);
        }
    }

    #[tokio::test]
    async fn test_spurred_candidates_rejected_when_avoiding_spurs() {
        let (search, _) = search_over(StubProvider::new(StubBehavior::SpurredLoop));

        let outcome = search
            .round_trip(start_point(), 5000.0, &TransportMode::Walk, true)
            .await;
        assert!(outcome.best.is_none());
        assert_eq!(outcome.attempts, 10);
    }

    #[tokio::test]
    async fn test_spurred_candidates_accepted_when_not_avoiding() {
        let (search, _) = search_over(StubProvider::new(StubBehavior::SpurredLoop));

        let outcome = search
            .round_trip(start_point(), 5000.0, &TransportMode::Walk, false)
            .await;
        assert!(outcome.best.is_some());
    }

    #[tokio::test]
    async fn test_empty_paths_are_skipped() {
        let (search, _) = search_over(StubProvider::new(StubBehavior::EmptyPath));

        let outcome = search
            .round_trip(start_point(), 5000.0, &TransportMode::Walk, true)
            .await;
        assert!(outcome.best.is_none());
    }

    #[tokio::test]
    async fn test_missing_provider_distance_falls_back_to_path_length() {
        let (search, _) = search_over(StubProvider::new(StubBehavior::NoDistance));

        let outcome = search
            .round_trip(start_point(), 5000.0, &TransportMode::Walk, true)
            .await;

        // Polygonal approximation of the circle stays well inside 3%
        let best = outcome.best.unwrap();
        assert!(best.score <= 0.03);
        assert!((best.distance_meters - 5000.0).abs() < 150.0);
    }

    #[tokio::test]
    async fn test_filler_search_spends_entire_budget() {
        let (search, provider) = search_over(StubProvider::new(StubBehavior::PerfectLoop));

        let outcome = search
            .filler_loop(start_point(), 2000.0, &TransportMode::Walk, true, true)
            .await;

        // No early exit even for a perfect first candidate
        assert_eq!(outcome.attempts, 14);
        assert_eq!(provider.round_trip_calls.lock().unwrap().len(), 14);
        let best = outcome.best.unwrap();
        assert!(best.score < 0.1, "clean loop should score low, got {}", best.score);
    }

    #[tokio::test]
    async fn test_filler_search_default_budget() {
        let (search, provider) = search_over(StubProvider::new(StubBehavior::RateLimited));

        let outcome = search
            .filler_loop(start_point(), 2000.0, &TransportMode::Walk, true, false)
            .await;

        assert!(outcome.best.is_none());
        assert_eq!(outcome.attempts, 8);
        assert_eq!(provider.round_trip_calls.lock().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_filler_score_is_overlap_dominated() {
        // A clean loop at the wrong length must beat a retraced path at the
        // right length: overlap carries 5x the weight of distance error.
        let clean_loop = make_loop(start_point(), 2600.0, 64);
        let clean_overlap = overlap_ratio_default(&clean_loop);
        let clean_score = clean_overlap + (2600.0 - 2000.0f64).abs() / 2000.0 * 0.2;

        let out: Vec<Coordinates> = (0..=50)
            .map(|i| start_point().local_offset(0.0, i as f64 * 20.0))
            .collect();
        let mut retraced = out.clone();
        retraced.extend(out.iter().rev().skip(1));
        let retraced_overlap = overlap_ratio_default(&retraced);
        let retraced_score = retraced_overlap + 0.0;

        assert!(clean_score < retraced_score);
    }
}
