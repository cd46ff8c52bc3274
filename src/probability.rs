/// Per-game rate above which the baseline stops distinguishing players.
/// One multi-score game in a tiny sample should not read as a lock.
pub const RATE_CEILING: f64 = 2.0;

/// Maps a per-game scoring rate to P(at least one score in a game).
///
/// The aggregator only produces rates; whichever model the engine is built
/// with turns them into probabilities, so a fitted model can replace the
/// baseline without changing the rate table's shape.
pub trait ProbabilityModel: Send + Sync {
    fn name(&self) -> &str;
    fn probability(&self, rate: f64) -> f64;
}

/// Treats scoring events as a Poisson process with mean `rate` per game:
/// `P(N >= 1) = 1 - exp(-min(rate, max_rate))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoissonBaseline {
    pub max_rate: f64,
}

impl Default for PoissonBaseline {
    fn default() -> Self {
        Self {
            max_rate: RATE_CEILING,
        }
    }
}

impl ProbabilityModel for PoissonBaseline {
    fn name(&self) -> &str {
        "poisson_baseline"
    }

    fn probability(&self, rate: f64) -> f64 {
        if rate.is_nan() {
            return 0.0;
        }
        // Clamp the rate, not the probability.
        let lambda = rate.clamp(0.0, self.max_rate);
        1.0 - (-lambda).exp()
    }
}

/// `events / games`, defined as zero for a player with no games.
pub fn per_game_rate(events: u32, games: u32) -> f64 {
    if games == 0 {
        0.0
    } else {
        f64::from(events) / f64::from(games)
    }
}

pub fn anytime_probability(rate: f64) -> f64 {
    PoissonBaseline::default().probability(rate)
}
