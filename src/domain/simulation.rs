/// ドメイン層: 擬似転送のタイミングと失敗注入
///
/// ステップ間隔と 100% 到達時の失敗判定を差し替え可能な戦略として切り出す。
/// 本番は乱数、テストは固定値を使う。
use crate::config::SimulationConfig;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

pub trait SimulationStrategy: Send + Sync {
    /// セッション1件分のステップ間隔（受け付け時に1回だけ引く）
    fn step_delay(&self) -> Duration;

    /// 100% 到達時の失敗判定（セッションごとに1回）
    fn should_fail(&self) -> bool;
}

/// 一様乱数による戦略
///
/// 間隔は `[min_step_delay_ms, max_step_delay_ms)` から、失敗は
/// `failure_probability` のベルヌーイ試行で決める。
pub struct RandomSimulation {
    min_delay: Duration,
    max_delay: Duration,
    failure_probability: f64,
    rng: Mutex<StdRng>,
}

impl RandomSimulation {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// シードを固定して再現可能にする
    pub fn with_seed(config: &SimulationConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &SimulationConfig, rng: StdRng) -> Self {
        Self {
            min_delay: config.min_step_delay(),
            max_delay: config
                .max_step_delay()
                .max(config.min_step_delay() + Duration::from_millis(1)),
            failure_probability: config.failure_probability.clamp(0.0, 1.0),
            rng: Mutex::new(rng),
        }
    }
}

impl SimulationStrategy for RandomSimulation {
    fn step_delay(&self) -> Duration {
        self.rng.lock().gen_range(self.min_delay..self.max_delay)
    }

    fn should_fail(&self) -> bool {
        self.rng.lock().gen_bool(self.failure_probability)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// 固定間隔・台本どおりの失敗判定を返すテスト用戦略
    ///
    /// 台本が尽きた後は `default_delay` と成功を返す。
    pub struct FixedSimulation {
        default_delay: Duration,
        delays: Mutex<VecDeque<Duration>>,
        failures: Mutex<VecDeque<bool>>,
    }

    impl FixedSimulation {
        pub fn succeeding(delay: Duration) -> Self {
            Self::scripted(delay, Vec::new(), Vec::new())
        }

        pub fn failing_once(delay: Duration) -> Self {
            Self::scripted(delay, Vec::new(), vec![true])
        }

        pub fn scripted(default_delay: Duration, delays: Vec<Duration>, failures: Vec<bool>) -> Self {
            Self {
                default_delay,
                delays: Mutex::new(delays.into()),
                failures: Mutex::new(failures.into()),
            }
        }
    }

    impl SimulationStrategy for FixedSimulation {
        fn step_delay(&self) -> Duration {
            self.delays.lock().pop_front().unwrap_or(self.default_delay)
        }

        fn should_fail(&self) -> bool {
            self.failures.lock().pop_front().unwrap_or(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(probability: f64) -> SimulationConfig {
        SimulationConfig {
            steps: 100,
            min_step_delay_ms: 50,
            max_step_delay_ms: 150,
            failure_probability: probability,
            failure_message: "Upload failed due to network error".to_string(),
            history_capacity: 10,
        }
    }

    #[test]
    fn test_delay_within_range() {
        let sim = RandomSimulation::from_config(&config(0.1));
        for _ in 0..1000 {
            let delay = sim.step_delay();
            assert!(delay >= Duration::from_millis(50));
            assert!(delay < Duration::from_millis(150));
        }
    }

    #[test]
    fn test_probability_extremes() {
        let never = RandomSimulation::from_config(&config(0.0));
        let always = RandomSimulation::from_config(&config(1.0));
        for _ in 0..100 {
            assert!(!never.should_fail());
            assert!(always.should_fail());
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let a = RandomSimulation::with_seed(&config(0.5), 42);
        let b = RandomSimulation::with_seed(&config(0.5), 42);
        for _ in 0..20 {
            assert_eq!(a.step_delay(), b.step_delay());
            assert_eq!(a.should_fail(), b.should_fail());
        }
    }

    #[test]
    fn test_failure_rate_is_roughly_configured() {
        let sim = RandomSimulation::with_seed(&config(0.1), 7);
        let failures = (0..10_000).filter(|_| sim.should_fail()).count();
        assert!((700..1300).contains(&failures), "failures = {failures}");
    }
}
