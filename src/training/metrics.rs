use std::collections::VecDeque;

/// Result of a single episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeResult {
    pub score: u32,
    pub total_reward: f32,
    pub steps: usize,
    /// True when the episode ended on a collision rather than the step cap.
    pub crashed: bool,
}

/// Training metrics tracker with rolling window computations.
pub struct TrainingMetrics {
    episode_results: VecDeque<EpisodeResult>,
    update_losses: VecDeque<f32>,
    capacity: usize,
    total_episodes: usize, // lifetime count, never capped
    best_score: u32,
    eval_history: Vec<(usize, f32)>,
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            episode_results: VecDeque::with_capacity(capacity),
            update_losses: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
            best_score: 0,
            eval_history: Vec::new(),
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.total_episodes += 1;
        self.best_score = self.best_score.max(result.score);
        self.episode_results.push_back(result);
        if self.episode_results.len() > self.capacity {
            self.episode_results.pop_front();
        }
    }

    pub fn record_update(&mut self, loss: f32) {
        self.update_losses.push_back(loss);
        if self.update_losses.len() > self.capacity {
            self.update_losses.pop_front();
        }
    }

    fn mean_over<F>(&self, last_n: usize, f: F) -> f32
    where
        F: Fn(&EpisodeResult) -> f32,
    {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let sum: f32 = self.episode_results.iter().rev().take(n).map(f).sum();
        sum / n as f32
    }

    /// Average score in the last N episodes.
    pub fn average_score(&self, last_n: usize) -> f32 {
        self.mean_over(last_n, |r| r.score as f32)
    }

    /// Average undiscounted return in the last N episodes.
    pub fn average_reward(&self, last_n: usize) -> f32 {
        self.mean_over(last_n, |r| r.total_reward)
    }

    /// Average episode length in the last N episodes.
    pub fn average_length(&self, last_n: usize) -> f32 {
        self.mean_over(last_n, |r| r.steps as f32)
    }

    /// Average loss over the last N updates.
    pub fn average_loss(&self, last_n: usize) -> f32 {
        let n = self.update_losses.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let sum: f32 = self.update_losses.iter().rev().take(n).sum();
        sum / n as f32
    }

    /// Record a greedy evaluation score taken after `episode`.
    pub fn record_eval(&mut self, episode: usize, score: f32) {
        self.eval_history.push((episode, score));
    }

    /// Every `(episode, score)` evaluation of the run, oldest first.
    pub fn eval_history(&self) -> &[(usize, f32)] {
        &self.eval_history
    }

    /// Best score over the whole run, not just the rolling window.
    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: u32, total_reward: f32, steps: usize) -> EpisodeResult {
        EpisodeResult {
            score,
            total_reward,
            steps,
            crashed: true,
        }
    }

    #[test]
    fn test_average_score() {
        let mut m = TrainingMetrics::new();
        for score in [1, 2, 3, 6] {
            m.record_episode(result(score, 0.0, 10));
        }
        assert!((m.average_score(10) - 3.0).abs() < 1e-6);
        assert!((m.average_score(2) - 4.5).abs() < 1e-6);
    }

    #[test]
    fn test_average_reward_and_length() {
        let mut m = TrainingMetrics::new();
        m.record_episode(result(0, 4.0, 20));
        m.record_episode(result(0, 8.0, 30));
        assert!((m.average_reward(10) - 6.0).abs() < 1e-6);
        assert!((m.average_length(10) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_average_loss() {
        let mut m = TrainingMetrics::new();
        m.record_update(1.0);
        m.record_update(3.0);
        assert!((m.average_loss(10) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_metrics_are_zero() {
        let m = TrainingMetrics::new();
        assert_eq!(m.average_score(10), 0.0);
        assert_eq!(m.average_loss(10), 0.0);
        assert_eq!(m.best_score(), 0);
    }

    #[test]
    fn test_eval_history_keeps_every_evaluation() {
        let mut m = TrainingMetrics::with_capacity(1);
        m.record_eval(10, 1.5);
        m.record_eval(20, 3.0);
        assert_eq!(m.eval_history(), &[(10, 1.5), (20, 3.0)]);
    }

    #[test]
    fn test_window_is_capped_but_best_and_total_are_not() {
        let mut m = TrainingMetrics::with_capacity(3);
        m.record_episode(result(50, 0.0, 1));
        for _ in 0..5 {
            m.record_episode(result(1, 0.0, 1));
        }
        assert_eq!(m.total_episodes(), 6);
        assert_eq!(m.best_score(), 50);
        assert!((m.average_score(100) - 1.0).abs() < 1e-6);
    }
}
