use super::*;

/// Allows at most `limit` acquisitions in any rolling `window`.
#[derive(Debug)]
pub struct SubmissionLimiter {
    limit: usize,
    window: Duration,
    recent: VecDeque<Instant>,
}

impl SubmissionLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            recent: VecDeque::with_capacity(limit),
        }
    }

    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        while let Some(oldest) = self.recent.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                self.recent.pop_front();
            } else {
                break;
            }
        }

        if self.recent.len() >= self.limit {
            return false;
        }

        self.recent.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn limits_within_window() {
        let mut limiter = SubmissionLimiter::new(3, Duration::from_millis(1000));

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(limiter.try_acquire());
    }

    #[test]
    fn window_rolls() {
        let mut limiter = SubmissionLimiter::new(3, Duration::from_millis(1000));
        let start = Instant::now();
        let at = |ms| start + Duration::from_millis(ms);

        assert!(limiter.try_acquire_at(at(0)));
        assert!(limiter.try_acquire_at(at(400)));
        assert!(limiter.try_acquire_at(at(800)));
        assert!(!limiter.try_acquire_at(at(900)));

        // only the submission at 0 has left the window
        assert!(limiter.try_acquire_at(at(1000)));
        assert!(!limiter.try_acquire_at(at(1100)));
        assert!(limiter.try_acquire_at(at(1400)));
    }

    #[test]
    fn zero_limit_never_acquires() {
        let mut limiter = SubmissionLimiter::new(0, Duration::from_millis(1000));
        assert!(!limiter.try_acquire());
    }
}
