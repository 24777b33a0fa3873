use std::time::{Duration, Instant};

pub const DEFAULT_TARGET_FPS: u32 = 33;

/// Fixed-interval cycle tick.
///
/// `wait` sleeps until one interval has passed since the previous tick; a
/// cycle that already overran the interval does not sleep at all.
#[derive(Debug)]
pub struct FramePacer {
    interval: Option<Duration>,
    last_tick: Option<Instant>,
}

impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            last_tick: None,
        }
    }

    pub fn from_fps(fps: u32) -> Self {
        if fps == 0 {
            return Self::unpaced();
        }
        Self::new(Duration::from_secs_f64(1.0 / fps as f64))
    }

    /// Never sleeps.
    pub fn unpaced() -> Self {
        Self {
            interval: None,
            last_tick: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Block until the next tick and return how long that took.
    pub fn wait(&mut self) -> Duration {
        let mut slept = Duration::ZERO;
        if let (Some(interval), Some(last)) = (self.interval, self.last_tick) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                slept = interval - elapsed;
                std::thread::sleep(slept);
            }
        }
        self.last_tick = Some(Instant::now());
        slept
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::from_fps(DEFAULT_TARGET_FPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_never_sleeps() {
        let mut pacer = FramePacer::new(Duration::from_millis(200));
        assert_eq!(pacer.wait(), Duration::ZERO);
    }

    #[test]
    fn second_tick_waits_out_the_interval() {
        let mut pacer = FramePacer::new(Duration::from_millis(20));
        pacer.wait();
        let start = Instant::now();
        pacer.wait();
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn unpaced_never_sleeps() {
        let mut pacer = FramePacer::from_fps(0);
        assert!(pacer.interval().is_none());
        pacer.wait();
        assert_eq!(pacer.wait(), Duration::ZERO);
    }

    #[test]
    fn default_is_about_thirty_milliseconds() {
        let interval = FramePacer::default().interval().unwrap();
        assert!(interval > Duration::from_millis(29) && interval < Duration::from_millis(31));
    }
}
