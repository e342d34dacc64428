//! Nav-bar visibility ratio
//!
//! Scrolling down hides the reader chrome progressively over a transition
//! region as tall as the nav bar; scrolling up brings it back. The ratio is
//! published on a `watch` channel, so the latest value always wins and a
//! slow consumer simply misses intermediate ratios.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

/// Pure ratio computation from successive scroll offsets
#[derive(Debug, Clone)]
pub struct NavBarTracker {
    region: f64,
    last_offset: Option<f64>,
    ratio: f64,
}

impl NavBarTracker {
    pub fn new(region: f64) -> Self {
        Self {
            region: region.max(1.0),
            last_offset: None,
            ratio: 1.0,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Feed a vertical scroll offset and return the new ratio in [0, 1]
    pub fn on_scroll(&mut self, offset: f64) -> f64 {
        if !offset.is_finite() {
            return self.ratio;
        }

        if offset <= 0.0 {
            self.ratio = 1.0;
        } else {
            let delta = offset - self.last_offset.unwrap_or(offset);
            self.ratio = (self.ratio - delta / self.region).clamp(0.0, 1.0);
        }
        self.last_offset = Some(offset);
        self.ratio
    }

    /// Force the chrome fully visible
    pub fn show(&mut self) -> f64 {
        self.ratio = 1.0;
        self.ratio
    }
}

/// Shared tracker plus its latest-value channel
#[derive(Debug, Clone)]
pub struct NavBarVisibility {
    tracker: Arc<Mutex<NavBarTracker>>,
    sender: Arc<watch::Sender<f64>>,
}

impl NavBarVisibility {
    pub fn new(region: f64) -> Self {
        let (sender, _) = watch::channel(1.0);
        Self {
            tracker: Arc::new(Mutex::new(NavBarTracker::new(region))),
            sender: Arc::new(sender),
        }
    }

    /// Receiver that always yields the most recent ratio
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> f64 {
        *self.sender.borrow()
    }

    pub fn on_scroll(&self, offset: f64) -> f64 {
        let ratio = match self.tracker.lock() {
            Ok(mut tracker) => tracker.on_scroll(offset),
            Err(_) => return self.current(),
        };
        self.sender.send_replace(ratio);
        ratio
    }

    pub fn show(&self) -> f64 {
        let ratio = match self.tracker.lock() {
            Ok(mut tracker) => tracker.show(),
            Err(_) => 1.0,
        };
        self.sender.send_replace(ratio);
        ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_of_page_is_fully_visible() {
        let mut tracker = NavBarTracker::new(50.0);
        assert_eq!(tracker.on_scroll(-50.0), 1.0);
        assert_eq!(tracker.on_scroll(0.0), 1.0);
    }

    #[test]
    fn test_scrolling_down_hides_progressively() {
        let mut tracker = NavBarTracker::new(50.0);
        tracker.on_scroll(0.0);
        assert_eq!(tracker.on_scroll(25.0), 0.5);
        assert_eq!(tracker.on_scroll(50.0), 0.0);
        assert_eq!(tracker.on_scroll(400.0), 0.0);
    }

    #[test]
    fn test_scrolling_up_reveals() {
        let mut tracker = NavBarTracker::new(50.0);
        tracker.on_scroll(0.0);
        tracker.on_scroll(300.0);
        assert_eq!(tracker.ratio(), 0.0);
        assert_eq!(tracker.on_scroll(280.0), 0.4);
        assert_eq!(tracker.on_scroll(200.0), 1.0);
    }

    #[test]
    fn test_first_sample_mid_page_keeps_ratio() {
        let mut tracker = NavBarTracker::new(50.0);
        assert_eq!(tracker.on_scroll(900.0), 1.0);
    }

    #[test]
    fn test_non_finite_offset_ignored() {
        let mut tracker = NavBarTracker::new(50.0);
        tracker.on_scroll(0.0);
        tracker.on_scroll(10.0);
        let before = tracker.ratio();
        assert_eq!(tracker.on_scroll(f64::NAN), before);
    }

    #[tokio::test]
    async fn test_latest_value_wins() {
        let visibility = NavBarVisibility::new(50.0);
        let mut receiver = visibility.subscribe();

        visibility.on_scroll(0.0);
        visibility.on_scroll(10.0);
        visibility.on_scroll(20.0);

        receiver.changed().await.unwrap();
        let seen = *receiver.borrow_and_update();
        assert!((seen - 0.6).abs() < 1e-9);
        assert!(!receiver.has_changed().unwrap());
    }

    #[test]
    fn test_show_resets() {
        let visibility = NavBarVisibility::new(50.0);
        visibility.on_scroll(0.0);
        visibility.on_scroll(100.0);
        assert_eq!(visibility.current(), 0.0);
        assert_eq!(visibility.show(), 1.0);
        assert_eq!(visibility.current(), 1.0);
    }
}
