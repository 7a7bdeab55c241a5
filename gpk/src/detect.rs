//! Foreground window title debouncing
//!
//! Window titles flicker while games load or switch scenes. A title is only
//! reported once it has stayed the same for the debounce window, and only
//! when it differs from the last title reported.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::Config;

#[derive(Debug)]
pub struct TitleDebouncer {
    window: Duration,
    candidate: Option<(String, Instant)>,
    stable: Option<String>,
}

impl TitleDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            candidate: None,
            stable: None,
        }
    }

    /// Debouncer using the configured `detect.debounce-secs` window
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.detect.debounce())
    }

    /// Last reported title
    pub fn stable(&self) -> Option<&str> {
        self.stable.as_deref()
    }

    /// Feed one observation; returns the title when it becomes the new stable one
    pub fn observe(&mut self, title: &str, now: Instant) -> Option<String> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }

        let same_candidate = self
            .candidate
            .as_ref()
            .is_some_and(|(candidate, _)| candidate.to_lowercase() == title.to_lowercase());
        if !same_candidate {
            debug!(%title, "TitleDebouncer::observe: new candidate");
            self.candidate = Some((title.to_string(), now));
            if !self.window.is_zero() {
                return None;
            }
        }

        let (candidate, since) = self.candidate.as_ref()?;
        if now.duration_since(*since) < self.window {
            return None;
        }

        let is_new = self
            .stable
            .as_ref()
            .is_none_or(|stable| stable.to_lowercase() != candidate.to_lowercase());
        if !is_new {
            return None;
        }

        debug!(title = %candidate, "TitleDebouncer::observe: title stable");
        self.stable = Some(candidate.clone());
        self.stable.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(20);

    #[test]
    fn test_from_config_uses_debounce_window() {
        let mut config = Config::default();
        config.detect.debounce_secs = 3;
        let start = Instant::now();
        let mut d = TitleDebouncer::from_config(&config);

        assert_eq!(d.observe("Arc Raiders", start), None);
        assert_eq!(d.observe("Arc Raiders", start + Duration::from_secs(2)), None);
        assert_eq!(
            d.observe("Arc Raiders", start + Duration::from_secs(3)).as_deref(),
            Some("Arc Raiders")
        );
    }

    #[test]
    fn test_default_config_window_is_twenty_seconds() {
        let start = Instant::now();
        let mut d = TitleDebouncer::from_config(&Config::default());
        d.observe("Arc Raiders", start);
        assert_eq!(d.observe("Arc Raiders", start + Duration::from_secs(19)), None);
        assert!(d.observe("Arc Raiders", start + WINDOW).is_some());
    }

    #[test]
    fn test_reports_after_window() {
        let start = Instant::now();
        let mut d = TitleDebouncer::new(WINDOW);

        assert_eq!(d.observe("Arc Raiders", start), None);
        assert_eq!(d.observe("Arc Raiders", start + Duration::from_secs(10)), None);
        assert_eq!(
            d.observe("Arc Raiders", start + Duration::from_secs(20)).as_deref(),
            Some("Arc Raiders")
        );
        assert_eq!(d.stable(), Some("Arc Raiders"));

        // Already reported
        assert_eq!(d.observe("arc raiders", start + Duration::from_secs(30)), None);
    }

    #[test]
    fn test_flicker_restarts_window() {
        let start = Instant::now();
        let mut d = TitleDebouncer::new(WINDOW);

        d.observe("Loading...", start);
        d.observe("Arc Raiders", start + Duration::from_secs(15));
        assert_eq!(d.observe("Arc Raiders", start + Duration::from_secs(25)), None);
        assert_eq!(
            d.observe("Arc Raiders", start + Duration::from_secs(35)).as_deref(),
            Some("Arc Raiders")
        );
    }

    #[test]
    fn test_blank_titles_ignored() {
        let start = Instant::now();
        let mut d = TitleDebouncer::new(WINDOW);

        d.observe("Game", start);
        assert_eq!(d.observe("   ", start + Duration::from_secs(5)), None);
        assert_eq!(d.observe("Game", start + Duration::from_secs(20)).as_deref(), Some("Game"));
    }

    #[test]
    fn test_zero_window_reports_immediately() {
        let mut d = TitleDebouncer::new(Duration::ZERO);
        let now = Instant::now();
        assert_eq!(d.observe("A", now).as_deref(), Some("A"));
        assert_eq!(d.observe("A", now), None);
        assert_eq!(d.observe("B", now).as_deref(), Some("B"));
    }
}
