//! Permission-gated delivery of weather alerts.
//!
//! Alerts go out one at a time, `stagger` apart, so several alerts for the
//! same snapshot do not land at once.

use std::time::Duration;

use async_trait::async_trait;

use crate::alerts::WeatherAlert;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    Granted,
    Denied,
    Unsupported,
}

/// Somewhere alerts can be shown.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn permission(&self) -> NotificationPermission;

    async fn show(&self, title: &str, body: &str, tag: &str);
}

/// Writes notifications to the log.
#[derive(Debug, Clone)]
pub struct LogSink {
    enabled: bool,
}

impl LogSink {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    fn permission(&self) -> NotificationPermission {
        if self.enabled {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        }
    }

    async fn show(&self, title: &str, body: &str, tag: &str) {
        tracing::warn!(tag = %tag, "{}: {}", title, body);
    }
}

pub struct AlertNotifier<S> {
    sink: S,
    stagger: Duration,
}

impl<S: NotificationSink> AlertNotifier<S> {
    pub fn new(sink: S, stagger: Duration) -> Self {
        Self { sink, stagger }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Deliver `alerts` in order. Returns how many were shown.
    pub async fn notify(&self, alerts: &[WeatherAlert]) -> usize {
        if alerts.is_empty() {
            return 0;
        }

        match self.sink.permission() {
            NotificationPermission::Granted => {}
            NotificationPermission::Denied => {
                tracing::debug!("Notification permission denied, skipping {} alerts", alerts.len());
                return 0;
            }
            NotificationPermission::Unsupported => {
                tracing::debug!("Notifications unsupported, skipping {} alerts", alerts.len());
                return 0;
            }
        }

        for (index, alert) in alerts.iter().enumerate() {
            if index > 0 && !self.stagger.is_zero() {
                tokio::time::sleep(self.stagger).await;
            }
            let title = format!("⚠️ {}", alert.event);
            self.sink.show(&title, &alert.description, &alert.tag()).await;
        }

        alerts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Instant;

    struct RecordingSink {
        permission: NotificationPermission,
        shown: Mutex<Vec<(String, String, Instant)>>,
    }

    impl RecordingSink {
        fn new(permission: NotificationPermission) -> Self {
            Self {
                permission,
                shown: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        fn permission(&self) -> NotificationPermission {
            self.permission
        }

        async fn show(&self, title: &str, _body: &str, tag: &str) {
            self.shown
                .lock()
                .push((title.to_string(), tag.to_string(), Instant::now()));
        }
    }

    fn alerts() -> Vec<WeatherAlert> {
        vec![
            WeatherAlert {
                event: "High Winds".into(),
                description: "Wind speed is 20 m/s.".into(),
            },
            WeatherAlert {
                event: "Thunderstorm Warning".into(),
                description: "Seek shelter.".into(),
            },
        ]
    }

    #[tokio::test]
    async fn test_alerts_are_tagged_and_ordered() {
        let notifier = AlertNotifier::new(
            RecordingSink::new(NotificationPermission::Granted),
            Duration::ZERO,
        );
        assert_eq!(notifier.notify(&alerts()).await, 2);

        let shown = notifier.sink().shown.lock();
        assert_eq!(shown[0].0, "⚠️ High Winds");
        assert_eq!(shown[0].1, "weather-alert-high-winds");
        assert_eq!(shown[1].1, "weather-alert-thunderstorm-warning");
    }

    #[tokio::test]
    async fn test_alerts_are_staggered() {
        let notifier = AlertNotifier::new(
            RecordingSink::new(NotificationPermission::Granted),
            Duration::from_millis(40),
        );
        notifier.notify(&alerts()).await;

        let shown = notifier.sink().shown.lock();
        let gap = shown[1].2.duration_since(shown[0].2);
        assert!(gap >= Duration::from_millis(40), "gap was {:?}", gap);
    }

    #[tokio::test]
    async fn test_denied_permission_shows_nothing() {
        let notifier = AlertNotifier::new(
            RecordingSink::new(NotificationPermission::Denied),
            Duration::ZERO,
        );
        assert_eq!(notifier.notify(&alerts()).await, 0);
        assert!(notifier.sink().shown.lock().is_empty());
    }
}
