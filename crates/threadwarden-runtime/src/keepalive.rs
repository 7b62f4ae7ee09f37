//! Periodic liveness pulse on the active thread.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use threadwarden_core::WardenConfig;
use threadwarden_executor::Platform;

use crate::engine::EngineHandle;

/// When and how long to show the typing indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub interval: Duration,
    pub typing: Duration,
}

impl KeepAlive {
    pub fn from_config(config: &WardenConfig) -> Self {
        Self {
            interval: config.keepalive_interval(),
            typing: config.keepalive_typing(),
        }
    }

    /// Toggle typing on the engine's active thread every `interval` until the
    /// engine shuts down. Pulse failures are logged and skipped.
    pub async fn run(self, engine: EngineHandle, platform: Arc<dyn Platform>) {
        let mut ticks = interval_at(Instant::now() + self.interval, self.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;

            let thread_id = match engine.active_thread().await {
                Ok(Some(thread_id)) => thread_id,
                Ok(None) => {
                    debug!("Keep-alive: no active thread");
                    continue;
                }
                Err(_) => break,
            };

            if let Err(e) = platform.send_typing(&thread_id, true).await {
                warn!("Keep-alive on thread {} failed: {}", thread_id, e);
                continue;
            }
            sleep(self.typing).await;
            if let Err(e) = platform.send_typing(&thread_id, false).await {
                warn!("Keep-alive on thread {} failed: {}", thread_id, e);
            }
        }

        info!("Keep-alive stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadwarden_executor::testing::RecordingPlatform;
    use threadwarden_executor::ExecutorConfig;
    use threadwarden_store::Command;

    fn keepalive() -> KeepAlive {
        KeepAlive {
            interval: Duration::from_secs(60),
            typing: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_from_config() {
        let ka = KeepAlive::from_config(&WardenConfig::default());
        assert_eq!(ka.interval, Duration::from_secs(300));
        assert_eq!(ka.typing, Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_without_active_thread() {
        let platform = Arc::new(RecordingPlatform::new());
        let engine = EngineHandle::with_executor_config(platform.clone(), ExecutorConfig::default());
        let task = tokio::spawn(keepalive().run(engine.clone(), platform.clone()));

        sleep(Duration::from_secs(200)).await;
        assert!(platform.typing_calls().is_empty());

        engine.shutdown().await.unwrap();
        sleep(Duration::from_secs(60)).await;
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulses_active_thread_until_shutdown() {
        let platform = Arc::new(RecordingPlatform::new());
        let engine = EngineHandle::with_executor_config(platform.clone(), ExecutorConfig::default());
        engine
            .command(Command::EnableAntiOut {
                thread_id: "t1".into(),
            })
            .await
            .unwrap()
            .unwrap();

        let task = tokio::spawn(keepalive().run(engine.clone(), platform.clone()));
        sleep(Duration::from_secs(130)).await;

        let calls = platform.typing_calls();
        assert_eq!(
            calls,
            vec![
                ("t1".to_string(), true),
                ("t1".to_string(), false),
                ("t1".to_string(), true),
                ("t1".to_string(), false),
            ]
        );

        engine.shutdown().await.unwrap();
        sleep(Duration::from_secs(60)).await;
        task.await.unwrap();
    }
}
