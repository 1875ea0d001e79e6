#![allow(dead_code)] // Not every test binary uses every helper

pub mod strategies;

use std::sync::Arc;

use push_notify::config::PushConfig;
use push_notify::platform::simulated::{Journal, PlatformEvent, RecordingConsole, SimulatedPlatform};
use push_notify::ActivationDispatcher;

/// A dispatcher wired to a simulated platform and a journal-backed console
pub struct Harness {
    pub platform: Arc<SimulatedPlatform>,
    pub console: Arc<RecordingConsole>,
    pub dispatcher: ActivationDispatcher,
    pub journal: Journal,
}

impl Harness {
    /// The exit prompt returns immediately
    pub fn new(platform: SimulatedPlatform) -> Self {
        Self::with_config(platform, &PushConfig::default(), false)
    }

    /// The exit prompt blocks until `console.request_exit()`
    pub fn interactive(platform: SimulatedPlatform) -> Self {
        Self::with_config(platform, &PushConfig::default(), true)
    }

    pub fn with_config(
        platform: SimulatedPlatform,
        config: &PushConfig,
        interactive: bool,
    ) -> Self {
        let platform = Arc::new(platform);
        let journal = platform.journal();
        let console = Arc::new(if interactive {
            RecordingConsole::interactive(journal.clone())
        } else {
            RecordingConsole::new(journal.clone())
        });
        let dispatcher = ActivationDispatcher::new(
            config,
            platform.clone(),
            platform.clone(),
            console.clone(),
        );

        Self {
            platform,
            console,
            dispatcher,
            journal,
        }
    }

    pub fn console_lines(&self) -> Vec<String> {
        self.journal.console_lines()
    }

    pub fn channel_requests(&self) -> usize {
        self.journal
            .count(|e| matches!(e, PlatformEvent::ChannelRequested(_)))
    }

    /// Index of the first console line starting with `prefix`
    pub fn console_line_position(&self, prefix: &str) -> Option<usize> {
        self.journal
            .position(|e| matches!(e, PlatformEvent::ConsoleLine(line) if line.starts_with(prefix)))
    }
}

pub fn config_with_timeout(timeout_secs: u64) -> PushConfig {
    PushConfig {
        channel_request_timeout_seconds: timeout_secs,
        ..PushConfig::default()
    }
}
