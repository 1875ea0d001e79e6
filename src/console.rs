//! Console output and the blocking wait for the user to exit.

use async_trait::async_trait;
use tracing::debug;

/// Where the sample writes its user-facing lines
#[async_trait]
pub trait Console: Send + Sync {
    fn write_line(&self, line: &str);

    /// Block until the user asks to exit
    async fn wait_for_exit(&self);
}

/// stdout for output, one line of stdin for the exit prompt
#[derive(Debug, Default)]
pub struct StdConsole;

impl StdConsole {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Console for StdConsole {
    fn write_line(&self, line: &str) {
        println!("\n{line}");
    }

    async fn wait_for_exit(&self) {
        let read = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)
        })
        .await;

        match read {
            Ok(Ok(_)) => debug!("Exit requested from console"),
            Ok(Err(e)) => debug!("Console read failed, exiting: {e}"),
            Err(e) => debug!("Console reader task failed, exiting: {e}"),
        }
    }
}
