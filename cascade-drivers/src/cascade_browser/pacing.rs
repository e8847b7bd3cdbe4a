use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy)]
/// Fixed pauses around dropdown interactions so the widget can animate
/// open/closed before the next command.
pub struct Pacing {
    pub after_open: Duration,
    pub after_select: Duration,
    pub after_close: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            after_open: Duration::from_millis(1000),
            after_select: Duration::from_millis(1000),
            after_close: Duration::from_millis(500),
        }
    }
}

impl Pacing {
    /// No pauses at all.
    pub fn immediate() -> Self {
        Self {
            after_open: Duration::ZERO,
            after_select: Duration::ZERO,
            after_close: Duration::ZERO,
        }
    }

    pub async fn opened(&self) {
        pause(self.after_open).await;
    }

    pub async fn selected(&self) {
        pause(self.after_select).await;
    }

    pub async fn closed(&self) {
        pause(self.after_close).await;
    }
}

async fn pause(d: Duration) {
    if !d.is_zero() {
        sleep(d).await;
    }
}
