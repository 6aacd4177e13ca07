use std::time::Duration;

use tokio::{
    sync::watch,
    time::{self, MissedTickBehavior},
};
use tracing::{info, instrument};

use crate::{
    Heading, Result,
    decoder::HeadingFeed,
    render::{ArrowSet, DisplaySurface},
};

/// Ties the heading feed to the display.
///
/// Every tick asks the feed once for news, keeps the last good heading when
/// there is none, and redraws both arrows plus the readout.
pub struct Viewer<F, D> {
    feed: F,
    heading: Heading,
    arrows: ArrowSet,
    display: D,
}

impl<F: HeadingFeed, D: DisplaySurface> Viewer<F, D> {
    pub fn new(feed: F, arrows: ArrowSet, display: D) -> Self {
        Self {
            feed,
            heading: Heading::NORTH,
            arrows,
            display,
        }
    }

    /// The heading currently on screen.
    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn into_parts(self) -> (F, D) {
        (self.feed, self.display)
    }

    /// One refresh. Read errors end up here and are passed on.
    pub fn tick(&mut self) -> Result<()> {
        if let Some(heading) = self.feed.next_heading()? {
            self.heading = heading;
        }

        let frame = self.arrows.render(self.heading);
        self.display.present(&frame)
    }

    /// Tick every `period` until `shutdown` turns true or its sender goes
    /// away. Once it returns no further frames are drawn; dropping the viewer
    /// afterwards closes the port.
    #[instrument(skip_all)]
    pub async fn run(&mut self, period: Duration, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("Rendering every {period:?}");

        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = interval.tick() => self.tick()?,
            }
        }

        info!("Render loop stopped at heading {}", self.heading);
        Ok(())
    }
}
