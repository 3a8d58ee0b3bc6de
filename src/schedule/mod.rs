//! Diurnal capture scheduler.
//!
//! Every tick is decided purely from the documents on disk and the current
//! time, so a process restarted at any point resumes exactly where the
//! previous one left off. The logical states are:
//!
//! - not yet due: sleep until the persisted wakeup, touching nothing;
//! - before sunrise: move the wakeup to today's sunrise;
//! - after sunset: the schedule drifted, go to sleep until tomorrow;
//! - capturing: take one frame, then either wait for the next slot, end the
//!   day, or finish the run.
//!
//! Documents are always written before the suspension they describe.

mod context;

pub use context::{init_daily, load_or_init, load_settings, RunContext};

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use tracing::{info, warn};

use crate::capture::CaptureInvoker;
use crate::clock::Clock;
use crate::error::Result;
use crate::logging::format_stamp;
use crate::state::{sleep_for_window, DailyProgress, RunState, Settings};
use crate::store::JsonStore;
use crate::sun::SunOracle;
use context::{after_seconds, seconds};

/// Why the scheduler is suspending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendReason {
    /// Woken before the persisted wakeup time.
    NotYetDue,
    /// Due, but the sun is not up yet.
    BeforeSunrise,
    /// A frame was taken and more are due today.
    NextFrame,
    /// Today's quota was met.
    EndOfDay,
    /// Woken after sunset without meeting the quota.
    Overslept,
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Suspend {
        until: DateTime<Utc>,
        reason: SuspendReason,
    },
    Complete,
}

pub struct Scheduler<C, S, K> {
    store: JsonStore,
    clock: C,
    sun: S,
    camera: K,
    offset: FixedOffset,
}

impl<C, S, K> Scheduler<C, S, K>
where
    C: Clock,
    S: SunOracle,
    K: CaptureInvoker,
{
    pub fn new(store: JsonStore, clock: C, sun: S, camera: K, offset: FixedOffset) -> Self {
        Self {
            store,
            clock,
            sun,
            camera,
            offset,
        }
    }

    /// Run until every configured day has been captured.
    pub fn run(&mut self) -> Result<()> {
        info!("Process started");

        let ctx = load_or_init(&self.store, true)?;
        info!("Next wakeup at: {}", self.stamp(ctx.run.next_wakeup()));

        loop {
            match self.tick()? {
                Action::Suspend { until, .. } => self.clock.sleep_until(until),
                Action::Complete => return Ok(()),
            }
        }
    }

    /// Load the documents, decide, persist, and report what to do next.
    pub fn tick(&mut self) -> Result<Action> {
        let now = self.clock.now();
        let ctx = load_or_init(&self.store, false)?;
        self.decide(ctx, now)
    }

    fn decide(&mut self, mut ctx: RunContext, now: DateTime<Utc>) -> Result<Action> {
        if ctx.run_finished() {
            // Interrupted during cleanup
            return self.finish();
        }

        let wakeup = ctx.run.next_wakeup();
        if now < wakeup {
            return Ok(Action::Suspend {
                until: wakeup,
                reason: SuspendReason::NotYetDue,
            });
        }

        if ctx.day_quota_met() {
            // Fewer frames than days leaves some days with nothing to take
            info!(
                "Quota for day {} already met at {}/{} frames, nothing to capture.",
                ctx.run.current_day + 1,
                ctx.run.current_frame,
                ctx.run.total_frames
            );
            return self.close_day(&mut ctx, now);
        }

        let date = self.local_date(now);
        let today = self.sun.sun_times(date)?;

        if now >= today.sunset {
            warn!(
                "Woken after sunset with {}/{} frames today, skipping to next sunrise.",
                ctx.daily.as_ref().map_or(0, |d| d.current_frame),
                ctx.run.frames_per_day
            );
            return self.end_of_day(&mut ctx, now, SuspendReason::Overslept);
        }

        let mut daily = match ctx.daily.take() {
            Some(daily) => daily,
            None => init_daily(&self.store, &self.sun, &ctx.run, date)?,
        };

        if now < today.sunrise {
            ctx.run.set_next_wakeup(today.sunrise);
            self.persist(&ctx, &daily)?;
            info!("Waiting for sunrise at: {}", self.stamp(today.sunrise));
            return Ok(Action::Suspend {
                until: today.sunrise,
                reason: SuspendReason::BeforeSunrise,
            });
        }

        if ctx.run.is_fresh() {
            daily.sleep_duration =
                sleep_for_window(seconds(today.sunset - now), ctx.run.frames_per_day);
            info!(
                "Timelapse started after sunrise. Setting sleep duration to {:.0} seconds.",
                daily.sleep_duration
            );
        }

        let index = ctx.run.current_frame;
        let path = self.camera.capture(index)?;
        ctx.run.current_frame += 1;
        daily.current_frame += 1;
        info!(
            "Captured frame {}/{} frames today and {}/{} frames total.",
            daily.current_frame, ctx.run.frames_per_day, ctx.run.current_frame, ctx.run.total_frames
        );
        tracing::debug!("Frame {} written to {:?}", index, path);

        if ctx.day_quota_met() {
            return self.close_day(&mut ctx, now);
        }

        let next = after_seconds(now, daily.sleep_duration);
        ctx.run.set_next_wakeup(next);
        self.persist(&ctx, &daily)?;
        info!("Next wakeup is at: {}", self.stamp(next));

        Ok(Action::Suspend {
            until: next,
            reason: SuspendReason::NextFrame,
        })
    }

    /// Count the current day as done, then finish or sleep until tomorrow.
    fn close_day(&mut self, ctx: &mut RunContext, now: DateTime<Utc>) -> Result<Action> {
        ctx.run.current_day += 1;
        if ctx.run_finished() {
            self.store.save(&ctx.run)?;
            return self.finish();
        }
        self.end_of_day(ctx, now, SuspendReason::EndOfDay)
    }

    /// Sleep until tomorrow's sunrise; today's progress is discarded.
    fn end_of_day(
        &mut self,
        ctx: &mut RunContext,
        now: DateTime<Utc>,
        reason: SuspendReason,
    ) -> Result<Action> {
        let tomorrow = self.local_date(now) + Days::new(1);
        let sunrise = self.sun.sun_times(tomorrow)?.sunrise;
        ctx.run.set_next_wakeup(sunrise);

        // Run state first: a crash before the removal leaves a stale daily
        // document behind, never a day that is counted twice.
        self.store.save(&ctx.settings)?;
        self.store.save(&ctx.run)?;
        self.store.remove::<DailyProgress>()?;

        info!(
            "Finished for the day going to sleep until: {}",
            self.stamp(sunrise)
        );
        Ok(Action::Suspend {
            until: sunrise,
            reason,
        })
    }

    fn finish(&mut self) -> Result<Action> {
        info!("Finished completely -- cleanup and exit");
        self.store.remove::<DailyProgress>()?;
        self.store.remove::<RunState>()?;
        Ok(Action::Complete)
    }

    fn persist(&self, ctx: &RunContext, daily: &DailyProgress) -> Result<()> {
        self.store.save::<Settings>(&ctx.settings)?;
        self.store.save::<RunState>(&ctx.run)?;
        self.store.save::<DailyProgress>(daily)?;
        Ok(())
    }

    fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    fn stamp(&self, at: DateTime<Utc>) -> String {
        format_stamp(at, self.offset)
    }
}
