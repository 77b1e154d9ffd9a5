//! Immediate vs. deferred execution.
//!
//! Deferred mode only arms a job when the configured date is today. The job then
//! recurs daily at the configured time while the process keeps polling.

use crate::config::{RunMode, SCHEDULE_DATE_FORMAT};
use anyhow::Result;
use chrono::{Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    RunOnce,
    Daily(DailyJob),
    /// Target date is not today: nothing is registered.
    Skip { target: NaiveDate, today: NaiveDate },
}

impl Plan {
    pub fn for_mode(mode: RunMode, now: NaiveDateTime) -> Self {
        match mode {
            RunMode::Immediate => Plan::RunOnce,
            RunMode::Deferred { date, time } if date == now.date() => {
                Plan::Daily(DailyJob::new(time, now))
            }
            RunMode::Deferred { date, .. } => Plan::Skip {
                target: date,
                today: now.date(),
            },
        }
    }
}

// ── Daily job ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyJob {
    at: NaiveTime,
    next_run: NaiveDateTime,
}

impl DailyJob {
    /// First run is today at `at`, or tomorrow if that moment has passed.
    pub fn new(at: NaiveTime, now: NaiveDateTime) -> Self {
        let today = now.date().and_time(at);
        let next_run = if today >= now {
            today
        } else {
            today + Days::new(1)
        };
        Self { at, next_run }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        now >= self.next_run
    }

    /// Advance to the next daily slot strictly after `now`.
    pub fn mark_ran(&mut self, now: NaiveDateTime) {
        self.next_run = self.next_run + Days::new(1);
        while self.next_run <= now {
            self.next_run = self.next_run + Days::new(1);
        }
    }
}

// ── Polling loop ──────────────────────────────────────────────────────────────

pub struct Scheduler {
    job: DailyJob,
    poll: Duration,
}

impl Scheduler {
    pub fn new(job: DailyJob) -> Self {
        Self {
            job,
            poll: POLL_INTERVAL,
        }
    }

    /// Run `task` if the job is due at `now`. Returns whether it ran.
    /// A failed run is logged; the next slot is still armed.
    pub async fn run_pending<F, Fut>(&mut self, now: NaiveDateTime, task: &mut F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if !self.job.is_due(now) {
            return false;
        }

        info!("Scheduled run due ({})", self.job.next_run);
        if let Err(e) = task().await {
            error!("Scheduled run failed: {:#}", e);
        }
        self.job.mark_ran(Local::now().naive_local().max(now));
        info!("Next run at {}", self.job.next_run);
        true
    }

    /// Block forever, checking every poll interval.
    pub async fn run_forever<F, Fut>(mut self, mut task: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        loop {
            self.run_pending(Local::now().naive_local(), &mut task).await;
            tokio::time::sleep(self.poll).await;
        }
    }
}

/// User-facing line announcing a daily job, with the full configured time.
fn scheduled_message(job: &DailyJob) -> String {
    format!(
        "Scheduled to run on {} at {}.",
        job.next_run().date().format(SCHEDULE_DATE_FORMAT),
        job.at()
    )
}

/// Execute a plan: once, daily, or not at all.
pub async fn dispatch<F, Fut>(plan: Plan, mut task: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    match plan {
        Plan::RunOnce => {
            println!("Running immediately.");
            task().await
        }
        Plan::Daily(job) => {
            println!("{}", scheduled_message(&job));
            info!("Job registered for {} daily, first run {}", job.at(), job.next_run());
            Scheduler::new(job).run_forever(task).await
        }
        Plan::Skip { target, today } => {
            let when = if target < today { "has already passed" } else { "is not today" };
            warn!("Scheduled date {} {}; nothing to do", target, when);
            println!(
                "The scheduled date {} {}. Update DIA_AGENDAMENTO and start again.",
                target.format(SCHEDULE_DATE_FORMAT),
                when
            );
            Ok(())
        }
    }
}
