//! The polling loop: fetch, validate, extract, notify, sleep, forever.
//!
//! One cycle never fails as a whole. Every error it meets is turned into a
//! failure notification and returned as a [`CycleOutcome`], which is what
//! lets [`StatusPoller::tick`] sleep unconditionally after each cycle.
use std::time::Duration;
use tracing::{debug, error, info, instrument};

use crate::config::App;
use crate::error::BotError;
use crate::model::{self, Cursor};
use crate::practicum::StatusSource;
use crate::telegram::Notifier;

pub const START_MESSAGE: &str = "Telegram bot started";

pub fn failure_message(err: &BotError) -> String {
    format!("Program malfunction: {err}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Fetching,
    Validating,
    Extracting,
    Notifying,
    Sleeping,
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// A new status text went out.
    Sent(String),
    /// Same text as the last one sent; nothing went out.
    Duplicate(String),
    /// The cycle failed; `reported` tells whether the failure notice was delivered.
    Failed { error: BotError, reported: bool },
}

pub struct StatusPoller<S, N> {
    source: S,
    notifier: N,
    retry_period: Duration,
    cursor: Cursor,
    last_message: String,
    state: CycleState,
}

impl<S: StatusSource, N: Notifier> StatusPoller<S, N> {
    pub fn new(source: S, notifier: N, app: &App) -> Self {
        Self {
            source,
            notifier,
            retry_period: app.retry_period(),
            cursor: app.initial_cursor,
            last_message: String::new(),
            state: CycleState::Idle,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    fn enter(&mut self, next: CycleState) {
        debug!(from = ?self.state, to = ?next, "cycle transition");
        self.state = next;
    }

    /// Startup notice. Callers treat a failure here as fatal.
    pub async fn announce_start(&self) -> Result<(), BotError> {
        info!("announcing bot start");
        self.notifier.send(START_MESSAGE).await
    }

    /// Run forever. Only external termination stops it.
    pub async fn run(mut self) {
        info!(cursor = self.cursor, period = ?self.retry_period, "polling loop started");
        loop {
            self.tick().await;
        }
    }

    /// One cycle followed by the fixed sleep.
    pub async fn tick(&mut self) -> CycleOutcome {
        let outcome = self.run_cycle().await;
        self.enter(CycleState::Sleeping);
        tokio::time::sleep(self.retry_period).await;
        self.enter(CycleState::Idle);
        outcome
    }

    /// One cycle without the trailing sleep.
    #[instrument(skip_all, fields(cursor = self.cursor))]
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let result = match self.poll().await {
            Ok(message) => self.notify(message).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(outcome) => outcome,
            Err(error) => {
                let reported = self.report_failure(&error).await;
                CycleOutcome::Failed { error, reported }
            }
        }
    }

    async fn poll(&mut self) -> Result<String, BotError> {
        self.enter(CycleState::Fetching);
        let raw = self.source.fetch(self.cursor).await?;

        self.enter(CycleState::Validating);
        let batch = model::validate(raw)?;
        if batch.current_date != self.cursor {
            info!(from = self.cursor, to = batch.current_date, "cursor advanced");
        }
        self.cursor = batch.current_date;

        self.enter(CycleState::Extracting);
        batch.message()
    }

    async fn notify(&mut self, message: String) -> Result<CycleOutcome, BotError> {
        if message == self.last_message {
            debug!(%message, "status text unchanged since last send; skipping");
            return Ok(CycleOutcome::Duplicate(message));
        }
        self.enter(CycleState::Notifying);
        self.notifier.send(&message).await?;
        info!(%message, "new homework status sent");
        self.last_message = message.clone();
        Ok(CycleOutcome::Sent(message))
    }

    async fn report_failure(&mut self, err: &BotError) -> bool {
        error!(error = %err, "polling cycle failed");
        self.enter(CycleState::Notifying);
        match self.notifier.send(&failure_message(err)).await {
            Ok(()) => true,
            Err(send_err) => {
                error!(error = %send_err, "could not deliver failure notice");
                false
            }
        }
    }
}
