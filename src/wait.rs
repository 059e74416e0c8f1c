//! The one place that waits on a page.
//!
//! Every "is it there yet" loop in the crate goes through [`Poller::await_condition`],
//! so timeout and cancellation behave the same for every field and stage.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::session::Session;

/// How long a wait may last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Give up once this much time has passed.
    Within(Duration),
    /// Keep trying until success or cancellation. Reserved for steps paced by
    /// a human or a slow multi-step page, where no fixed bound is meaningful.
    Unbounded,
}

/// Retry loop shared by all stages of a run, tied to that run's cancel token.
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Poller {
    /// `timeout` is the bound used by the bounded helpers.
    pub fn new(interval: Duration, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            interval,
            timeout,
            cancel,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn bounded(&self) -> Deadline {
        Deadline::Within(self.timeout)
    }

    /// Deadline of a single poll interval, for elements that are either
    /// already on a loaded page or not there at all.
    pub fn brief(&self) -> Deadline {
        Deadline::Within(self.interval)
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fails with [`Error::Cancelled`] once the token is signaled.
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep that wakes early, with [`Error::Cancelled`], when the token fires.
    pub async fn pause(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Run a one-shot operation, abandoning it if the token fires first.
    pub async fn interruptible<T, Fut>(&self, operation: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.checkpoint()?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = operation => result,
        }
    }

    /// Evaluate `predicate` until it yields `Ok`, the deadline passes, or the
    /// token fires.
    ///
    /// An `Err` from the predicate only means "not yet". Returns `Ok(None)` on
    /// timeout and `Err(Error::Cancelled)` on cancellation. A single attempt
    /// is raced against both the token and the remaining time, so a stuck
    /// browser call cannot stretch either bound.
    pub async fn await_condition<T, F, Fut>(
        &self,
        deadline: Deadline,
        mut predicate: F,
    ) -> Result<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let end = match deadline {
            Deadline::Within(limit) => Some(Instant::now() + limit),
            Deadline::Unbounded => None,
        };

        loop {
            self.checkpoint()?;

            let attempt = predicate();
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                outcome = async {
                    match end {
                        Some(end) => tokio::time::timeout_at(end, attempt).await.unwrap_or_else(
                            |_| Err(Error::Timeout("attempt overran deadline".into())),
                        ),
                        None => attempt.await,
                    }
                } => outcome,
            };

            match outcome {
                Ok(value) => return Ok(Some(value)),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => tracing::trace!("condition not met: {e}"),
            }

            if end.is_some_and(|end| Instant::now() >= end) {
                return Ok(None);
            }
            self.pause(self.interval).await?;
            if end.is_some_and(|end| Instant::now() >= end) {
                return Ok(None);
            }
        }
    }

    /// Click `locator` as soon as it can be clicked. `Ok(false)` if it never
    /// could within the bound.
    pub async fn click_when_ready<S>(&self, session: &S, locator: &Locator) -> Result<bool>
    where
        S: Session + ?Sized,
    {
        self.click_within(session, locator, self.bounded()).await
    }

    /// Like [`Poller::click_when_ready`] with an explicit deadline.
    pub async fn click_within<S>(
        &self,
        session: &S,
        locator: &Locator,
        deadline: Deadline,
    ) -> Result<bool>
    where
        S: Session + ?Sized,
    {
        let clicked = self
            .await_condition(deadline, || session.click(locator))
            .await?
            .is_some();
        if !clicked {
            tracing::debug!(%locator, "element never became clickable");
        }
        Ok(clicked)
    }

    /// Clear `locator` and type `value` into it. `Ok(false)` if the element
    /// never showed up within the bound.
    pub async fn fill_when_ready<S>(
        &self,
        session: &S,
        locator: &Locator,
        value: &str,
    ) -> Result<bool>
    where
        S: Session + ?Sized,
    {
        let filled = self
            .await_condition(self.bounded(), move || async move {
                session.clear(locator).await?;
                session.type_text(locator, value).await
            })
            .await?
            .is_some();
        if !filled {
            tracing::debug!(%locator, "element never became fillable");
        }
        Ok(filled)
    }

    /// Send `key` to `locator` once it is there.
    pub async fn press_when_ready<S>(
        &self,
        session: &S,
        locator: &Locator,
        key: &str,
    ) -> Result<bool>
    where
        S: Session + ?Sized,
    {
        let pressed = self
            .await_condition(self.bounded(), || session.press_key(locator, key))
            .await?;
        Ok(pressed.is_some())
    }

    /// Text of `locator`, or `None` if it never appeared before `deadline`.
    pub async fn text_within<S>(
        &self,
        session: &S,
        locator: &Locator,
        deadline: Deadline,
    ) -> Result<Option<String>>
    where
        S: Session + ?Sized,
    {
        self.await_condition(deadline, || session.text(locator)).await
    }

    /// Wait for at least one match of `locator`.
    pub async fn present<S>(
        &self,
        session: &S,
        locator: &Locator,
        deadline: Deadline,
    ) -> Result<bool>
    where
        S: Session + ?Sized,
    {
        let found = self
            .await_condition(deadline, move || async move {
                match session.count(locator).await? {
                    0 => Err(Error::ElementNotFound(locator.to_string())),
                    n => Ok(n),
                }
            })
            .await?;
        Ok(found.is_some())
    }
}
