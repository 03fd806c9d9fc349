use crate::PathParams;
use crate::error::{DispatchError, FaultSite, Panicked, Step};
use crate::middleware::{Flow, SharedMiddleware};
use crate::view::{RequestView, ResponseView};
use futures::FutureExt;
use std::future::{Future, pending};
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Why a pipeline stopped before reaching the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The middleware returned [`Flow::Halt`].
    Rejected,
    /// The middleware sent the response.
    ResponseSent,
}

/// A pipeline that stopped early. This is regular control flow, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halt {
    step: usize,
    reason: HaltReason,
}

impl Halt {
    /// Position of the halting middleware in the global-then-route sequence.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn reason(&self) -> HaltReason {
        self.reason
    }
}

/// The middleware sequence of one dispatch: global middleware in registration order, then the
/// route's frozen chain.
#[derive(Clone, Copy)]
pub struct Pipeline<'a> {
    global: &'a [SharedMiddleware],
    route: &'a [SharedMiddleware],
}

impl std::fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("global", &self.global.len()).field("route", &self.route.len()).finish()
    }
}

impl<'a> Pipeline<'a> {
    pub fn new(global: &'a [SharedMiddleware], route: &'a [SharedMiddleware]) -> Self {
        Self { global, route }
    }

    pub fn len(&self) -> usize {
        self.global.len() + self.route.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a SharedMiddleware> + use<'a> {
        self.global.iter().chain(self.route.iter())
    }

    /// Runs every step in order, returning the halt if one of them stopped the pipeline.
    pub(crate) async fn run(
        &self,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
        params: &PathParams<'_, '_>,
        guard: &StepGuard,
        site: &(dyn Fn(Step) -> FaultSite + Sync),
    ) -> Result<Option<Halt>, DispatchError> {
        for (index, middleware) in self.iter().enumerate() {
            let step = Step::Middleware(index);
            guard.check(|| site(step))?;

            let flow = guard
                .run(middleware.handle(req, resp, params))
                .await
                .map_err(|interrupt| interrupt.into_error(site(step)))?
                .map_err(|source| DispatchError::Fault { site: site(step), source })?;

            // the sent check wins over whatever the middleware returned
            if resp.is_sent() {
                debug!(step = index, "response sent by middleware, pipeline halted");
                return Ok(Some(Halt { step: index, reason: HaltReason::ResponseSent }));
            }

            if flow == Flow::Halt {
                debug!(step = index, "middleware halted the pipeline");
                return Ok(Some(Halt { step: index, reason: HaltReason::Rejected }));
            }
        }
        Ok(None)
    }
}

/// Something that stopped a step from completing.
#[derive(Debug)]
pub(crate) enum Interrupt {
    Panicked(Panicked),
    Cancelled,
    DeadlineExceeded,
}

impl Interrupt {
    pub(crate) fn into_error(self, site: FaultSite) -> DispatchError {
        match self {
            Self::Panicked(panicked) => DispatchError::Fault { site, source: Box::new(panicked) },
            Self::Cancelled => DispatchError::Cancelled { site },
            Self::DeadlineExceeded => DispatchError::DeadlineExceeded { site },
        }
    }
}

/// Deadline and cancellation of one dispatch, read once from the request view.
#[derive(Debug, Default)]
pub(crate) struct StepGuard {
    deadline: Option<Instant>,
    token: Option<CancellationToken>,
}

impl StepGuard {
    pub(crate) fn from_request(req: &dyn RequestView) -> Self {
        Self { deadline: req.deadline(), token: req.cancellation().cloned() }
    }

    /// Fails if the dispatch was cancelled or ran out of time before the next step.
    pub(crate) fn check(&self, site: impl FnOnce() -> FaultSite) -> Result<(), DispatchError> {
        if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(DispatchError::Cancelled { site: site() });
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(DispatchError::DeadlineExceeded { site: site() });
        }
        Ok(())
    }

    /// Drives one step, racing it against the deadline and the cancellation token.
    ///
    /// Racing needs a tokio runtime with the time driver enabled whenever a deadline is set.
    pub(crate) async fn run<F: Future>(&self, step: F) -> Result<F::Output, Interrupt> {
        let step = AssertUnwindSafe(step).catch_unwind();
        let caught = |payload: Box<dyn std::any::Any + Send>| Interrupt::Panicked(Panicked::from_payload(&*payload));

        if self.deadline.is_none() && self.token.is_none() {
            return step.await.map_err(caught);
        }

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
                None => pending::<()>().await,
            }
        };
        let cancelled = async {
            match &self.token {
                Some(token) => token.cancelled().await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            output = step => output.map_err(caught),
            () = cancelled => Err(Interrupt::Cancelled),
            () = expired => Err(Interrupt::DeadlineExceeded),
        }
    }
}
