//! Single-flight gate for the refresh protocol.
//!
//! The coordinator is an explicit `Idle`/`Refreshing` state machine behind a synchronous
//! lock. [`RefreshCoordinator::acquire`] checks the phase and transitions in one critical
//! section that never spans an `.await`, so two concurrent authorization failures can
//! never both observe `Idle`. The first caller becomes the leader and receives a
//! [`RefreshLease`]; later callers are queued in arrival order until the lease settles.

// std
use std::{collections::VecDeque, mem};
// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::TokenSecret, error::SessionError};

/// Outcome fanned out to every request waiting on one refresh.
pub type RefreshOutcome = Result<TokenSecret, SessionError>;

/// Observable coordinator phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshState {
	/// No refresh is outstanding.
	Idle,
	/// A refresh is in flight.
	Refreshing {
		/// Requests parked behind the in-flight refresh.
		queued: usize,
	},
}

/// Result of asking the coordinator for a refreshed credential.
#[derive(Debug)]
pub enum RefreshTicket {
	/// The caller must run the refresh protocol and settle the lease.
	Leader(RefreshLease),
	/// A refresh is already running; the receiver yields its outcome.
	Queued(oneshot::Receiver<RefreshOutcome>),
	/// The attempt counter reached the ceiling; no refresh may run.
	Exhausted {
		/// Configured ceiling.
		ceiling: u32,
	},
}

#[derive(Debug)]
enum Phase {
	Idle,
	Refreshing { waiters: VecDeque<oneshot::Sender<RefreshOutcome>> },
}

#[derive(Debug)]
struct CoordinatorState {
	phase: Phase,
	attempts: u32,
}

/// Shared refresh gate owning the attempt counter and the pending-request queue.
#[derive(Clone, Debug)]
pub struct RefreshCoordinator {
	inner: Arc<Mutex<CoordinatorState>>,
	ceiling: u32,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator that allows `ceiling` consecutive refresh attempts.
	pub fn new(ceiling: u32) -> Self {
		Self {
			inner: Arc::new(Mutex::new(CoordinatorState { phase: Phase::Idle, attempts: 0 })),
			ceiling,
		}
	}

	/// Configured attempt ceiling.
	pub fn ceiling(&self) -> u32 {
		self.ceiling
	}

	/// Number of refresh attempts since the last successful response.
	pub fn attempts(&self) -> u32 {
		self.inner.lock().attempts
	}

	/// Current phase, with the queue length while refreshing.
	pub fn state(&self) -> RefreshState {
		match &self.inner.lock().phase {
			Phase::Idle => RefreshState::Idle,
			Phase::Refreshing { waiters } => RefreshState::Refreshing { queued: waiters.len() },
		}
	}

	/// Joins the in-flight refresh or starts a new one.
	///
	/// The ceiling is only consulted while idle: a request that fails during an outstanding
	/// refresh always waits for that refresh's outcome.
	pub fn acquire(&self) -> RefreshTicket {
		let mut guard = self.inner.lock();
		let state = &mut *guard;

		if let Phase::Refreshing { waiters } = &mut state.phase {
			let (sender, receiver) = oneshot::channel();

			waiters.push_back(sender);

			return RefreshTicket::Queued(receiver);
		}
		if state.attempts >= self.ceiling {
			return RefreshTicket::Exhausted { ceiling: self.ceiling };
		}

		state.attempts += 1;
		state.phase = Phase::Refreshing { waiters: VecDeque::new() };

		RefreshTicket::Leader(RefreshLease { inner: self.inner.clone(), settled: false })
	}

	/// Forgives previous failed attempts after a healthy round-trip.
	pub fn record_success(&self) {
		self.inner.lock().attempts = 0;
	}
}

/// Leadership of one refresh cycle.
///
/// Settling returns the coordinator to `Idle` and resolves every queued request with the
/// same outcome. Dropping an unsettled lease releases the queue with
/// [`SessionError::RefreshAbandoned`].
#[derive(Debug)]
pub struct RefreshLease {
	inner: Arc<Mutex<CoordinatorState>>,
	settled: bool,
}
impl RefreshLease {
	/// Publishes the outcome to every queued request in FIFO order and returns how many
	/// were released.
	pub fn settle(mut self, outcome: &RefreshOutcome) -> usize {
		self.settled = true;

		let waiters = self.release();
		let released = waiters.len();

		for waiter in waiters {
			// A waiter whose request was dropped no longer needs the outcome.
			let _ = waiter.send(outcome.clone());
		}

		released
	}

	fn release(&self) -> VecDeque<oneshot::Sender<RefreshOutcome>> {
		match mem::replace(&mut self.inner.lock().phase, Phase::Idle) {
			Phase::Refreshing { waiters } => waiters,
			Phase::Idle => VecDeque::new(),
		}
	}
}
impl Drop for RefreshLease {
	fn drop(&mut self) {
		if self.settled {
			return;
		}

		for waiter in self.release() {
			let _ = waiter.send(Err(SessionError::RefreshAbandoned));
		}
	}
}
