//! Periodic session re-validation.

// crates.io
use tokio::{
	task::JoinHandle,
	time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	session::{Redirect, Session},
	transport::ApiTransport,
};

impl<T> Session<T>
where
	T: ?Sized + ApiTransport,
{
	/// Spawns a task that runs [`Session::check_auth`] every
	/// [`check_interval`](crate::config::ClientConfig::check_interval) and signals
	/// [`Redirect::Login`] on a negative result.
	///
	/// The first check happens one interval after spawning. The task stops when the handle
	/// is dropped or shut down, or when the session is torn down. Must be called from
	/// within a Tokio runtime.
	pub fn spawn_watchdog(self: &Arc<Self>) -> WatchdogHandle {
		let token = self.shutdown.child_token();
		let cancelled = token.clone();
		let session = Arc::clone(self);
		let period = session.client.config.check_interval;
		let task = tokio::spawn(async move {
			let mut ticker = time::interval_at(time::Instant::now() + period, period);

			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

			loop {
				tokio::select! {
					_ = cancelled.cancelled() => break,
					_ = ticker.tick() => {},
				}

				let authenticated = session.check_auth().await;

				if cancelled.is_cancelled() {
					break;
				}
				if !authenticated {
					tracing::info!("Periodic session check failed; redirecting to login.");
					session.signal(Redirect::Login);
				}
			}

			tracing::debug!("Session watchdog stopped.");
		});

		WatchdogHandle { token, task: Some(task) }
	}
}

/// Handle to a running watchdog. Dropping it cancels the task.
#[derive(Debug)]
pub struct WatchdogHandle {
	token: CancellationToken,
	task: Option<JoinHandle<()>>,
}
impl WatchdogHandle {
	/// Requests cancellation without waiting for the task to exit.
	pub fn cancel(&self) {
		self.token.cancel();
	}

	/// Returns `true` once cancellation was requested, directly or via session teardown.
	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}

	/// Cancels the task and waits for it to exit.
	pub async fn shutdown(mut self) {
		self.token.cancel();

		let Some(task) = self.task.take() else { return };

		if let Err(e) = task.await {
			tracing::warn!(error = %e, "Session watchdog exited abnormally.");
		}
	}
}
impl Drop for WatchdogHandle {
	fn drop(&mut self) {
		self.token.cancel();
	}
}
