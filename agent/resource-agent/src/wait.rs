/*!

A remote object that is written asynchronously reports a provisioning state. The `wait` module
polls that state until it reaches a terminal value or a deadline passes.

!*/

use log::trace;
use reconcile_model::ProvisioningState;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

/// The shortest time between two polls unless a caller asks for less.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(15);

/// How long to wait when a caller does not say.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Describes one wait: the states that mean "keep waiting", the states that mean "done", and how
/// long to keep polling. Any state in neither set is a failure.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StateChange {
    pub pending: Vec<ProvisioningState>,
    pub target: Vec<ProvisioningState>,
    pub timeout: Duration,
    pub min_interval: Duration,
}

impl StateChange {
    pub fn new<P, T>(pending: P, target: T) -> Self
    where
        P: IntoIterator<Item = ProvisioningState>,
        T: IntoIterator<Item = ProvisioningState>,
    {
        Self {
            pending: pending.into_iter().collect(),
            target: target.into_iter().collect(),
            timeout: DEFAULT_TIMEOUT,
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    /// Where an observed `state` leaves the wait.
    pub fn classify(&self, state: &ProvisioningState) -> WaitState {
        if self.target.contains(state) {
            WaitState::Succeeded(state.clone())
        } else if self.pending.contains(state) {
            WaitState::Pending
        } else {
            WaitState::Failed(state.clone())
        }
    }

    /// The target states, for messages.
    pub fn expected(&self) -> String {
        self.target
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The states of a wait. `Pending` is the only non-terminal one, and [`await_terminal_state`]
/// never returns it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WaitState {
    Pending,
    /// The object reached the contained target state.
    Succeeded(ProvisioningState),
    /// The object reported the contained state, which is neither pending nor a target.
    Failed(ProvisioningState),
    /// The deadline passed. Holds the last state observed, if any.
    TimedOut(Option<ProvisioningState>),
}

impl WaitState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WaitState::Pending)
    }
}

/// Poll `refresh` until it reports a terminal state for `change`, or until `change.timeout`
/// passes.
///
/// `refresh` receives the time left before the deadline and is cancelled when that time runs out,
/// so a slow read cannot push the wait past its deadline. Polls are `change.min_interval` apart,
/// except that the last sleep is cut short at the deadline. An error from `refresh` ends the wait
/// and is returned as is.
pub async fn await_terminal_state<F, Fut, E>(
    change: &StateChange,
    mut refresh: F,
) -> Result<WaitState, E>
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = Result<ProvisioningState, E>>,
{
    let deadline = Instant::now() + change.timeout;
    let mut last = None;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(WaitState::TimedOut(last));
        }
        let state = match timeout(remaining, refresh(remaining)).await {
            Ok(result) => result?,
            Err(_) => {
                trace!("Refresh did not finish before the deadline");
                return Ok(WaitState::TimedOut(last));
            }
        };

        match change.classify(&state) {
            WaitState::Pending => trace!("Still waiting, state is '{}'", state),
            terminal => return Ok(terminal),
        }
        last = Some(state);

        let remaining = deadline.saturating_duration_since(Instant::now());
        sleep(change.min_interval.min(remaining)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile_model::ProvisioningState::{Canceled, Creating, Failed, Succeeded, Updating};
    use std::collections::VecDeque;

    fn change() -> StateChange {
        StateChange::new(vec![Creating, Updating], vec![Succeeded])
            .with_timeout(Duration::from_secs(60))
    }

    /// A refresh that reports `states` in order, repeating the last one, and counts calls.
    fn scripted(
        states: Vec<ProvisioningState>,
        polls: &mut usize,
    ) -> impl FnMut(Duration) -> std::future::Ready<Result<ProvisioningState, String>> + '_ {
        let mut states: VecDeque<_> = states.into();
        move |_| {
            *polls += 1;
            let state = if states.len() > 1 {
                states.pop_front()
            } else {
                states.front().cloned()
            };
            std::future::ready(state.ok_or_else(|| "no states".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pending_then_succeeded() {
        let start = Instant::now();
        let mut polls = 0;
        let state = await_terminal_state(
            &change(),
            scripted(vec![Creating, Creating, Succeeded], &mut polls),
        )
        .await
        .unwrap();
        assert_eq!(state, WaitState::Succeeded(Succeeded));
        assert_eq!(polls, 3);
        assert_eq!(start.elapsed(), DEFAULT_MIN_INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_state_fails_without_waiting() {
        let start = Instant::now();
        let mut polls = 0;
        let state = await_terminal_state(&change(), scripted(vec![Failed], &mut polls))
            .await
            .unwrap();
        assert_eq!(state, WaitState::Failed(Failed));
        assert_eq!(polls, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);

        let state = await_terminal_state(&change(), scripted(vec![Updating, Canceled], &mut 0))
            .await
            .unwrap();
        assert_eq!(state, WaitState::Failed(Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_pending_times_out_rather_than_failing() {
        let start = Instant::now();
        let mut polls = 0;
        let state = await_terminal_state(&change(), scripted(vec![Creating], &mut polls))
            .await
            .unwrap();
        assert_eq!(state, WaitState::TimedOut(Some(Creating)));
        // Polls at 0s, 15s, 30s and 45s, then the deadline.
        assert_eq!(polls, 4);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_refresh_is_bounded_by_the_deadline() {
        let start = Instant::now();
        let state = await_terminal_state(&change(), |remaining| async move {
            assert_eq!(remaining, Duration::from_secs(60));
            sleep(Duration::from_secs(3600)).await;
            Ok::<_, String>(Succeeded)
        })
        .await
        .unwrap();
        assert_eq!(state, WaitState::TimedOut(None));
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_errors_end_the_wait() {
        let err = await_terminal_state(&change(), |_| async {
            Err::<ProvisioningState, _>("throttled".to_string())
        })
        .await
        .unwrap_err();
        assert_eq!(err, "throttled");
    }

    #[test]
    fn only_pending_is_not_terminal() {
        assert!(!WaitState::Pending.is_terminal());
        assert!(WaitState::TimedOut(None).is_terminal());
        assert_eq!(change().classify(&Updating), WaitState::Pending);
        assert_eq!(
            change().classify(&ProvisioningState::Other("Migrating".into())),
            WaitState::Failed(ProvisioningState::Other("Migrating".into()))
        );
    }
}
