//! Inactivity-driven session timeout state machine.
//!
//! The monitor is a pure state machine over an injected clock: the embedding
//! layer feeds it DOM activity via [`InactivityMonitor::record_activity`] and
//! drives transitions with a periodic [`InactivityMonitor::poll`] tick. It never
//! spawns timers itself, which keeps every transition testable without sleeping.
//!
//! States: `Active` (user present), `Warning` (prompt window, counting down),
//! `Expired` (terminal; the embedding layer logs out and navigates to login,
//! navigating even when the logout call fails).

// self
use crate::_prelude::*;

/// Default total inactivity timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::minutes(30);
/// Default warning window before expiry.
pub const DEFAULT_PROMPT_BEFORE: Duration = Duration::minutes(5);

// Activity events arrive in bursts (mousemove); one reset per second is enough.
const ACTIVITY_THROTTLE: Duration = Duration::seconds(1);

/// Errors raised while constructing a monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum MonitorConfigError {
	/// Both durations must be positive.
	#[error("Timeout and prompt window must be positive.")]
	NonPositiveDuration,
	/// The prompt window must fit inside the timeout.
	#[error("The prompt window must be shorter than the total timeout.")]
	PromptExceedsTimeout,
}

/// Lifecycle states of the inactivity monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MonitorState {
	/// User activity observed recently.
	Active,
	/// Warning window armed; remaining seconds are counting down.
	Warning,
	/// Session expired; terminal for this monitor instance.
	Expired,
}
impl MonitorState {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			MonitorState::Active => "active",
			MonitorState::Warning => "warning",
			MonitorState::Expired => "expired",
		}
	}
}
impl Display for MonitorState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Transition reported by a [`InactivityMonitor::poll`] tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorTransition {
	/// No state change.
	Unchanged,
	/// The monitor just entered the warning window.
	Warned,
	/// The monitor just expired; the session must be terminated.
	Expired,
}

/// Inactivity state machine tracking the last qualifying activity instant.
#[derive(Clone, Debug)]
pub struct InactivityMonitor {
	timeout: Duration,
	prompt_before: Duration,
	last_activity: OffsetDateTime,
	state: MonitorState,
}
impl InactivityMonitor {
	/// Creates a monitor with validated durations, active as of `now`.
	pub fn new(
		timeout: Duration,
		prompt_before: Duration,
		now: OffsetDateTime,
	) -> Result<Self, MonitorConfigError> {
		if !timeout.is_positive() || !prompt_before.is_positive() {
			return Err(MonitorConfigError::NonPositiveDuration);
		}
		if prompt_before >= timeout {
			return Err(MonitorConfigError::PromptExceedsTimeout);
		}

		Ok(Self { timeout, prompt_before, last_activity: now, state: MonitorState::Active })
	}

	/// Creates a monitor with the default 30-minute timeout and 5-minute prompt.
	pub fn with_defaults(now: OffsetDateTime) -> Self {
		Self {
			timeout: DEFAULT_TIMEOUT,
			prompt_before: DEFAULT_PROMPT_BEFORE,
			last_activity: now,
			state: MonitorState::Active,
		}
	}

	/// Returns the current state.
	pub fn state(&self) -> MonitorState {
		self.state
	}

	/// Instant at which the warning window opens.
	pub fn warning_deadline(&self) -> OffsetDateTime {
		self.last_activity + (self.timeout - self.prompt_before)
	}

	/// Instant at which the session expires.
	pub fn expiry_deadline(&self) -> OffsetDateTime {
		self.last_activity + self.timeout
	}

	/// Records a qualifying DOM activity event (mouse, keyboard, touch, scroll,
	/// click).
	///
	/// Resets only apply while `Active`: once the warning window is armed, the
	/// user must extend explicitly. Events within one second of the previous
	/// reset are dropped. Returns `true` when the activity reset the clock.
	pub fn record_activity(&mut self, now: OffsetDateTime) -> bool {
		if self.state != MonitorState::Active {
			return false;
		}
		if now - self.last_activity <= ACTIVITY_THROTTLE {
			return false;
		}

		self.last_activity = now;

		true
	}

	/// Explicitly extends the session, equivalent to a fresh activity reset.
	///
	/// Valid from `Active` and `Warning`; `Expired` is terminal. Returns `true`
	/// when the session was extended.
	pub fn extend(&mut self, now: OffsetDateTime) -> bool {
		if self.state == MonitorState::Expired {
			return false;
		}

		self.last_activity = now;
		self.state = MonitorState::Active;

		true
	}

	/// Drives the state machine from the current clock reading.
	///
	/// Call on a one-second tick. A large clock jump past the expiry deadline
	/// while `Active` expires directly without reporting the warning first.
	pub fn poll(&mut self, now: OffsetDateTime) -> MonitorTransition {
		match self.state {
			MonitorState::Active =>
				if now >= self.expiry_deadline() {
					self.state = MonitorState::Expired;

					MonitorTransition::Expired
				} else if now >= self.warning_deadline() {
					self.state = MonitorState::Warning;

					MonitorTransition::Warned
				} else {
					MonitorTransition::Unchanged
				},
			MonitorState::Warning =>
				if now >= self.expiry_deadline() {
					self.state = MonitorState::Expired;

					MonitorTransition::Expired
				} else {
					MonitorTransition::Unchanged
				},
			MonitorState::Expired => MonitorTransition::Unchanged,
		}
	}

	/// Remaining whole seconds before expiry; `Some` only while `Warning`.
	pub fn remaining_seconds(&self, now: OffsetDateTime) -> Option<i64> {
		if self.state != MonitorState::Warning {
			return None;
		}

		Some((self.expiry_deadline() - now).whole_seconds().max(0))
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	const START: OffsetDateTime = macros::datetime!(2025-01-01 09:00 UTC);

	fn monitor() -> InactivityMonitor {
		InactivityMonitor::new(Duration::minutes(30), Duration::minutes(5), START)
			.expect("Default monitor fixture should build.")
	}

	#[test]
	fn construction_validates_durations() {
		assert_eq!(
			InactivityMonitor::new(Duration::ZERO, Duration::minutes(5), START)
				.expect_err("Zero durations should be rejected."),
			MonitorConfigError::NonPositiveDuration,
		);
		assert_eq!(
			InactivityMonitor::new(Duration::minutes(5), Duration::minutes(5), START)
				.expect_err("Prompt window equal to the timeout should be rejected."),
			MonitorConfigError::PromptExceedsTimeout,
		);
	}

	#[test]
	fn warning_fires_at_timeout_minus_prompt_with_full_window_remaining() {
		let mut monitor = monitor();

		assert_eq!(monitor.poll(START + Duration::minutes(24)), MonitorTransition::Unchanged);
		assert_eq!(monitor.poll(START + Duration::minutes(25)), MonitorTransition::Warned);
		assert_eq!(monitor.state(), MonitorState::Warning);
		assert_eq!(monitor.remaining_seconds(START + Duration::minutes(25)), Some(300));
	}

	#[test]
	fn activity_before_warning_resets_the_clock() {
		let mut monitor = monitor();

		assert!(monitor.record_activity(START + Duration::minutes(20)));
		assert_eq!(monitor.poll(START + Duration::minutes(40)), MonitorTransition::Unchanged);
		assert_eq!(monitor.poll(START + Duration::minutes(45)), MonitorTransition::Warned);
	}

	#[test]
	fn activity_is_throttled_to_one_reset_per_second() {
		let mut monitor = monitor();

		assert!(monitor.record_activity(START + Duration::seconds(10)));
		assert!(!monitor.record_activity(START + Duration::seconds(10)));
		assert!(!monitor.record_activity(START + Duration::milliseconds(10_500)));
		assert!(monitor.record_activity(START + Duration::seconds(12)));
	}

	#[test]
	fn activity_does_not_reset_during_warning() {
		let mut monitor = monitor();

		monitor.poll(START + Duration::minutes(25));

		assert!(!monitor.record_activity(START + Duration::minutes(26)));
		assert_eq!(monitor.state(), MonitorState::Warning);
	}

	#[test]
	fn extend_returns_from_warning_to_active() {
		let mut monitor = monitor();

		monitor.poll(START + Duration::minutes(25));

		assert!(monitor.extend(START + Duration::minutes(26)));
		assert_eq!(monitor.state(), MonitorState::Active);
		assert_eq!(monitor.remaining_seconds(START + Duration::minutes(26)), None);
		// Fresh 30-minute window from the extension instant.
		assert_eq!(
			monitor.poll(START + Duration::minutes(26) + Duration::minutes(25)),
			MonitorTransition::Warned,
		);
	}

	#[test]
	fn warning_counts_down_to_expiry() {
		let mut monitor = monitor();

		monitor.poll(START + Duration::minutes(25));

		assert_eq!(
			monitor.remaining_seconds(START + Duration::minutes(29) + Duration::seconds(59)),
			Some(1),
		);
		assert_eq!(
			monitor.poll(START + Duration::minutes(29) + Duration::seconds(59)),
			MonitorTransition::Unchanged,
		);
		assert_eq!(monitor.poll(START + Duration::minutes(30)), MonitorTransition::Expired);
		assert_eq!(monitor.state(), MonitorState::Expired);
	}

	#[test]
	fn expired_is_terminal() {
		let mut monitor = monitor();

		monitor.poll(START + Duration::minutes(25));
		monitor.poll(START + Duration::minutes(30));

		assert!(!monitor.extend(START + Duration::minutes(31)));
		assert!(!monitor.record_activity(START + Duration::minutes(31)));
		assert_eq!(monitor.poll(START + Duration::minutes(31)), MonitorTransition::Unchanged);
		assert_eq!(monitor.state(), MonitorState::Expired);
	}

	#[test]
	fn clock_jump_past_expiry_skips_straight_to_expired() {
		let mut monitor = monitor();

		assert_eq!(monitor.poll(START + Duration::hours(2)), MonitorTransition::Expired);
	}

	#[test]
	fn defaults_match_thirty_and_five_minutes() {
		let monitor = InactivityMonitor::with_defaults(START);

		assert_eq!(monitor.warning_deadline(), START + Duration::minutes(25));
		assert_eq!(monitor.expiry_deadline(), START + Duration::minutes(30));
	}
}
