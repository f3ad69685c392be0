use crate::booking::BookingCoordinator;
use crate::config::Config;
use crate::error::{BookingError, StoreError};
use crate::extractors::{
    classify_confirmation, extract_name, extract_phone, extract_time, is_cancel_request,
    normalize_e164, Confirmation, Reason, TimeRequest,
};
use crate::locale::{zone_for_phone, CallLocale, Clock};
use crate::profile::CallerProfileResolver;
use crate::prompts;
use crate::session_store::SessionStore;
use crate::storage::BookingOutcome;
use crate::types::{CallSession, CallState, Expected, NextStep, Reply, Slot, Turn, TurnOutcome};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of applying one turn to a session, before it is written back.
struct Step {
    session: CallSession,
    say: String,
    outcome: TurnOutcome,
}

/// The call-flow state machine.  Each webhook turn is one `handle_turn`; everything it needs
/// between turns lives in the session store, keyed by call id.
#[derive(Clone)]
pub struct CallFlow {
    config: Arc<Config>,
    sessions: Arc<dyn SessionStore>,
    profiles: CallerProfileResolver,
    booking: BookingCoordinator,
    clock: Arc<dyn Clock>,
}

impl CallFlow {
    pub fn new(
        config: Arc<Config>,
        sessions: Arc<dyn SessionStore>,
        profiles: CallerProfileResolver,
        booking: BookingCoordinator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            sessions,
            profiles,
            booking,
            clock,
        }
    }

    /// Process one turn within the configured budget.  Never fails: every condition becomes
    /// something to say to the caller.
    pub async fn handle_turn(&self, turn: Turn) -> Reply {
        match tokio::time::timeout(self.config.turn_budget, self.process(&turn)).await {
            Ok(reply) => reply,
            Err(_) => {
                warn!(call_id=%turn.call_id, budget=?self.config.turn_budget, "turn exceeded its budget");
                retry_later(None)
            }
        }
    }

    /// The caller hung up.  A live session is marked abandoned and removed; returns the state
    /// the call was left in, if there was one.
    pub async fn hangup(&self, call_id: &str) -> Option<CallState> {
        let session = match self.sessions.get(call_id).await {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(e) => {
                warn!(error=%e, call_id=%call_id, "could not load session on hangup");
                return None;
            }
        };
        let left_in = session.state;
        if !left_in.is_terminal() {
            let mut abandoned = session.clone();
            abandoned.state = CallState::Abandoned;
            abandoned.turn_seq += 1;
            abandoned.updated_at = self.clock.now();
            if let Err(e) = self
                .sessions
                .put(&abandoned, Expected::At(session.revision()))
                .await
            {
                debug!(error=%e, call_id=%call_id, "abandon write lost, deleting anyway");
            }
            info!(call_id=%call_id, state=%left_in, "caller hung up");
        }
        self.discard(call_id).await;
        Some(left_in)
    }

    async fn process(&self, turn: &Turn) -> Reply {
        let now = self.clock.now();
        let current = match self.sessions.get(&turn.call_id).await {
            Ok(current) => current,
            Err(e) => {
                warn!(error=%e, call_id=%turn.call_id, "session store unavailable");
                return retry_later(None);
            }
        };

        let (prior, step) = match current {
            // Only our own gather actions carry a seq, so the call has already finished and
            // its session is gone.
            None if turn.seq.is_some() => {
                debug!(call_id=%turn.call_id, seq=?turn.seq, "turn for a finished call");
                return call_ended();
            }
            None => {
                let session = self.open_session(turn, now);
                debug!(call_id=%turn.call_id, is_test_data=session.is_test_data, "new call");
                (None, self.enter(session, now).await)
            }
            Some(session) if is_replay(&session, turn) => {
                debug!(
                    call_id=%turn.call_id,
                    seq=?turn.seq,
                    turn_seq=session.turn_seq,
                    "replayed turn, re-prompting"
                );
                return current_prompt(&session, TurnOutcome::Replayed);
            }
            Some(session) => {
                let prior = session.revision();
                (Some(prior), self.advance(session, turn, now).await)
            }
        };

        if step.outcome == TurnOutcome::RetryLater {
            return retry_later(Some(step.session.state));
        }
        self.commit(turn, prior.map_or(Expected::Absent, Expected::At), step)
            .await
    }

    fn open_session(&self, turn: &Turn, now: DateTime<Utc>) -> CallSession {
        let caller_phone = turn
            .caller_phone
            .as_deref()
            .and_then(|raw| normalize_e164(raw, &self.config.country_code).ok());
        let is_test_data = turn.is_test_data
            || caller_phone
                .as_deref()
                .map_or(false, |p| self.config.is_test_caller(p));
        CallSession::new(&turn.call_id, caller_phone, is_test_data, now)
    }

    /// Write the step back, conditioned on the revision the turn started from.  The write is the
    /// last thing a turn does, so the caller hears the new prompt only if the new state stuck.
    async fn commit(&self, turn: &Turn, expected: Expected, step: Step) -> Reply {
        let Step {
            session,
            say,
            outcome,
        } = step;
        match self.sessions.put(&session, expected).await {
            Ok(()) => {
                info!(
                    call_id=%session.call_id,
                    state=%session.state,
                    turn_seq=session.turn_seq,
                    outcome=?outcome,
                    "turn processed"
                );
                if session.state.is_terminal() {
                    self.discard(&session.call_id).await;
                }
                Reply {
                    say,
                    next: next_step(&session),
                    state: Some(session.state),
                    outcome,
                }
            }
            Err(StoreError::Conflict) => {
                // Another delivery of this turn won; answer with whatever it left behind.
                match self.sessions.get(&turn.call_id).await {
                    Ok(Some(winner)) => current_prompt(&winner, TurnOutcome::Replayed),
                    Ok(None) => retry_later(None),
                    Err(e) => {
                        warn!(error=%e, call_id=%turn.call_id, "session store unavailable");
                        retry_later(None)
                    }
                }
            }
            Err(e) => {
                warn!(error=%e, call_id=%turn.call_id, "failed to save session");
                retry_later(None)
            }
        }
    }

    async fn discard(&self, call_id: &str) {
        if let Err(e) = self.sessions.delete(call_id).await {
            debug!(error=%e, call_id=%call_id, "session delete failed, leaving it to expire");
        }
    }

    async fn enter(&self, mut session: CallSession, now: DateTime<Utc>) -> Step {
        let profile = match &session.caller_phone {
            Some(phone) => self.profiles.resolve(phone).await,
            None => None,
        };
        let say = match profile {
            Some(profile) => {
                let say = prompts::greeting_returning(
                    &profile.full_name,
                    profile.last_appointment_at,
                    self.config.business_hours.tz,
                );
                session.slots.name = Some(profile.full_name);
                session.slots.phone = session.caller_phone.clone();
                session.state = CallState::CollectTime;
                say
            }
            None => {
                session.state = CallState::CollectName;
                prompts::greeting_new()
            }
        };
        touch(&mut session, now);
        Step {
            session,
            say,
            outcome: TurnOutcome::Advanced,
        }
    }

    async fn advance(&self, mut session: CallSession, turn: &Turn, now: DateTime<Utc>) -> Step {
        let utterance = turn
            .utterance
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());

        let slot = match session.state.slot() {
            Some(slot) => slot,
            // Entry is never stored; terminal sessions are answered as replays.
            None => return self.enter(session, now).await,
        };

        if utterance.map_or(false, is_cancel_request) {
            session.state = CallState::Abandoned;
            touch(&mut session, now);
            return Step {
                session,
                say: prompts::cancelled(),
                outcome: TurnOutcome::Abandoned,
            };
        }

        let result = match (slot, utterance) {
            (_, None) => Err(Reason::NoInput),
            (Slot::Name, Some(u)) => {
                extract_name(u, self.config.min_name_token_len).map(|name| {
                    session.slots.name = Some(name);
                    CallState::CollectPhone
                })
            }
            (Slot::Phone, Some(u)) => {
                extract_phone(u, &self.config.country_code).map(|phone| {
                    session.slots.phone = Some(phone);
                    CallState::CollectTime
                })
            }
            (Slot::Time, Some(u)) => {
                let locale = self.locale_for(&session, now);
                let req = TimeRequest {
                    locale: &locale,
                    hours: &self.config.business_hours,
                    default_minutes: self.config.appointment_minutes,
                    horizon_days: self.config.booking_horizon_days,
                };
                extract_time(u, &req).map(|time| {
                    session.slots.starts_at = Some(time.starts_at);
                    session.slots.duration_minutes = Some(time.duration_minutes);
                    CallState::Confirm
                })
            }
            (Slot::Confirm, Some(u)) => match classify_confirmation(u) {
                Confirmation::Affirm => return self.book(session, now).await,
                Confirmation::Deny => {
                    session.slots.starts_at = None;
                    session.slots.duration_minutes = None;
                    session.attempt_counts.remove(&Slot::Confirm);
                    session.state = CallState::CollectTime;
                    touch(&mut session, now);
                    return Step {
                        session,
                        say: prompts::time_rejected_on_confirm(),
                        outcome: TurnOutcome::Advanced,
                    };
                }
                Confirmation::Unclear => Err(Reason::Unclear),
            },
        };

        match result {
            Ok(next) => {
                session.attempt_counts.remove(&slot);
                session.state = next;
                touch(&mut session, now);
                let say = prompts::ask(next, &session.slots);
                Step {
                    session,
                    say,
                    outcome: TurnOutcome::Advanced,
                }
            }
            Err(reason) => self.fail(session, slot, reason, now),
        }
    }

    fn fail(&self, mut session: CallSession, slot: Slot, reason: Reason, now: DateTime<Utc>) -> Step {
        let attempts = session.attempts(slot) + 1;
        debug!(call_id=%session.call_id, ?slot, %reason, attempts, "extraction failed");
        touch(&mut session, now);
        session.attempt_counts.insert(slot, attempts);
        if attempts >= self.config.max_attempts {
            session.state = CallState::Abandoned;
            return Step {
                session,
                say: prompts::abandoned(),
                outcome: TurnOutcome::Abandoned,
            };
        }
        let say = prompts::reprompt(slot, reason, attempts, &session.slots);
        Step {
            session,
            say,
            outcome: TurnOutcome::Reprompted(reason),
        }
    }

    async fn book(&self, mut session: CallSession, now: DateTime<Utc>) -> Step {
        match self.booking.book(&session).await {
            Ok(BookingOutcome::Booked(appointment)) => {
                let say = match &session.slots.starts_at {
                    Some(starts_at) => prompts::booked(starts_at),
                    None => prompts::ask(CallState::Booked, &session.slots),
                };
                session.attempt_counts.remove(&Slot::Confirm);
                session.state = CallState::Booked;
                touch(&mut session, now);
                Step {
                    session,
                    say,
                    outcome: TurnOutcome::Booked(appointment.id),
                }
            }
            Ok(BookingOutcome::Duplicate(existing)) => {
                let say = match &session.slots.starts_at {
                    Some(asked) => prompts::duplicate(&existing.starts_at.with_timezone(asked.offset())),
                    None => prompts::ask(CallState::DuplicateRejected, &session.slots),
                };
                session.state = CallState::DuplicateRejected;
                touch(&mut session, now);
                Step {
                    session,
                    say,
                    outcome: TurnOutcome::Duplicate(existing.id),
                }
            }
            Err(BookingError::Contention) => {
                touch(&mut session, now);
                let say = prompts::booking_contended(&session.slots);
                Step {
                    session,
                    say,
                    outcome: TurnOutcome::Contended,
                }
            }
            Err(BookingError::Storage(_)) => Step {
                session,
                say: prompts::retry_later(),
                outcome: TurnOutcome::RetryLater,
            },
        }
    }

    /// The call's own timezone: from the caller ID's area code, else the number they gave,
    /// else the business timezone.
    fn locale_for(&self, session: &CallSession, now: DateTime<Utc>) -> CallLocale {
        let tz = session
            .caller_phone
            .as_deref()
            .and_then(zone_for_phone)
            .or_else(|| session.slots.phone.as_deref().and_then(zone_for_phone))
            .unwrap_or(self.config.business_hours.tz);
        CallLocale {
            tz,
            country_code: self.config.country_code.clone(),
            now,
        }
    }
}

/// A call-start webhook for a call we already know, or an answer to a prompt we have since
/// moved past.
fn is_replay(session: &CallSession, turn: &Turn) -> bool {
    session.state.is_terminal() || turn.seq != Some(session.turn_seq)
}

fn touch(session: &mut CallSession, now: DateTime<Utc>) {
    session.turn_seq += 1;
    session.updated_at = now;
}

fn next_step(session: &CallSession) -> NextStep {
    if session.state.is_terminal() {
        NextStep::Hangup
    } else {
        NextStep::Gather {
            seq: session.turn_seq,
        }
    }
}

/// Re-emit what the session is currently waiting on, without changing anything.
fn current_prompt(session: &CallSession, outcome: TurnOutcome) -> Reply {
    Reply {
        say: prompts::ask(session.state, &session.slots),
        next: next_step(session),
        state: Some(session.state),
        outcome,
    }
}

fn call_ended() -> Reply {
    Reply {
        say: prompts::call_ended(),
        next: NextStep::Hangup,
        state: None,
        outcome: TurnOutcome::Replayed,
    }
}

fn retry_later(state: Option<CallState>) -> Reply {
    Reply {
        say: prompts::retry_later(),
        next: NextStep::Hangup,
        state,
        outcome: TurnOutcome::RetryLater,
    }
}
