//! # Background Recovery
//!
//! Hosts throttle timers and sometimes suspend audio while the app is in
//! the background. When it comes back, the player may still say `Playing`
//! while the media element sits paused, or the track may have finished
//! without the end ever being reported.
//!
//! [`RecoveryMonitor`] decides what to do about it and returns a
//! [`RecoveryAction`]; the engine loop carries the action out. Retries are
//! scheduled by the engine and come back through [`RecoveryMonitor::retry`],
//! which re-checks that the same load is still playing before touching the
//! media element.

use crate::config::PlaybackConfig;
use crate::models::{PlaybackStatus, TrackId};
use bridge_traits::{LifecycleState, MediaElement};
use core_runtime::events::{CoreEvent, EventBus, RecoveryEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One scheduled resume attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryTicket {
    pub generation: u64,
    pub attempt: u32,
}

/// What the engine should do after a lifecycle change or retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    None,
    Resumed { attempts: u32 },
    /// Deliver `ticket` back to [`RecoveryMonitor::retry`] after `delay`.
    RetryAfter {
        delay: Duration,
        ticket: RecoveryTicket,
    },
    /// Every attempt failed; playback should enter Error.
    Exhausted { attempts: u32 },
    /// The track finished while the host was inactive; run the track-end
    /// transition.
    MissedTrackEnd,
}

pub struct RecoveryMonitor {
    media: Arc<dyn MediaElement>,
    events: EventBus,
    max_attempts: u32,
    retry_delay: Duration,
    foreground: bool,
    pending: Option<RecoveryTicket>,
}

impl RecoveryMonitor {
    pub fn new(media: Arc<dyn MediaElement>, events: EventBus, config: &PlaybackConfig) -> Self {
        Self {
            media,
            events,
            max_attempts: config.max_resume_attempts,
            retry_delay: config.resume_retry_delay,
            foreground: true,
            pending: None,
        }
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground
    }

    /// A resume retry is scheduled.
    pub fn is_recovering(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any scheduled retry.
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            debug!("Recovery cancelled");
        }
    }

    /// Handle a lifecycle change. Only transitions matter; repeating the
    /// current state does nothing.
    pub async fn on_lifecycle(
        &mut self,
        state: LifecycleState,
        status: PlaybackStatus,
        generation: u64,
        track_id: Option<&TrackId>,
    ) -> RecoveryAction {
        if !state.is_foreground() {
            let was_foreground = std::mem::replace(&mut self.foreground, false);
            self.cancel();

            if was_foreground && status == PlaybackStatus::Playing {
                debug!(state = ?state, "Backgrounded while playing");
                self.emit(RecoveryEvent::Backgrounded {
                    track_id: track_id.map(ToString::to_string),
                });
            }
            return RecoveryAction::None;
        }

        if self.foreground {
            return RecoveryAction::None;
        }
        self.foreground = true;
        self.emit(RecoveryEvent::Foregrounded);

        if status != PlaybackStatus::Playing {
            return RecoveryAction::None;
        }

        match self.media.has_ended().await {
            Ok(true) => {
                info!("Track ended while in background");
                if let Some(track_id) = track_id {
                    self.emit(RecoveryEvent::MissedTrackEnd {
                        track_id: track_id.to_string(),
                    });
                }
                return RecoveryAction::MissedTrackEnd;
            }
            Ok(false) => {}
            Err(e) => debug!(error = %e, "Could not query media end state"),
        }

        match self.media.is_paused().await {
            Ok(true) => {
                info!("Media paused behind a Playing status, resuming");
                self.attempt(RecoveryTicket {
                    generation,
                    attempt: 1,
                })
                .await
            }
            Ok(false) => RecoveryAction::None,
            Err(e) => {
                debug!(error = %e, "Could not query media pause state");
                RecoveryAction::None
            }
        }
    }

    /// Run a scheduled attempt, unless the load it was scheduled for is no
    /// longer playing.
    pub async fn retry(
        &mut self,
        ticket: RecoveryTicket,
        status: PlaybackStatus,
        generation: u64,
    ) -> RecoveryAction {
        if self.pending != Some(ticket)
            || status != PlaybackStatus::Playing
            || generation != ticket.generation
        {
            debug!(
                attempt = ticket.attempt,
                status = %status,
                "Abandoning recovery"
            );
            if self.pending == Some(ticket) {
                self.pending = None;
            }
            return RecoveryAction::None;
        }

        self.attempt(ticket).await
    }

    async fn attempt(&mut self, ticket: RecoveryTicket) -> RecoveryAction {
        self.pending = None;
        self.emit(RecoveryEvent::ResumeAttempt {
            attempt: ticket.attempt,
            max_attempts: self.max_attempts,
        });

        if let Err(e) = self.media.play().await {
            debug!(attempt = ticket.attempt, error = %e, "Resume attempt rejected");
        }

        let resumed = matches!(self.media.is_paused().await, Ok(false));
        if resumed {
            info!(attempts = ticket.attempt, "Playback resumed");
            self.emit(RecoveryEvent::Resumed {
                attempts: ticket.attempt,
            });
            return RecoveryAction::Resumed {
                attempts: ticket.attempt,
            };
        }

        if ticket.attempt >= self.max_attempts {
            warn!(attempts = ticket.attempt, "Giving up on resuming playback");
            self.emit(RecoveryEvent::Exhausted {
                attempts: ticket.attempt,
            });
            return RecoveryAction::Exhausted {
                attempts: ticket.attempt,
            };
        }

        let next = RecoveryTicket {
            generation: ticket.generation,
            attempt: ticket.attempt + 1,
        };
        self.pending = Some(next);
        RecoveryAction::RetryAfter {
            delay: self.retry_delay,
            ticket: next,
        }
    }

    fn emit(&self, event: RecoveryEvent) {
        let _ = self.events.emit(CoreEvent::Recovery(event));
    }
}
