use serde::Serialize;
use ts_rs::TS;

/// Follow-mode state. Pause is not a state: it only suspends polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum FollowMode {
    #[default]
    Disabled,
    Enabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleEvent {
    EnableRequested { playing: bool },
    DisableRequested,
    PlaybackStarted,
    PlaybackPaused,
    PlaybackEnded,
    Seeked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleAction {
    ResumePolling,
    StopPolling,
    CancelTimers,
    ForceRefresh,
    MarkAllRead,
    SetPageMarker(bool),
    NotifyEnabled,
    NotifyDisabled,
}

pub(crate) fn transition(
    mode: FollowMode,
    event: LifecycleEvent,
) -> (FollowMode, Vec<LifecycleAction>) {
    use LifecycleAction::*;

    match (mode, event) {
        (FollowMode::Disabled, LifecycleEvent::EnableRequested { playing }) => {
            let mut actions = vec![SetPageMarker(true), ForceRefresh];
            if playing {
                actions.push(ResumePolling);
            }
            actions.push(NotifyEnabled);
            (FollowMode::Enabled, actions)
        }
        (FollowMode::Enabled, LifecycleEvent::EnableRequested { playing }) => {
            let actions = if playing { vec![ResumePolling] } else { Vec::new() };
            (FollowMode::Enabled, actions)
        }
        (FollowMode::Enabled, LifecycleEvent::DisableRequested) => (
            FollowMode::Disabled,
            vec![StopPolling, CancelTimers, SetPageMarker(false), NotifyDisabled],
        ),
        (FollowMode::Enabled, LifecycleEvent::PlaybackEnded) => (
            FollowMode::Disabled,
            vec![
                StopPolling,
                CancelTimers,
                MarkAllRead,
                SetPageMarker(false),
                NotifyDisabled,
            ],
        ),
        (FollowMode::Disabled, LifecycleEvent::PlaybackEnded) => {
            (FollowMode::Disabled, vec![StopPolling, MarkAllRead])
        }
        (_, LifecycleEvent::PlaybackPaused) => (mode, vec![StopPolling]),
        (FollowMode::Enabled, LifecycleEvent::PlaybackStarted) => {
            (FollowMode::Enabled, vec![ResumePolling])
        }
        (FollowMode::Enabled, LifecycleEvent::Seeked) => (FollowMode::Enabled, vec![ForceRefresh]),
        (FollowMode::Disabled, LifecycleEvent::DisableRequested)
        | (FollowMode::Disabled, LifecycleEvent::PlaybackStarted)
        | (FollowMode::Disabled, LifecycleEvent::Seeked) => (FollowMode::Disabled, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleAction::*;

    #[test]
    fn enable_while_paused_does_not_poll() {
        let (mode, actions) = transition(
            FollowMode::Disabled,
            LifecycleEvent::EnableRequested { playing: false },
        );
        assert_eq!(mode, FollowMode::Enabled);
        assert_eq!(actions, vec![SetPageMarker(true), ForceRefresh, NotifyEnabled]);
    }

    #[test]
    fn enable_is_idempotent_apart_from_polling() {
        let (mode, actions) = transition(
            FollowMode::Enabled,
            LifecycleEvent::EnableRequested { playing: true },
        );
        assert_eq!(mode, FollowMode::Enabled);
        assert_eq!(actions, vec![ResumePolling]);
    }

    #[test]
    fn pause_keeps_follow_enabled() {
        let (mode, actions) = transition(FollowMode::Enabled, LifecycleEvent::PlaybackPaused);
        assert_eq!(mode, FollowMode::Enabled);
        assert_eq!(actions, vec![StopPolling]);

        let (mode, actions) = transition(mode, LifecycleEvent::PlaybackStarted);
        assert_eq!(mode, FollowMode::Enabled);
        assert_eq!(actions, vec![ResumePolling]);
    }

    #[test]
    fn ended_always_disables_and_marks_read() {
        for start in [FollowMode::Disabled, FollowMode::Enabled] {
            let (mode, actions) = transition(start, LifecycleEvent::PlaybackEnded);
            assert_eq!(mode, FollowMode::Disabled);
            assert!(actions.contains(&MarkAllRead));
        }
    }

    #[test]
    fn disabled_ignores_playback_and_seeks() {
        for event in [LifecycleEvent::PlaybackStarted, LifecycleEvent::Seeked] {
            let (mode, actions) = transition(FollowMode::Disabled, event);
            assert_eq!(mode, FollowMode::Disabled);
            assert!(actions.is_empty());
        }
    }
}
