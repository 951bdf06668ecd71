//! States of a single-device install and the transitions allowed between them

use crate::error::InstallFailureKind;
use crate::snapshot::Bounds;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    /// Look at the page from the top: open button, installed or not
    Probe,
    /// Package missing; make sure its store page is showing
    NotInstalled,
    AwaitingInstallButton { attempt: u32 },
    /// Install tapped; waiting for the download indicator to go away
    Installing { bounds: Bounds },
    InstalledAwaitingOpen { attempt: u32 },
    /// Update tapped; waiting for the version code to move off `previous`
    UpdatePending { previous: u64 },
    Ready,
    Failed(InstallFailureKind),
}

impl InstallState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::NotInstalled => "not_installed",
            Self::AwaitingInstallButton { .. } => "awaiting_install_button",
            Self::Installing { .. } => "installing",
            Self::InstalledAwaitingOpen { .. } => "installed_awaiting_open",
            Self::UpdatePending { .. } => "update_pending",
            Self::Ready => "ready",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed(_))
    }

    /// Transition table of the install machine
    pub fn can_transition_to(&self, next: &InstallState) -> bool {
        use InstallState::*;

        match self {
            Probe => matches!(
                next,
                Ready | NotInstalled | InstalledAwaitingOpen { attempt: 0 } | Failed(InstallFailureKind::Unknown)
            ),
            NotInstalled => matches!(next, AwaitingInstallButton { attempt: 0 }),
            AwaitingInstallButton { attempt } => match next {
                AwaitingInstallButton { attempt: n } => *n == attempt + 1,
                Installing { .. } | Failed(_) => true,
                _ => false,
            },
            Installing { .. } => matches!(next, Probe),
            InstalledAwaitingOpen { attempt } => match next {
                InstalledAwaitingOpen { attempt: n } => *n == attempt + 1,
                UpdatePending { .. } | Ready | Probe => true,
                _ => false,
            },
            UpdatePending { .. } => matches!(next, InstalledAwaitingOpen { attempt: 0 } | Probe),
            Ready | Failed(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_have_no_exits() {
        for terminal in [InstallState::Ready, InstallState::Failed(InstallFailureKind::Paid)] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(&InstallState::Probe));
        }
    }

    #[test]
    fn test_retry_counters_only_move_forward_by_one() {
        let waiting = InstallState::AwaitingInstallButton { attempt: 1 };
        assert!(waiting.can_transition_to(&InstallState::AwaitingInstallButton { attempt: 2 }));
        assert!(!waiting.can_transition_to(&InstallState::AwaitingInstallButton { attempt: 1 }));
        assert!(!waiting.can_transition_to(&InstallState::AwaitingInstallButton { attempt: 0 }));

        let settling = InstallState::InstalledAwaitingOpen { attempt: 0 };
        assert!(settling.can_transition_to(&InstallState::InstalledAwaitingOpen { attempt: 1 }));
        assert!(!settling.can_transition_to(&InstallState::InstalledAwaitingOpen { attempt: 3 }));
    }

    #[test]
    fn test_classified_failures_only_from_install_button_phase() {
        let network = InstallState::Failed(InstallFailureKind::NetworkUnavailable);
        assert!(InstallState::AwaitingInstallButton { attempt: 0 }.can_transition_to(&network));
        assert!(!InstallState::Probe.can_transition_to(&network));
        assert!(!InstallState::Installing {
            bounds: Bounds::new(0, 0, 1, 1)
        }
        .can_transition_to(&network));
    }

    #[test]
    fn test_happy_path_is_allowed() {
        let path = [
            InstallState::Probe,
            InstallState::NotInstalled,
            InstallState::AwaitingInstallButton { attempt: 0 },
            InstallState::Installing {
                bounds: Bounds::new(0, 0, 10, 10),
            },
            InstallState::Probe,
            InstallState::InstalledAwaitingOpen { attempt: 0 },
            InstallState::UpdatePending { previous: 5 },
            InstallState::InstalledAwaitingOpen { attempt: 0 },
            InstallState::Ready,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(&pair[1]),
                "{} -> {}",
                pair[0].name(),
                pair[1].name()
            );
        }
    }
}
