//! Per-call exchange state.
//!
//! Single exchanges go `Idle -> CommandSent -> AwaitingResponse -> Done|Failed`.
//! Downloads go `Idle -> DownloadRequested -> DataPhase(1..n) ->
//! AwaitingTerminalStatus -> Done|Failed`. Nothing carries over between calls.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangePhase {
    #[default]
    Idle,
    CommandSent,
    AwaitingResponse,
    DownloadRequested,
    /// Sending chunk `chunk` of `total` (1-based).
    DataPhase {
        chunk: usize,
        total: usize,
    },
    AwaitingTerminalStatus,
    Done,
    Failed,
}

impl fmt::Display for ExchangePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangePhase::Idle => write!(f, "IDLE"),
            ExchangePhase::CommandSent => write!(f, "COMMAND_SENT"),
            ExchangePhase::AwaitingResponse => write!(f, "AWAITING_RESPONSE"),
            ExchangePhase::DownloadRequested => write!(f, "DOWNLOAD_REQUESTED"),
            ExchangePhase::DataPhase { chunk, total } => {
                write!(f, "DATA_PHASE({}/{})", chunk, total)
            }
            ExchangePhase::AwaitingTerminalStatus => write!(f, "AWAITING_TERMINAL_STATUS"),
            ExchangePhase::Done => write!(f, "DONE"),
            ExchangePhase::Failed => write!(f, "FAILED"),
        }
    }
}

impl ExchangePhase {
    /// Check if the exchange has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExchangePhase::Done | ExchangePhase::Failed)
    }

    /// Check if this phase belongs to a data transfer.
    pub fn is_download(&self) -> bool {
        matches!(
            self,
            ExchangePhase::DownloadRequested
                | ExchangePhase::DataPhase { .. }
                | ExchangePhase::AwaitingTerminalStatus
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_classification() {
        assert!(!ExchangePhase::Idle.is_terminal());
        assert!(ExchangePhase::Done.is_terminal());
        assert!(ExchangePhase::Failed.is_terminal());
        assert!(ExchangePhase::DataPhase { chunk: 1, total: 2 }.is_download());
        assert!(!ExchangePhase::CommandSent.is_download());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(
            ExchangePhase::DataPhase { chunk: 2, total: 5 }.to_string(),
            "DATA_PHASE(2/5)"
        );
        assert_eq!(ExchangePhase::default().to_string(), "IDLE");
    }
}
