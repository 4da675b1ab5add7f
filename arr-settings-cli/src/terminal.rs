//! Terminal adapters for the core collaborator traits

use std::io::{BufRead, Write};

use arr_settings_core::traits::{DiscardConfirmer, Notifier};
use arr_settings_core::types::{EditorSession, Notification, NotificationLevel};
use async_trait::async_trait;

/// Prints notifications to stdout (errors to stderr).
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        let line = format_notification(&notification);
        if notification.level == NotificationLevel::Error {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}

fn format_notification(notification: &Notification) -> String {
    let tag = match notification.level {
        NotificationLevel::Success => "ok",
        NotificationLevel::Info => "info",
        NotificationLevel::Warning => "warn",
        NotificationLevel::Error => "error",
    };
    format!("[{tag}] {}", notification.message)
}

/// Asks on stdin. `assume_yes` skips the prompt.
#[derive(Debug, Clone, Copy)]
pub struct StdinConfirmer {
    pub assume_yes: bool,
}

impl StdinConfirmer {
    /// Ask a yes/no question; anything but `y`/`yes` is no.
    pub async fn ask(&self, question: String) -> bool {
        if self.assume_yes {
            return true;
        }
        let answer = tokio::task::spawn_blocking(move || {
            print!("{question} [y/N] ");
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await;
        match answer {
            Ok(Ok(line)) => is_yes(&line),
            Ok(Err(e)) => {
                tracing::warn!("Failed to read answer: {e}");
                false
            }
            Err(e) => {
                tracing::warn!("Prompt task failed: {e}");
                false
            }
        }
    }
}

#[async_trait]
impl DiscardConfirmer for StdinConfirmer {
    async fn confirm_discard(&self, session: &EditorSession) -> bool {
        let name = session.original.display_name(session.index.unwrap_or(0));
        self.ask(format!("Discard unsaved changes to {name}?")).await
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
