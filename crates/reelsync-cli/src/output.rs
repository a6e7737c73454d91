use clap::ValueEnum;
use media_sync_core::{Notification, NotificationAction};
use owo_colors::OwoColorize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

/// User-facing messages. Logs go through tracing; this is what the user reads.
#[derive(Debug, Clone)]
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        self.message("success", "✓".green().to_string(), msg.as_ref());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => println!("{}", msg.as_ref()),
            _ => self.print_json(&json!({ "type": "info", "message": msg.as_ref() })),
        }
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.message("warning", "⚠".yellow().to_string(), msg.as_ref());
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        // Errors are shown even in quiet mode
        match self.format {
            OutputFormat::Human => eprintln!("{} {}", "✗".red(), msg.as_ref()),
            _ => self.print_json(&json!({ "type": "error", "message": msg.as_ref() })),
        }
    }

    /// Render a sync notification the way a desktop notification would read.
    pub fn notification(&self, notification: &Notification) {
        if self.quiet && notification.actions.is_empty() {
            return;
        }
        match self.format {
            OutputFormat::Human => {
                println!("{} {}", "●".cyan(), notification.title.bold());
                println!("  {}", notification.text);
                for action in &notification.actions {
                    match action {
                        NotificationAction::MoreInfo(url) => println!("  More info: {}", url.underline()),
                        NotificationAction::Snooze(target) => println!(
                            "  Snooze for 30 days: reelsync snooze {}",
                            match target {
                                media_sync_config::SnoozeTarget::CustomLists => "lists",
                                media_sync_config::SnoozeTarget::Watchlist => "watchlist",
                            }
                        ),
                    }
                }
            }
            _ => {
                let actions: Vec<String> = notification
                    .actions
                    .iter()
                    .map(|action| match action {
                        NotificationAction::MoreInfo(url) => format!("more_info:{}", url),
                        NotificationAction::Snooze(target) => format!("snooze:{}", target.key()),
                    })
                    .collect();
                self.print_json(&json!({
                    "type": "notification",
                    "id": notification.id,
                    "title": notification.title,
                    "text": notification.text,
                    "actions": actions,
                }));
            }
        }
    }

    pub fn json(&self, data: &serde_json::Value) {
        if self.quiet && self.format != OutputFormat::Human {
            return;
        }
        self.print_json(data);
    }

    fn message(&self, kind: &str, icon: String, msg: &str) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => println!("{} {}", icon, msg),
            _ => self.print_json(&json!({ "type": kind, "message": msg })),
        }
    }

    fn print_json(&self, data: &serde_json::Value) {
        match self.format {
            OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(data).unwrap_or_default()),
            _ => println!("{}", serde_json::to_string(data).unwrap_or_default()),
        }
    }
}
