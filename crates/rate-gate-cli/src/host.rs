use rate_gate_core::{
    AppMetadata, NetworkReachability, OpenError, PromptChoice, PromptRequest, PromptService,
    UrlOpener,
};
use std::io::{self, BufRead, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::process::Command;
use std::time::Duration;
use tracing::debug;

pub struct StaticMetadata {
    pub version: String,
    pub display_name: String,
}

impl AppMetadata for StaticMetadata {
    fn version(&self) -> String {
        self.version.clone()
    }

    fn display_name(&self) -> String {
        self.display_name.clone()
    }
}

/// Reachable when a TCP connection to `host:port` opens within the timeout.
pub struct TcpReachability {
    pub target: String,
    pub timeout: Duration,
}

impl NetworkReachability for TcpReachability {
    fn is_reachable(&self) -> bool {
        let addrs = match self.target.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(err) => {
                debug!(event = "reachability_resolve_failed", addr = %self.target, error = %err);
                return false;
            }
        };
        for addr in addrs {
            if TcpStream::connect_timeout(&addr, self.timeout).is_ok() {
                return true;
            }
        }
        debug!(event = "reachability_connect_failed", addr = %self.target);
        false
    }
}

pub struct Offline;

impl NetworkReachability for Offline {
    fn is_reachable(&self) -> bool {
        false
    }
}

/// Numbered-button prompt on stdin/stdout.
pub struct TerminalPrompt;

pub fn render_prompt(request: &PromptRequest) -> String {
    format!(
        "\n{}\n\n{}\n\n  [1] {}\n  [2] {}\n  [3] {}\n> ",
        request.title,
        request.message,
        request.rate_button,
        request.cancel_button,
        request.rate_later_button
    )
}

/// Anything unrecognised, including EOF, defers the decision.
pub fn parse_answer(line: &str) -> PromptChoice {
    match line.trim() {
        "1" => PromptChoice::Rate,
        "2" => PromptChoice::Decline,
        "3" => PromptChoice::RemindLater,
        other => other.parse().unwrap_or(PromptChoice::RemindLater),
    }
}

impl PromptService for TerminalPrompt {
    fn present(&self, request: &PromptRequest) -> PromptChoice {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(render_prompt(request).as_bytes());
        let _ = stdout.flush();
        drop(stdout);

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => PromptChoice::RemindLater,
            Ok(_) => parse_answer(&line),
        }
    }
}

/// Hands URLs to the desktop's default handler.
pub struct SystemUrlOpener;

impl UrlOpener for SystemUrlOpener {
    fn open(&self, url: &str) -> Result<(), OpenError> {
        let program = if cfg!(target_os = "macos") {
            "open"
        } else if cfg!(target_os = "windows") {
            "explorer"
        } else {
            "xdg-open"
        };
        let status = Command::new(program).arg(url).status()?;
        if !status.success() {
            return Err(OpenError::HandlerFailed {
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

pub struct PrintUrlOpener;

impl UrlOpener for PrintUrlOpener {
    fn open(&self, url: &str) -> Result<(), OpenError> {
        println!("{url}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_map_to_buttons() {
        assert_eq!(parse_answer("1\n"), PromptChoice::Rate);
        assert_eq!(parse_answer(" 2 "), PromptChoice::Decline);
        assert_eq!(parse_answer("3"), PromptChoice::RemindLater);
        assert_eq!(parse_answer("decline"), PromptChoice::Decline);
        assert_eq!(parse_answer(""), PromptChoice::RemindLater);
        assert_eq!(parse_answer("what"), PromptChoice::RemindLater);
    }

    #[test]
    fn rendered_prompt_lists_all_buttons_in_order() {
        let text = render_prompt(&PromptRequest {
            title: "Rate Atlas".to_string(),
            message: "Enjoying it?".to_string(),
            rate_button: "Rate Atlas".to_string(),
            cancel_button: "No, Thanks".to_string(),
            rate_later_button: "Remind me later".to_string(),
        });
        let rate = text.find("[1] Rate Atlas").expect("rate button");
        let cancel = text.find("[2] No, Thanks").expect("cancel button");
        let later = text.find("[3] Remind me later").expect("later button");
        assert!(rate < cancel && cancel < later);
        assert!(text.contains("Enjoying it?"));
    }

    #[test]
    fn unresolvable_target_is_unreachable() {
        let probe = TcpReachability {
            target: "not a host".to_string(),
            timeout: Duration::from_millis(10),
        };
        assert!(!probe.is_reachable());
    }
}
