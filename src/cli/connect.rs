//! Interactive REPL over one orchestrated session

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use aerie::channel::SshConnector;
use aerie::config::Settings;
use aerie::domain::{AuthMethod, SessionProfile};
use aerie::intel;
use aerie::orchestrator::Orchestrator;
use aerie::session::CredentialPrompt;
use aerie::SessionError;

/// Prompts for secrets on the controlling terminal
struct StdinPrompt;

impl CredentialPrompt for StdinPrompt {
    fn request_secret(&self, prompt: &str) -> Option<String> {
        eprint!("{prompt}: ");
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

pub async fn connect_command(
    settings: Settings,
    destination: &str,
    port: u16,
    use_password: bool,
    key: Option<PathBuf>,
) -> Result<()> {
    let (username, hostname) = destination
        .split_once('@')
        .ok_or_else(|| anyhow!("Destination must be user@host, got '{destination}'"))?;
    let profile = SessionProfile::new(hostname, port, username);

    let credentials: Arc<dyn CredentialPrompt> = Arc::new(StdinPrompt);
    let auth = if let Some(key) = key {
        AuthMethod::KeyFile(key)
    } else if use_password {
        let secret = credentials
            .request_secret(&format!("Password for {profile}"))
            .ok_or_else(|| anyhow!("No password supplied"))?;
        AuthMethod::Password(secret)
    } else {
        AuthMethod::Agent
    };

    let connector = Arc::new(SshConnector::new(settings.connect_timeout()));
    let orchestrator = Orchestrator::new(settings, connector, credentials)?;

    let id = orchestrator
        .open_session(profile, auth)
        .await
        .context("Failed to open session")?;
    let session = orchestrator
        .session(&id)
        .ok_or_else(|| anyhow!("Session closed during connect"))?;
    println!("Connected to {} (os: {})", session.profile(), session.os());
    println!("Type 'exit' to close, 'history' for this session's commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}> ", session.profile());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = line.trim();
        match command {
            "" => continue,
            "exit" | "quit" => break,
            "history" => {
                for (i, cmd) in session.history().await.iter().enumerate() {
                    println!("{:>4}  {cmd}", i + 1);
                }
                continue;
            }
            _ => {}
        }

        match session.send(command).await {
            Ok(outcome) => {
                if outcome.timed_out {
                    println!("(no prompt within timeout; partial output follows)");
                }
                if !outcome.output.is_empty() {
                    println!("{}", outcome.output);
                }

                println!("--- analysis ---");
                println!("{}", intel::analyze(command, &outcome.output, session.os()));
                let next = intel::suggest_next(&session.history().await, session.os());
                println!(
                    "suggested next: {next}  (risk: {})",
                    intel::assess_risk(&next)
                );
            }
            Err(SessionError::Busy) => println!("A command is still running."),
            Err(SessionError::Closed) => {
                println!("Session closed by remote host.");
                break;
            }
            Err(e) => bail!("Command failed: {e}"),
        }
    }

    orchestrator.close_all().await;
    orchestrator.flush_ledger().await;
    Ok(())
}
