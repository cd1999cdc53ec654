use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use voxlate::{Config, AuthClient, ServerEvent, SessionManager};

#[derive(Debug, Parser)]
#[command(name = "voxlate", about = "Real-time speech translation client")]
struct Args {
    /// Config file path (extension resolved by the config loader)
    #[arg(long, default_value = "config/voxlate")]
    config: String,

    /// Log in before establishing the session
    #[arg(long)]
    email: Option<String>,

    /// Password for --email
    #[arg(long)]
    password: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v0.1.0", cfg.service.name);
    info!("Backend: {}", cfg.server.base_url);

    let auth = AuthClient::new(&cfg.server.base_url)?;
    if let (Some(email), Some(password)) = (&args.email, &args.password) {
        auth.login(email, password).await?;
    }

    let (mut manager, mut events) = SessionManager::establish(&cfg, &auth).await?;
    let mut conn_state = manager
        .connection_state_changes()
        .context("Session has no connection")?;

    println!("Commands: start | stop | lang <code> | source <code> | langs | history | clear | status | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !dispatch(&mut manager, line.trim()).await {
                    break;
                }
            }
            maybe_event = events.recv() => match maybe_event {
                Some(event) => {
                    let show_result = matches!(event, ServerEvent::TranscriptionResult { .. });
                    manager.handle_event(event).await;
                    if show_result {
                        println!("original:   {}", manager.original_text());
                        println!("translated: {}", manager.translated_text());
                    }
                    println!("[{}]", manager.status());
                }
                None => {
                    println!("[{}]", manager.status());
                    break;
                }
            },
            _ = conn_state.changed() => {
                let state = *conn_state.borrow();
                manager.note_connection_state(state);
                println!("[{}]", manager.status());
            }
        }
    }

    manager.shutdown().await;
    Ok(())
}

/// Handle one console command; returns false on quit.
async fn dispatch(manager: &mut SessionManager, line: &str) -> bool {
    let (command, rest) = match line.split_once(' ') {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };

    match command {
        "start" => manager.start_recording().await,
        "stop" => manager.stop_recording().await,
        "lang" => manager.set_target_language(rest),
        "source" => manager.set_source_language(rest),
        "langs" => {
            for (name, code) in manager.languages().iter() {
                println!("{}  {}", code, name);
            }
            return true;
        }
        "history" => {
            for entry in manager.history().entries() {
                println!(
                    "{}  {} -> {}: {} / {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    manager.history().resolve_display_name(&entry.source_lang),
                    manager.history().resolve_display_name(&entry.target_lang),
                    entry.original,
                    entry.translated,
                );
            }
            return true;
        }
        "clear" => manager.clear_history(),
        "status" => {}
        "quit" | "exit" => return false,
        "" => return true,
        other => {
            println!("Unknown command: {}", other);
            return true;
        }
    }

    println!("[{}]", manager.status());
    true
}
