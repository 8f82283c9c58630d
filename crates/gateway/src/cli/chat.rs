//! `threadchat chat`: interactive REPL client.
//!
//! Talks to a running server over HTTP and mirrors every conversation to a
//! local JSON file after each message. Slash-commands manage both the local
//! mirrors and the server-side threads.

use std::sync::Arc;

use tc_domain::config::Config;

use super::client::ApiClient;
use super::mirror::{self, LocalMirror, MirrorMessage};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(config: Arc<Config>, api: Option<String>) -> anyhow::Result<()> {
    let base = api.unwrap_or_else(|| config.client.api_base.clone());
    let client = ApiClient::new(&base, &config.client)?;
    let mirror = LocalMirror::new(config.client.mirror_dir.clone());

    // Readline editor with persistent history.
    let history_path = dirs::home_dir()
        .unwrap_or_default()
        .join(".threadchat")
        .join("repl_history.txt");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    let mut session = Conversation::start(&client).await;

    eprintln!("ThreadChat ({})", client.base());
    eprintln!(
        "Thread: {}  |  Type /help for commands, Ctrl+D to exit",
        session.thread_id
    );
    eprintln!();

    loop {
        match rl.readline("you> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(&line).ok();

                if trimmed.starts_with('/') {
                    match SlashCommand::parse(trimmed) {
                        Ok(SlashCommand::Exit) => break,
                        Ok(cmd) => run_command(cmd, &client, &mirror, &mut session).await,
                        Err(msg) => eprintln!("{msg}"),
                    }
                    continue;
                }

                session.send(&client, &mirror, trimmed).await;
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    rl.save_history(&history_path).ok();
    eprintln!("Goodbye!");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Conversation {
    thread_id: String,
    /// Set by `/open` and `/rename`; otherwise derived from the messages.
    title: Option<String>,
    messages: Vec<MirrorMessage>,
}

impl Conversation {
    /// Ask the server for a thread id, falling back to a local one when it
    /// is unreachable.
    async fn start(client: &ApiClient) -> Self {
        let thread_id = match client.new_thread().await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "could not create thread on server");
                eprintln!("(server unreachable, working offline: {e})");
                local_thread_id()
            }
        };
        Self {
            thread_id,
            title: None,
            messages: Vec::new(),
        }
    }

    fn title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| mirror::title_for(&self.messages))
    }

    fn persist(&self, mirror: &LocalMirror) {
        if let Err(e) = mirror.save(&self.title(), &self.thread_id, &self.messages) {
            eprintln!("\x1B[31mcould not write local mirror: {e}\x1B[0m");
        }
    }

    async fn send(&mut self, client: &ApiClient, mirror: &LocalMirror, text: &str) {
        self.messages.push(MirrorMessage::new("user", text));
        self.persist(mirror);

        let reply = match client.chat(&self.thread_id, text).await {
            Ok(r) => r,
            Err(e) => format!("Error communicating with backend: {e}"),
        };
        println!("{reply}");
        println!();

        self.messages.push(MirrorMessage::new("assistant", reply));
        self.persist(mirror);
    }
}

fn local_thread_id() -> String {
    format!("local-{}", chrono::Utc::now().timestamp())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slash command handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, PartialEq)]
enum SlashCommand {
    New,
    List,
    /// 1-based index into `/list`.
    Open(usize),
    Delete(usize),
    Rename(usize, String),
    Threads,
    History,
    Save(String),
    Drop,
    Help,
    Exit,
}

impl SlashCommand {
    fn parse(input: &str) -> Result<Self, String> {
        let mut parts = input.splitn(2, ' ');
        let cmd = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).unwrap_or_default();

        let index = |usage: &str| -> Result<usize, String> {
            arg.split_whitespace()
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("Usage: {usage}"))
        };

        match cmd {
            "/new" => Ok(Self::New),
            "/list" => Ok(Self::List),
            "/open" => index("/open <n>").map(Self::Open),
            "/delete" => index("/delete <n>").map(Self::Delete),
            "/rename" => {
                let n = index("/rename <n> <title>")?;
                let title = arg
                    .split_once(' ')
                    .map(|(_, t)| t.trim())
                    .filter(|t| !t.is_empty())
                    .ok_or("Usage: /rename <n> <title>")?;
                Ok(Self::Rename(n, title.to_owned()))
            }
            "/threads" => Ok(Self::Threads),
            "/history" => Ok(Self::History),
            "/save" if !arg.is_empty() => Ok(Self::Save(arg.to_owned())),
            "/save" => Err("Usage: /save <name>".into()),
            "/drop" => Ok(Self::Drop),
            "/help" => Ok(Self::Help),
            "/exit" | "/quit" => Ok(Self::Exit),
            other => Err(format!("Unknown command: {other}  (type /help for a list)")),
        }
    }
}

async fn run_command(
    cmd: SlashCommand,
    client: &ApiClient,
    mirror: &LocalMirror,
    session: &mut Conversation,
) {
    if let Err(e) = try_run_command(cmd, client, mirror, session).await {
        eprintln!("\x1B[31merror: {e}\x1B[0m");
    }
}

async fn try_run_command(
    cmd: SlashCommand,
    client: &ApiClient,
    mirror: &LocalMirror,
    session: &mut Conversation,
) -> anyhow::Result<()> {
    match cmd {
        SlashCommand::New => {
            *session = Conversation::start(client).await;
            eprintln!("New thread: {}", session.thread_id);
        }

        SlashCommand::List => {
            let entries = mirror.list()?;
            if entries.is_empty() {
                eprintln!("No saved chats yet. Start a conversation and it is saved automatically.");
            }
            for (i, e) in entries.iter().enumerate() {
                let marker = if e.thread_id == session.thread_id { "*" } else { " " };
                eprintln!("{marker}{:>3}. {}  ({})", i + 1, e.title, e.thread_id);
            }
        }

        SlashCommand::Open(n) => {
            let entry = nth_entry(mirror, n)?;
            let data = mirror.load(&entry.file)?;
            *session = Conversation {
                thread_id: data.thread_id,
                title: Some(data.title),
                messages: data.messages,
            };
            eprintln!("Opened \"{}\" ({})", entry.title, session.thread_id);
            for m in &session.messages {
                println!("{}: {}", m.role, m.content);
            }
        }

        SlashCommand::Delete(n) => {
            let entry = nth_entry(mirror, n)?;
            mirror.delete(&entry.file)?;
            eprintln!("Deleted local chat \"{}\"", entry.title);
        }

        SlashCommand::Rename(n, title) => {
            let entry = nth_entry(mirror, n)?;
            mirror.rename(&entry.file, &title)?;
            if entry.thread_id == session.thread_id {
                session.title = Some(title.clone());
            }
            eprintln!("Renamed to \"{title}\"");
        }

        SlashCommand::Threads => {
            for id in client.threads().await? {
                let marker = if id == session.thread_id { "*" } else { " " };
                eprintln!("{marker} {id}");
            }
        }

        SlashCommand::History => {
            let history = client.history(&session.thread_id).await?;
            if history.is_empty() {
                eprintln!("(no server history for {})", session.thread_id);
            }
            for m in history {
                println!("{}: {}", m.role, m.content);
            }
        }

        SlashCommand::Save(name) => {
            let saved = client.save_chat(&session.thread_id, &name).await?;
            eprintln!("{} ({})", saved.message, saved.path);
        }

        SlashCommand::Drop => {
            let msg = client.delete_chat(&session.thread_id).await?;
            eprintln!("{msg}");
            *session = Conversation::start(client).await;
            eprintln!("New thread: {}", session.thread_id);
        }

        SlashCommand::Help => {
            eprintln!("Commands:");
            eprintln!("  /new                 Start a new thread");
            eprintln!("  /list                List local chats, newest first");
            eprintln!("  /open <n>            Open local chat n");
            eprintln!("  /delete <n>          Delete local chat n");
            eprintln!("  /rename <n> <title>  Retitle local chat n");
            eprintln!("  /threads             List threads known to the server");
            eprintln!("  /history             Show the server's history for this thread");
            eprintln!("  /save <name>         Archive this thread on the server as <name>.txt");
            eprintln!("  /drop                Delete this thread on the server");
            eprintln!("  /exit, /quit         Exit the chat");
            eprintln!("  /help                Show this help");
        }

        SlashCommand::Exit => {}
    }
    Ok(())
}

fn nth_entry(mirror: &LocalMirror, n: usize) -> anyhow::Result<mirror::MirrorEntry> {
    let mut entries = mirror.list()?;
    if n == 0 || n > entries.len() {
        anyhow::bail!("no local chat #{n} (have {})", entries.len());
    }
    Ok(entries.swap_remove(n - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(SlashCommand::parse("/new"), Ok(SlashCommand::New));
        assert_eq!(SlashCommand::parse("/open 3"), Ok(SlashCommand::Open(3)));
        assert_eq!(
            SlashCommand::parse("/rename 2  My new title "),
            Ok(SlashCommand::Rename(2, "My new title".into()))
        );
        assert_eq!(
            SlashCommand::parse("/save weekly notes"),
            Ok(SlashCommand::Save("weekly notes".into()))
        );
        assert_eq!(SlashCommand::parse("/quit"), Ok(SlashCommand::Exit));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(SlashCommand::parse("/open").is_err());
        assert!(SlashCommand::parse("/open 0").is_err());
        assert!(SlashCommand::parse("/delete x").is_err());
        assert!(SlashCommand::parse("/rename 1").is_err());
        assert!(SlashCommand::parse("/save").is_err());
        assert!(SlashCommand::parse("/bogus")
            .unwrap_err()
            .contains("Unknown command"));
    }

    #[test]
    fn offline_ids_are_marked_local() {
        assert!(local_thread_id().starts_with("local-"));
    }

    #[test]
    fn nth_entry_is_one_based() {
        let dir = tempfile::tempdir().unwrap();
        let m = LocalMirror::new(dir.path());
        m.save("only", "t-1", &[MirrorMessage::new("user", "hi")]).unwrap();
        assert_eq!(nth_entry(&m, 1).unwrap().thread_id, "t-1");
        assert!(nth_entry(&m, 2).is_err());
        assert!(nth_entry(&m, 0).is_err());
    }
}
