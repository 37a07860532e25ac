use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use colored::Colorize;
use futures_util::{pin_mut, StreamExt};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::api::{ChatContext, GeminiClient};
use crate::chat::sessions::{CreateOutcome, SessionList};
use crate::chat::store::HistoryStore;
use crate::chat::turn::Turn;
use crate::config::ClientConfig;
use crate::logging::ConversationLogger;
use crate::models::{AttachedImage, ChatMessage, AVAILABLE_MODELS, MAX_SESSIONS};

/// Run interactive REPL mode
pub async fn run_repl_mode(config: ClientConfig) -> Result<()> {
    println!("{}", "🟢 Arkcom - ask anything".bright_cyan().bold());
    println!(
        "{}",
        format!(
            "Storage: {} • Model: {} • Grounding: {}",
            config.storage_dir.display(),
            config.default_model,
            if config.web_grounding { "on" } else { "off" }
        )
        .bright_black()
    );
    println!(
        "{}",
        "Type a message to chat, /help for commands, 'exit' to quit\n".bright_black()
    );

    let store = HistoryStore::new(&config.storage_dir)?;
    let sessions = SessionList::load(store, &config.default_model);
    let client = GeminiClient::new(&config);
    let logger = match ConversationLogger::new(&config.storage_dir) {
        Ok(l) => Some(l),
        Err(e) => {
            eprintln!("Logging disabled: {}", e);
            None
        }
    };

    let mut state = ReplState {
        sessions,
        client,
        logger,
        web_grounding: config.web_grounding,
        attached: None,
        context: None,
        context_session: None,
        export_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        color_enabled: colored::control::SHOULD_COLORIZE.should_colorize(),
    };

    if state.sessions.at_capacity() {
        print_capacity_notice();
    }

    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline("❯ ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);

                if input == "exit" || input == "quit" {
                    break;
                }
                if let Some(command) = input.strip_prefix('/') {
                    state.handle_command(command).await;
                } else {
                    state.send_message(input).await;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{} Readline error: {}", "❌".red(), e);
                break;
            }
        }
    }

    println!("{}", "Goodbye!".bright_black());
    Ok(())
}

struct ReplState {
    sessions: SessionList,
    client: GeminiClient,
    logger: Option<ConversationLogger>,
    web_grounding: bool,
    attached: Option<AttachedImage>,
    /// Context for the session it was opened from; rebuilt statelessly from
    /// stored history whenever the active session changes.
    context: Option<ChatContext>,
    context_session: Option<Uuid>,
    export_dir: PathBuf,
    color_enabled: bool,
}

impl ReplState {
    async fn handle_command(&mut self, command: &str) {
        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name {
            "help" => print_help(),
            "new" => match self.sessions.create_session() {
                CreateOutcome::Created(_) => {
                    self.invalidate_context();
                    println!("{}", "Started a new chat".green());
                }
                CreateOutcome::LimitReached => print_capacity_notice(),
            },
            "chats" => self.list_sessions(),
            "open" => {
                if let Some(id) = self.resolve_session(rest) {
                    self.sessions.select_session(id);
                    self.invalidate_context();
                    println!("Opened chat: {}", self.active_title().bright_cyan());
                }
            }
            "delete" => {
                if let Some(id) = self.resolve_session(rest) {
                    self.sessions.delete_session(id);
                    self.invalidate_context();
                    println!("{}", "Chat deleted".green());
                }
            }
            "model" => self.set_model(rest),
            "attach" => self.attach_file(rest),
            "detach" => {
                self.attached = None;
                println!("Attachment removed");
            }
            "rewrite" => self.rewrite(rest).await,
            "grounding" => {
                self.web_grounding = !self.web_grounding;
                self.invalidate_context();
                println!(
                    "Web grounding {}",
                    if self.web_grounding {
                        "enabled".green()
                    } else {
                        "disabled".yellow()
                    }
                );
            }
            "color" => {
                self.color_enabled = !self.color_enabled;
                colored::control::set_override(self.color_enabled);
                println!(
                    "Colored output {}",
                    if self.color_enabled { "enabled" } else { "disabled" }
                );
            }
            "export" => match self.sessions.export_and_clear(&self.export_dir) {
                Ok(path) => {
                    self.invalidate_context();
                    println!(
                        "{} History exported to {} and cleared",
                        "💾".green(),
                        path.display()
                    );
                }
                Err(e) => eprintln!("{} Export failed: {:#}", "❌".red(), e),
            },
            "clear" => {
                self.sessions.clear_all();
                self.invalidate_context();
                println!("{}", "All chats deleted".green());
            }
            _ => println!(
                "{} Unknown command: /{} (try /help)",
                "⚠️".yellow(),
                name
            ),
        }
    }

    async fn send_message(&mut self, text: &str) {
        if self.client.is_degraded() {
            println!(
                "{} Sending is disabled: no API key is configured",
                "⚠️".yellow()
            );
            return;
        }

        let image = self.attached.take();
        if text.is_empty() && image.is_none() {
            println!("{} Nothing to send", "⚠️".yellow());
            return;
        }

        self.ensure_context();
        let Some(mut ctx) = self.context.take() else {
            println!("{} Could not open a chat context", "⚠️".yellow());
            return;
        };

        self.sessions.append_turn(
            ChatMessage::user(text, image.clone()),
            ChatMessage::model_placeholder(),
        );
        if let Some(logger) = &mut self.logger {
            logger.log("user", text, None);
        }

        let mut turn = Turn::begin();
        let mut printed_len = 0usize;

        let outcome: Result<()> = match self.client.send(&mut ctx, text, image) {
            Err(e) => Err(e.into()),
            Ok(stream) => {
                pin_mut!(stream);
                let mut result = Ok(());
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(event) => {
                            if let Some(patch) = turn.apply(event) {
                                let rendered = render_model_text(&patch.content);
                                if rendered.len() > printed_len {
                                    print!("{}", &rendered[printed_len..]);
                                    let _ = io::stdout().flush();
                                    printed_len = rendered.len();
                                }
                                self.sessions
                                    .patch_streaming_message(&patch.content, patch.sources.as_deref());
                            }
                        }
                        Err(e) => {
                            result = Err(e);
                            break;
                        }
                    }
                }
                result
            }
        };
        println!();

        // Settlement block: every path through here releases the generating
        // state before the composer is offered again.
        match outcome {
            Ok(()) => {
                turn.settle();
                ctx.record_reply(turn.content());
                if let Some(sources) = turn.sources() {
                    if !sources.is_empty() {
                        println!("{}", "Sources:".bright_black());
                        for source in sources {
                            println!(
                                "  {} {}",
                                source.title.bright_black(),
                                source.uri.underline().bright_black()
                            );
                        }
                    }
                }
                if let Some(logger) = &mut self.logger {
                    logger.log("model", turn.content(), Some(ctx.model()));
                }
                self.context = Some(ctx);
            }
            Err(e) => {
                eprintln!("{} {:#}", "❌".red(), e);
                let patch = turn.fail();
                self.sessions.patch_streaming_message(&patch.content, None);
                println!("{}", patch.content);
                // The context may hold a user turn with no reply; reopen it
                // from stored history on the next send.
                self.invalidate_context();
            }
        }
        debug_assert!(!turn.is_generating());

        if self.sessions.at_capacity() {
            print_capacity_notice();
        }
    }

    /// Open a context for the active session if none matches it.
    fn ensure_context(&mut self) {
        let active_id = self.sessions.active_id();
        if self.context.is_some() && self.context_session == active_id {
            return;
        }
        let Some(session) = self.sessions.active() else {
            self.context = None;
            self.context_session = None;
            return;
        };
        self.context =
            self.client
                .open_context(&session.messages, &session.model, self.web_grounding);
        self.context_session = active_id;
    }

    fn invalidate_context(&mut self) {
        self.context = None;
        self.context_session = None;
    }

    fn list_sessions(&self) {
        for (index, session) in self.sessions.sessions().iter().enumerate() {
            let marker = if Some(session.id) == self.sessions.active_id() {
                "●".green()
            } else {
                " ".normal()
            };
            println!(
                "{:>3}. {} {} {}",
                index + 1,
                marker,
                session.title(),
                format!("({}, {} messages)", session.model, session.messages.len()).bright_black()
            );
        }
        println!(
            "{}",
            format!("{} of {} chats used", self.sessions.len(), MAX_SESSIONS).bright_black()
        );
    }

    /// Resolve a 1-based list index or an id prefix to a session id.
    fn resolve_session(&self, arg: &str) -> Option<Uuid> {
        if arg.is_empty() {
            println!("{} Give a chat number or id (see /chats)", "⚠️".yellow());
            return None;
        }
        if let Ok(index) = arg.parse::<usize>() {
            if index >= 1 && index <= self.sessions.len() {
                return Some(self.sessions.sessions()[index - 1].id);
            }
        }
        let matched: Vec<Uuid> = self
            .sessions
            .sessions()
            .iter()
            .filter(|s| s.id.to_string().starts_with(arg))
            .map(|s| s.id)
            .collect();
        match matched.as_slice() {
            [id] => Some(*id),
            [] => {
                println!("{} No chat matches '{}'", "⚠️".yellow(), arg);
                None
            }
            _ => {
                println!("{} '{}' matches more than one chat", "⚠️".yellow(), arg);
                None
            }
        }
    }

    fn set_model(&mut self, model: &str) {
        if model.is_empty() {
            println!("Available models: {}", AVAILABLE_MODELS.join(", "));
            println!("Current: {}", self.sessions.selected_model());
            return;
        }
        if !AVAILABLE_MODELS.contains(&model) {
            println!(
                "{} Unknown model '{}' (available: {})",
                "⚠️".yellow(),
                model,
                AVAILABLE_MODELS.join(", ")
            );
            return;
        }
        if let Some(id) = self.sessions.active_id() {
            self.sessions.set_session_model(id, model);
            self.invalidate_context();
            println!("Model set to {}", model.bright_cyan());
        }
    }

    /// Attach one image file to the next message. Non-image files are
    /// rejected with a notice and no state change.
    fn attach_file(&mut self, path: &str) {
        if path.is_empty() {
            println!("{} Give a file path: /attach photo.png", "⚠️".yellow());
            return;
        }
        let path = Path::new(path);
        let Some(mime_type) = image_mime_type(path) else {
            println!("{} Please select an image file.", "⚠️".yellow());
            return;
        };
        match fs::read(path) {
            Ok(bytes) => {
                let size_kb = bytes.len() as f64 / 1024.0;
                self.attached = Some(AttachedImage {
                    mime_type: mime_type.to_string(),
                    data: BASE64.encode(bytes),
                });
                println!(
                    "{} Attached {} ({:.1} KB); it will be sent with your next message",
                    "📎".green(),
                    path.display(),
                    size_kb
                );
            }
            Err(e) => println!("{} Could not read {}: {}", "❌".red(), path.display(), e),
        }
    }

    async fn rewrite(&mut self, draft: &str) {
        if draft.is_empty() {
            println!("{} Give the text to improve: /rewrite <text>", "⚠️".yellow());
            return;
        }
        println!("{}", "✨ Improving...".bright_black());
        let improved = self.client.rewrite(draft).await;
        println!("{}", improved);
    }

    fn active_title(&self) -> String {
        self.sessions
            .active()
            .map(|s| s.title())
            .unwrap_or_else(|| "New chat".to_string())
    }
}

/// Model text is rendered with markdown emphasis markers stripped.
fn render_model_text(content: &str) -> String {
    content.replace('*', "")
}

/// MIME type for recognized image extensions; None for anything else.
fn image_mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

fn print_capacity_notice() {
    println!(
        "{} Chat history is full ({} chats). Creating new chats is blocked until you \
         /export (save to a file, then clear) or /clear (delete everything).",
        "⚠️".yellow(),
        MAX_SESSIONS
    );
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  /new              start a new chat");
    println!("  /chats            list chats");
    println!("  /open <n|id>      switch to a chat");
    println!("  /delete <n|id>    delete a chat");
    println!("  /model [name]     show or set the model for this chat");
    println!("  /attach <path>    attach an image to the next message");
    println!("  /detach           remove the pending attachment");
    println!("  /rewrite <text>   improve a draft without sending it");
    println!("  /grounding        toggle web grounding");
    println!("  /color            toggle colored output");
    println!("  /export           save all chats to a file, then clear");
    println!("  /clear            delete all chats");
    println!("  exit              quit");
}
