//! Main TUI application state and input handling.
//!
//! [`TuiApp`] owns the [`ChatSession`], the rendered conversation, the input
//! buffer and scroll state.  Requests and reveals run on spawned tasks and
//! report back over [`tokio::sync::mpsc`] channels that the UI loop drains
//! with [`TuiApp::check_responses`].

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use relaychat_core::attachment::DEFAULT_MAX_ATTACHMENT_BYTES;
use relaychat_core::reveal::DEFAULT_REVEAL_INTERVAL;
use relaychat_core::view::render_history;
use relaychat_core::{
    CANCELLED_MESSAGE, ChatConfig, ChatError, ChatSession, Dispatcher, MessageView, Outbound,
    PendingAttachment, RevealEvent, RevealHandle, Turn, spawn_reveal,
};
use relaychat_store::{TranscriptStore, TranscriptWriter};

/// Shown for `/help`.
pub const HELP_TEXT: &str = "/attach <path> stages a file for the next message\n\
                             /detach drops the staged file\n\
                             /clear deletes all chats\n\
                             /help shows this list\n\
                             Ctrl+S stops a response, Esc quits";

const WELCOME_TEXT: &str = "Type a message and press Enter. /help lists commands.";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Tunables for the chat view.
#[derive(Debug, Clone)]
pub struct TuiSettings {
    /// Delay between revealed words.
    pub reveal_interval: Duration,
    /// Largest file `/attach` accepts.
    pub max_attachment_bytes: usize,
}

impl Default for TuiSettings {
    fn default() -> Self {
        Self {
            reveal_interval: DEFAULT_REVEAL_INTERVAL,
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

impl TuiSettings {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            reveal_interval: config.reveal_interval(),
            max_attachment_bytes: config.max_attachment_bytes,
        }
    }
}

/// Outcome of a background request.
#[derive(Debug)]
struct Reply {
    request_id: u64,
    outcome: relaychat_core::Result<String>,
}

/// Actions the UI loop should take after processing a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    /// Continue the main loop.
    Continue,
    /// Exit the application.
    Quit,
}

// ---------------------------------------------------------------------------
// TuiApp
// ---------------------------------------------------------------------------

/// The main TUI application state.
pub struct TuiApp {
    /// Current text in the input field.
    input: String,
    /// Cursor position within the input field, in characters.
    cursor_pos: usize,
    /// Conversation as drawn.
    entries: Vec<MessageView>,
    /// Lines scrolled up from the bottom.
    scroll_offset: u16,
    session: ChatSession,
    dispatcher: Dispatcher,
    backend_label: String,
    transcript: Option<TranscriptWriter>,
    settings: TuiSettings,
    /// Index into `entries` of the reply being waited on or revealed.
    reply_entry: Option<usize>,
    reveal: Option<RevealHandle>,
    reply_tx: mpsc::UnboundedSender<Reply>,
    reply_rx: mpsc::UnboundedReceiver<Reply>,
    reveal_tx: mpsc::UnboundedSender<RevealEvent>,
    reveal_rx: mpsc::UnboundedReceiver<RevealEvent>,
}

impl TuiApp {
    /// Create an app with an empty conversation.
    pub fn new(dispatcher: Dispatcher, settings: TuiSettings) -> Self {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let (reveal_tx, reveal_rx) = mpsc::unbounded_channel();

        Self {
            input: String::new(),
            cursor_pos: 0,
            entries: vec![MessageView::notice(WELCOME_TEXT)],
            scroll_offset: 0,
            session: ChatSession::new(),
            backend_label: dispatcher.backend().describe(),
            dispatcher,
            transcript: None,
            settings,
            reply_entry: None,
            reveal: None,
            reply_tx,
            reply_rx,
            reveal_tx,
            reveal_rx,
        }
    }

    /// Seed the conversation with restored turns.
    pub fn with_history(mut self, turns: Vec<Turn>) -> Self {
        let mut entries = render_history(&turns);
        entries.append(&mut self.entries);
        self.entries = entries;
        self.session = ChatSession::with_history(turns);
        self
    }

    /// Save the conversation after each exchange and delete it on `/clear`.
    pub fn with_transcript(mut self, transcript: TranscriptStore) -> Self {
        self.transcript = Some(TranscriptWriter::spawn(transcript));
        self
    }

    /// Wait for queued saves and deletes to reach the store.
    pub async fn flush_transcript(&self) {
        if let Some(writer) = &self.transcript {
            writer.flush().await;
        }
    }

    /// Show a local notice in the conversation.
    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.entries.push(MessageView::notice(text));
    }

    // -- Accessors ----------------------------------------------------------

    /// Return the current input text.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Return the cursor position within the input.
    pub fn cursor_pos(&self) -> usize {
        self.cursor_pos
    }

    pub fn entries(&self) -> &[MessageView] {
        &self.entries
    }

    /// Return the current scroll offset.
    pub fn scroll_offset(&self) -> u16 {
        self.scroll_offset
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Waiting for a reply or revealing one.  New sends are blocked.
    pub fn is_busy(&self) -> bool {
        self.session.is_busy() || self.reveal.is_some()
    }

    pub fn is_waiting(&self) -> bool {
        self.session.is_busy()
    }

    pub fn backend_label(&self) -> &str {
        &self.backend_label
    }

    /// Label of the staged file, if any.
    pub fn attachment_label(&self) -> Option<String> {
        MessageView::outgoing("", self.session.pending_attachment()).attachment
    }

    // -- Key handling -------------------------------------------------------

    /// Handle a key event and return the action the UI should take.
    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return AppAction::Quit,
                KeyCode::Char('s') => self.stop(),
                _ => {}
            }
            return AppAction::Continue;
        }

        match key.code {
            KeyCode::Esc => return AppAction::Quit,
            KeyCode::Enter => self.submit_input(),
            KeyCode::Char(c) => {
                let at = self.byte_index();
                self.input.insert(at, c);
                self.cursor_pos += 1;
            }
            KeyCode::Backspace => {
                if self.cursor_pos > 0 {
                    self.cursor_pos -= 1;
                    let at = self.byte_index();
                    self.input.remove(at);
                }
            }
            KeyCode::Delete => {
                if self.cursor_pos < self.input_len() {
                    let at = self.byte_index();
                    self.input.remove(at);
                }
            }
            KeyCode::Left => self.cursor_pos = self.cursor_pos.saturating_sub(1),
            KeyCode::Right => self.cursor_pos = (self.cursor_pos + 1).min(self.input_len()),
            KeyCode::Home => self.cursor_pos = 0,
            KeyCode::End => self.cursor_pos = self.input_len(),
            KeyCode::Up => self.scroll_up(1),
            KeyCode::Down => self.scroll_down(1),
            KeyCode::PageUp => self.scroll_up(10),
            KeyCode::PageDown => self.scroll_down(10),
            _ => {}
        }

        AppAction::Continue
    }

    fn input_len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_pos)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_pos = 0;
    }

    // -- Scrolling ----------------------------------------------------------

    fn scroll_up(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    fn scroll_down(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    // -- Sending ------------------------------------------------------------

    /// Run a `/command` or send the input as a message.
    fn submit_input(&mut self) {
        let text = self.input.trim().to_owned();
        self.scroll_offset = 0;

        if let Some(command) = text.strip_prefix('/') {
            self.clear_input();
            self.run_command(command);
            return;
        }
        if self.is_busy() {
            return;
        }

        let outgoing = MessageView::outgoing(&text, self.session.pending_attachment());
        match self.session.begin_send(&text) {
            Ok(outbound) => {
                self.clear_input();
                self.entries.push(outgoing);
                self.entries.push(MessageView::pending_reply());
                self.reply_entry = Some(self.entries.len() - 1);
                self.spawn_request(outbound);
            }
            Err(ChatError::EmptyMessage) => {}
            Err(e) => self.entries.push(MessageView::error(e.to_string())),
        }
    }

    fn spawn_request(&self, outbound: Outbound) {
        let dispatcher = self.dispatcher.clone();
        let tx = self.reply_tx.clone();

        tokio::spawn(async move {
            let outcome = dispatcher.dispatch(&outbound).await;
            let _ = tx.send(Reply {
                request_id: outbound.id,
                outcome,
            });
        });
    }

    /// Stop whatever is in progress: the pending request, or the reveal.
    ///
    /// Also discards the staged attachment.
    pub fn stop(&mut self) {
        if self.session.cancel() {
            if let Some(idx) = self.reply_entry.take()
                && let Some(entry) = self.entries.get_mut(idx)
            {
                *entry = MessageView::notice(CANCELLED_MESSAGE);
            }
            self.scroll_offset = 0;
        } else if let Some(reveal) = &self.reveal {
            // The final frame arrives as `RevealEvent::Cancelled`.
            reveal.cancel();
        }
    }

    // -- Background event polling -------------------------------------------

    /// Drain reply and reveal events and update state accordingly.
    ///
    /// Should be called on every iteration of the main UI loop.
    pub fn check_responses(&mut self) {
        while let Ok(reply) = self.reply_rx.try_recv() {
            self.on_reply(reply);
        }
        while let Ok(event) = self.reveal_rx.try_recv() {
            self.on_reveal(event);
        }
    }

    fn on_reply(&mut self, reply: Reply) {
        match self.session.finish(reply.request_id, reply.outcome) {
            Ok(text) => {
                tracing::debug!(request_id = reply.request_id, "reply received");
                self.save_transcript();
                if let Some(entry) = self.reply_entry.and_then(|i| self.entries.get_mut(i)) {
                    entry.text.clear();
                }
                self.reveal = Some(spawn_reveal(
                    reply.request_id,
                    text,
                    self.settings.reveal_interval,
                    self.reveal_tx.clone(),
                ));
            }
            // `stop` or `/clear` already updated the view.
            Err(ChatError::Cancelled) => {}
            Err(e) => {
                if let Some(idx) = self.reply_entry.take()
                    && let Some(entry) = self.entries.get_mut(idx)
                {
                    *entry = MessageView::error(e.to_string());
                }
                self.scroll_offset = 0;
            }
        }
    }

    fn on_reveal(&mut self, event: RevealEvent) {
        let current = self
            .reveal
            .as_ref()
            .is_some_and(|r| r.id() == event.reveal_id());
        if !current {
            return;
        }

        let entry = self.reply_entry.and_then(|i| self.entries.get_mut(i));
        match event {
            RevealEvent::Frame { visible, .. } => {
                if let Some(entry) = entry {
                    entry.text = visible;
                }
            }
            RevealEvent::Done { .. } => {
                if let Some(entry) = entry {
                    entry.loading = false;
                }
                self.reply_entry = None;
                self.reveal = None;
            }
            RevealEvent::Cancelled { visible, .. } => {
                if let Some(entry) = entry {
                    entry.text = visible;
                    entry.loading = false;
                }
                self.reply_entry = None;
                self.reveal = None;
                self.entries.push(MessageView::notice(CANCELLED_MESSAGE));
            }
        }
        self.scroll_offset = 0;
    }

    // -- Commands -----------------------------------------------------------

    fn run_command(&mut self, command: &str) {
        let (name, arg) = match command.split_once(' ') {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match name {
            "attach" => self.attach(arg),
            "detach" => match self.session.cancel_attachment() {
                Some(file) => self.push_notice(format!("Removed {}.", file.file_name)),
                None => self.push_notice("No file is attached."),
            },
            "clear" => self.clear_chats(),
            "help" => self.push_notice(HELP_TEXT),
            other => self.entries.push(MessageView::error(format!(
                "Unknown command /{other}. Type /help for a list."
            ))),
        }
    }

    fn attach(&mut self, path: &str) {
        if path.is_empty() {
            self.entries
                .push(MessageView::error("Usage: /attach <path>"));
            return;
        }
        if self.is_busy() {
            self.entries.push(MessageView::error(
                "Wait for the current response before attaching a file.",
            ));
            return;
        }

        match PendingAttachment::from_path(path, self.settings.max_attachment_bytes) {
            Ok(file) => {
                self.push_notice(format!(
                    "Attached {} ({}, {} bytes). It goes out with your next message.",
                    file.file_name,
                    file.mime_type,
                    file.data.len()
                ));
                self.session.stage_attachment(file);
            }
            Err(e) => self.entries.push(MessageView::error(e.to_string())),
        }
    }

    /// Delete the conversation everywhere: session, view and saved record.
    fn clear_chats(&mut self) {
        self.session.reset();
        self.reveal = None;
        self.reply_entry = None;
        self.entries.clear();

        if let Some(writer) = &self.transcript {
            writer.clear();
        }
        self.push_notice("All chats deleted.");
    }

    fn save_transcript(&self) {
        if let Some(writer) = &self.transcript {
            writer.save(self.session.history().snapshot());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
