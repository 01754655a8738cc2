use std::sync::Arc;

use ratatui::layout::Rect;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::api::{ChatError, ChatResponse, DocumentBackend, UploadError, UploadReceipt};
use crate::config::Config;
use crate::conversation::ConversationControl;
use crate::message::{ConversationLog, Message};
use crate::upload::{SelectedFile, SelectionError, UploadControl};

pub const UPLOAD_FAILED_NOTICE: &str = "Upload failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    AwaitingDocument,
    Chatting,
}

struct PendingUpload {
    file: SelectedFile,
    handle: JoinHandle<Result<Value, UploadError>>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub mode: Mode,
    pub notice: Option<String>,
    pub backend_url: String,
    clear_history_on_switch: bool,

    // Owned exclusively here; the controls only ever borrow it
    log: ConversationLog,
    conversation: ConversationControl,
    upload: UploadControl,

    // Drop zone path input (typed "browse")
    pub path_input: String,
    pub path_cursor: usize,

    // Question input
    pub query_input: String,
    pub query_cursor: usize,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the chat area, set during render
    pub chat_width: u16,  // inner width of the chat area, set during render

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Drop zone area for mouse hit-testing (updated during render)
    pub drop_zone_area: Option<Rect>,

    // Network
    backend: Arc<dyn DocumentBackend>,
    upload_task: Option<PendingUpload>,
    chat_task: Option<JoinHandle<Result<ChatResponse, ChatError>>>,
}

impl App {
    pub fn new(backend: Arc<dyn DocumentBackend>, config: &Config) -> Self {
        Self {
            should_quit: false,
            mode: Mode::AwaitingDocument,
            notice: None,
            backend_url: config.backend_url.clone(),
            clear_history_on_switch: config.clear_history_on_switch,

            log: ConversationLog::new(),
            conversation: ConversationControl::new(),
            upload: UploadControl::new(),

            path_input: String::new(),
            path_cursor: 0,

            query_input: String::new(),
            query_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            drop_zone_area: None,

            backend,
            upload_task: None,
            chat_task: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.log.messages()
    }

    pub fn candidate(&self) -> Option<&SelectedFile> {
        self.upload.candidate()
    }

    pub fn is_uploading(&self) -> bool {
        self.upload.is_submitting()
    }

    pub fn is_thinking(&self) -> bool {
        self.conversation.is_awaiting_answer()
    }

    pub fn is_drop_highlighted(&self) -> bool {
        self.upload.is_highlighted()
    }

    // Upload

    /// Pick a file through the typed path ("browse").
    pub fn select_file(&mut self, raw: &str) -> bool {
        let result = self.upload.select(raw).map(|_| ());
        self.report_selection(result)
    }

    /// Pick a file dropped onto the terminal.
    pub fn drop_file(&mut self, raw: &str) -> bool {
        let result = self.upload.drop_path(raw).map(|_| ());
        self.report_selection(result)
    }

    fn report_selection(&mut self, result: Result<(), SelectionError>) -> bool {
        match result {
            Ok(()) => true,
            Err(SelectionError::Busy) => false,
            Err(e) => {
                tracing::warn!(error = %e, "document selection rejected");
                self.notice = Some(e.to_string());
                false
            }
        }
    }

    pub fn drag_over(&mut self, inside: bool) {
        if inside {
            self.upload.drag_enter();
        } else {
            self.upload.drag_leave();
        }
    }

    /// Start uploading the selected document. No-op without a candidate or while one is in flight.
    pub fn confirm_upload(&mut self) {
        if self.mode != Mode::AwaitingDocument {
            return;
        }
        let Some(file) = self.upload.begin_submit() else {
            return;
        };

        tracing::info!(file = %file.name, backend = %self.backend_url, "uploading document");
        let backend = Arc::clone(&self.backend);
        let task_file = file.clone();
        let handle = tokio::spawn(async move { backend.upload_document(&task_file).await });
        self.upload_task = Some(PendingUpload { file, handle });
    }

    fn finish_upload(&mut self, file: SelectedFile, outcome: Result<Value, UploadError>) {
        match outcome {
            Ok(body) => {
                let receipt = UploadReceipt::from_value(&body);
                tracing::info!(
                    file = %file.name,
                    chunks = ?receipt.chunks_added,
                    message = receipt.message.as_deref().unwrap_or(""),
                    "document accepted"
                );
                self.upload.finish(true);
                self.mode = Mode::Chatting;
                self.log.reset_with(Message::assistant(format!(
                    "I've analyzed **{}**. I'm ready to answer your questions!",
                    file.name
                )));
                self.chat_scroll = 0;
            }
            Err(e) => {
                tracing::error!(file = %file.name, error = %e, "upload failed");
                self.upload.finish(false);
                self.notice = Some(UPLOAD_FAILED_NOTICE.to_string());
            }
        }
    }

    // Conversation

    /// Ask a question. Returns whether it was accepted; blank input and
    /// questions asked while an answer is pending are ignored.
    pub fn submit_query(&mut self, raw: &str) -> bool {
        if self.mode != Mode::Chatting {
            return false;
        }
        let Some(query) = self.conversation.submit(&mut self.log, raw) else {
            return false;
        };

        tracing::info!(chars = query.len(), "sending question");
        let backend = Arc::clone(&self.backend);
        self.chat_task = Some(tokio::spawn(async move { backend.chat(&query).await }));
        self.scroll_chat_to_bottom();
        true
    }

    /// "Upload a different document". Ignored while an answer is pending.
    pub fn switch_document(&mut self) {
        if self.mode != Mode::Chatting || self.is_thinking() {
            return;
        }
        self.mode = Mode::AwaitingDocument;
        if self.clear_history_on_switch {
            self.log.clear();
            self.chat_scroll = 0;
        }
    }

    /// Apply the results of any network calls that have completed. Never waits on a pending one.
    pub async fn poll_tasks(&mut self) {
        if let Some(pending) = self.upload_task.take_if(|p| p.handle.is_finished()) {
            let outcome = pending
                .handle
                .await
                .unwrap_or_else(|e| Err(UploadError::Interrupted(e.to_string())));
            self.finish_upload(pending.file, outcome);
        }

        if let Some(handle) = self.chat_task.take_if(|h| h.is_finished()) {
            let outcome = handle
                .await
                .unwrap_or_else(|e| Err(ChatError::Interrupted(e.to_string())));
            self.conversation.resolve(&mut self.log, outcome);
            self.scroll_chat_to_bottom();
        }
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.upload_task.is_some() || self.chat_task.is_some()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_thinking() || self.is_uploading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.chat_line_count().saturating_sub(self.visible_chat_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    /// Scroll chat to bottom so the newest turn (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let total_lines = self.chat_line_count();
        let visible_height = self.visible_chat_height();

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }

    fn visible_chat_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Wrapped line count of the chat as the renderer lays it out.
    fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.log.messages() {
            total_lines = total_lines.saturating_add(1); // Role line ("You:" or "AI:")
            for line in msg.content.lines() {
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add((char_count / wrap_width + 1) as u16);
            }
            if let Some(sources) = &msg.sources {
                total_lines = total_lines.saturating_add(1 + sources.len() as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.is_thinking() {
            total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
        }

        total_lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::CHAT_FAILURE_TEXT;
    use crate::message::Role;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::fs::File;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    /// Backend that replays canned results.
    /// With a `gate`, chat calls block until `release` is called.
    #[derive(Default)]
    struct ScriptedBackend {
        upload_fails: bool,
        chat_replies: Mutex<VecDeque<Result<ChatResponse, ChatError>>>,
        gate: Option<Notify>,
        upload_calls: AtomicUsize,
        chat_calls: AtomicUsize,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn with_replies(replies: Vec<Result<ChatResponse, ChatError>>) -> Self {
            Self {
                chat_replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }

        fn release(&self) {
            if let Some(gate) = &self.gate {
                gate.notify_one();
            }
        }
    }

    #[async_trait]
    impl DocumentBackend for ScriptedBackend {
        async fn upload_document(&self, file: &SelectedFile) -> Result<Value, UploadError> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            if self.upload_fails {
                Err(UploadError::Rejected(StatusCode::INTERNAL_SERVER_ERROR))
            } else {
                Ok(json!({"filename": file.name, "chunks_added": 3}))
            }
        }

        async fn chat(&self, query: &str) -> Result<ChatResponse, ChatError> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.chat_replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ChatError::Interrupted("no scripted reply".to_string())))
        }
    }

    fn reply(response: &str, sources: &[&str]) -> Result<ChatResponse, ChatError> {
        Ok(ChatResponse {
            response: response.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn new_app(backend: &Arc<ScriptedBackend>, config: &Config) -> App {
        let backend: Arc<dyn DocumentBackend> = backend.clone();
        App::new(backend, config)
    }

    fn pdf(dir: &TempDir, name: &str) -> String {
        let path = dir.path().join(name);
        File::create(&path).unwrap();
        path.to_string_lossy().into_owned()
    }

    /// Let spawned tasks run, then apply whatever finished.
    async fn settle(app: &mut App) {
        for _ in 0..50 {
            tokio::task::yield_now().await;
            app.poll_tasks().await;
        }
    }

    async fn chatting_app(backend: &Arc<ScriptedBackend>, dir: &TempDir) -> App {
        let mut app = new_app(backend, &Config::default());
        assert!(app.select_file(&pdf(dir, "report.pdf")));
        app.confirm_upload();
        settle(&mut app).await;
        assert_eq!(app.mode, Mode::Chatting);
        app
    }

    #[tokio::test]
    async fn test_initial_state() {
        let backend = Arc::new(ScriptedBackend::default());
        let app = new_app(&backend, &Config::default());
        assert_eq!(app.mode, Mode::AwaitingDocument);
        assert!(app.messages().is_empty());
        assert!(app.notice.is_none());
        assert!(!app.has_pending_tasks());
    }

    #[tokio::test]
    async fn test_non_pdf_selection_never_reaches_network() {
        let backend = Arc::new(ScriptedBackend::default());
        let dir = tempfile::tempdir().unwrap();
        let mut app = new_app(&backend, &Config::default());

        let txt = dir.path().join("notes.txt");
        File::create(&txt).unwrap();
        assert!(!app.drop_file(&txt.to_string_lossy()));
        assert_eq!(app.notice.as_deref(), Some("Only PDF files are allowed"));
        assert!(app.candidate().is_none());

        app.confirm_upload();
        settle(&mut app).await;
        assert_eq!(backend.upload_calls.load(Ordering::SeqCst), 0);
        assert_eq!(app.mode, Mode::AwaitingDocument);
    }

    #[tokio::test]
    async fn test_successful_upload_enters_chat_with_one_message() {
        let backend = Arc::new(ScriptedBackend::default());
        let dir = tempfile::tempdir().unwrap();
        let app = chatting_app(&backend, &dir).await;

        assert_eq!(backend.upload_calls.load(Ordering::SeqCst), 1);
        assert_eq!(app.messages().len(), 1);
        let ready = &app.messages()[0];
        assert_eq!(ready.role, Role::Assistant);
        assert_eq!(
            ready.content,
            "I've analyzed **report.pdf**. I'm ready to answer your questions!"
        );
        assert!(app.candidate().is_none());
        assert!(!app.is_uploading());
    }

    #[tokio::test]
    async fn test_failed_upload_shows_notice_and_keeps_file() {
        let backend = Arc::new(ScriptedBackend {
            upload_fails: true,
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let mut app = new_app(&backend, &Config::default());

        app.select_file(&pdf(&dir, "report.pdf"));
        app.confirm_upload();
        assert!(app.is_uploading());
        settle(&mut app).await;

        assert_eq!(app.mode, Mode::AwaitingDocument);
        assert_eq!(app.notice.as_deref(), Some(UPLOAD_FAILED_NOTICE));
        assert_eq!(app.candidate().unwrap().name, "report.pdf");
        assert!(!app.is_uploading());
        assert!(app.messages().is_empty());

        // Retry without reselecting
        app.dismiss_notice();
        app.confirm_upload();
        settle(&mut app).await;
        assert_eq!(backend.upload_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_confirm_twice_issues_one_upload() {
        let backend = Arc::new(ScriptedBackend::default());
        let dir = tempfile::tempdir().unwrap();
        let mut app = new_app(&backend, &Config::default());

        app.select_file(&pdf(&dir, "report.pdf"));
        app.confirm_upload();
        app.confirm_upload();
        settle(&mut app).await;
        assert_eq!(backend.upload_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_report_scenario() {
        let backend = Arc::new(ScriptedBackend::with_replies(vec![reply(
            "The total revenue is $4.2M.",
            &["report.pdf#page=3"],
        )]));
        let dir = tempfile::tempdir().unwrap();
        let mut app = chatting_app(&backend, &dir).await;

        assert!(app.submit_query("What is the total revenue?"));
        assert!(app.is_thinking());
        settle(&mut app).await;

        let messages = app.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "What is the total revenue?");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].content, "The total revenue is $4.2M.");
        assert_eq!(messages[2].source_labels(), vec!["report.pdf#page=3 #Page".to_string()]);
        assert!(!app.is_thinking());
    }

    #[tokio::test]
    async fn test_trimmed_query_is_sent() {
        let backend = Arc::new(ScriptedBackend::with_replies(vec![reply("ok", &[])]));
        let dir = tempfile::tempdir().unwrap();
        let mut app = chatting_app(&backend, &dir).await;

        app.submit_query("   revenue?  ");
        settle(&mut app).await;
        assert_eq!(*backend.queries.lock().unwrap(), vec!["revenue?".to_string()]);
        assert_eq!(app.messages()[1].content, "   revenue?  ");
    }

    #[tokio::test]
    async fn test_failed_chat_adds_apology() {
        let backend = Arc::new(ScriptedBackend::with_replies(vec![Err(ChatError::Server {
            status: StatusCode::SERVICE_UNAVAILABLE,
            detail: "RAG Service not initialized".to_string(),
        })]));
        let dir = tempfile::tempdir().unwrap();
        let mut app = chatting_app(&backend, &dir).await;

        app.submit_query("Q");
        settle(&mut app).await;

        assert_eq!(app.messages().len(), 3);
        let last = &app.messages()[2];
        assert_eq!(last.content, CHAT_FAILURE_TEXT);
        assert_eq!(last.sources, None);
        assert!(!app.is_thinking());
    }

    #[tokio::test]
    async fn test_blank_query_is_ignored() {
        let backend = Arc::new(ScriptedBackend::default());
        let dir = tempfile::tempdir().unwrap();
        let mut app = chatting_app(&backend, &dir).await;

        assert!(!app.submit_query("   \t "));
        settle(&mut app).await;
        assert_eq!(app.messages().len(), 1);
        assert_eq!(backend.chat_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_submit_while_pending_is_ignored() {
        let backend = Arc::new(ScriptedBackend {
            gate: Some(Notify::new()),
            chat_replies: Mutex::new(vec![reply("first answer", &[])].into()),
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let mut app = chatting_app(&backend, &dir).await;

        assert!(app.submit_query("first"));
        settle(&mut app).await;
        assert_eq!(app.messages().len(), 2);

        assert!(!app.submit_query("second"));
        settle(&mut app).await;
        assert_eq!(app.messages().len(), 2);
        assert_eq!(backend.chat_calls.load(Ordering::SeqCst), 1);
        assert!(app.is_thinking());

        backend.release();
        settle(&mut app).await;
        assert_eq!(app.messages().len(), 3);
        assert_eq!(app.messages()[2].content, "first answer");
        assert!(!app.is_thinking());
    }

    #[tokio::test]
    async fn test_chat_blocked_before_document() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut app = new_app(&backend, &Config::default());

        assert!(!app.submit_query("hello?"));
        assert!(app.messages().is_empty());
    }

    #[tokio::test]
    async fn test_switch_document_keeps_history_by_default() {
        let backend = Arc::new(ScriptedBackend::with_replies(vec![reply("R", &[])]));
        let dir = tempfile::tempdir().unwrap();
        let mut app = chatting_app(&backend, &dir).await;
        app.submit_query("Q");
        settle(&mut app).await;

        app.switch_document();
        assert_eq!(app.mode, Mode::AwaitingDocument);
        assert_eq!(app.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_switch_document_can_clear_history() {
        let backend = Arc::new(ScriptedBackend::default());
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            clear_history_on_switch: true,
            ..Config::default()
        };
        let mut app = new_app(&backend, &config);
        app.select_file(&pdf(&dir, "report.pdf"));
        app.confirm_upload();
        settle(&mut app).await;

        app.switch_document();
        assert_eq!(app.mode, Mode::AwaitingDocument);
        assert!(app.messages().is_empty());
    }

    #[tokio::test]
    async fn test_switch_document_ignored_while_thinking() {
        let backend = Arc::new(ScriptedBackend {
            gate: Some(Notify::new()),
            chat_replies: Mutex::new(vec![reply("R", &[])].into()),
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let mut app = chatting_app(&backend, &dir).await;

        app.submit_query("Q");
        app.switch_document();
        assert_eq!(app.mode, Mode::Chatting);

        backend.release();
        settle(&mut app).await;
        app.switch_document();
        assert_eq!(app.mode, Mode::AwaitingDocument);
    }

    #[tokio::test]
    async fn test_new_document_resets_log() {
        let backend = Arc::new(ScriptedBackend::with_replies(vec![reply("R", &[])]));
        let dir = tempfile::tempdir().unwrap();
        let mut app = chatting_app(&backend, &dir).await;
        app.submit_query("Q");
        settle(&mut app).await;
        app.switch_document();

        app.select_file(&pdf(&dir, "second.pdf"));
        app.confirm_upload();
        settle(&mut app).await;

        assert_eq!(app.mode, Mode::Chatting);
        assert_eq!(app.messages().len(), 1);
        assert!(app.messages()[0].content.contains("**second.pdf**"));
    }

    #[tokio::test]
    async fn test_drag_over_toggles_highlight() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut app = new_app(&backend, &Config::default());

        app.drag_over(true);
        assert!(app.is_drop_highlighted());
        app.drag_over(false);
        assert!(!app.is_drop_highlighted());
        assert!(app.candidate().is_none());
    }

    #[tokio::test]
    async fn test_scroll_follows_new_messages() {
        let replies = (0..20).map(|i| reply(&format!("answer {}", i), &[])).collect();
        let backend = Arc::new(ScriptedBackend::with_replies(replies));
        let dir = tempfile::tempdir().unwrap();
        let mut app = chatting_app(&backend, &dir).await;
        app.chat_height = 10;
        app.chat_width = 40;

        for i in 0..20 {
            app.submit_query(&format!("question {}", i));
            settle(&mut app).await;
        }
        assert!(app.chat_scroll > 0);

        let bottom = app.chat_scroll;
        app.scroll_down(5);
        assert_eq!(app.chat_scroll, bottom);
        app.scroll_up(3);
        assert_eq!(app.chat_scroll, bottom - 3);
    }
}
