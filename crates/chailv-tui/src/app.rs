use anyhow::anyhow;
use ratatui::text::Line;
use tokio::task::JoinHandle;

use chailv_core::{ChatSession, PolicyTables, RelayClient, TableKind};

use crate::editor;

/// Side panel for viewing and editing the two reference tables
#[derive(Debug, Clone)]
pub struct SettingsPanel {
    pub open: bool,
    pub focus: TableKind,
    pub cursor: usize, // char index into the focused table
    pub confirm_reset: bool,
}

impl Default for SettingsPanel {
    fn default() -> Self {
        Self {
            open: false,
            focus: TableKind::Region,
            cursor: 0,
            confirm_reset: false,
        }
    }
}

pub struct App {
    pub should_quit: bool,

    // Conversation
    pub session: ChatSession,
    pub input_cursor: usize,
    pub query_task: Option<JoinHandle<anyhow::Result<String>>>,
    pub relay: RelayClient,

    // Chat viewport
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Tables and settings panel
    pub tables: PolicyTables,
    pub settings: SettingsPanel,

    /// Last persistence problem, shown in the footer
    pub status: Option<String>,
}

impl App {
    pub fn new(relay: RelayClient, tables: PolicyTables) -> Self {
        Self {
            should_quit: false,
            session: ChatSession::new(),
            input_cursor: 0,
            query_task: None,
            relay,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            tables,
            settings: SettingsPanel::default(),
            status: None,
        }
    }

    /// Submit the input and spawn the relay request in the background.
    /// Does nothing while a request is in flight or the input is blank.
    pub fn send_query(&mut self) {
        let Some(message) = self.session.submit() else {
            return;
        };
        self.input_cursor = 0;

        let relay = self.relay.clone();
        let region = self.tables.get(TableKind::Region).to_string();
        let standard = self.tables.get(TableKind::Standard).to_string();
        self.query_task = Some(tokio::spawn(async move {
            relay.chat(&message, &region, &standard).await
        }));

        self.scroll_chat_to_bottom();
    }

    /// Resolve the session once the background request has finished.
    /// A panicked or cancelled task resolves as a failure.
    pub async fn poll_query(&mut self) {
        let finished = self
            .query_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.query_task.take() {
            let outcome = match task.await {
                Ok(result) => result,
                Err(e) => Err(anyhow!("query task failed: {}", e)),
            };
            self.session.resolve(outcome);
            self.scroll_chat_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_awaiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat input editing
    pub fn input_insert(&mut self, c: char) {
        editor::insert_char(&mut self.session.input, &mut self.input_cursor, c);
    }

    pub fn input_backspace(&mut self) {
        editor::backspace(&mut self.session.input, &mut self.input_cursor);
    }

    pub fn input_delete(&mut self) {
        editor::delete(&mut self.session.input, self.input_cursor);
    }

    pub fn input_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn input_right(&mut self) {
        let char_count = self.session.input.chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_count);
    }

    pub fn input_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn input_end(&mut self) {
        self.input_cursor = self.session.input.chars().count();
    }

    // Settings panel
    pub fn toggle_settings(&mut self) {
        self.settings.open = !self.settings.open;
        self.settings.confirm_reset = false;
        if self.settings.open {
            self.clamp_table_cursor();
        }
    }

    pub fn close_settings(&mut self) {
        self.settings.open = false;
        self.settings.confirm_reset = false;
    }

    pub fn switch_table(&mut self) {
        self.settings.focus = self.settings.focus.other();
        self.settings.cursor = 0;
    }

    pub fn focused_table(&self) -> &str {
        self.tables.get(self.settings.focus)
    }

    fn clamp_table_cursor(&mut self) {
        let len = self.focused_table().chars().count();
        self.settings.cursor = self.settings.cursor.min(len);
    }

    /// Apply an edit to the focused table; the change is persisted at once
    fn edit_table<F>(&mut self, f: F)
    where
        F: FnOnce(&mut String, &mut usize),
    {
        let kind = self.settings.focus;
        let mut cursor = self.settings.cursor;
        let result = self.tables.edit(kind, |text| f(text, &mut cursor));
        self.settings.cursor = cursor;
        self.record(result);
    }

    pub fn table_insert(&mut self, c: char) {
        self.edit_table(|text, cursor| editor::insert_char(text, cursor, c));
    }

    pub fn table_backspace(&mut self) {
        if self.settings.cursor > 0 {
            self.edit_table(editor::backspace);
        }
    }

    pub fn table_delete(&mut self) {
        if self.settings.cursor < self.focused_table().chars().count() {
            self.edit_table(|text, cursor| editor::delete(text, *cursor));
        }
    }

    pub fn table_left(&mut self) {
        self.settings.cursor = self.settings.cursor.saturating_sub(1);
    }

    pub fn table_right(&mut self) {
        let len = self.focused_table().chars().count();
        self.settings.cursor = (self.settings.cursor + 1).min(len);
    }

    pub fn table_up(&mut self) {
        self.settings.cursor = editor::move_up(self.focused_table(), self.settings.cursor);
    }

    pub fn table_down(&mut self) {
        self.settings.cursor = editor::move_down(self.focused_table(), self.settings.cursor);
    }

    pub fn table_home(&mut self) {
        self.settings.cursor = editor::line_start(self.focused_table(), self.settings.cursor);
    }

    pub fn table_end(&mut self) {
        self.settings.cursor = editor::line_end(self.focused_table(), self.settings.cursor);
    }

    pub fn request_reset(&mut self) {
        self.settings.confirm_reset = true;
    }

    pub fn cancel_reset(&mut self) {
        self.settings.confirm_reset = false;
    }

    /// Restore both presets after the user confirmed
    pub fn confirm_reset(&mut self) {
        self.settings.confirm_reset = false;
        let result = self.tables.reset();
        self.record(result);
        self.clamp_table_cursor();
    }

    fn record(&mut self, result: anyhow::Result<()>) {
        match result {
            Ok(()) => self.status = None,
            Err(e) => {
                tracing::warn!(error = %e, "table change not persisted");
                self.status = Some(e.to_string());
            }
        }
    }

    // Chat scrolling
    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    /// Scroll chat so the latest turn (or the loading indicator) is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;

        for msg in self.session.messages() {
            total_lines += 1; // Role line
            for line in msg.content.lines() {
                // Display width, so wide CJK glyphs count double
                let width = Line::from(line).width();
                total_lines += width.div_ceil(wrap_width).max(1);
            }
            total_lines += 1; // Blank line after message
        }

        if self.session.is_awaiting() {
            total_lines += 2;
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chailv_core::tables::{PRESET_REGION_DATA, PRESET_STANDARD_DATA};
    use chailv_core::TableStore;
    use tempfile::TempDir;

    fn test_app() -> (App, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let tables = PolicyTables::load(TableStore::new(dir.path()));
        (App::new(RelayClient::new("http://127.0.0.1:1"), tables), dir)
    }

    #[test]
    fn test_table_edits_are_persisted() {
        let (mut app, dir) = test_app();
        app.toggle_settings();
        app.table_insert('新');
        app.table_insert('\n');

        let reloaded = PolicyTables::load(TableStore::new(dir.path()));
        assert_eq!(
            reloaded.get(TableKind::Region),
            format!("新\n{}", PRESET_REGION_DATA)
        );
        assert_eq!(app.settings.cursor, 2);
    }

    #[test]
    fn test_backspace_at_start_does_not_write() {
        let (mut app, dir) = test_app();
        app.table_backspace();
        let store = TableStore::new(dir.path());
        assert!(!store.contains(TableKind::Region.key()));
    }

    #[test]
    fn test_reset_needs_confirmation() {
        let (mut app, dir) = test_app();
        app.switch_table();
        app.table_insert('!');
        app.request_reset();
        app.cancel_reset();
        assert!(app.tables.get(TableKind::Standard).starts_with('!'));

        app.request_reset();
        assert!(app.settings.confirm_reset);
        app.confirm_reset();

        assert!(!app.settings.confirm_reset);
        assert_eq!(app.tables.get(TableKind::Standard), PRESET_STANDARD_DATA);
        assert!(!TableStore::new(dir.path()).contains(TableKind::Standard.key()));
    }

    #[tokio::test]
    async fn test_send_blank_input_spawns_nothing() {
        let (mut app, _dir) = test_app();
        app.session.input = "   ".to_string();
        app.send_query();
        assert!(app.query_task.is_none());
        assert_eq!(app.session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_request_clears_awaiting() {
        let (mut app, _dir) = test_app();
        app.session.input = "去上海出差标准是多少？".to_string();
        app.input_end();
        app.send_query();
        assert!(app.session.is_awaiting());
        assert_eq!(app.input_cursor, 0);

        // Second send while awaiting is ignored
        app.session.input = "again".to_string();
        app.send_query();
        assert_eq!(app.session.messages().len(), 2);

        while app.session.is_awaiting() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            app.poll_query().await;
        }

        assert!(app.query_task.is_none());
        assert_eq!(
            app.session.messages().last().map(|m| m.content.as_str()),
            Some(chailv_core::state::FAILURE_MESSAGE)
        );
    }

    #[test]
    fn test_failed_write_is_reported_and_edit_kept() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let tables = PolicyTables::load(TableStore::new(&blocker));
        let mut app = App::new(RelayClient::new("http://127.0.0.1:1"), tables);

        app.table_insert('a');
        app.table_insert('b');

        assert!(app.status.is_some());
        assert!(app.tables.get(TableKind::Region).starts_with("ab"));
        assert_eq!(app.settings.cursor, 2);
    }

    #[test]
    fn test_scroll_counts_exact_width_as_one_row() {
        let (mut app, _dir) = test_app();
        app.chat_width = 10;
        app.chat_height = 1;
        let greeting_rows = app
            .session
            .messages()
            .iter()
            .map(|m| {
                2 + m
                    .content
                    .lines()
                    .map(|l| Line::from(l).width().div_ceil(10).max(1))
                    .sum::<usize>()
            })
            .sum::<usize>();

        // Ten ASCII cells, or five wide glyphs, fill a row exactly
        app.session.input = "0123456789".to_string();
        app.session.submit();
        app.session.resolve(Ok("上海北京天".to_string()));
        app.scroll_chat_to_bottom();

        // Each turn: role + 1 + blank
        let expected = greeting_rows + 3 + 3 - 1;
        assert_eq!(app.chat_scroll as usize, expected);
    }

    #[test]
    fn test_scroll_saturates_on_huge_history() {
        let (mut app, _dir) = test_app();
        app.chat_width = 1;
        app.chat_height = 5;
        app.session.input = "x".repeat(200_000);
        app.session.submit();
        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX - 5);
    }
}
