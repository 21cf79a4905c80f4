use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::App;
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    app.poll_query().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any mode
    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }
    if (ctrl && key.code == KeyCode::Char('s')) || key.code == KeyCode::F(2) {
        app.toggle_settings();
        return;
    }

    if app.settings.confirm_reset {
        handle_reset_confirmation(app, key);
    } else if app.settings.open {
        handle_settings(app, key, ctrl);
    } else {
        handle_chat(app, key);
    }
}

fn handle_reset_confirmation(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_reset(),
        _ => app.cancel_reset(),
    }
}

fn handle_settings(app: &mut App, key: KeyEvent, ctrl: bool) {
    match key.code {
        KeyCode::Esc => app.close_settings(),
        KeyCode::Tab | KeyCode::BackTab => app.switch_table(),
        KeyCode::Char('r') if ctrl => app.request_reset(),

        KeyCode::Enter => app.table_insert('\n'),
        KeyCode::Backspace => app.table_backspace(),
        KeyCode::Delete => app.table_delete(),
        KeyCode::Left => app.table_left(),
        KeyCode::Right => app.table_right(),
        KeyCode::Up => app.table_up(),
        KeyCode::Down => app.table_down(),
        KeyCode::Home => app.table_home(),
        KeyCode::End => app.table_end(),
        KeyCode::Char(c) if !ctrl => app.table_insert(c),
        _ => {}
    }
}

fn handle_chat(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            if app.session.input.is_empty() {
                app.should_quit = true;
            } else {
                app.session.input.clear();
                app.input_cursor = 0;
            }
        }
        KeyCode::Enter => app.send_query(),
        KeyCode::Backspace => app.input_backspace(),
        KeyCode::Delete => app.input_delete(),
        KeyCode::Left => app.input_left(),
        KeyCode::Right => app.input_right(),
        KeyCode::Home => app.input_home(),
        KeyCode::End => app.input_end(),
        KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::PageUp => app.scroll_chat_up(app.chat_height.max(1)),
        KeyCode::PageDown => app.scroll_chat_down(app.chat_height.max(1)),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.input_insert(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_chat_down(3),
        MouseEventKind::ScrollUp => app.scroll_chat_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chailv_core::{PolicyTables, RelayClient, TableKind, TableStore};
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn test_app(dir: &std::path::Path) -> App {
        let tables = PolicyTables::load(TableStore::new(dir));
        App::new(RelayClient::new("http://127.0.0.1:1"), tables)
    }

    #[test]
    fn test_typing_goes_to_chat_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        for c in "去上海".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        assert_eq!(app.session.input, "去上海");
        assert_eq!(app.input_cursor, 3);
    }

    #[test]
    fn test_settings_panel_captures_typing() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        handle_key(&mut app, ctrl('s'));
        assert!(app.settings.open);

        handle_key(&mut app, key(KeyCode::Tab));
        handle_key(&mut app, key(KeyCode::Char('#')));
        assert!(app.session.input.is_empty());
        assert!(app.tables.get(TableKind::Standard).starts_with('#'));

        handle_key(&mut app, key(KeyCode::Esc));
        assert!(!app.settings.open);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_reset_flow_requires_y() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        handle_key(&mut app, key(KeyCode::F(2)));
        handle_key(&mut app, key(KeyCode::Char('x')));
        handle_key(&mut app, ctrl('r'));
        assert!(app.settings.confirm_reset);

        handle_key(&mut app, key(KeyCode::Char('n')));
        assert!(!app.settings.confirm_reset);
        assert!(app.tables.get(TableKind::Region).starts_with('x'));

        handle_key(&mut app, ctrl('r'));
        handle_key(&mut app, key(KeyCode::Char('y')));
        assert_eq!(app.tables.get(TableKind::Region), TableKind::Region.preset());
    }

    #[test]
    fn test_esc_quits_only_with_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        handle_key(&mut app, key(KeyCode::Char('a')));
        handle_key(&mut app, key(KeyCode::Esc));
        assert!(!app.should_quit);
        assert!(app.session.input.is_empty());

        handle_key(&mut app, key(KeyCode::Esc));
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.toggle_settings();
        let mut event = ctrl('c');
        event.kind = KeyEventKind::Press;
        handle_key(&mut app, event);
        assert!(app.should_quit);
    }
}
