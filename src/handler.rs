use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, Mode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // A notice blocks everything else until dismissed
    if app.notice.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.dismiss_notice();
        }
        return;
    }

    match app.mode {
        Mode::AwaitingDocument => handle_upload_key(app, key),
        Mode::Chatting => handle_chat_key(app, key),
    }
}

fn handle_upload_key(app: &mut App, key: KeyEvent) {
    // The drop zone is disabled while an upload is in flight
    if app.is_uploading() {
        return;
    }

    match key.code {
        KeyCode::Enter => {
            if app.path_input.trim().is_empty() {
                app.confirm_upload();
            } else {
                let path = app.path_input.clone();
                if app.select_file(&path) {
                    app.path_input.clear();
                    app.path_cursor = 0;
                }
            }
        }
        KeyCode::Esc => {
            app.path_input.clear();
            app.path_cursor = 0;
        }
        _ => edit_line(&mut app.path_input, &mut app.path_cursor, key),
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.switch_document();
            return;
        }
        KeyCode::PageUp => {
            app.scroll_up(app.chat_height.max(2) / 2);
            return;
        }
        KeyCode::PageDown => {
            app.scroll_down(app.chat_height.max(2) / 2);
            return;
        }
        KeyCode::Up => {
            app.scroll_up(1);
            return;
        }
        KeyCode::Down => {
            app.scroll_down(1);
            return;
        }
        _ => {}
    }

    // Input is disabled while the brain is thinking
    if app.is_thinking() {
        return;
    }

    match key.code {
        KeyCode::Enter => {
            let query = app.query_input.clone();
            if app.submit_query(&query) {
                app.query_input.clear();
                app.query_cursor = 0;
            }
        }
        KeyCode::Esc => {
            app.query_input.clear();
            app.query_cursor = 0;
        }
        _ => edit_line(&mut app.query_input, &mut app.query_cursor, key),
    }
}

/// Single-line editing shared by the path and question inputs.
fn edit_line(input: &mut String, cursor: &mut usize, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = input.chars().count();
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = input.chars().count();
            *cursor = (*cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = input.chars().count();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let byte_pos = char_to_byte_index(input, *cursor);
            input.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.notice.is_some() {
        return;
    }

    match app.mode {
        // Dropping a file onto the terminal pastes its path
        Mode::AwaitingDocument => {
            app.drop_file(text);
        }
        Mode::Chatting if !app.is_thinking() => {
            let flattened = text.replace(['\r', '\n'], " ");
            let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
            app.query_input.insert_str(byte_pos, &flattened);
            app.query_cursor += flattened.chars().count();
        }
        Mode::Chatting => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) if app.mode == Mode::AwaitingDocument => {
            let inside = app
                .drop_zone_area
                .map(|r| point_in_rect(mouse.column, mouse.row, r))
                .unwrap_or(false);
            app.drag_over(inside);
        }
        MouseEventKind::ScrollDown if app.mode == Mode::Chatting => app.scroll_down(3),
        MouseEventKind::ScrollUp if app.mode == Mode::Chatting => app.scroll_up(3),
        _ => {}
    }
}
