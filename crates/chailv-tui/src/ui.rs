use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use chailv_core::{line_count, ChatRole, TableKind};

use crate::app::App;
use crate::editor;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if app.settings.open {
        let [chat_area, settings_area] = Layout::horizontal([
            Constraint::Percentage(55),
            Constraint::Percentage(45),
        ])
        .areas(body_area);
        render_chat(app, frame, chat_area);
        render_settings(app, frame, settings_area);
    } else {
        render_chat(app, frame, body_area);
    }

    render_footer(app, frame, footer_area);

    if app.settings.confirm_reset {
        render_reset_confirmation(frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" 津药差旅智能助手 ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("● ", Style::default().fg(Color::Green)),
        Span::styled("DATABASE PRE-LOADED ", Style::default().fg(Color::White)),
        Span::styled(
            format!("{} ", app.relay.base_url()),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = if app.settings.open {
        (" 数据 ", Style::default().bg(Color::Green).fg(Color::Black))
    } else if app.session.is_awaiting() {
        (" 查询中 ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" 咨询 ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let hints = if app.settings.confirm_reset {
        vec![
            Span::styled(" y ", key_style),
            Span::styled(" 确认恢复 ", label_style),
            Span::styled(" 其他键 ", key_style),
            Span::styled(" 取消 ", label_style),
        ]
    } else if app.settings.open {
        vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" 切换表格 ", label_style),
            Span::styled(" Ctrl-R ", key_style),
            Span::styled(" 恢复代码预设数据 ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" 确认修改并返回 ", label_style),
        ]
    } else {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" 发送 ", label_style),
            Span::styled(" ↑/↓ ", key_style),
            Span::styled(" 滚动 ", label_style),
            Span::styled(" Ctrl-S ", key_style),
            Span::styled(" 查看/更新数据库 ", label_style),
            Span::styled(" Ctrl-C ", key_style),
            Span::styled(" 退出 ", label_style),
        ]
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];
    spans.extend(hints);
    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!(" 保存失败: {} ", status),
            Style::default().bg(Color::Red).fg(Color::White),
        ));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" 对话 ");

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.session.messages() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.session.is_awaiting() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("查询政策中{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    // Dim border while the send control is disabled
    let border_color = if app.session.can_send() {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let title = if app.session.is_awaiting() {
        " 请输入您的咨询... (查询中，暂不可发送) "
    } else {
        " 请输入您的咨询... "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let before_cursor: String = app.session.input.chars().take(app.input_cursor).collect();
    let cursor_width = Line::from(before_cursor.as_str()).width();
    let scroll_offset = if inner_width == 0 || cursor_width < inner_width {
        0
    } else {
        cursor_width - inner_width + 1
    };

    let input = Paragraph::new(app.session.input.as_str())
        .style(Style::default().fg(Color::Cyan))
        .scroll((0, scroll_offset as u16))
        .block(input_block);
    frame.render_widget(input, area);

    if !app.settings.open {
        frame.set_cursor_position((
            area.x + (cursor_width - scroll_offset) as u16 + 1,
            area.y + 1,
        ));
    }
}

fn render_settings(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
        .title(" 数据预设与更新 ")
        .title_bottom(" 您可以临时修改或恢复默认值 ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [region_area, standard_area] = Layout::vertical([
        Constraint::Percentage(40),
        Constraint::Percentage(60),
    ])
    .areas(inner);

    render_table_editor(app, frame, region_area, TableKind::Region, Color::Blue);
    render_table_editor(app, frame, standard_area, TableKind::Standard, Color::Green);
}

fn render_table_editor(app: &App, frame: &mut Frame, area: Rect, kind: TableKind, accent: Color) {
    let text = app.tables.get(kind);
    let focused = app.settings.focus == kind;
    let border_color = if focused { accent } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Line::from(vec![
            Span::styled(format!(" {} ", kind.display_name()), Style::default().bold()),
            Span::styled(format!("{} 行 ", line_count(text)), Style::default().fg(accent)),
        ]));
    let inner_height = area.height.saturating_sub(2) as usize;
    let inner_width = area.width.saturating_sub(2) as usize;

    // Keep the cursor line in view; lines are not wrapped so columns stay exact
    let (line, col) = if focused {
        editor::line_col(text, app.settings.cursor)
    } else {
        (0, 0)
    };
    let scroll = if inner_height == 0 {
        0
    } else {
        line.saturating_sub(inner_height - 1)
    };

    // Shift every row left by whole glyphs of the cursor line until the
    // cursor fits inside the box
    let current_line = text.split('\n').nth(line).unwrap_or_default();
    let prefix: String = current_line.chars().take(col).collect();
    let cursor_width = cell_width(&prefix);
    let overflow = if inner_width == 0 || cursor_width < inner_width {
        0
    } else {
        cursor_width - inner_width + 1
    };
    let mut shift = 0;
    for c in prefix.chars() {
        if shift >= overflow {
            break;
        }
        shift += char_width(c);
    }

    let visible: Vec<Line> = text
        .split('\n')
        .map(|row| Line::from(skip_cells(row, shift)))
        .collect();
    let editor_widget = Paragraph::new(Text::from(visible))
        .style(Style::default().fg(Color::White))
        .scroll((scroll as u16, 0))
        .block(block);
    frame.render_widget(editor_widget, area);

    if focused && !app.settings.confirm_reset {
        let x = (cursor_width - shift) as u16;
        let y = (line - scroll) as u16;
        frame.set_cursor_position((area.x + 1 + x, area.y + 1 + y));
    }
}

fn cell_width(s: &str) -> usize {
    Line::from(s).width()
}

fn char_width(c: char) -> usize {
    cell_width(c.encode_utf8(&mut [0; 4]))
}

/// Drop the first `cells` display cells of a row. A wide glyph cut in half
/// becomes a space so columns stay aligned with the cursor row.
fn skip_cells(row: &str, cells: usize) -> String {
    let mut skipped = 0;
    let mut chars = row.chars();
    while skipped < cells {
        match chars.next() {
            Some(c) => skipped += char_width(c),
            None => return String::new(),
        }
    }
    format!("{}{}", " ".repeat(skipped - cells), chars.as_str())
}

fn render_reset_confirmation(frame: &mut Frame, area: Rect) {
    let popup_width = 44.min(area.width.saturating_sub(4));
    let popup_height = 5;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" 恢复默认 ");

    let body = Paragraph::new(vec![
        Line::from("确定要恢复到代码预设的初始数据吗？"),
        Line::default(),
        Line::from(Span::styled("y 确认 / 其他键取消", Style::default().fg(Color::DarkGray))),
    ])
    .block(block);
    frame.render_widget(body, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chailv_core::{PolicyTables, RelayClient, TableStore};
    use ratatui::{backend::TestBackend, Terminal};

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_markdown_bold_is_styled() {
        let line = parse_markdown_line("- **住宿标准**：550元/天");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "住宿标准");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(plain(&line), "- 住宿标准：550元/天");
    }

    #[test]
    fn test_unclosed_bold_is_literal() {
        let line = parse_markdown_line("**未闭合");
        assert_eq!(plain(&line), "**未闭合");
    }

    #[test]
    fn test_empty_line() {
        assert!(parse_markdown_line("").spans.is_empty());
    }

    #[test]
    fn test_skip_cells_pads_split_glyph() {
        assert_eq!(skip_cells("ab上海", 2), "上海");
        assert_eq!(skip_cells("上海,1", 1), " 海,1");
        assert_eq!(skip_cells("ab", 5), "");
        assert_eq!(skip_cells("上海", 0), "上海");
    }

    #[test]
    fn test_table_editor_scrolls_to_cursor_at_row_end() {
        let dir = tempfile::tempdir().unwrap();
        let tables = PolicyTables::load(TableStore::new(dir.path()));
        let mut app = App::new(RelayClient::new("http://127.0.0.1:1"), tables);
        app.toggle_settings();
        app.switch_table();
        app.table_down();
        app.table_down();
        app.table_end();
        let row = app.focused_table().split('\n').nth(2).unwrap().to_string();
        assert!(row.ends_with("超标部分自理"));
        assert!(cell_width(&row) > 60);

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let cursor = terminal.get_cursor_position().unwrap();
        assert!(cursor.x < 119);
        let buffer = terminal.backend().buffer();
        assert_eq!(buffer[(cursor.x - 2, cursor.y)].symbol(), "理");
        assert_eq!(buffer[(cursor.x - 4, cursor.y)].symbol(), "自");
        assert_eq!(buffer[(cursor.x, cursor.y)].symbol(), " ");
    }
}
