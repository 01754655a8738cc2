use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use crate::app::{App, Mode};
use crate::message::Role;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            // Consume the second *
            chars.next();

            // Push any accumulated plain text
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

    match app.mode {
        Mode::AwaitingDocument => render_upload_screen(app, frame, body_area),
        Mode::Chatting => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if let Some(notice) = &app.notice {
        render_notice(notice, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" DocuMind ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("AI-Powered Document Intelligence ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!("[{}]", app.backend_url), Style::default().fg(Color::DarkGray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.mode {
        Mode::AwaitingDocument => Style::default().bg(Color::Blue).fg(Color::White),
        Mode::Chatting => Style::default().bg(Color::Green).fg(Color::Black),
    };
    let mode_text = match app.mode {
        Mode::AwaitingDocument => " UPLOAD ",
        Mode::Chatting => " CHAT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = if app.notice.is_some() {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" dismiss ", label_style),
        ]
    } else {
        let ready_to_upload = app.candidate().is_some() && app.path_input.is_empty();
        match app.mode {
            Mode::AwaitingDocument if ready_to_upload => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" upload & analyze ", label_style),
                Span::styled(" drop/type ", key_style),
                Span::styled(" pick another ", label_style),
            ],
            Mode::AwaitingDocument => vec![
                Span::styled(" drop ", key_style),
                Span::styled(" PDF onto terminal ", label_style),
                Span::styled(" Enter ", key_style),
                Span::styled(" select typed path ", label_style),
            ],
            Mode::Chatting => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" PgUp/PgDn ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" Ctrl+O ", key_style),
                Span::styled(" different document ", label_style),
            ],
        }
    };
    hints.extend(vec![
        Span::styled(" Ctrl+C ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_upload_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [zone_area, input_area, features_area] = Layout::vertical([
        Constraint::Length(9),
        Constraint::Length(3),
        Constraint::Length(5),
    ])
    .flex(Flex::Center)
    .areas(area);

    let [zone_area] = Layout::horizontal([Constraint::Max(60)])
        .flex(Flex::Center)
        .areas(zone_area);
    let [input_area] = Layout::horizontal([Constraint::Max(60)])
        .flex(Flex::Center)
        .areas(input_area);

    // Store area for mouse hit-testing
    app.drop_zone_area = Some(zone_area);

    let highlighted = app.is_drop_highlighted();
    let border_color = if highlighted { Color::Blue } else { Color::DarkGray };
    let zone_block = Block::default()
        .borders(Borders::ALL)
        .border_type(if highlighted { BorderType::Double } else { BorderType::Rounded })
        .border_style(Style::default().fg(border_color));

    let (icon, title, subtitle) = match app.candidate() {
        Some(file) => ("[✓]", file.name.clone(), "Ready to upload"),
        None => ("[↑]", "Drop PDF here".to_string(), "or type its path below"),
    };

    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(icon, Style::default().fg(Color::Blue).bold())).centered(),
        Line::default(),
        Line::from(Span::styled(title, Style::default().fg(Color::White).bold())).centered(),
        Line::from(Span::styled(subtitle, Style::default().fg(Color::DarkGray))).centered(),
    ];

    if app.is_uploading() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::default());
        lines.push(
            Line::from(Span::styled(
                format!("Uploading & analyzing{}", dots),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
            ))
            .centered(),
        );
    } else if app.candidate().is_some() {
        lines.push(Line::default());
        lines.push(
            Line::from(Span::styled(
                " Enter: Upload & Analyze ",
                Style::default().bg(Color::Blue).fg(Color::White).bold(),
            ))
            .centered(),
        );
    }

    let zone = Paragraph::new(Text::from(lines)).block(zone_block);
    frame.render_widget(zone, zone_area);

    // Path input ("browse")
    let input_color = if app.is_uploading() { Color::DarkGray } else { Color::Yellow };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_color))
        .title(" Path to PDF ");
    render_line_input(
        frame,
        input_area,
        input_block,
        &app.path_input,
        app.path_cursor,
        !app.is_uploading() && app.notice.is_none(),
    );

    render_features(frame, features_area);
}

fn render_features(frame: &mut Frame, area: Rect) {
    let [area] = Layout::horizontal([Constraint::Max(90)])
        .flex(Flex::Center)
        .areas(area);
    let columns = Layout::horizontal([Constraint::Ratio(1, 3); 3]).split(area);

    let features = [
        ("⚡ Instant Analysis", "Vector-based semantic search"),
        ("🎯 Precise Citations", "Always know the source"),
        ("🔒 Secure Local RAG", "Data stays in your control"),
    ];

    for (column, (title, blurb)) in columns.iter().zip(features) {
        let card = Paragraph::new(Text::from(vec![
            Line::from(Span::styled(title, Style::default().fg(Color::White).bold())).centered(),
            Line::from(Span::styled(blurb, Style::default().fg(Color::DarkGray))).centered(),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        frame.render_widget(card, *column);
    }
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    app.drop_zone_area = None;

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Line::from(vec![
            Span::styled(" ● ", Style::default().fg(Color::Green)),
            Span::styled("DocuMind AI ", Style::default().fg(Color::White).bold()),
        ]));

    let chat_text = if app.messages().is_empty() && !app.is_thinking() {
        Text::from(Span::styled(
            "Upload a document to start chatting",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.messages() {
            match msg.role {
                Role::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                Role::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "AI:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
            }

            if msg.sources.is_some() {
                lines.push(Line::from(Span::styled(
                    "Sources:",
                    Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
                )));
                for label in msg.source_labels() {
                    lines.push(Line::from(Span::styled(
                        format!("  [{}]", label),
                        Style::default().fg(Color::LightBlue),
                    )));
                }
            }
            lines.push(Line::default());
        }

        if app.is_thinking() {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    let input_color = if app.is_thinking() { Color::DarkGray } else { Color::Yellow };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_color))
        .title(" Ask a question about your documents... ");
    render_line_input(
        frame,
        input_area,
        input_block,
        &app.query_input,
        app.query_cursor,
        !app.is_thinking() && app.notice.is_none(),
    );
}

/// Single-line input with horizontal scrolling that keeps the cursor visible
fn render_line_input(
    frame: &mut Frame,
    area: Rect,
    block: Block,
    text: &str,
    cursor: usize,
    show_cursor: bool,
) {
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor >= inner_width {
        cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = text
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if show_cursor {
        let cursor_x = (cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_notice(notice: &str, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 5.min(area.height);

    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;

    // Never draw outside the frame on tiny terminals
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height).intersection(area);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Notice ");

    let body = Paragraph::new(Text::from(vec![
        Line::from(notice.to_string()).centered(),
        Line::default(),
        Line::from(Span::styled(
            "Press Enter to continue",
            Style::default().fg(Color::DarkGray),
        ))
        .centered(),
    ]))
    .wrap(Wrap { trim: true })
    .block(block);

    frame.render_widget(body, popup_area);
}
