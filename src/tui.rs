//! Terminal dashboard (`tui-support` feature).

use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs};
use ratatui::{prelude::CrosstermBackend, Terminal};
use tracing::{error, info};

use dept_checkout::engine::catalog::filter_resources;
use dept_checkout::engine::catalog::ResourceQuery;
use dept_checkout::engine::classifier::{classify, ReturnsReport, Severity};
use dept_checkout::engine::ordering::{filter_and_sort, RequestFilter};
use dept_checkout::engine::stats::DashboardStats;
use dept_checkout::models::request::{Request, RequestTransition};
use dept_checkout::models::resource::Resource;
use dept_checkout::utils::notification::{route, FeedSnapshot, NotificationFeed};
use dept_checkout::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Dashboard,
    Resources,
    Requests,
    Returns,
    Notifications,
}

impl Tab {
    const ALL: [Tab; 5] = [Tab::Dashboard, Tab::Resources, Tab::Requests, Tab::Returns, Tab::Notifications];

    fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "1 Dashboard",
            Tab::Resources => "2 Resources",
            Tab::Requests => "3 Requests",
            Tab::Returns => "4 Returns",
            Tab::Notifications => "5 Notifications",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|t| t == self).unwrap_or(0)
    }
}

struct Screen {
    tab: Tab,
    filter: RequestFilter,
    stats: DashboardStats,
    resources: Vec<Resource>,
    requests: Vec<Request>,
    report: ReturnsReport,
    list: ListState,
    status: String,
}

impl Screen {
    fn new() -> Self {
        Self {
            tab: Tab::Dashboard,
            filter: RequestFilter::All,
            stats: DashboardStats::default(),
            resources: Vec::new(),
            requests: Vec::new(),
            report: ReturnsReport::default(),
            list: ListState::default().with_selected(Some(0)),
            status: "Loading...".to_string(),
        }
    }

    async fn reload(&mut self, state: &AppState) {
        match state.overview().await {
            Ok(overview) => {
                self.resources = overview.resources;
                self.requests = overview.requests;
                self.stats = overview.stats;
                self.report = overview.report;
                self.status = format!("Updated {}", Utc::now().format("%H:%M:%S"));
            }
            Err(e) => {
                error!("Dashboard reload failed: {}", e);
                self.status = e.to_string();
            }
        }
    }

    fn visible_requests(&self, viewer: dept_checkout::models::user::Role) -> Vec<Request> {
        filter_and_sort(&self.requests, self.filter, viewer, Utc::now())
    }

    fn move_selection(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.list.select(Some(0));
            return;
        }
        let current = self.list.selected().unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len as isize) as usize;
        self.list.select(Some(next));
    }

    fn switch(&mut self, tab: Tab) {
        self.tab = tab;
        self.list.select(Some(0));
    }
}

fn severity_color(severity: Option<Severity>) -> Color {
    match severity {
        Some(Severity::High) => Color::Red,
        Some(Severity::Medium) => Color::Yellow,
        Some(Severity::Low) => Color::Green,
        None => Color::Gray,
    }
}

async fn transition_selected(screen: &mut Screen, state: &AppState, transition: RequestTransition) {
    let visible = screen.visible_requests(state.role());
    let Some(request) = screen.list.selected().and_then(|i| visible.get(i)) else {
        return;
    };
    match state.apply_transition(&request.id, &transition).await {
        Ok(requests) => {
            info!("Request {} moved to {}", request.id, transition.target());
            screen.status = format!("{} is now {}", request.resource_name(), transition.target());
            screen.requests = requests;
        }
        Err(e) => screen.status = e.to_string(),
    }
}

pub async fn run(state: &mut AppState) -> Result<()> {
    state.require_session()?;

    let feed = NotificationFeed::spawn(Arc::new(state.client.clone()), state.config.poll_interval);
    let mut screen = Screen::new();
    screen.reload(state).await;

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, cursor::Hide)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(out))?;

    let result = event_loop(&mut terminal, &mut screen, state, &feed).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;
    feed.shutdown().await;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    screen: &mut Screen,
    state: &AppState,
    feed: &NotificationFeed,
) -> Result<()> {
    loop {
        let notifications = feed.snapshot();
        draw(terminal, screen, state, &notifications)?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let len = match screen.tab {
            Tab::Dashboard => screen.stats.recent.len(),
            Tab::Resources => screen.resources.len(),
            Tab::Requests => screen.visible_requests(state.role()).len(),
            Tab::Returns => screen.report.overdue.len() + screen.report.due.len(),
            Tab::Notifications => notifications.notifications.len(),
        };

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => break,
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                screen.switch(Tab::ALL[idx]);
            }
            KeyCode::Tab => screen.switch(Tab::ALL[(screen.tab.index() + 1) % Tab::ALL.len()]),
            KeyCode::Down | KeyCode::Char('j') => screen.move_selection(1, len),
            KeyCode::Up | KeyCode::Char('k') => screen.move_selection(-1, len),
            KeyCode::Char('r') => {
                screen.reload(state).await;
                feed.refresh_now();
            }
            KeyCode::Char('f') if screen.tab == Tab::Requests => {
                screen.filter = screen.filter.next();
                screen.list.select(Some(0));
            }
            KeyCode::Char('a') if screen.tab == Tab::Requests => {
                transition_selected(screen, state, RequestTransition::Approve).await;
            }
            KeyCode::Char('x') if screen.tab == Tab::Requests => {
                transition_selected(screen, state, RequestTransition::RequestReturn).await;
            }
            KeyCode::Char('c') if screen.tab == Tab::Requests => {
                transition_selected(screen, state, RequestTransition::ConfirmReturn).await;
            }
            KeyCode::Char('d') if screen.tab == Tab::Requests => {
                screen.status = "Deny from the CLI: dept-checkout deny <id> --reason \"...\"".to_string();
            }
            KeyCode::Char('m') if screen.tab == Tab::Notifications => {
                match state.client.mark_all_notifications_read().await {
                    Ok(_) => feed.refresh_now(),
                    Err(e) => screen.status = e.to_string(),
                }
            }
            KeyCode::Enter if screen.tab == Tab::Notifications => {
                let selected = screen
                    .list
                    .selected()
                    .and_then(|i| notifications.notifications.get(i));
                if let Some(notification) = selected {
                    if let Err(e) = state.client.mark_notification_read(&notification.id).await {
                        screen.status = e.to_string();
                    }
                    feed.refresh_now();
                    screen.filter = route(notification.kind);
                    screen.switch(Tab::Requests);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn draw(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    screen: &mut Screen,
    state: &AppState,
    feed: &FeedSnapshot,
) -> Result<()> {
    let now = Utc::now();
    let viewer = state.role();
    let who = state
        .session
        .as_ref()
        .map(|s| format!("{} ({})", s.name(), s.role()))
        .unwrap_or_default();

    let items: Vec<ListItem> = match screen.tab {
        Tab::Dashboard => screen
            .stats
            .recent
            .iter()
            .map(|r| ListItem::new(format!("{:<24} {:<16} {}", r.resource_name(), r.status, r.requester_name())))
            .collect(),
        Tab::Resources => filter_resources(&screen.resources, &ResourceQuery::default())
            .into_iter()
            .map(|r| {
                ListItem::new(format!(
                    "{:<28} {:<16} {:>3}/{:<3} {}",
                    r.name, r.category, r.available_quantity, r.quantity, r.status
                ))
            })
            .collect(),
        Tab::Requests => screen
            .visible_requests(viewer)
            .iter()
            .map(|r| {
                let c = classify(r, now);
                let style = Style::default().fg(severity_color(c.severity()));
                let due = if c.is_overdue || c.severity().is_some() { c.days_text() } else { String::new() };
                ListItem::new(format!(
                    "{:<24} {:<18} x{:<3} {:<16} {:<9} {}",
                    r.resource_name(),
                    r.requester_name(),
                    r.quantity,
                    r.status,
                    r.priority.map_or("-".to_string(), |p| p.to_string()),
                    due
                ))
                .style(style)
            })
            .collect(),
        Tab::Returns => screen
            .report
            .overdue
            .iter()
            .chain(screen.report.due.iter())
            .map(|row| {
                ListItem::new(format!(
                    "{:<24} {:<18} {}",
                    row.request.resource_name(),
                    row.request.requester_name(),
                    row.classification.days_text()
                ))
                .style(Style::default().fg(severity_color(row.severity)))
            })
            .collect(),
        Tab::Notifications => feed
            .notifications
            .iter()
            .map(|n| {
                let style = if n.read {
                    Style::default().fg(Color::Gray)
                } else {
                    Style::default().add_modifier(Modifier::BOLD)
                };
                ListItem::new(format!("{} - {}", n.title, n.message)).style(style)
            })
            .collect(),
    };

    let list_title = match screen.tab {
        Tab::Requests => format!("Requests [{}] (f filter, a approve, x return, c confirm)", screen.filter),
        Tab::Notifications => "Notifications (Enter open, m mark all read)".to_string(),
        Tab::Dashboard => "Recent requests".to_string(),
        Tab::Resources => "Resources".to_string(),
        Tab::Returns => "Overdue and due soon".to_string(),
    };

    let summary = format!(
        "{}  |  Resources {}  Mine {}  Pending {}  Approved {}  Overdue {}  Due {}  |  Unread {}",
        who,
        screen.stats.total_resources,
        screen.stats.my_requests,
        screen.stats.pending,
        screen.stats.approved,
        screen.stats.overdue,
        screen.stats.due,
        feed.unread,
    );
    let status = match &feed.last_error {
        Some(e) => format!("{}  |  notifications: {}", screen.status, e),
        None => screen.status.clone(),
    };

    terminal.draw(|frame| {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // tabs
                Constraint::Length(3), // summary
                Constraint::Min(5),    // list
                Constraint::Length(3), // status
            ])
            .split(frame.area());

        let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()).collect::<Vec<_>>())
            .select(screen.tab.index())
            .block(Block::default().title("Department Checkout").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, layout[0]);

        frame.render_widget(
            Paragraph::new(summary).block(Block::default().borders(Borders::ALL)),
            layout[1],
        );

        let list = List::new(items)
            .block(Block::default().title(list_title).borders(Borders::ALL))
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, layout[2], &mut screen.list);

        frame.render_widget(
            Paragraph::new(status).block(Block::default().title("q quit, r reload, Tab switch").borders(Borders::ALL)),
            layout[3],
        );
    })?;

    Ok(())
}
