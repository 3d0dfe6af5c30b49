// Terminal dashboard for the cart-pole simulator
use crate::{CartPoleSim, Direction, Gains, SimState};
use anyhow::Result;
use cartpole_core::{ErrorTrace, GainSlider};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Line as CanvasLine, Rectangle},
        Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph,
    },
    Frame, Terminal,
};
use std::io::stdout;
use std::time::{Duration, Instant};
use tracing::debug;

/// Run the interactive dashboard until the user quits
pub fn run(mut sim: CartPoleSim) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut sim, &mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend>(sim: &mut CartPoleSim, terminal: &mut Terminal<B>) -> Result<()> {
    let tick_rate = Duration::from_secs_f64(sim.world().tick_ms() / 1000.0);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| draw_ui(f, sim))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !handle_key(sim, key.code)? {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            sim.step()?;
            last_tick = Instant::now();
        }
    }
}

/// Apply one key press; returns `false` when the dashboard should close
pub fn handle_key(sim: &mut CartPoleSim, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(false),
        KeyCode::Left => sim.push(Direction::Left)?,
        KeyCode::Right => sim.push(Direction::Right)?,
        KeyCode::Char('r') | KeyCode::Char('R') => sim.reset(),
        KeyCode::Char('p') | KeyCode::Char('P') | KeyCode::Char(' ') => sim.toggle_pause(),
        KeyCode::Char(c @ ('k' | 'K' | 'd' | 'D')) => {
            let steps = if c.is_ascii_uppercase() { 1 } else { -1 };
            match sim.gains_mut().sliders_mut() {
                Some(sliders) if c.eq_ignore_ascii_case(&'k') => sliders.kp.nudge(steps),
                Some(sliders) => sliders.kd.nudge(steps),
                None => debug!("Gains are fixed; ignoring slider key"),
            }
        }
        _ => {}
    }
    Ok(true)
}

fn draw_ui(f: &mut Frame, sim: &CartPoleSim) {
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3),      // Status
            Constraint::Percentage(50), // Scene
            Constraint::Min(8),         // Error chart
            Constraint::Length(3),      // Gains
            Constraint::Length(1),      // Footer
        ])
        .split(f.size());

    draw_status(f, sim, chunks[0]);
    draw_scene(f, sim, chunks[1]);
    draw_error_chart(f, sim.trace(), chunks[2]);
    draw_gains(f, sim.gains(), chunks[3]);
    draw_footer(f, chunks[4]);
}

fn draw_status(f: &mut Frame, sim: &CartPoleSim, area: Rect) {
    let (state, color) = match sim.state() {
        SimState::Running => ("RUNNING", Color::Green),
        SimState::Paused => ("PAUSED", Color::Yellow),
        SimState::Stopped => ("STOPPED", Color::Red),
    };

    let mut spans = vec![
        Span::styled(
            state,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "  tick {}  t {:.1}s",
            sim.tick(),
            sim.elapsed_ms() / 1000.0
        )),
    ];
    if let Some(out) = sim.last_output() {
        spans.push(Span::raw(format!(
            "  error {:+.4} rad  force {:+.5}",
            out.error, out.output
        )));
    }

    let status = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(" Cart-Pole ")
            .borders(Borders::ALL),
    );
    f.render_widget(status, area);
}

fn draw_scene(f: &mut Frame, sim: &CartPoleSim, area: Rect) {
    let world = sim.world().world_config().clone();
    let pendulum = sim.world().pendulum_config().clone();
    let positions = sim.positions();

    // Scene y grows downward; the canvas y grows upward
    let height = world.height;
    let flip = move |y: f64| height - y;

    let canvas = Canvas::default()
        .block(Block::default().title(" Scene ").borders(Borders::ALL))
        .marker(symbols::Marker::Braille)
        .x_bounds([0.0, world.width])
        .y_bounds([0.0, world.height])
        .paint(move |ctx| {
            ctx.draw(&CanvasLine {
                x1: 0.0,
                y1: world.wall_thickness,
                x2: world.width,
                y2: world.wall_thickness,
                color: Color::Gray,
            });

            if let Some((cart, bob)) = positions {
                let [w, h] = pendulum.cart_size;
                ctx.draw(&Rectangle {
                    x: cart.x - w / 2.0,
                    y: flip(cart.y) - h / 2.0,
                    width: w,
                    height: h,
                    color: Color::Cyan,
                });
                ctx.draw(&CanvasLine {
                    x1: cart.x,
                    y1: flip(cart.y),
                    x2: bob.x,
                    y2: flip(bob.y),
                    color: Color::White,
                });
                ctx.draw(&Circle {
                    x: bob.x,
                    y: flip(bob.y),
                    radius: pendulum.bob_radius,
                    color: Color::Red,
                });
            }
        });
    f.render_widget(canvas, area);
}

fn draw_error_chart(f: &mut Frame, trace: &ErrorTrace, area: Rect) {
    let points = trace.points();
    let [y_min, y_max] = ErrorTrace::Y_RANGE;
    let x_max = trace.capacity() as f64;

    let datasets = vec![Dataset::default()
        .name("error")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Yellow))
        .data(&points)];

    let chart = Chart::new(datasets)
        .block(Block::default().title(" Error (rad) ").borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .labels(vec![
                    Span::raw(format!("{:.1}", y_min)),
                    Span::raw("0"),
                    Span::raw(format!("{:.1}", y_max)),
                ])
                .bounds([y_min, y_max]),
        );
    f.render_widget(chart, area);
}

fn draw_gains(f: &mut Frame, gains: &Gains, area: Rect) {
    match gains {
        Gains::Sliders(sliders) => {
            let chunks = Layout::default()
                .direction(LayoutDirection::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(area);
            f.render_widget(slider_gauge(&sliders.kp, Color::Magenta), chunks[0]);
            f.render_widget(slider_gauge(&sliders.kd, Color::Blue), chunks[1]);
        }
        Gains::Fixed(fixed) => {
            let text = format!("Kp {:.3}  Kd {:.3} (fixed)", fixed.kp, fixed.kd);
            let paragraph = Paragraph::new(text)
                .block(Block::default().title(" Gains ").borders(Borders::ALL));
            f.render_widget(paragraph, area);
        }
    }
}

fn slider_gauge(slider: &GainSlider, color: Color) -> Gauge<'static> {
    let (min, max) = slider.bounds();
    Gauge::default()
        .block(
            Block::default()
                .title(format!(" {} [{:.3}, {:.3}] ", slider.name(), min, max))
                .borders(Borders::ALL),
        )
        .gauge_style(Style::default().fg(color))
        .ratio(slider.ratio())
        .label(format!("{:.3}", slider.value()))
}

fn draw_footer(f: &mut Frame, area: Rect) {
    let footer = Paragraph::new(
        "←/→ push  r reset  p pause  k/K Kp -/+  d/D Kd -/+  q quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, area);
}
