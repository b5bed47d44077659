/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Popup panels (material, quiz, feedback, results, average score and the
/// two title-menu panels) are drawn over the level at the scale given by
/// `panel::panel_scale`.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use log::debug;

use crate::config::PanelConfig;
use crate::domain::input::InputChannel;
use crate::domain::movement::{Facing, JumpPhase};
use crate::domain::tile::Tile;
use crate::sim::world::{MenuPanel, Phase, WorldState, MENU_ITEMS};
use crate::ui::controls::{self, BUTTON_H};
use crate::ui::panel::{panel_scale, scaled_size};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// gap between rows matches the cell colour on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel used to invalidate the back buffer.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    fn new(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Panel content ──

/// One line of panel text.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelLine {
    pub text: String,
    pub fg: Color,
}

impl PanelLine {
    fn new(text: impl Into<String>, fg: Color) -> Self {
        PanelLine { text: text.into(), fg }
    }

    fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Color::White)
    }
}

/// Title, body and footer of a popup.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelContent {
    pub title: String,
    pub lines: Vec<PanelLine>,
    pub footer: String,
}

const GOLD: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const GREEN: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const RED: Color = Color::Rgb { r: 255, g: 90, b: 90 };
const DIM: Color = Color::DarkGrey;
const PANEL_BG: Color = Color::Rgb { r: 30, g: 34, b: 60 };
const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

/// Widest body line allowed before wrapping.
const PANEL_TEXT_W: usize = 52;

/// Greedy word wrap at `width` chars. Words longer than a line are cut.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = vec![];
    let mut line = String::new();
    for word in text.split_whitespace() {
        let word: String = word.chars().take(width).collect();
        let len = line.chars().count();
        if len > 0 && len + 1 + word.chars().count() > width {
            out.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&word);
    }
    if !line.is_empty() || out.is_empty() {
        out.push(line);
    }
    out
}

fn wrapped(text: &str, fg: Color) -> impl Iterator<Item = PanelLine> + '_ {
    wrap(text, PANEL_TEXT_W).into_iter().map(move |l| PanelLine::new(l, fg))
}

/// Popup for the current phase, or `None` for Title / Playing.
pub fn phase_panel(w: &WorldState) -> Option<PanelContent> {
    match w.phase {
        Phase::Title | Phase::Playing => None,
        Phase::Material => {
            let mut lines: Vec<PanelLine> = vec![];
            for para in &w.material {
                lines.extend(wrapped(para, Color::White));
            }
            lines.push(PanelLine::plain(""));
            lines.push(PanelLine::new(
                format!("{} checkpoint questions on this level", w.session.total_questions()),
                DIM,
            ));
            Some(PanelContent {
                title: w.level_name.clone(),
                lines,
                footer: "Enter: start".into(),
            })
        }
        Phase::Quiz => {
            let q = w.question()?;
            let mut lines: Vec<PanelLine> = vec![];
            if let Some(img) = &q.image {
                lines.push(PanelLine::new(format!("[image: {img}]"), DIM));
            }
            lines.extend(wrapped(&q.prompt, Color::White));
            lines.push(PanelLine::plain(""));
            for (i, answer) in q.answers.iter().enumerate() {
                let selected = i == w.answer_cursor;
                let marker = if selected { '▶' } else { ' ' };
                let fg = if selected { GOLD } else { Color::White };
                lines.push(PanelLine::new(format!("{marker} {}) {answer}", i + 1), fg));
            }
            Some(PanelContent {
                title: format!("Question {} of {}", w.session.answered_count() + 1, w.session.total_questions()),
                lines,
                footer: "1-4 or ↑↓ + Enter: answer".into(),
            })
        }
        Phase::Feedback { correct } => {
            let q = w.question()?;
            let mut lines = vec![];
            if correct {
                lines.push(PanelLine::new(
                    format!("Correct! +{} points", w.session.score_per_correct_answer()),
                    GREEN,
                ));
            } else {
                lines.push(PanelLine::new("Not quite.", RED));
                lines.extend(wrapped(&format!("Correct answer: {}", q.correct_answer()), Color::White));
                if let Some(img) = &q.solution_image {
                    lines.push(PanelLine::new(format!("[solution: {img}]"), DIM));
                }
            }
            lines.push(PanelLine::plain(""));
            lines.push(PanelLine::new(
                format!("Score {} / {}", w.session.score(), w.session.max_score()),
                GOLD,
            ));
            Some(PanelContent {
                title: if correct { "Correct".into() } else { "Wrong".into() },
                lines,
                footer: "Enter: continue".into(),
            })
        }
        Phase::Results => {
            let r = w.last_result?;
            let mut lines = vec![
                PanelLine::plain(format!("Score {} / {}", r.score, r.max_score)),
            ];
            if r.perfect {
                lines.push(PanelLine::plain(""));
                lines.push(PanelLine::new("★ PERFECT SCORE ★", GOLD));
            }
            Some(PanelContent {
                title: format!("Level {} complete", r.level),
                lines,
                footer: "N: next level   M/Esc: main menu".into(),
            })
        }
        Phase::AverageScore => {
            let (rows, mean) = w.average.as_ref()?;
            let mut lines: Vec<PanelLine> = rows
                .iter()
                .map(|(level, score)| PanelLine::plain(format!("Level {level}: {score}")))
                .collect();
            lines.push(PanelLine::plain(""));
            lines.push(PanelLine::new(format!("Average: {mean:.1}"), GOLD));
            Some(PanelContent {
                title: "All levels complete".into(),
                lines,
                footer: "Enter: main menu".into(),
            })
        }
    }
}

/// Side panel of the title menu, if one is open.
pub fn menu_panel(w: &WorldState) -> Option<PanelContent> {
    match w.menu_panel {
        MenuPanel::None => None,
        MenuPanel::Profile => Some(PanelContent {
            title: "Profile".into(),
            lines: w.profile.iter().map(PanelLine::plain).collect(),
            footer: "Enter/Esc: close".into(),
        }),
        MenuPanel::Instructions => Some(PanelContent {
            title: "Instructions".into(),
            lines: [
                "Run right with ←→ or A/D, jump with Space/↑/W.",
                "Release jump early for a short hop.",
                "Each ? checkpoint asks one question.",
                "Answer every question to open the flag ⚑.",
                "Mouse: hold the on-screen LEFT/RIGHT/JUMP buttons.",
                "Gamepad: stick or d-pad to move, A/B/X/Y answer.",
            ]
            .into_iter()
            .flat_map(|l| wrapped(l, Color::White).collect::<Vec<_>>())
            .collect(),
            footer: "Enter/Esc: close".into(),
        }),
    }
}

// ── Renderer ──

/// Each game cell is 2 terminal columns wide.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    panels: PanelConfig,
    channel: InputChannel,
    keyboard_enhanced: bool,
}

impl Renderer {
    pub fn new(panels: PanelConfig, channel: InputChannel) -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            panels,
            channel,
            keyboard_enhanced: false,
        }
    }

    /// Enter the alternate screen. Returns whether the terminal reports
    /// key releases.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            EnableMouseCapture,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.keyboard_enhanced = true;
        }
        debug!("keyboard enhancement: {}", self.keyboard_enhanced);

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(self.keyboard_enhanced)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Terminal size as of the last frame, for controller hit tests.
    pub fn size(&self) -> (u16, u16) {
        (self.term_w as u16, self.term_h as u16)
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // HUD + gap + message bar + controller strip
        let reserved_rows = MAP_ROW + 2 + BUTTON_H as usize + 1;
        let max_view_h = self.term_h.saturating_sub(reserved_rows).max(1);
        world.camera.view_w = self.term_w / CELL_W;
        if world.width > 0 {
            world.camera.view_w = world.camera.view_w.min(world.width);
        }
        world.camera.view_h = if world.height > 0 { max_view_h.min(world.height) } else { max_view_h };

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        if world.phase == Phase::Playing {
            let (cx, cy) = world.body.cell();
            world.camera.follow(cx, cy, world.width, world.height);
        }

        self.front.clear();
        match world.phase {
            Phase::Title => {
                self.compose_title(world);
                if let Some(content) = menu_panel(world) {
                    self.compose_panel(&content, world.panel_tick);
                }
            }
            _ => {
                self.compose_game(world);
                if let Some(content) = phase_panel(world) {
                    self.compose_panel(&content, world.panel_tick);
                }
            }
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colours; ResetColor would fall back to the
        // terminal default and leave line artifacts.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.as_str()))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, w: &WorldState) {
        let buf_w = self.front.width;
        let cam = w.camera.clone();

        let flag = if w.session.all_answered() { "⚑ open" } else { "⚑ locked" };
        let hud = format!(
            " {}   Score {:>3}/{}   Quiz {}/{}   {} ",
            w.level_name,
            w.session.score(),
            w.session.max_score(),
            w.session.answered_count(),
            w.session.total_questions(),
            flag,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        for vy in 0..cam.view_h {
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }
            for vx in 0..cam.view_w {
                let col = vx * CELL_W;
                if col + 1 >= buf_w { break; }
                self.compose_cell(w, cam.x + vx as i32, cam.y + vy as i32, col, row);
            }
        }

        let msg_row = MAP_ROW + cam.view_h + 1;
        if msg_row < self.front.height && !w.message.is_empty() {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), Color::Black, MSG_BG);
        }

        if self.channel == InputChannel::Touch && w.phase == Phase::Playing {
            self.compose_controller();
        }
    }

    fn compose_cell(&mut self, w: &WorldState, gx: i32, gy: i32, col: usize, row: usize) {
        let (px, py) = w.body.cell();
        if (gx, gy) == (px, py) {
            let body = match w.movement.phase() {
                JumpPhase::Jumping | JumpPhase::InFlight => '◆',
                _ if w.movement.horizontal_input() != 0.0 && (w.anim_tick / 3) % 2 == 1 => '○',
                _ => '●',
            };
            let (a, b) = match w.movement.facing() {
                Facing::Left => ('◀', body),
                Facing::Right => (body, '▶'),
            };
            self.front.set(col, row, Cell::new(a, GREEN, Color::Reset));
            self.front.set(col + 1, row, Cell::new(b, GREEN, Color::Reset));
            return;
        }

        if let Some(q) = w.quizzes.iter().find(|q| (q.x as i32, q.y as i32) == (gx, gy)) {
            let (text, fg) = if q.has_fired() {
                ("✓ ", DIM)
            } else if (w.anim_tick / 8) % 2 == 0 {
                ("??", GOLD)
            } else {
                ("??", Color::Rgb { r: 255, g: 150, b: 30 })
            };
            self.front.put_str(col, row, text, fg, Color::Reset);
            return;
        }

        if gx < 0 || gy < 0 || gx as usize >= w.width || gy as usize >= w.height {
            self.front.put_str(col, row, "  ", Color::White, Cell::BASE_BG);
            return;
        }

        let (text, fg, bg) = match w.map().at(gx, gy) {
            Tile::Empty => ("  ", Color::White, Color::Reset),
            Tile::Ground => ("▓▓", Color::Rgb { r: 150, g: 100, b: 50 }, Color::Rgb { r: 90, g: 60, b: 30 }),
            Tile::Platform => ("▀▀", Color::Grey, Color::Reset),
            Tile::Flag if w.session.all_answered() => ("⚑ ", GREEN, Color::Reset),
            Tile::Flag => ("⚑ ", RED, Color::Reset),
        };
        self.front.put_str(col, row, text, fg, bg);
    }

    fn compose_controller(&mut self) {
        let bg = Color::Rgb { r: 50, g: 50, b: 80 };
        for b in controls::layout(self.term_w as u16, self.term_h as u16) {
            for dy in 0..b.h as usize {
                for dx in 0..b.w as usize {
                    self.front.set(b.x as usize + dx, b.y as usize + dy, Cell::new(' ', Color::White, bg));
                }
            }
            let label = b.label();
            let lx = b.x as usize + (b.w as usize).saturating_sub(label.chars().count()) / 2;
            self.front.put_str(lx, b.y as usize + b.h as usize / 2, label, Color::White, bg);
        }
    }

    fn compose_title(&mut self, w: &WorldState) {
        let title = [
            r"   ___        _       ___                          ",
            r"  / _ \ _  _ (_)___  | _ \ _  _  _ _   _ _   ___  _ _ ",
            r" | (_) | || || |_ /  |   /| || || ' \ | ' \ / -_)| '_|",
            r"  \__\_\\_,_||_/__|  |_|_\ \_,_||_||_||_||_|\___||_|  ",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, GOLD, Color::Reset);
        }
        let tagline = "━━━ run · jump · answer ━━━";
        let tx = 2 + title[1].len().saturating_sub(tagline.chars().count()) / 2;
        self.front.put_str(tx, 7, tagline, Color::Rgb { r: 180, g: 140, b: 50 }, Color::Reset);

        let menu_base = 10;
        for (i, item) in MENU_ITEMS.iter().enumerate() {
            let (text, fg) = if i == w.menu_cursor {
                (format!("▶ {item}"), GREEN)
            } else {
                (format!("  {item}"), Color::White)
            };
            self.front.put_str(8, menu_base + i, &text, fg, Color::Reset);
        }
        self.front.put_str(8, menu_base + MENU_ITEMS.len() + 1, "↑↓ select   Enter confirm   Q quit", DIM, Color::Reset);

        if !w.message.is_empty() {
            let msg_row = self.front.height.saturating_sub(1);
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), Color::Black, MSG_BG);
        }
    }

    /// Centered popup. Text is clipped to the box while it grows.
    fn compose_panel(&mut self, content: &PanelContent, tick: u32) {
        let text_w = content
            .lines
            .iter()
            .map(|l| l.text.chars().count())
            .chain([content.title.chars().count() + 4, content.footer.chars().count()])
            .max()
            .unwrap_or(0);
        let full_w = (text_w + 4).min(self.term_w.saturating_sub(2)).max(8);
        let full_h = (content.lines.len() + 5).min(self.term_h.saturating_sub(1)).max(5);

        let scale = panel_scale(&self.panels, tick);
        let (pw, ph) = scaled_size(full_w, full_h, scale);
        let pw = pw.min(self.term_w);
        let ph = ph.min(self.term_h);
        let x0 = (self.term_w - pw) / 2;
        let y0 = (self.term_h - ph) / 2;

        for dy in 0..ph {
            for dx in 0..pw {
                let ch = match (dx, dy) {
                    _ if pw < 2 || ph < 2 => ' ',
                    (0, 0) => '┌',
                    (x, 0) if x == pw - 1 => '┐',
                    (0, y) if y == ph - 1 => '└',
                    (x, y) if x == pw - 1 && y == ph - 1 => '┘',
                    (_, 0) => '─',
                    (_, y) if y == ph - 1 => '─',
                    (0, _) => '│',
                    (x, _) if x == pw - 1 => '│',
                    _ => ' ',
                };
                self.front.set(x0 + dx, y0 + dy, Cell::new(ch, GOLD, PANEL_BG));
            }
        }

        if pw < 5 || ph < 3 { return; }
        let inner = pw - 4;
        let clip = |s: &str| -> String { s.chars().take(inner).collect() };

        let title = clip(&format!(" {} ", content.title));
        let tx = x0 + (pw - title.chars().count()) / 2;
        self.front.put_str(tx, y0, &title, GOLD, PANEL_BG);

        let body_rows = ph.saturating_sub(4);
        for (i, line) in content.lines.iter().take(body_rows).enumerate() {
            self.front.put_str(x0 + 2, y0 + 2 + i, &clip(&line.text), line.fg, PANEL_BG);
        }
        if ph >= 4 {
            self.front.put_str(x0 + 2, y0 + ph - 2, &clip(&content.footer), DIM, PANEL_BG);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::question::QuestionBank;
    use crate::sim::level::{load_level, LevelSet};
    use crate::sim::progress::LevelResult;

    fn world() -> WorldState {
        let config = GameConfig::default();
        let mut w = WorldState::new(&config, QuestionBank::embedded());
        load_level(&mut w, &LevelSet::embedded(), 1).unwrap();
        w
    }

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        assert_eq!(wrap("one two three four", 9), vec!["one two", "three", "four"]);
        assert_eq!(wrap("", 9), vec![""]);
        assert_eq!(wrap("abcdefghijkl", 5), vec!["abcde"]);
    }

    #[test]
    fn no_popup_while_playing_or_on_title() {
        let mut w = world();
        w.set_phase(Phase::Playing);
        assert!(phase_panel(&w).is_none());
        w.set_phase(Phase::Title);
        assert!(phase_panel(&w).is_none());
        assert!(menu_panel(&w).is_none());
    }

    #[test]
    fn quiz_panel_lists_four_answers_with_cursor() {
        let mut w = world();
        w.current_question = w.quizzes.first().map(|q| q.question);
        w.answer_cursor = 2;
        w.set_phase(Phase::Quiz);
        let panel = phase_panel(&w).unwrap();
        let answers: Vec<_> = panel.lines.iter().filter(|l| l.text.contains(") ")).collect();
        assert_eq!(answers.len(), 4);
        assert!(answers[2].text.starts_with('▶'));
        assert_eq!(answers[2].fg, GOLD);
    }

    #[test]
    fn wrong_feedback_shows_correct_answer() {
        let mut w = world();
        let idx = w.quizzes[0].question;
        w.current_question = Some(idx);
        w.set_phase(Phase::Feedback { correct: false });
        let expected = w.bank.get(idx).unwrap().correct_answer().to_string();
        let panel = phase_panel(&w).unwrap();
        let body: String = panel.lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>().join(" ");
        assert!(body.contains(&expected));
    }

    #[test]
    fn results_banner_only_for_perfect_runs() {
        let mut w = world();
        let mut result = LevelResult { level: 1, score: 100, max_score: 100, perfect: true, unlocked_level: 1 };
        w.last_result = Some(result);
        w.set_phase(Phase::Results);
        assert!(phase_panel(&w).unwrap().lines.iter().any(|l| l.text.contains("PERFECT")));

        result.score = 60;
        result.perfect = false;
        w.last_result = Some(result);
        assert!(!phase_panel(&w).unwrap().lines.iter().any(|l| l.text.contains("PERFECT")));
    }

    #[test]
    fn average_panel_prints_one_decimal() {
        let mut w = world();
        w.average = Some((vec![(1, 80), (2, 65)], 72.5));
        w.set_phase(Phase::AverageScore);
        let panel = phase_panel(&w).unwrap();
        assert!(panel.lines.iter().any(|l| l.text == "Average: 72.5"));
    }
}
