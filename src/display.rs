use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

use crate::framebuffer::{PackedFramebuffer, DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// Display is used by the interpreter to draw things on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work. Sprite drawing happens on a packed framebuffer the display owns;
/// `present` pushes it to whatever is actually showing pixels.
pub trait Display {
    /// switch every pixel off
    fn clear(&mut self);

    /// XOR an 8-pixel sprite row in at (x, y), coordinates wrapping; true if
    /// a lit pixel was switched off
    fn draw_row(&mut self, x: usize, y: usize, row: u8) -> bool;

    /// show the current frame, if anything changed since the last one
    fn present(&mut self) -> Result<(), io::Error>;
}

// store useful metadata about the terminal
struct Resolution(usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every pixel in `data` whose bit equals `bitplane`
    fn bitplane_from_data<'a>(
        &self,
        data: &'a [u8],
        bitplane: u8,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let mut count = self.pixel_count();
        let w = self.0;
        std::iter::from_fn(move || {
            while count > 0 {
                count -= 1;
                let bit = 1 & (data[count / 8] >> (7 - count % 8));
                if bit == bitplane {
                    return Some((
                        (count % w) as f64,        // x
                        -1.0 * (count / w) as f64, // y
                    ));
                }
            }
            None
        })
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
    framebuffer: PackedFramebuffer,
    dirty: bool,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(DISPLAY_WIDTH, DISPLAY_HEIGHT),
            framebuffer: PackedFramebuffer::new(),
            // draw the blank screen once up front
            dirty: true,
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
    }
}

impl Display for MonoTermDisplay {
    fn clear(&mut self) {
        self.framebuffer.clear();
        self.dirty = true;
    }

    fn draw_row(&mut self, x: usize, y: usize, row: u8) -> bool {
        self.dirty = true;
        self.framebuffer.draw_row(x, y, row)
    }

    fn present(&mut self) -> Result<(), io::Error> {
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;

        let resolution = &self.resolution;
        let data = self.framebuffer.as_bytes();

        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, 2 + resolution.0 as u16, 2 + resolution.1 as u16);

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    // only the lit bitplane needs painting on a black
                    // background
                    ctx.draw(&Points {
                        coords: &resolution.bitplane_from_data(data, 1).collect::<Vec<_>>(),
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines; keeps the framebuffer for
/// inspection and counts frames presented
#[derive(Default)]
pub struct DummyDisplay {
    pub framebuffer: PackedFramebuffer,
    pub frames_presented: usize,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        DummyDisplay::default()
    }
}

impl Display for DummyDisplay {
    fn clear(&mut self) {
        self.framebuffer.clear();
    }

    fn draw_row(&mut self, x: usize, y: usize, row: u8) -> bool {
        self.framebuffer.draw_row(x, y, row)
    }

    fn present(&mut self) -> Result<(), io::Error> {
        self.frames_presented += 1;
        Ok(())
    }
}
