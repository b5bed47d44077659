/// On-screen controller for the touch channel.
///
/// Three buttons along the bottom edge of the terminal: LEFT and RIGHT
/// on the left side, JUMP on the right. Holding the mouse button on
/// LEFT/RIGHT yields -1/+1; pressing JUMP gives a jump edge and
/// releasing it a stop-jump edge.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ControlButton {
    Left,
    Right,
    Jump,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ButtonRect {
    pub button: ControlButton,
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

impl ButtonRect {
    pub fn contains(&self, col: u16, row: u16) -> bool {
        col >= self.x && col < self.x + self.w && row >= self.y && row < self.y + self.h
    }

    pub fn label(&self) -> &'static str {
        match self.button {
            ControlButton::Left => "◀ LEFT",
            ControlButton::Right => "RIGHT ▶",
            ControlButton::Jump => "▲ JUMP",
        }
    }
}

pub const BUTTON_W: u16 = 10;
pub const BUTTON_H: u16 = 3;

/// Button layout for a `cols`×`rows` terminal. Empty when the terminal
/// is too small to fit all three.
pub fn layout(cols: u16, rows: u16) -> Vec<ButtonRect> {
    if cols < BUTTON_W * 3 + 4 || rows < BUTTON_H + 2 {
        return vec![];
    }
    let y = rows - BUTTON_H - 1;
    let rect = |button, x| ButtonRect { button, x, y, w: BUTTON_W, h: BUTTON_H };
    vec![
        rect(ControlButton::Left, 1),
        rect(ControlButton::Right, 2 + BUTTON_W),
        rect(ControlButton::Jump, cols - BUTTON_W - 1),
    ]
}

pub fn hit_test(buttons: &[ButtonRect], col: u16, row: u16) -> Option<ControlButton> {
    buttons.iter().find(|b| b.contains(col, row)).map(|b| b.button)
}

/// Horizontal scalar for the held button.
pub fn axis_for(held: Option<ControlButton>) -> f32 {
    match held {
        Some(ControlButton::Left) => -1.0,
        Some(ControlButton::Right) => 1.0,
        _ => 0.0,
    }
}
