//! Chrome of the floating chat panel: drag positioning, outside-click
//! dismissal, keyboard shortcuts and the hover-revealed delete button.
//!
//! Pure state; the view feeds it pointer and key events and acts on what
//! comes back.

use std::ops::{Add, Sub};

use bazaar_common::ids::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Default panel size in CSS pixels.
pub const PANEL_SIZE: Size = Size {
    width: 360.0,
    height: 480.0,
};

/// Where the panel opens, relative to the viewport's top-left corner.
pub const PANEL_ORIGIN: Point = Point::new(24.0, 96.0);

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragStart {
    pointer: Point,
    panel: Point,
}

/// Key press while an input inside the panel has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Enter { shift: bool },
    Escape,
    Other,
}

/// What the view should do with a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Send the draft and suppress the default newline.
    Send,
    /// Invoke the close callback.
    Close,
    /// Let the input handle it (Shift+Enter inserts a newline).
    Default,
}

impl KeyAction {
    pub fn prevents_default(self) -> bool {
        matches!(self, KeyAction::Send)
    }
}

#[derive(Debug, Clone)]
pub struct PanelChrome {
    position: Point,
    size: Size,
    drag: Option<DragStart>,
    hovered: Option<MessageId>,
}

impl Default for PanelChrome {
    fn default() -> Self {
        Self::new(PANEL_ORIGIN, PANEL_SIZE)
    }
}

impl PanelChrome {
    pub fn new(position: Point, size: Size) -> Self {
        Self {
            position,
            size,
            drag: None,
            hovered: None,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// While true the view keeps its pointer-move/up listeners mounted;
    /// otherwise they must not exist.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Pointer went down on the header.
    pub fn begin_drag(&mut self, pointer: Point) {
        self.drag = Some(DragStart {
            pointer,
            panel: self.position,
        });
    }

    /// Returns `true` if the panel moved.
    pub fn drag_to(&mut self, pointer: Point) -> bool {
        let Some(start) = self.drag else {
            return false;
        };
        let next = start.panel + (pointer - start.pointer);
        let moved = next != self.position;
        self.position = next;
        moved
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.position.x
            && point.x <= self.position.x + self.size.width
            && point.y >= self.position.y
            && point.y <= self.position.y + self.size.height
    }

    /// A pointer-down anywhere on the page. Returns `true` when it landed
    /// outside the panel and the panel should close.
    pub fn should_dismiss(&self, pointer: Point) -> bool {
        !self.is_dragging() && !self.contains(pointer)
    }

    pub fn on_key(&self, key: KeyPress) -> KeyAction {
        match key {
            KeyPress::Escape => KeyAction::Close,
            KeyPress::Enter { shift: false } => KeyAction::Send,
            KeyPress::Enter { shift: true } | KeyPress::Other => KeyAction::Default,
        }
    }

    pub fn hover(&mut self, message: Option<MessageId>) {
        self.hovered = message;
    }

    pub fn hovered(&self) -> Option<&MessageId> {
        self.hovered.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_moves_by_cumulative_delta() {
        let mut panel = PanelChrome::new(Point::new(100.0, 50.0), PANEL_SIZE);
        assert!(!panel.is_dragging());

        panel.begin_drag(Point::new(110.0, 60.0));
        assert!(panel.is_dragging());
        assert!(panel.drag_to(Point::new(115.0, 70.0)));
        assert_eq!(panel.position(), Point::new(105.0, 60.0));
        // Deltas are measured from the drag start, not the previous move.
        panel.drag_to(Point::new(90.0, 40.0));
        assert_eq!(panel.position(), Point::new(80.0, 30.0));

        panel.end_drag();
        assert!(!panel.is_dragging());
    }

    #[test]
    fn position_is_frozen_after_pointer_up() {
        let mut panel = PanelChrome::default();
        panel.begin_drag(Point::new(30.0, 100.0));
        panel.drag_to(Point::new(40.0, 110.0));
        panel.end_drag();
        let frozen = panel.position();

        assert!(!panel.drag_to(Point::new(500.0, 500.0)));
        assert_eq!(panel.position(), frozen);
    }

    #[test]
    fn second_drag_starts_from_current_position() {
        let mut panel = PanelChrome::new(Point::new(0.0, 0.0), PANEL_SIZE);
        panel.begin_drag(Point::new(10.0, 10.0));
        panel.drag_to(Point::new(20.0, 20.0));
        panel.end_drag();

        panel.begin_drag(Point::new(200.0, 200.0));
        panel.drag_to(Point::new(205.0, 195.0));
        assert_eq!(panel.position(), Point::new(15.0, 5.0));
    }

    #[test]
    fn outside_pointer_down_dismisses() {
        let panel = PanelChrome::new(Point::new(100.0, 100.0), Size { width: 200.0, height: 300.0 });
        assert!(!panel.should_dismiss(Point::new(150.0, 150.0)));
        assert!(!panel.should_dismiss(Point::new(300.0, 400.0)));
        assert!(panel.should_dismiss(Point::new(99.0, 150.0)));
        assert!(panel.should_dismiss(Point::new(150.0, 401.0)));
    }

    #[test]
    fn key_bindings() {
        let panel = PanelChrome::default();
        assert_eq!(panel.on_key(KeyPress::Escape), KeyAction::Close);
        assert_eq!(panel.on_key(KeyPress::Enter { shift: false }), KeyAction::Send);
        assert!(KeyAction::Send.prevents_default());
        assert_eq!(panel.on_key(KeyPress::Enter { shift: true }), KeyAction::Default);
        assert!(!KeyAction::Default.prevents_default());
        assert_eq!(panel.on_key(KeyPress::Other), KeyAction::Default);
    }
}
