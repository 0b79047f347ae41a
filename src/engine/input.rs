// Input state tracking for keyboard and mouse
// Abstracts winit events into a queryable per-frame snapshot:
//   - directional key presses queued as edges (held keys tracked separately)
//   - pointer position, normalized to NDC against the window size
//   - left click latched until end_frame()

use std::collections::{HashSet, VecDeque};

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use super::movement::Direction;

/// Directional binding for a physical key: WASD and the arrow keys.
pub fn direction_for_key(key: KeyCode) -> Option<Direction> {
    match key {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(Direction::Up),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(Direction::Down),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(Direction::Left),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(Direction::Right),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct InputState {
    // Keyboard
    keys_held: HashSet<KeyCode>,
    pending: VecDeque<Direction>,

    // Mouse, in window pixels (origin top-left)
    pub mouse_position: Option<(f32, f32)>,
    clicked: bool,

    pub window_size: (u32, u32),
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a winit WindowEvent into the input state.
    /// Call this once per event before the game's own event handling.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        // Auto-repeat counts as a fresh press, like a held arrow key.
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.set_cursor(position.x as f32, position.y as f32);
            }
            WindowEvent::CursorLeft { .. } => {
                self.mouse_position = None;
            }
            WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Left, .. } => {
                self.click();
            }
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
            }
            _ => {}
        }
    }

    pub fn press_key(&mut self, key: KeyCode) {
        self.keys_held.insert(key);
        if let Some(direction) = direction_for_key(key) {
            self.pending.push_back(direction);
        }
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.keys_held.remove(&key);
    }

    pub fn set_cursor(&mut self, x: f32, y: f32) {
        self.mouse_position = Some((x, y));
    }

    pub fn click(&mut self) {
        self.clicked = true;
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Directional presses since the last drain, oldest first.
    pub fn drain_directions(&mut self) -> impl Iterator<Item = Direction> + '_ {
        self.pending.drain(..)
    }

    /// True if the left button went down this frame.
    pub fn clicked(&self) -> bool {
        self.clicked
    }

    pub fn aspect(&self) -> f32 {
        let (w, h) = self.window_size;
        if w == 0 || h == 0 { 1.0 } else { w as f32 / h as f32 }
    }

    /// Pointer in normalized device coordinates (x right, y up, [-1, 1]).
    /// `None` before the cursor enters the window or while the size is unknown.
    pub fn pointer_ndc(&self) -> Option<Vec2> {
        let (x, y) = self.mouse_position?;
        let (w, h) = self.window_size;
        if w == 0 || h == 0 {
            return None;
        }
        Some(Vec2::new(x / w as f32 * 2.0 - 1.0, -(y / h as f32) * 2.0 + 1.0))
    }

    /// Call once per frame after the session has consumed input.
    /// Resets per-frame latches.
    pub fn end_frame(&mut self) {
        self.clicked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presses_queue_in_order() {
        let mut input = InputState::new();
        input.press_key(KeyCode::KeyW);
        input.press_key(KeyCode::ArrowLeft);
        input.press_key(KeyCode::Space);
        let got: Vec<_> = input.drain_directions().collect();
        assert_eq!(got, vec![Direction::Up, Direction::Left]);
        assert_eq!(input.drain_directions().count(), 0);
        assert!(input.is_key_held(KeyCode::Space));
    }

    #[test]
    fn release_only_clears_held_state() {
        let mut input = InputState::new();
        input.press_key(KeyCode::KeyD);
        input.release_key(KeyCode::KeyD);
        assert!(!input.is_key_held(KeyCode::KeyD));
        assert_eq!(input.drain_directions().collect::<Vec<_>>(), vec![Direction::Right]);
    }

    #[test]
    fn key_bindings_match_named_keys() {
        for (code, name) in [
            (KeyCode::KeyW, "w"),
            (KeyCode::ArrowDown, "ArrowDown"),
            (KeyCode::KeyA, "a"),
            (KeyCode::ArrowRight, "ArrowRight"),
        ] {
            assert_eq!(direction_for_key(code), Direction::from_key_name(name));
        }
        assert_eq!(direction_for_key(KeyCode::KeyQ), None);
    }

    #[test]
    fn pointer_maps_to_ndc() {
        let mut input = InputState::new();
        assert_eq!(input.pointer_ndc(), None);
        input.window_size = (800, 600);
        input.set_cursor(400.0, 300.0);
        assert_eq!(input.pointer_ndc(), Some(Vec2::ZERO));
        input.set_cursor(0.0, 0.0);
        assert_eq!(input.pointer_ndc(), Some(Vec2::new(-1.0, 1.0)));
        input.set_cursor(800.0, 600.0);
        assert_eq!(input.pointer_ndc(), Some(Vec2::new(1.0, -1.0)));
        assert!((input.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn click_is_latched_for_one_frame() {
        let mut input = InputState::new();
        input.click();
        assert!(input.clicked());
        input.end_frame();
        assert!(!input.clicked());
    }
}
