use winit::event::MouseScrollDelta;
use winit::keyboard::{Key, NamedKey};

use crate::config::ScrollConfig;

/// Share of the viewport height a page key moves.
const PAGE_FRACTION: f32 = 0.875;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    /// Scroll by this many CSS pixels; positive moves down the page.
    ScrollBy(f32),
    /// Jump to a fraction of the scroll range.
    ScrollTo(f32),
    Close,
}

pub fn wheel_action(delta: MouseScrollDelta, scroll: &ScrollConfig, scale_factor: f64) -> InputAction {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => InputAction::ScrollBy(-y * scroll.wheel_line_px),
        MouseScrollDelta::PixelDelta(pos) => {
            let dpr = if scale_factor > 0.0 { scale_factor } else { 1.0 };
            InputAction::ScrollBy((-pos.y / dpr) as f32)
        }
    }
}

pub fn key_action(
    key: &Key,
    shift: bool,
    scroll: &ScrollConfig,
    viewport_height: f32,
) -> Option<InputAction> {
    let page = viewport_height * PAGE_FRACTION;
    let action = match key {
        Key::Named(NamedKey::ArrowDown) => InputAction::ScrollBy(scroll.key_step_px),
        Key::Named(NamedKey::ArrowUp) => InputAction::ScrollBy(-scroll.key_step_px),
        Key::Named(NamedKey::PageDown) => InputAction::ScrollBy(page),
        Key::Named(NamedKey::PageUp) => InputAction::ScrollBy(-page),
        Key::Named(NamedKey::Space) if shift => InputAction::ScrollBy(-page),
        Key::Named(NamedKey::Space) => InputAction::ScrollBy(page),
        Key::Named(NamedKey::Home) => InputAction::ScrollTo(0.0),
        Key::Named(NamedKey::End) => InputAction::ScrollTo(1.0),
        Key::Named(NamedKey::Escape) => InputAction::Close,
        Key::Character(c) if c.eq_ignore_ascii_case("q") => InputAction::Close,
        _ => return None,
    };
    Some(action)
}
