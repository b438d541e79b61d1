use std::time::{Duration, Instant};

use flipbook_hero::config::Configuration;
use flipbook_hero::events::FrameLoaded;
use flipbook_hero::flipbook::Flipbook;
use flipbook_hero::processing::layout::FitMode;
use flipbook_hero::render::compose::Compositor;
use flipbook_hero::render::surface::{DrawOutcome, Viewport};
use image::{Rgba, RgbaImage};

const FRAME_TICK: Duration = Duration::from_millis(16);

fn config(count: usize) -> Configuration {
    let mut cfg = Configuration::default();
    cfg.frames.count = count;
    cfg
}

/// Solid frame whose red channel identifies it.
fn frame(index: usize) -> RgbaImage {
    RgbaImage::from_pixel(16, 9, Rgba([(index % 200) as u8 + 20, 40, 60, 255]))
}

fn red_at(book: &Flipbook, x: u32, y: u32) -> u8 {
    book.surface().pixels().get_pixel(x, y)[0]
}

fn close(a: u8, b: u8) -> bool {
    a.abs_diff(b) <= 1
}

fn loaded_book(count: usize, viewport: Viewport, failed: &[usize]) -> Flipbook {
    let now = Instant::now();
    let mut book = Flipbook::new(&config(count), now).unwrap();
    book.resize(viewport);
    for index in 0..count {
        let event = if failed.contains(&index) {
            FrameLoaded::failed(index)
        } else {
            FrameLoaded::decoded(index, frame(index))
        };
        book.handle_frame_loaded(event, now);
    }
    book
}

fn show(book: &mut Flipbook, fraction: f32) -> Option<usize> {
    book.scroll_to(fraction, Instant::now());
    book.settle();
    book.render_pending()
}

#[test]
fn halfway_shows_the_middle_frame() {
    let mut book = loaded_book(192, Viewport::new(160.0, 90.0, 1.0), &[]);
    assert_eq!(show(&mut book, 0.5), Some(95));
    assert_eq!(show(&mut book, 0.0), Some(0));
    assert_eq!(show(&mut book, 1.0), Some(191));
}

#[test]
fn failed_frame_keeps_the_previous_image() {
    let mut book = loaded_book(192, Viewport::new(160.0, 90.0, 1.0), &[47]);
    assert!(book.frames().is_complete());
    assert_eq!(book.frames().percent(), 100);

    assert_eq!(show(&mut book, 46.5 / 191.0), Some(46));
    assert!(close(red_at(&book, 80, 45), frame(46).get_pixel(0, 0)[0]));

    assert_eq!(show(&mut book, 47.5 / 191.0), None);
    assert_eq!(book.last_outcome(), Some(DrawOutcome::SkippedNotDecoded));
    assert_eq!(book.displayed_frame(), Some(46));
    assert!(close(red_at(&book, 80, 45), frame(46).get_pixel(0, 0)[0]));
}

#[test]
fn portrait_resize_switches_to_contain_and_keeps_progress() {
    let mut book = loaded_book(192, Viewport::new(1600.0, 900.0, 1.0), &[]);
    assert_eq!(show(&mut book, 0.3), Some(57));
    assert_eq!(
        book.last_outcome(),
        Some(DrawOutcome::Drawn {
            mode: FitMode::Cover,
            background: false
        })
    );

    book.resize(Viewport::new(400.0, 800.0, 1.0));
    assert!((book.progress().raw() - 0.3).abs() < 1e-4);
    assert_eq!(book.displayed_frame(), Some(57));
    assert_eq!(
        book.last_outcome(),
        Some(DrawOutcome::Drawn {
            mode: FitMode::Contain,
            background: true
        })
    );
    assert_eq!(book.surface().pixels().dimensions(), (400, 800));
}

#[test]
fn repeated_resize_is_idempotent() {
    let viewport = Viewport::new(50.0, 100.0, 2.0);
    let mut book = loaded_book(4, viewport, &[]);
    assert_eq!(book.displayed_frame(), Some(0));
    let before = book.surface().pixels().clone();

    book.resize(viewport);
    book.resize(viewport);
    assert_eq!(book.surface().pixels().dimensions(), (100, 200));
    assert_eq!(book.surface().pixels().as_raw(), before.as_raw());

    // contained frame sits in the vertical middle, background above it
    let red = frame(0).get_pixel(0, 0)[0];
    assert!(close(red_at(&book, 50, 100), red));
    assert!(!close(red_at(&book, 50, 10), red));
}

#[test]
fn resize_never_falls_back_to_frame_zero() {
    let mut book = loaded_book(10, Viewport::new(160.0, 90.0, 1.0), &[]);
    assert_eq!(show(&mut book, 1.0), Some(9));
    book.resize(Viewport::new(320.0, 180.0, 1.0));
    assert_eq!(book.displayed_frame(), Some(9));
    assert!(close(red_at(&book, 160, 90), frame(9).get_pixel(0, 0)[0]));
}

#[test]
fn reverse_scroll_never_advances_the_frame() {
    let mut book = loaded_book(192, Viewport::new(160.0, 90.0, 1.0), &[]);
    show(&mut book, 1.0);
    let mut previous = book.scheduler().last_frame().unwrap();
    let mut now = Instant::now();
    for _ in 0..120 {
        now += FRAME_TICK;
        book.scroll_by(-4.0, now);
        book.tick(now, FRAME_TICK);
        book.render_pending();
        let current = book.scheduler().last_frame().unwrap();
        assert!(current <= previous, "{current} > {previous}");
        previous = current;
    }
    assert!(previous < 191);
}

#[test]
fn spring_catches_up_and_stops_ticking() {
    let mut book = loaded_book(192, Viewport::new(160.0, 90.0, 1.0), &[]);
    let mut now = Instant::now();
    book.scroll_to(0.5, now);
    assert!(book.tick(now, FRAME_TICK).animating);
    for _ in 0..600 {
        now += FRAME_TICK;
        book.tick(now, FRAME_TICK);
        book.render_pending();
        if !book.progress().is_animating() {
            break;
        }
    }
    assert!(!book.progress().is_animating());
    assert_eq!(book.scheduler().last_frame(), Some(95));
}

#[test]
fn beats_fade_in_and_out_around_their_window() {
    let mut book = loaded_book(8, Viewport::new(160.0, 90.0, 1.0), &[]);
    book.finish_loading();
    let beat = book.beats()[1].clone();

    show(&mut book, beat.midpoint());
    let overlay = book.overlay(Instant::now());
    assert!((overlay.beats[1].opacity - 1.0).abs() < 1e-4);
    assert!(overlay.beats[1].offset_y.abs() < 1e-4);
    assert_eq!(overlay.beats[0].opacity, 0.0);

    for p in [beat.from, beat.to, 0.5, 0.9] {
        show(&mut book, p);
        let overlay = book.overlay(Instant::now());
        assert!(overlay.beats[1].opacity.abs() < 1e-4, "visible at {p}");
    }

    let captions = {
        show(&mut book, beat.midpoint());
        let overlay = book.overlay(Instant::now());
        book.captions(&overlay)
    };
    assert!(captions.iter().any(|c| c.text == beat.text));
}

#[test]
fn exit_fades_to_the_page_background() {
    let mut book = loaded_book(8, Viewport::new(160.0, 90.0, 1.0), &[]);
    book.finish_loading();
    show(&mut book, 1.0);
    let overlay = book.overlay(Instant::now());
    assert!((overlay.exit.fade - 1.0).abs() < 1e-4);
    assert!(overlay.exit.blur_px > 0.0);
    assert!(overlay.caption_alpha.abs() < 1e-4);

    show(&mut book, 0.5);
    let overlay = book.overlay(Instant::now());
    assert!(overlay.exit.is_idle());
    assert!((overlay.caption_alpha - 1.0).abs() < 1e-4);
}

#[test]
fn loading_screen_clears_once_after_the_grace_period() {
    let start = Instant::now();
    let mut book = Flipbook::new(&config(3), start).unwrap();
    book.resize(Viewport::new(160.0, 90.0, 1.0));
    book.handle_frame_loaded(FrameLoaded::decoded(1, frame(1)), start);
    assert_eq!(book.overlay(start).loading.percent, 33);
    book.handle_frame_loaded(FrameLoaded::decoded(0, frame(0)), start);
    book.handle_frame_loaded(FrameLoaded::failed(2), start);
    assert!(!book.is_ready());

    let later = start + Duration::from_millis(800);
    let outcome = book.tick(later, FRAME_TICK);
    assert!(outcome.ready);
    assert!(book.is_ready());
    assert_eq!(book.overlay(later).loading.opacity, 0.0);
    let again = book.tick(later + FRAME_TICK, FRAME_TICK);
    assert!(!again.ready);
}

#[test]
fn failed_first_frame_presents_fog() {
    let cfg = config(3);
    let fog = cfg.fog_color.to_rgba();
    let mut book = loaded_book(3, Viewport::new(160.0, 90.0, 1.0), &[0]);
    book.finish_loading();
    book.render_pending();
    assert_eq!(book.displayed_frame(), None);

    let mut compositor = Compositor::new(fog, cfg.page_background.to_rgba());
    let overlay = book.overlay(Instant::now());
    let composed = compositor.compose(book.surface(), overlay.compose_params());
    assert!(composed.image.pixels().all(|p| *p == fog));

    book.resize(Viewport::new(120.0, 200.0, 2.0));
    book.render_pending();
    let composed = compositor.compose(book.surface(), overlay.compose_params());
    assert_eq!(composed.image.dimensions(), (240, 400));
    assert!(composed.image.pixels().all(|p| *p == fog));
}
