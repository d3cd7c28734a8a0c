use image::{Rgba, RgbaImage};

use paintsurface::canvas::TRANSPARENT;
use paintsurface::components::Tool;
use paintsurface::ops::color_mix::{blend, oklab_to_rgb, rgb_to_oklab, MixStrategy};
use paintsurface::{PaintError, Session, Settings};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

fn stroke(s: &mut Session, from: (f32, f32), to: (f32, f32)) {
    s.pointer_down(from).unwrap();
    s.pointer_move(to);
    s.pointer_up();
}

#[test]
fn brush_stroke_is_undoable() {
    let mut s = Session::with_size(100, 100);
    s.tools.brush.color = RED;
    s.tools.brush.size = 1.0;
    stroke(&mut s, (10.0, 10.0), (20.0, 20.0));
    assert_eq!(*s.composite().get_pixel(15, 15), RED);

    assert!(s.undo());
    assert_eq!(*s.composite().get_pixel(15, 15), WHITE);
}

#[test]
fn invisible_top_layer_composites_to_the_bottom_layer() {
    let mut s = Session::with_size(16, 16);
    s.tools.brush.color = RED;
    stroke(&mut s, (2.0, 2.0), (12.0, 9.0));
    s.add_layer(Some("Top"));
    s.tools.brush.color = BLUE;
    stroke(&mut s, (0.0, 8.0), (16.0, 8.0));
    s.set_layer_visible(1, false);
    assert_eq!(s.composite(), &s.canvas.layers[0].pixels);
}

#[test]
fn half_opacity_blue_over_red() {
    let mut s = Session::new(&Settings {
        canvas_width: 1,
        canvas_height: 1,
        background: RED,
        ..Settings::default()
    });
    s.add_layer(None);
    s.set_tool(Tool::Fill);
    s.fill_at(0, 0, Some(BLUE)).unwrap();
    s.set_layer_opacity(1, 0.5);
    assert_eq!(*s.composite().get_pixel(0, 0), Rgba([128, 0, 128, 255]));
}

#[test]
fn history_stays_bounded_and_undo_stops_at_the_oldest_entry() {
    let mut s = Session::with_size(8, 8);
    s.tools.brush.size = 1.0;
    for i in 0..45u8 {
        s.tools.brush.color = Rgba([i, 0, 0, 255]);
        stroke(&mut s, (0.5, 0.5), (7.5, 0.5));
        assert!(s.history.len() <= 30);
    }
    let retained = s.history.len();
    assert_eq!(retained, 30);
    let mut undos = 0;
    while s.undo() {
        undos += 1;
    }
    assert_eq!(undos, retained - 1);
    assert!(!s.undo());
}

#[test]
fn redo_after_undo_restores_the_same_state() {
    let mut s = Session::with_size(32, 32);
    s.tools.brush.color = GREEN;
    stroke(&mut s, (3.0, 3.0), (28.0, 20.0));
    s.set_tool(Tool::Circle);
    stroke(&mut s, (16.0, 16.0), (16.0, 24.0));
    let before = s.composite().clone();

    assert!(s.undo());
    assert_ne!(s.composite(), &before);
    assert!(s.redo());
    assert_eq!(s.composite(), &before);
    assert!(!s.redo());
}

#[test]
fn filling_with_the_existing_color_commits_nothing() {
    let mut s = Session::with_size(20, 20);
    let outcome = s.fill_at(4, 4, Some(WHITE)).unwrap();
    assert!(outcome.is_noop());
    assert_eq!(s.history.len(), 1);
}

#[test]
fn fill_is_area_exact() {
    let mut s = Session::with_size(20, 20);
    s.tools.brush.color = RED;
    s.tools.brush.size = 1.0;
    // Vertical wall down column 10.
    stroke(&mut s, (10.5, 0.0), (10.5, 20.0));
    let outcome = s.fill_at(2, 2, Some(GREEN)).unwrap();
    assert_eq!(outcome.filled, 10 * 20);
    let out = s.composite();
    assert_eq!(*out.get_pixel(0, 19), GREEN);
    assert_eq!(*out.get_pixel(10, 5), RED);
    assert_eq!(*out.get_pixel(15, 5), WHITE);
}

#[test]
fn out_of_bounds_fill_is_rejected() {
    let mut s = Session::with_size(10, 10);
    let err = s.fill_at(10, 0, Some(RED)).unwrap_err();
    assert!(matches!(err, PaintError::OutOfBoundsFill { .. }));
    assert!(s.composite().pixels().all(|p| *p == WHITE));
}

#[test]
fn eraser_clears_to_transparent() {
    let mut s = Session::with_size(40, 40);
    s.set_tool(Tool::Eraser);
    stroke(&mut s, (5.0, 20.0), (35.0, 20.0));
    assert_eq!(*s.canvas.active_layer().pixels.get_pixel(20, 20), TRANSPARENT);
    assert_eq!(*s.canvas.active_layer().pixels.get_pixel(20, 2), WHITE);
}

#[test]
fn undo_after_adding_a_layer_restores_the_old_layer_set() {
    let mut s = Session::with_size(10, 10);
    s.add_layer(Some("Ink"));
    s.tools.brush.color = RED;
    stroke(&mut s, (1.0, 5.0), (9.0, 5.0));
    assert_eq!(s.history.len(), 2);

    assert!(s.undo());
    assert_eq!(s.canvas.layers.len(), 1);
    assert!(s.canvas.active_layer_index < s.canvas.layers.len());
    assert!(s.composite().pixels().all(|p| *p == WHITE));
}

#[test]
fn removing_the_last_layer_is_a_noop() {
    let mut s = Session::with_size(4, 4);
    assert!(!s.remove_layer(0));
    assert_eq!(s.canvas.layers.len(), 1);
    s.add_layer(None);
    s.add_layer(None);
    assert!(s.remove_layer(2));
    assert_eq!(s.canvas.active_layer_index, 1);
}

#[test]
fn imported_image_is_stretched_and_undoable() {
    let mut s = Session::with_size(8, 8);
    s.import_image(&RgbaImage::from_pixel(2, 2, BLUE));
    assert!(s.composite().pixels().all(|p| *p == BLUE));
    assert!(s.undo());
    assert!(s.composite().pixels().all(|p| *p == WHITE));
}

#[test]
fn mixing_brush_blends_into_existing_paint() {
    let mut s = Session::new(&Settings {
        canvas_width: 16,
        canvas_height: 16,
        background: Rgba([0, 0, 255, 255]),
        ..Settings::default()
    });
    s.tools.brush.color = Rgba([255, 255, 0, 255]);
    s.tools.brush.alpha = 0.5;
    s.tools.brush.size = 4.0;
    s.tools.brush.mix = Some(MixStrategy::OkLab);
    stroke(&mut s, (8.5, 2.0), (8.5, 14.0));
    let got = *s.composite().get_pixel(8, 8);
    let want = blend(MixStrategy::OkLab, Rgba([0, 0, 255, 255]), Rgba([255, 255, 0, 255]), 0.5);
    assert_eq!(got, want);
}

#[test]
fn every_strategy_keeps_its_endpoints() {
    let a = Rgba([200, 40, 90, 255]);
    let b = Rgba([10, 220, 130, 255]);
    for &strategy in MixStrategy::all() {
        assert_eq!(blend(strategy, a, b, 0.0), a, "{strategy}");
        assert_eq!(blend(strategy, a, b, 1.0), b, "{strategy}");
    }
}

#[test]
fn oklab_round_trip_is_within_one() {
    for r in (0..=255u16).step_by(51) {
        for g in (0..=255u16).step_by(51) {
            for b in (0..=255u16).step_by(51) {
                let c = Rgba([r as u8, g as u8, b as u8, 255]);
                let back = oklab_to_rgb(rgb_to_oklab(c));
                for i in 0..3 {
                    assert!((c[i] as i32 - back[i] as i32).abs() <= 1, "{c:?} -> {back:?}");
                }
            }
        }
    }
}
