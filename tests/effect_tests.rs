use image::{Rgba, RgbaImage};
use pixmark::effect::{Effect, EffectCategory, EffectSpec};
use pixmark::ops::filters::convolve_3x3;
use pixmark::session::EditorSession;
use pixmark::{EffectDispatcher, PixmarkError};

fn noisy(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| {
        let v = x.wrapping_mul(2654435761).wrapping_add(y.wrapping_mul(40503));
        Rgba([(v & 0xff) as u8, ((v >> 8) & 0xff) as u8, ((v >> 16) & 0xff) as u8, ((v >> 3) & 0xff) as u8 | 1])
    })
}

#[test]
fn convolution_identity_kernel_reproduces_source() {
    let src = noisy(37, 23);
    let identity = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
    assert_eq!(convolve_3x3(&src, &identity, 1.0, 0.0, false), src);
    assert_eq!(convolve_3x3(&src, &identity, 1.0, 0.0, true), src);

    // The catalog's convolution matrix defaults to the identity kernel.
    let effect = EffectSpec::default_for("convolution_matrix").unwrap();
    assert_eq!(effect.apply(&src), src);
}

#[test]
fn perspective_warp_with_zero_offsets_is_identity() {
    let src = noisy(31, 17);
    let effect = EffectSpec::default_for("perspective_warp").unwrap();
    assert_eq!(effect.apply(&src), src);

    let explicit = EffectSpec::from_json(
        r#"{"effect": "perspective_warp", "top_left_x": 0, "top_left_y": 0, "top_right_x": 0,
            "top_right_y": 0, "bottom_right_x": 0, "bottom_right_y": 0, "bottom_left_x": 0, "bottom_left_y": 0}"#,
    )
    .unwrap();
    assert_eq!(explicit.apply(&src), src);
}

#[test]
fn solarize_white_4x4_scenario() {
    let mut session = EditorSession::new();
    session.load_image(RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255])));
    let solarize = EffectSpec::from_json(r#"{"effect": "solarize", "threshold": 128}"#).unwrap();
    assert!(session.apply_effect(&EffectDispatcher::new(), &solarize));
    let img = session.image().unwrap();
    assert_eq!(img.dimensions(), (4, 4));
    assert!(img.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
}

#[test]
fn solarize_keeps_channels_at_or_below_threshold() {
    let src = RgbaImage::from_fn(16, 16, |x, y| {
        let v = (y * 16 + x) as u8;
        Rgba([v, 255 - v, 128, 200])
    });
    let out = EffectSpec::default_for("solarize").unwrap().apply(&src);
    for (s, o) in src.pixels().zip(out.pixels()) {
        for c in 0..3 {
            let expected = if s[c] > 128 { 255 - s[c] } else { s[c] };
            assert_eq!(o[c], expected);
        }
        assert_eq!(o[3], s[3]);
    }
}

#[test]
fn out_of_range_parameters_are_clamped() {
    let src = noisy(12, 12);
    let apply = |json: &str| EffectSpec::from_json(json).unwrap().apply(&src);
    assert_eq!(
        apply(r#"{"effect": "brightness", "amount": 500}"#),
        apply(r#"{"effect": "brightness", "amount": 100}"#)
    );
    assert_eq!(
        apply(r#"{"effect": "pinch_bulge", "strength": -900}"#),
        apply(r#"{"effect": "pinch_bulge", "strength": -100}"#)
    );
    assert_eq!(
        apply(r#"{"effect": "add_noise", "amount": 1000, "seed": 3}"#),
        apply(r#"{"effect": "add_noise", "amount": 100, "seed": 3}"#)
    );
}

#[test]
fn seeded_effects_are_deterministic() {
    let src = noisy(48, 32);
    for json in [
        r#"{"effect": "add_noise", "amount": 40, "seed": 7}"#,
        r#"{"effect": "stained_glass", "tile_size": 10, "seed": 99}"#,
        r#"{"effect": "liquid_glass", "seed": 5}"#,
    ] {
        let effect = EffectSpec::from_json(json).unwrap();
        assert_eq!(effect.apply(&src), effect.apply(&src), "{json}");
    }
    let a = EffectSpec::from_json(r#"{"effect": "add_noise", "amount": 40, "seed": 1}"#).unwrap();
    let b = EffectSpec::from_json(r#"{"effect": "add_noise", "amount": 40, "seed": 2}"#).unwrap();
    assert_ne!(a.apply(&src), b.apply(&src));
}

#[test]
fn same_size_effects_preserve_dimensions_and_source() {
    let src = noisy(21, 13);
    let before = src.clone();
    for name in EffectSpec::names() {
        let effect = EffectSpec::default_for(name).unwrap();
        let out = effect.apply(&src);
        if !effect.resizes() {
            assert_eq!(out.dimensions(), src.dimensions(), "{name}");
        }
    }
    assert_eq!(src, before);
}

#[test]
fn geometry_effects_size_themselves() {
    let src = noisy(20, 10);
    let rotate = EffectSpec::from_json(r#"{"effect": "rotate", "degrees": 270}"#).unwrap();
    assert_eq!(rotate.category(), EffectCategory::Geometry);
    assert_eq!(rotate.apply(&src).dimensions(), (10, 20));
    let resize = EffectSpec::from_json(r#"{"effect": "resize", "width": 5}"#).unwrap();
    assert_eq!(resize.apply(&src).dimensions(), (5, 10));
    let flip = EffectSpec::from_json(r#"{"effect": "flip", "axis": "vertical"}"#).unwrap();
    let flipped = flip.apply(&src);
    assert_eq!(flipped.get_pixel(3, 0), src.get_pixel(3, 9));
}

#[test]
fn key_value_pairs_build_effects() {
    let pairs = vec![("radius".to_string(), "3".to_string())];
    let blur = EffectSpec::from_name_and_pairs("gaussian_blur", &pairs).unwrap();
    assert_eq!(blur.name(), "gaussian_blur");
    assert!(matches!(
        EffectSpec::from_name_and_pairs("warp_drive", &[]),
        Err(PixmarkError::UnknownEffect(name)) if name == "warp_drive"
    ));
}

#[test]
fn auto_contrast_stretches_to_full_range() {
    let src = RgbaImage::from_fn(32, 1, |x, _| {
        let v = 100 + x as u8;
        Rgba([v, v, v, 255])
    });
    let out = EffectSpec::from_json(r#"{"effect": "auto_contrast", "clip_percent": 0}"#).unwrap().apply(&src);
    assert_eq!(out.get_pixel(0, 0)[0], 0);
    assert_eq!(out.get_pixel(31, 0)[0], 255);
}

#[test]
fn dyn_effects_work_through_boxes() {
    let boxed: Vec<Box<dyn Effect>> = ["invert", "grayscale", "emboss"]
        .iter()
        .map(|n| EffectSpec::default_for(n).unwrap().build())
        .collect();
    let src = noisy(8, 8);
    for effect in &boxed {
        assert_eq!(effect.apply(&src).dimensions(), (8, 8));
    }
    assert_eq!(boxed[0].apply(&boxed[0].apply(&src)), src);
}

#[test]
fn enormous_blur_radius_is_clamped() {
    let src = RgbaImage::from_pixel(4, 4, Rgba([40, 80, 120, 255]));
    let huge = EffectSpec::from_json(r#"{"effect": "gaussian_blur", "radius": 1500000000}"#).unwrap();
    let capped = EffectSpec::from_json(r#"{"effect": "gaussian_blur", "radius": 1000}"#).unwrap();
    let out = huge.apply(&src);
    assert_eq!(out.dimensions(), (4, 4));
    assert_eq!(out, capped.apply(&src));
}

#[test]
fn tone_effects_at_neutral_settings_leave_pixels_alone() {
    let src = noisy(19, 11);
    for name in ["exposure", "alpha", "gamma", "levels", "hue"] {
        let effect = EffectSpec::default_for(name).unwrap();
        assert_eq!(effect.category(), EffectCategory::Adjustment, "{name}");
        assert_eq!(effect.apply(&src), src, "{name}");
    }
}

#[test]
fn exposure_and_alpha_run_as_color_matrices() {
    let exposure = EffectSpec::from_json(r#"{"effect": "exposure", "exposure": 1}"#).unwrap();
    let alpha = EffectSpec::from_json(r#"{"effect": "alpha", "opacity": 25}"#).unwrap();
    assert!(exposure.gpu_program().is_some());
    assert!(alpha.gpu_program().is_some());

    let src = RgbaImage::from_pixel(2, 2, Rgba([50, 60, 70, 200]));
    assert_eq!(*exposure.apply(&src).get_pixel(1, 1), Rgba([100, 120, 140, 200]));
    assert_eq!(*alpha.apply(&src).get_pixel(0, 0), Rgba([50, 60, 70, 50]));
    // Exposure is clamped to ±5 stops.
    let wild = EffectSpec::from_json(r#"{"effect": "exposure", "exposure": -40}"#).unwrap();
    let floor = EffectSpec::from_json(r#"{"effect": "exposure", "exposure": -5}"#).unwrap();
    assert_eq!(wild.apply(&src), floor.apply(&src));
}

#[test]
fn levels_with_reversed_output_inverts() {
    let src = noisy(10, 10);
    let levels = EffectSpec::from_json(r#"{"effect": "levels", "output_black": 255, "output_white": 0}"#).unwrap();
    let invert = EffectSpec::default_for("invert").unwrap();
    let a = levels.apply(&src);
    let b = invert.apply(&src);
    for (p, q) in a.pixels().zip(b.pixels()) {
        for c in 0..4 {
            assert!((p[c] as i32 - q[c] as i32).abs() <= 1);
        }
    }
}

#[test]
fn new_filters_are_deterministic_and_keep_size() {
    let src = noisy(24, 18);
    for json in [
        r#"{"effect": "sharpen", "strength": 2}"#,
        r#"{"effect": "motion_blur", "distance": 15, "angle": 30}"#,
        r#"{"effect": "oil_paint", "radius": 2, "levels": 16}"#,
        r#"{"effect": "sobel_edge"}"#,
    ] {
        let effect = EffectSpec::from_json(json).unwrap();
        assert_eq!(effect.category(), EffectCategory::Filter, "{json}");
        assert!(effect.gpu_program().is_none(), "{json}");
        let out = effect.apply(&src);
        assert_eq!(out.dimensions(), (24, 18), "{json}");
        assert_eq!(out, effect.apply(&src), "{json}");
    }
}

#[test]
fn sobel_edge_on_flat_image_is_black_with_source_alpha() {
    let src = RgbaImage::from_pixel(6, 6, Rgba([120, 30, 200, 140]));
    let out = EffectSpec::default_for("sobel_edge").unwrap().apply(&src);
    assert!(out.pixels().all(|p| *p == Rgba([0, 0, 0, 140])));
}

#[test]
fn oversized_filter_parameters_are_clamped() {
    let src = noisy(12, 12);
    let apply = |json: &str| EffectSpec::from_json(json).unwrap().apply(&src);
    assert_eq!(
        apply(r#"{"effect": "motion_blur", "distance": 100000, "angle": 0}"#),
        apply(r#"{"effect": "motion_blur", "distance": 200, "angle": 0}"#)
    );
    assert_eq!(
        apply(r#"{"effect": "oil_paint", "radius": 99, "levels": 999}"#),
        apply(r#"{"effect": "oil_paint", "radius": 6, "levels": 64}"#)
    );
}
