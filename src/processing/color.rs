use image::Rgba;

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let a = f32::from(a);
    let b = f32::from(b);
    (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
}

/// Source-over blend of `src` onto `dst`, with `src` alpha scaled by `opacity`.
pub fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>, opacity: f32) {
    let sa = (f32::from(src[3]) / 255.0) * opacity.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    if sa >= 1.0 {
        *dst = src;
        return;
    }
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        // weight of the source channel in the un-premultiplied result
        let t = if out_a > 0.0 { sa / out_a } else { 1.0 };
        dst[c] = lerp_u8(dst[c], src[c], t);
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Colour with its alpha channel multiplied by `opacity`.
pub fn with_opacity(color: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let a = (f32::from(color[3]) * opacity.clamp(0.0, 1.0))
        .round()
        .clamp(0.0, 255.0) as u8;
    Rgba([color[0], color[1], color[2], a])
}
