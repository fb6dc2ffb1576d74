//! Property tests for geometry resolution.

use multisize::imaging::{Dimension, Rect, ScaleMethod, resolve};
use proptest::prelude::*;

fn within(inner: Rect, width: u32, height: u32) -> bool {
    inner.width >= 1
        && inner.height >= 1
        && inner.x + inner.width <= width
        && inner.y + inner.height <= height
}

fn side() -> impl Strategy<Value = u32> {
    1u32..3000
}

proptest! {
    #[test]
    fn inside_fits_the_box_and_keeps_aspect(
        sw in side(), sh in side(), rw in side(), rh in side()
    ) {
        let r = resolve(
            (sw, sh),
            Some(Dimension::Pixels(rw)),
            Some(Dimension::Pixels(rh)),
            ScaleMethod::Inside,
        ).unwrap();
        prop_assert!(r.width <= rw && r.height <= rh);
        prop_assert!(r.width == rw || r.height == rh);
        // Rounding moves each axis by less than one pixel
        let skew = (r.width as i64 * sh as i64 - r.height as i64 * sw as i64).abs();
        prop_assert!(skew <= sw as i64 + sh as i64);
    }

    #[test]
    fn exact_methods_hit_the_requested_size(
        sw in side(), sh in side(), rw in side(), rh in side(),
        method in prop::sample::select(vec![
            ScaleMethod::Passthrough,
            ScaleMethod::Fit,
            ScaleMethod::Crop,
            ScaleMethod::CropResize,
        ])
    ) {
        let r = resolve(
            (sw, sh),
            Some(Dimension::Pixels(rw)),
            Some(Dimension::Pixels(rh)),
            method,
        ).unwrap();
        prop_assert_eq!((r.width, r.height), (rw, rh));
        prop_assert!(within(r.geometry.dest_box, rw, rh));
        prop_assert!(within(r.geometry.source_box, sw, sh));
    }

    #[test]
    fn fit_centers_the_content(
        sw in side(), sh in side(), rw in side(), rh in side()
    ) {
        let r = resolve(
            (sw, sh),
            Some(Dimension::Pixels(rw)),
            Some(Dimension::Pixels(rh)),
            ScaleMethod::Fit,
        ).unwrap();
        let dest = r.geometry.dest_box;
        let right = rw - dest.x - dest.width;
        let bottom = rh - dest.y - dest.height;
        prop_assert!(dest.x.abs_diff(right) <= 1);
        prop_assert!(dest.y.abs_diff(bottom) <= 1);
    }

    #[test]
    fn outside_covers_the_box(
        sw in side(), sh in side(), rw in side(), rh in side()
    ) {
        let r = resolve(
            (sw, sh),
            Some(Dimension::Pixels(rw)),
            Some(Dimension::Pixels(rh)),
            ScaleMethod::Outside,
        ).unwrap();
        prop_assert!(r.width >= rw && r.height >= rh);
        prop_assert!(r.width == rw || r.height == rh);
    }

    #[test]
    fn one_axis_follows_source_aspect(sw in side(), sh in side(), rw in side()) {
        let r = resolve((sw, sh), Some(Dimension::Pixels(rw)), None, ScaleMethod::Inside).unwrap();
        // A derived height that rounds down can make height the binding axis
        prop_assert!(r.width <= rw);
        let expected = ((rw as f64 * sh as f64 / sw as f64).round() as u32).max(1);
        prop_assert!(r.height.abs_diff(expected) <= 1);
    }
}
