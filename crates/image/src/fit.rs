//! Cover / contain / fill placement.
//!
//! `cover` crops through the texture coordinates and keeps the quad full
//! size. `contain` shrinks the quad and samples the whole image. `fill`
//! stretches. Positions are percentages, `0` meaning left/top.

use backdrop_core::config::{ImageFit, ImagePosition};
use glam::Vec2;

/// Quad transform and texture-coordinate window for one fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    pub uv_scale: Vec2,
    pub uv_offset: Vec2,
    pub quad_scale: Vec2,
    pub quad_offset: Vec2,
}

impl FitTransform {
    pub const IDENTITY: FitTransform = FitTransform {
        uv_scale: Vec2::ONE,
        uv_offset: Vec2::ZERO,
        quad_scale: Vec2::ONE,
        quad_offset: Vec2::ZERO,
    };
}

/// Computes the fit of an image with aspect `image_aspect` (width / height)
/// into a target with aspect `target_aspect`.
pub fn compute_fit(
    fit: ImageFit,
    position: ImagePosition,
    image_aspect: f32,
    target_aspect: f32,
) -> FitTransform {
    if !(image_aspect.is_finite() && target_aspect.is_finite())
        || image_aspect <= 0.0
        || target_aspect <= 0.0
    {
        return FitTransform::IDENTITY;
    }
    let px = (position.x / 100.0).clamp(0.0, 1.0);
    let py = (position.y / 100.0).clamp(0.0, 1.0);
    let mut out = FitTransform::IDENTITY;
    match fit {
        ImageFit::Fill => {}
        ImageFit::Cover => {
            if image_aspect > target_aspect {
                let s = target_aspect / image_aspect;
                out.uv_scale.x = s;
                out.uv_offset.x = (1.0 - s) * px;
            } else {
                let s = image_aspect / target_aspect;
                out.uv_scale.y = s;
                // v runs bottom to top, percentages top to bottom.
                out.uv_offset.y = (1.0 - s) * (1.0 - py);
            }
        }
        ImageFit::Contain => {
            if image_aspect > target_aspect {
                let s = target_aspect / image_aspect;
                out.quad_scale.y = s;
                out.quad_offset.y = (1.0 - s) * (1.0 - 2.0 * py);
            } else {
                let s = image_aspect / target_aspect;
                out.quad_scale.x = s;
                out.quad_offset.x = (1.0 - s) * (2.0 * px - 1.0);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: ImagePosition = ImagePosition { x: 50.0, y: 50.0 };

    fn close(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-5
    }

    #[test]
    fn fill_is_identity() {
        assert_eq!(compute_fit(ImageFit::Fill, CENTER, 4.0, 1.0), FitTransform::IDENTITY);
    }

    #[test]
    fn cover_crops_wide_image_horizontally() {
        let f = compute_fit(ImageFit::Cover, CENTER, 2.0, 1.0);
        assert!(close(f.uv_scale, Vec2::new(0.5, 1.0)));
        assert!(close(f.uv_offset, Vec2::new(0.25, 0.0)));
        assert_eq!(f.quad_scale, Vec2::ONE);
    }

    #[test]
    fn cover_anchors_tall_image_to_top() {
        let top = ImagePosition { x: 50.0, y: 0.0 };
        let f = compute_fit(ImageFit::Cover, top, 0.5, 1.0);
        assert!(close(f.uv_scale, Vec2::new(1.0, 0.5)));
        // Window [0.5, 1] in v is the upper half.
        assert!(close(f.uv_offset, Vec2::new(0.0, 0.5)));
    }

    #[test]
    fn contain_letterboxes_wide_image() {
        let f = compute_fit(ImageFit::Contain, CENTER, 32.0 / 9.0, 16.0 / 9.0);
        assert!(close(f.quad_scale, Vec2::new(1.0, 0.5)));
        assert!(close(f.quad_offset, Vec2::ZERO));
        assert_eq!(f.uv_scale, Vec2::ONE);
    }

    #[test]
    fn contain_pillarbox_follows_position() {
        let left = ImagePosition { x: 0.0, y: 50.0 };
        let f = compute_fit(ImageFit::Contain, left, 1.0, 2.0);
        assert!(close(f.quad_scale, Vec2::new(0.5, 1.0)));
        assert!(close(f.quad_offset, Vec2::new(-0.5, 0.0)));
    }

    #[test]
    fn matching_aspect_needs_no_adjustment() {
        for fit in [ImageFit::Cover, ImageFit::Contain] {
            let f = compute_fit(fit, CENTER, 1.5, 1.5);
            assert!(close(f.uv_scale, Vec2::ONE) && close(f.quad_scale, Vec2::ONE));
        }
    }

    #[test]
    fn degenerate_aspect_falls_back_to_identity() {
        assert_eq!(compute_fit(ImageFit::Cover, CENTER, 0.0, 1.0), FitTransform::IDENTITY);
        assert_eq!(compute_fit(ImageFit::Contain, CENTER, 1.0, f32::NAN), FitTransform::IDENTITY);
    }
}
