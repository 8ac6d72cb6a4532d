use super::types::MandelbrotParams;
use std::ops::Range;

/// Number of iterations before `z` leaves the radius-2 disc, or `max_iter`.
pub fn escape_time(c_re: f64, c_im: f64, max_iter: u32) -> u32 {
    let (mut z_re, mut z_im) = (0.0f64, 0.0f64);

    for n in 0..max_iter {
        if z_re * z_re + z_im * z_im > 4.0 {
            return n;
        }
        let next_re = z_re * z_re - z_im * z_im + c_re;
        z_im = 2.0 * z_re * z_im + c_im;
        z_re = next_re;
    }

    max_iter
}

/// Escape counts for `rows` of the image, row-major. Row 0 is `max_im`.
pub fn compute_rows(params: &MandelbrotParams, rows: Range<usize>) -> Vec<u32> {
    let vp = &params.viewport;
    let re_factor = step(vp.max_re - vp.min_re, params.width);
    let im_factor = step(vp.max_im - vp.min_im, params.height);

    let mut escape = Vec::with_capacity(rows.len() * params.width);
    for y in rows {
        let c_im = vp.max_im - y as f64 * im_factor;
        for x in 0..params.width {
            let c_re = vp.min_re + x as f64 * re_factor;
            escape.push(escape_time(c_re, c_im, params.max_iter));
        }
    }
    escape
}

fn step(span: f64, cells: usize) -> f64 {
    if cells > 1 {
        span / (cells - 1) as f64
    } else {
        0.0
    }
}
