/// Rasterize one polygon, given as a flat `[x0, y0, x1, y1, ...]` list, into
/// a column-major 0/1 mask of size h-by-w.
///
/// Uses the cocoapi scan-line scheme: each edge toggles the pixel it crosses
/// in every column it spans, then a prefix XOR down each column fills the
/// interior. Polygons with fewer than 3 vertices yield an empty mask.
pub fn rasterize_polygon(xy: &[f64], h: usize, w: usize) -> Vec<u8> {
    let n = h * w;
    let k = xy.len() / 2;
    if k < 3 {
        return vec![0u8; n];
    }

    let h_f = h as f64;
    let w_f = w as f64;

    let x: Vec<f64> = (0..k).map(|j| xy[2 * j].max(0.0)).collect();
    let y: Vec<f64> = (0..k).map(|j| xy[2 * j + 1].max(0.0).min(h_f)).collect();

    let mut mask = vec![0u8; n];

    for j in 0..k {
        let j_next = (j + 1) % k;

        let mut xs = x[j];
        let mut xe = x[j_next];
        let mut ys = y[j];
        let mut ye = y[j_next];

        // Walk the longer axis of the edge; `flip` means the primary axis is y.
        let flip = if (xe - xs).abs() >= (ye - ys).abs() {
            if xs > xe {
                std::mem::swap(&mut xs, &mut xe);
                std::mem::swap(&mut ys, &mut ye);
            }
            false
        } else {
            std::mem::swap(&mut xs, &mut ys);
            std::mem::swap(&mut xe, &mut ye);
            if xs > xe {
                std::mem::swap(&mut xs, &mut xe);
                std::mem::swap(&mut ys, &mut ye);
            }
            true
        };

        let slope = if xe == xs { 0.0 } else { (ye - ys) / (xe - xs) };

        let (bound_primary, bound_secondary) = if flip { (h_f, w_f) } else { (w_f, h_f) };
        let start = ((xs + 1.0).floor() as i64).max(0) as usize;
        let end = ((xe + 1.0).floor() as i64).min(bound_primary as i64).max(0) as usize;

        for d in start..end {
            let t = ys + slope * (d as f64 - xs);
            let t_int = if t < 0.0 {
                0
            } else if t >= bound_secondary {
                bound_secondary as usize - 1
            } else {
                t as usize
            };

            // toggle the crossing pixel, column-major
            let index = if flip { d + h * t_int } else { t_int + h * d };
            if index < n {
                mask[index] ^= 1;
            }
        }
    }

    // prefix XOR per column turns crossings into inside/outside runs
    for col in 0..w {
        let base = col * h;
        let mut inside = 0u8;
        for row in 0..h {
            inside ^= mask[base + row];
            mask[base + row] = inside;
        }
    }

    mask
}

/// Union of several polygons belonging to one object.
pub fn rasterize_polygons(polygons: &[Vec<f64>], h: usize, w: usize) -> Vec<u8> {
    let mut mask = vec![0u8; h * w];
    for polygon in polygons {
        for (dst, src) in mask.iter_mut().zip(rasterize_polygon(polygon, h, w)) {
            *dst |= src;
        }
    }
    mask
}
