//! Merging raw window hits into final boxes.
//!
//! Both policies are deterministic for a given input order; the detector
//! sorts raw hits before calling in here.

use super::result::{Detection, DetectionBox};

/// Convergence tolerance of one mean-shift step (squared, in kernel units).
const MODE_EPS: f64 = 1e-5;
const MAX_SHIFT_ITERATIONS: usize = 100;
/// Modes closer than this (squared, in kernel units) are the same mode.
const MODE_MERGE_DISTANCE: f64 = 1.0;
/// Mean-shift kernel widths at scale 1: centre x, centre y, log-scale.
const KERNEL_XY: (f64, f64) = (8.0, 16.0);
const KERNEL_LOG_SCALE: f64 = 0.262_364_264_467_491; // ln 1.3

fn similar(a: &DetectionBox, b: &DetectionBox, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    ((a.x - b.x) as f64).abs() <= delta
        && ((a.y - b.y) as f64).abs() <= delta
        && ((a.right() - b.right()) as f64).abs() <= delta
        && ((a.bottom() - b.bottom()) as f64).abs() <= delta
}

/// Label connected components of the similarity graph.
///
/// Labels are numbered in order of each class's first member.
fn partition(rects: &[DetectionBox], eps: f64) -> (Vec<usize>, usize) {
    let mut parent: Vec<usize> = (0..rects.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if similar(&rects[i], &rects[j], eps) {
                let ri = find(&mut parent, i);
                let rj = find(&mut parent, j);
                if ri != rj {
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    let mut label_of_root = vec![usize::MAX; rects.len()];
    let mut labels = Vec::with_capacity(rects.len());
    let mut classes = 0;
    for i in 0..rects.len() {
        let root = find(&mut parent, i);
        if label_of_root[root] == usize::MAX {
            label_of_root[root] = classes;
            classes += 1;
        }
        labels.push(label_of_root[root]);
    }
    (labels, classes)
}

/// Neighbour grouping.
///
/// Similar rectangles are clustered and averaged. Clusters with
/// `group_threshold` members or fewer are dropped, as are clusters sitting
/// inside a clearly stronger one. A threshold of zero returns the raw boxes.
pub fn group_rectangles(hits: &[Detection], group_threshold: usize, eps: f64) -> Vec<DetectionBox> {
    let rects: Vec<DetectionBox> = hits.iter().map(|d| d.rect).collect();
    if group_threshold == 0 || rects.is_empty() {
        return rects;
    }

    let (labels, classes) = partition(&rects, eps);
    let mut sums = vec![[0i64; 4]; classes];
    let mut counts = vec![0usize; classes];
    for (rect, &label) in rects.iter().zip(&labels) {
        let s = &mut sums[label];
        s[0] += rect.x as i64;
        s[1] += rect.y as i64;
        s[2] += rect.width as i64;
        s[3] += rect.height as i64;
        counts[label] += 1;
    }

    let averaged: Vec<DetectionBox> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let avg = |v: i64| (v as f64 / n as f64).round() as i32;
            DetectionBox::new(avg(s[0]), avg(s[1]), avg(s[2]), avg(s[3]))
        })
        .collect();

    let mut grouped = Vec::new();
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = counts[i];
        if n1 <= group_threshold {
            continue;
        }
        let swallowed = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = counts[j];
            if j == i || n2 <= group_threshold {
                return false;
            }
            let dx = (r2.width as f64 * eps).round() as i32;
            let dy = (r2.height as f64 * eps).round() as i32;
            let inside = r1.x >= r2.x - dx
                && r1.y >= r2.y - dy
                && r1.right() <= r2.right() + dx
                && r1.bottom() <= r2.bottom() + dy;
            inside && (n2 > n1.max(3) || n1 < 3)
        });
        if !swallowed {
            grouped.push(*r1);
        }
    }
    grouped
}

#[derive(Clone, Copy)]
struct ShiftPoint {
    pos: [f64; 3],
    weight: f64,
}

/// Kernel widths at the log-scale `z`: the spatial widths grow with scale.
fn kernel_at(z: f64) -> [f64; 3] {
    let s = z.exp();
    [KERNEL_XY.0 * s, KERNEL_XY.1 * s, KERNEL_LOG_SCALE]
}

/// Squared distance from `a` to `b` in units of `width`.
fn scaled_distance(a: &[f64; 3], b: &[f64; 3], width: &[f64; 3]) -> f64 {
    (0..3)
        .map(|k| {
            let d = (a[k] - b[k]) / width[k];
            d * d
        })
        .sum()
}

/// Kernel weight of `p` seen from `at`, normalised by the kernel size.
fn kernel_weight(p: &ShiftPoint, at: &[f64; 3], width: &[f64; 3]) -> f64 {
    let norm = (width[0] + width[1] + width[2]).sqrt();
    p.weight * (-scaled_distance(&p.pos, at, width) / 2.0).exp() / norm
}

/// One mean-shift step from `at`.
fn shift(points: &[ShiftPoint], at: &[f64; 3]) -> [f64; 3] {
    let mut ratio = [0.0f64; 3];
    let mut sum_weight = [0.0f64; 3];
    for p in points {
        let width = kernel_at(p.pos[2]);
        let w = kernel_weight(p, at, &width);
        for k in 0..3 {
            ratio[k] += w * p.pos[k] / width[k];
            sum_weight[k] += w / width[k];
        }
    }
    let mut next = *at;
    for k in 0..3 {
        if sum_weight[k] > 0.0 {
            next[k] = ratio[k] / sum_weight[k];
        }
    }
    next
}

fn move_to_mode(points: &[ShiftPoint], start: [f64; 3]) -> [f64; 3] {
    let mut at = start;
    for _ in 0..MAX_SHIFT_ITERATIONS {
        let next = shift(points, &at);
        let moved = scaled_distance(&next, &at, &kernel_at(at[2]));
        at = next;
        if moved <= MODE_EPS {
            break;
        }
    }
    at
}

/// Kernel density of all points at `mode`.
fn support(points: &[ShiftPoint], mode: &[f64; 3]) -> f64 {
    points
        .iter()
        .map(|p| kernel_weight(p, mode, &kernel_at(p.pos[2])))
        .sum()
}

/// Mean-shift grouping over (centre x, centre y, ln scale).
///
/// Every hit shifts to its density mode; nearby modes merge. A mode survives
/// when its kernel-weighted support exceeds `weight_threshold`. Boxes are one
/// window at the mode's scale, centred on the mode.
pub fn group_meanshift(hits: &[Detection], window: (u32, u32), weight_threshold: f64) -> Vec<DetectionBox> {
    let points: Vec<ShiftPoint> = hits
        .iter()
        .filter(|d| d.scale > 0.0)
        .map(|d| ShiftPoint {
            pos: [
                (d.rect.x + d.rect.right()) as f64 * 0.5,
                (d.rect.y + d.rect.bottom()) as f64 * 0.5,
                d.scale.ln(),
            ],
            weight: d.weight,
        })
        .collect();

    let mut modes: Vec<[f64; 3]> = Vec::new();
    for p in &points {
        let mode = move_to_mode(&points, p.pos);
        let known = modes
            .iter()
            .any(|m| scaled_distance(&mode, m, &kernel_at(m[2])) < MODE_MERGE_DISTANCE);
        if !known {
            modes.push(mode);
        }
    }

    let mut grouped = Vec::new();
    for mode in modes {
        if support(&points, &mode) <= weight_threshold {
            continue;
        }
        let scale = mode[2].exp();
        let w = (window.0 as f64 * scale) as i32;
        let h = (window.1 as f64 * scale) as i32;
        grouped.push(DetectionBox::new(
            (mode[0] - (w / 2) as f64) as i32,
            (mode[1] - (h / 2) as f64) as i32,
            w,
            h,
        ));
    }
    grouped
}
