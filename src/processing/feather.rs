//! Gaussian feathering of alpha transitions

use crate::types::AlphaMap;

/// Alpha difference that marks a hard pixel as sitting on a boundary
const EDGE_DELTA: f32 = 0.5;

/// Disk-shaped Gaussian kernel with `sigma = radius / 2`
///
/// Offsets never exceed `max_reach`; taps further out cannot land inside the map.
fn disk_kernel(radius: f32, max_reach: i64) -> Vec<(i64, i64, f32)> {
    let sigma = radius / 2.0;
    let denom = 2.0 * sigma * sigma;
    let reach = (radius.ceil() as i64).min(max_reach);

    let mut taps = Vec::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let dist_sq = (dx * dx + dy * dy) as f32;
            if dist_sq.sqrt() <= radius {
                taps.push((dx, dy, (-dist_sq / denom).exp()));
            }
        }
    }
    taps
}

fn is_edge(map: &AlphaMap, x: i64, y: i64, value: f32) -> bool {
    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || ny < 0 {
                continue;
            }
            if let Some(neighbor) = map.get(nx as u32, ny as u32) {
                if (neighbor - value).abs() > EDGE_DELTA {
                    return true;
                }
            }
        }
    }
    false
}

fn smoothed(map: &AlphaMap, kernel: &[(i64, i64, f32)], x: i64, y: i64) -> f32 {
    let mut sum = 0.0f32;
    let mut weight_sum = 0.0f32;
    for &(dx, dy, weight) in kernel {
        let (nx, ny) = (x + dx, y + dy);
        if nx < 0 || ny < 0 {
            continue;
        }
        if let Some(value) = map.get(nx as u32, ny as u32) {
            sum += value * weight;
            weight_sum += weight;
        }
    }
    if weight_sum > 0.0 {
        sum / weight_sum
    } else {
        0.0
    }
}

/// Soften alpha boundaries, returning a new map
///
/// Hard pixels (exactly 0 or 1) are only touched when a 3x3 neighbor in the
/// input differs by more than 0.5; partial pixels are always smoothed. All
/// reads come from `map`, never from values written in this pass.
/// A non-positive radius returns an unchanged copy.
#[must_use]
pub fn feather(map: &AlphaMap, radius: f32) -> AlphaMap {
    let mut output = map.clone();
    if !(radius > 0.0) || map.is_empty() {
        return output;
    }

    let max_reach = i64::from(map.width().max(map.height())) - 1;
    let kernel = disk_kernel(radius, max_reach);
    let width = map.width() as usize;

    for (index, (out, &value)) in output.values_mut().iter_mut().zip(map.values()).enumerate() {
        let x = (index % width) as i64;
        let y = (index / width) as i64;

        let hard = value == 0.0 || value == 1.0;
        if hard && !is_edge(map, x, y, value) {
            continue;
        }
        *out = smoothed(map, &kernel, x, y).clamp(0.0, 1.0);
    }

    output
}

/// Feather `map` in place
pub fn feather_in_place(map: &mut AlphaMap, radius: f32) {
    if !(radius > 0.0) {
        return;
    }
    *map = feather(map, radius);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half_split(width: u32, height: u32) -> AlphaMap {
        let values = (0..width * height)
            .map(|i| if i % width < width / 2 { 0.0 } else { 1.0 })
            .collect();
        AlphaMap::from_values(width, height, values).unwrap()
    }

    #[test]
    fn test_zero_radius_is_identity() {
        let map = half_split(8, 4);
        assert_eq!(feather(&map, 0.0), map);
        assert_eq!(feather(&map, -3.0), map);

        let mut in_place = map.clone();
        feather_in_place(&mut in_place, 0.0);
        assert_eq!(in_place, map);
    }

    #[test]
    fn test_kernel_reach_is_bounded_by_map() {
        assert_eq!(disk_kernel(2.0, 100).len(), 13);
        assert_eq!(disk_kernel(1.0e6, 1).len(), 9);
        assert_eq!(disk_kernel(1.0e6, 0).len(), 1);
    }

    #[test]
    fn test_huge_radius_on_tiny_map() {
        let map = AlphaMap::from_values(2, 1, vec![0.0, 1.0]).unwrap();
        let wide = feather(&map, 500.0);
        let huge = feather(&map, 20_000.0);

        for (a, b) in wide.values().iter().zip(huge.values()) {
            assert!((a - 0.5).abs() < 1e-3);
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_uniform_map_untouched() {
        let map = AlphaMap::opaque(6, 6);
        assert_eq!(feather(&map, 2.0), map);
    }

    #[test]
    fn test_edges_become_partial() {
        let map = half_split(10, 5);
        let out = feather(&map, 1.5);

        let left = out.get(4, 2).unwrap();
        let right = out.get(5, 2).unwrap();
        assert!(left > 0.0 && left < 0.5, "left edge {}", left);
        assert!(right > 0.5 && right < 1.0, "right edge {}", right);

        // Far from the boundary nothing changes
        assert_eq!(out.get(0, 2), Some(0.0));
        assert_eq!(out.get(9, 2), Some(1.0));
    }

    #[test]
    fn test_output_stays_in_unit_range() {
        let values = (0..64).map(|i| ((i * 37) % 11) as f32 / 10.0).collect();
        let map = AlphaMap::from_values(8, 8, values).unwrap();
        let out = feather(&map, 3.0);
        assert!(out.values().iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(out.dimensions(), map.dimensions());
    }

    #[test]
    fn test_partial_pixels_always_smoothed() {
        let mut values = vec![0.4f32; 9];
        values[4] = 0.6;
        let map = AlphaMap::from_values(3, 3, values).unwrap();
        let out = feather(&map, 1.0);
        let center = out.get(1, 1).unwrap();
        assert!(center < 0.6 && center > 0.4);
    }

    #[test]
    fn test_kernel_is_disk_shaped() {
        let kernel = disk_kernel(1.5, 64);
        // 3x3 block plus nothing at distance 2 since 2 > 1.5
        assert_eq!(kernel.len(), 9);
        assert!(kernel.iter().all(|&(dx, dy, _)| dx.abs() <= 1 && dy.abs() <= 1));
    }
}
