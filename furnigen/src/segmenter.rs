//! Colored floor-plan image → [`Grid`] (`spec.md` §4.B).
//!
//! Pixel classification, per-colour 4-connected component labelling, and
//! majority-vote downsampling are implemented directly against the `image`
//! crate's buffer types, the same way `calx::stego` reaches straight for
//! `image::{RgbImage, Pixel}` rather than wrapping it in another abstraction
//! layer.

use std::collections::{HashMap, VecDeque};

use image::{Rgb, RgbImage};
use log::{debug, info};

use crate::error::{FurnigenError, Result};
use crate::geom::Cell;
use crate::grid::{Grid, GridBuilder};

/// Quantized RGB colour bucket: each channel divided by 64 (`spec.md` §4.B
/// step 3), giving at most 4×4×4 = 64 buckets.
type QuantColor = (u8, u8, u8);

/// Fraction of total image area a connected component must cover to be kept
/// as a candidate region, rather than rejected as noise.
const MIN_REGION_AREA_FRACTION: f64 = 0.003;
/// Chroma threshold below which a pixel is classified as wall/background.
const CHROMA_THRESHOLD: i32 = 40;
/// Channel value below which all three channels being under it means "near-black".
const NEAR_BLACK_THRESHOLD: u8 = 50;
/// Channel value above which all three channels being over it means "near-white".
const NEAR_WHITE_THRESHOLD: u8 = 220;

fn is_wall_or_background(p: Rgb<u8>) -> bool {
    let [r, g, b] = p.0;
    let near_black = r < NEAR_BLACK_THRESHOLD && g < NEAR_BLACK_THRESHOLD && b < NEAR_BLACK_THRESHOLD;
    let near_white = r > NEAR_WHITE_THRESHOLD && g > NEAR_WHITE_THRESHOLD && b > NEAR_WHITE_THRESHOLD;
    let chroma = (r as i32 - g as i32).abs() + (g as i32 - b as i32).abs() + (b as i32 - r as i32).abs();
    near_black || near_white || chroma < CHROMA_THRESHOLD
}

fn quantize(p: Rgb<u8>) -> QuantColor { (p.0[0] / 64, p.0[1] / 64, p.0[2] / 64) }

/// Pixel-grid label map plus how many distinct labels were assigned.
struct LabelMap {
    width: u32,
    height: u32,
    labels: Vec<i32>,
}

impl LabelMap {
    fn get(&self, x: u32, y: u32) -> i32 { self.labels[(y * self.width + x) as usize] }
    fn set(&mut self, x: u32, y: u32, v: i32) { self.labels[(y * self.width + x) as usize] = v; }
}

/// Classify pixels and run 4-connected component labelling per quantized
/// colour, rejecting blobs under [`MIN_REGION_AREA_FRACTION`] of the image
/// (`spec.md` §4.B steps 2–4).
fn label_regions(image: &RgbImage) -> LabelMap {
    let (width, height) = image.dimensions();
    let total_pixels = (width as u64 * height as u64) as f64;
    let min_area = (total_pixels * MIN_REGION_AREA_FRACTION).ceil() as u64;

    let mut quant: Vec<Option<QuantColor>> = Vec::with_capacity((width * height) as usize);
    for p in image.pixels() {
        quant.push(if is_wall_or_background(*p) { None } else { Some(quantize(*p)) });
    }

    let mut labels = LabelMap { width, height, labels: vec![0; (width * height) as usize] };
    let mut next_label = 1;
    let mut rejected_blobs = 0u32;

    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize;
            let Some(color) = quant[idx] else { continue };
            if labels.get(x, y) != 0 {
                continue;
            }

            // BFS flood-fill over 4-neighbors sharing this quantized colour.
            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            queue.push_back((x, y));
            labels.set(x, y, next_label);

            while let Some((cx, cy)) = queue.pop_front() {
                component.push((cx, cy));
                let neighbors = [
                    (cx.wrapping_sub(1), cy),
                    (cx + 1, cy),
                    (cx, cy.wrapping_sub(1)),
                    (cx, cy + 1),
                ];
                for (nx, ny) in neighbors {
                    if nx >= width || ny >= height {
                        continue;
                    }
                    let nidx = (ny * width + nx) as usize;
                    if quant[nidx] == Some(color) && labels.get(nx, ny) == 0 {
                        labels.set(nx, ny, next_label);
                        queue.push_back((nx, ny));
                    }
                }
            }

            if (component.len() as u64) < min_area {
                // Noise: un-label so it doesn't participate in the majority vote.
                for (cx, cy) in component {
                    labels.set(cx, cy, 0);
                }
                rejected_blobs += 1;
            } else {
                next_label += 1;
            }
        }
    }

    if rejected_blobs > 0 {
        debug!("segmenter: rejected {} sub-threshold noise blob(s)", rejected_blobs);
    }

    labels
}

/// Downsample the pixel label map to a `grid_width × grid_height` cell grid
/// by majority vote of nonzero labels inside each cell's pixel rectangle.
/// Cells with no nonzero vote are returned as `None` (`spec.md` §4.B step 5).
fn downsample(labels: &LabelMap, grid_width: u32, grid_height: u32) -> Vec<Vec<Option<i32>>> {
    let mut counts: Vec<Vec<HashMap<i32, u32>>> =
        vec![vec![HashMap::new(); grid_width as usize]; grid_height as usize];

    for y in 0..labels.height {
        let i = ((y as u64 * grid_height as u64) / labels.height as u64) as usize;
        let i = i.min(grid_height as usize - 1);
        for x in 0..labels.width {
            let label = labels.get(x, y);
            if label == 0 {
                continue;
            }
            let j = ((x as u64 * grid_width as u64) / labels.width as u64) as usize;
            let j = j.min(grid_width as usize - 1);
            *counts[i][j].entry(label).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell_counts| {
                    cell_counts
                        .into_iter()
                        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
                        .map(|(label, _)| label)
                })
                .collect()
        })
        .collect()
}

/// Rank used to pair detected regions with requested room names: higher
/// ranks are assigned to the largest regions first (`spec.md` §4.B step 7).
fn room_name_priority(name: &str) -> i32 {
    let lower = name.to_lowercase();
    if lower.contains("living") || lower.contains("lounge") {
        7
    } else if lower.contains("kitchen") || lower.contains("dining") {
        6
    } else if lower.contains("master") {
        5
    } else if lower.contains("bed") {
        4
    } else if lower.contains("hall") {
        2
    } else if lower.contains("bath") {
        1
    } else if lower.contains("storage") {
        0
    } else {
        3 // mid-priority default
    }
}

fn auto_name(area_m2: f64, suffix: usize) -> String {
    let base = if area_m2 > 15.0 {
        "living area"
    } else if area_m2 > 8.0 {
        "bedroom"
    } else if area_m2 > 3.0 {
        "bathroom"
    } else {
        "storage"
    };
    format!("{} {}", base, suffix)
}

/// Segment a colored floor-plan image into a fully populated [`Grid`].
///
/// `envelope_width_m` is the assumed physical width of the floor plan;
/// `cell_size_m` is the target grid cell side. `required_rooms`, if
/// non-empty, is paired by descending region size against the priority
/// table of `spec.md` §4.B step 7; any detected regions beyond the list are
/// auto-named by area bracket.
pub fn segment_floorplan(
    image: &RgbImage,
    envelope_width_m: f64,
    cell_size_m: f64,
    required_rooms: &[String],
) -> Result<Grid> {
    if image.width() == 0 || image.height() == 0 {
        return Err(FurnigenError::InputInvalid {
            component: crate::error::Component::Segmenter,
            message: "image has zero width or height".into(),
        });
    }

    let grid_width = (envelope_width_m / cell_size_m).round().max(1.0) as u32;
    let grid_height =
        ((image.height() as f64) * (grid_width as f64) / (image.width() as f64)).round().max(1.0) as u32;

    let labels = label_regions(image);
    let cell_labels = downsample(&labels, grid_width, grid_height);

    // Tally cell counts per label (region area, in cells).
    let mut cells_by_label: HashMap<i32, Vec<Cell>> = HashMap::new();
    for (i, row) in cell_labels.iter().enumerate() {
        for (j, label) in row.iter().enumerate() {
            if let Some(label) = label {
                cells_by_label.entry(*label).or_default().push(Cell::new(j as i32, i as i32));
            }
        }
    }

    if cells_by_label.is_empty() {
        return Err(FurnigenError::NoRoomsDetected);
    }

    let min_cells = (1.0 / (cell_size_m * cell_size_m)).ceil() as usize;
    let mut regions: Vec<(i32, Vec<Cell>)> = cells_by_label
        .into_iter()
        .filter(|(_, cells)| cells.len() >= min_cells)
        .collect();

    if regions.is_empty() {
        return Err(FurnigenError::NoRoomsDetected);
    }

    // Descending area; ties broken by ascending label (first-seen order).
    regions.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));

    let mut sorted_requested: Vec<&String> = required_rooms.iter().collect();
    sorted_requested.sort_by(|a, b| room_name_priority(b).cmp(&room_name_priority(a)));

    let mut builder = GridBuilder::new(grid_width, grid_height, cell_size_m);
    let mut used_names: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut room_owned: std::collections::HashSet<Cell> = std::collections::HashSet::new();
    let mut auto_suffix = 1usize;

    for (idx, (_label, cells)) in regions.into_iter().enumerate() {
        let area_m2 = cells.len() as f64 * cell_size_m * cell_size_m;
        let mut name = if let Some(requested) = sorted_requested.get(idx) {
            (*requested).clone()
        } else {
            auto_name(area_m2, auto_suffix)
        };

        while used_names.contains(&name) {
            name = format!("{} ({})", name, auto_suffix);
            auto_suffix += 1;
        }
        used_names.insert(name.clone());
        if sorted_requested.get(idx).is_none() {
            auto_suffix += 1;
        }

        info!("segmenter: region '{}' covers {:.1}m^2 ({} cells)", name, area_m2, cells.len());
        room_owned.extend(cells.iter().copied());
        builder.insert_room(name, cells);
    }

    // Unassigned cells inside the downsampled grid become passage cells
    // implicitly, including the open question noted in `spec.md` §9 about
    // gray boundary stripes being swallowed into this same bucket. Cells
    // from regions rejected as too small (below `min_cells`) fall back here
    // too, since they were never claimed by a kept room.
    let all_cells: Vec<Cell> = (0..grid_height as i32)
        .flat_map(|i| (0..grid_width as i32).map(move |j| Cell::new(j, i)))
        .collect();
    let passages: Vec<Cell> = all_cells.into_iter().filter(|c| !room_owned.contains(c)).collect();
    debug!("segmenter: {} cell(s) fell back to passage", passages.len());
    builder.insert_passages(passages);

    builder.finish()
}

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgb;

    fn solid(w: u32, h: u32, color: Rgb<u8>) -> RgbImage { RgbImage::from_pixel(w, h, color) }

    #[test]
    fn test_no_room_pixels_errors() {
        let image = solid(20, 20, Rgb([250, 250, 250]));
        let result = segment_floorplan(&image, 5.0, 0.5, &[]);
        assert!(matches!(result, Err(FurnigenError::NoRoomsDetected)));
    }

    #[test]
    fn test_two_colors_become_two_rooms() {
        let mut image = RgbImage::from_pixel(40, 20, Rgb([245, 245, 245]));
        for y in 0..20 {
            for x in 0..20 {
                image.put_pixel(x, y, Rgb([200, 60, 60]));
            }
            for x in 20..40 {
                image.put_pixel(x, y, Rgb([60, 60, 200]));
            }
        }
        let grid = segment_floorplan(&image, 4.0, 0.5, &[]).expect("segments");
        assert_eq!(grid.room_names().count(), 2);
    }
}
