// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Box geometry helpers for pose decoding.

/// Calculate Intersection over Union (`IoU`) between two `[x1, y1, x2, y2]` boxes.
#[must_use]
pub fn calculate_iou(box1: &[f32; 4], box2: &[f32; 4]) -> f32 {
    let x1 = box1[0].max(box2[0]);
    let y1 = box1[1].max(box2[1]);
    let x2 = box1[2].min(box2[2]);
    let y2 = box1[3].min(box2[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area1 = box_area(box1);
    let area2 = box_area(box2);
    let union = area1 + area2 - intersection;

    if union <= 0.0 { 0.0 } else { intersection / union }
}

/// Area of an `[x1, y1, x2, y2]` box; zero for inverted boxes.
#[must_use]
pub fn box_area(b: &[f32; 4]) -> f32 {
    (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0)
}

/// Non-Maximum Suppression over `(bbox, score)` pairs.
///
/// Returns indices of kept boxes ordered by descending score. NaN scores sort
/// last.
#[must_use]
pub fn nms(boxes: &[([f32; 4], f32)], iou_threshold: f32) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..boxes.len()).collect();
    indices.sort_by(|&a, &b| boxes[b].1.total_cmp(&boxes[a].1));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; boxes.len()];

    for (pos, &i) in indices.iter().enumerate() {
        if suppressed[i] {
            continue;
        }
        keep.push(i);

        for &j in &indices[pos + 1..] {
            if !suppressed[j] && calculate_iou(&boxes[i].0, &boxes[j].0) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}
