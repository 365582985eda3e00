//! Stack offsets for hit objects placed on top of each other.
//!
//! Objects that sit on the same spot within a short time of each other are
//! shifted up and left by one step per stack level so they stay readable.
//! Circles under the end of a slider are shifted the other way.

use crate::beatmap::{HitObject, HitObjectKind, Position};

/// Objects closer than this (osu!pixels) share a spot
const STACK_DISTANCE: f32 = 3.0;

/// Diagonal shift in osu!pixels for `stack_height` at `circle_size`
pub fn stack_offset(stack_height: i32, circle_size: f32) -> f32 {
    let scale = (1.0 - 0.7 * (circle_size - 5.0) / 5.0) / 2.0;
    stack_height as f32 * scale * -6.4
}

fn is_circle(object: &HitObject) -> bool {
    matches!(object.kind, HitObjectKind::Circle)
}

fn is_slider(object: &HitObject) -> bool {
    matches!(object.kind, HitObjectKind::Slider { .. })
}

/// Stack level of every object. `end_positions[i]` is where object `i`
/// finishes: the curve tail for sliders with an odd span count, otherwise
/// the object's own position.
pub fn stack_heights(
    objects: &[HitObject],
    end_positions: &[Position],
    stack_threshold: f64,
) -> Vec<i32> {
    let mut heights = vec![0; objects.len()];

    let Some(last) = objects.len().checked_sub(1) else {
        return heights;
    };

    for i in (1..=last).rev() {
        let mut n = i;
        let mut top = i;

        if heights[top] != 0 || objects[top].is_spinner() {
            continue;
        }

        if is_circle(&objects[top]) {
            while let Some(prev) = n.checked_sub(1) {
                n = prev;
                if objects[n].is_spinner() {
                    continue;
                }

                if (objects[top].time - objects[n].end_time()) as f64 > stack_threshold {
                    break;
                }

                // Circles under the end of a slider stack downwards from it
                if is_slider(&objects[n])
                    && end_positions[n].distance(objects[top].position) < STACK_DISTANCE
                {
                    let offset = heights[top] - heights[n] + 1;
                    for j in n + 1..=i {
                        if end_positions[n].distance(objects[j].position) < STACK_DISTANCE {
                            heights[j] -= offset;
                        }
                    }
                    break;
                }

                if objects[n].position.distance(objects[top].position) < STACK_DISTANCE {
                    heights[n] = heights[top] + 1;
                    top = n;
                }
            }
        } else if is_slider(&objects[top]) {
            while let Some(prev) = n.checked_sub(1) {
                n = prev;
                if objects[n].is_spinner() {
                    continue;
                }

                if (objects[top].time - objects[n].time) as f64 > stack_threshold {
                    break;
                }

                if end_positions[n].distance(objects[top].position) < STACK_DISTANCE {
                    heights[n] = heights[top] + 1;
                    top = n;
                }
            }
        }
    }

    heights
}

/// Set each object's stack offset
pub fn apply_stacking(
    objects: &mut [HitObject],
    end_positions: &[Position],
    stack_threshold: f64,
    circle_size: f32,
) {
    let heights = stack_heights(objects, end_positions, stack_threshold);

    for (object, height) in objects.iter_mut().zip(heights) {
        object.stack_offset = stack_offset(height, circle_size);
    }
}
