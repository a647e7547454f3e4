use super::{LayeredNode, Layers};
use crate::sizes::sanitized_size;
use crate::{LayoutParameters, NodeHandle, NodeSizes, Point};

/// Assign coordinates to every arena node, dummies included
///
/// Each layer is laid out left to right using cumulative width plus
/// `node_spacing` and centered around x = 0; `y = layer * layer_spacing`.
/// Dummy nodes have zero width.
pub(crate) fn assign_coordinates<N, S>(
    layers: &Layers<N>,
    sizes: &S,
    params: &LayoutParameters,
) -> Vec<Point>
where
    N: NodeHandle,
    S: NodeSizes<N>,
{
    let widths: Vec<f32> = layers
        .nodes
        .iter()
        .map(|node| node.handle().map_or(0.0, |handle| sanitized_size(sizes, handle).x))
        .collect();

    let mut points = vec![Point::origin(); layers.nodes.len()];

    // First pass: centered rows
    assign_rows(&layers.layers, &widths, params, &mut points);

    // Second pass: pull nodes toward their neighbours
    if params.alignment_iterations > 0 {
        align_to_neighbors(layers, &widths, params, &mut points);
        recenter_horizontally(&mut points);
    }

    points
}

fn assign_rows(rows: &[Vec<usize>], widths: &[f32], params: &LayoutParameters, points: &mut [Point]) {
    for (layer_index, row) in rows.iter().enumerate() {
        let gaps = row.len().saturating_sub(1) as f32 * params.node_spacing;
        let total: f32 = row.iter().map(|&node| widths[node]).sum::<f32>() + gaps;
        let y = layer_index as f32 * params.layer_spacing;

        let mut left = -total / 2.0;
        for &node in row {
            points[node] = Point::new(left + widths[node] / 2.0, y);
            left += widths[node] + params.node_spacing;
        }
    }
}

/// Alternating downward/upward sweeps moving each node to the barycenter of
/// its neighbours in the previously swept layer, keeping the order and the
/// minimum spacing within each layer
fn align_to_neighbors<N>(
    layers: &Layers<N>,
    widths: &[f32],
    params: &LayoutParameters,
    points: &mut [Point],
) where
    N: NodeHandle,
{
    let layer_count = layers.layers.len();

    for iteration in 0..params.alignment_iterations {
        let mut changed = false;
        let downward = iteration % 2 == 0;
        let sweep: Vec<usize> = if downward {
            (1..layer_count).collect()
        } else {
            (0..layer_count.saturating_sub(1)).rev().collect()
        };

        for layer_index in sweep {
            let row = &layers.layers[layer_index];
            for &node in row {
                let Some(new_x) = calculate_barycenter(&layers.nodes[node], points, downward)
                else {
                    continue;
                };

                if (new_x - points[node].x).abs() > 0.1 {
                    points[node].x = new_x;
                    changed = true;
                }
            }

            // Enforce minimum horizontal distance between nodes
            for pair in row.windows(2) {
                let (prev, curr) = (pair[0], pair[1]);
                let min_x =
                    points[prev].x + (widths[prev] + widths[curr]) / 2.0 + params.node_spacing;
                if points[curr].x < min_x {
                    points[curr].x = min_x;
                    changed = true;
                }
            }
        }

        if !changed {
            break;
        }
    }
}

/// Calculate the barycenter (average x) of the neighbours on the layer above
/// (`upward_neighbors`) or below
fn calculate_barycenter<N>(
    node: &LayeredNode<N>,
    points: &[Point],
    upward_neighbors: bool,
) -> Option<f32> {
    let neighbors = if upward_neighbors {
        &node.incoming
    } else {
        &node.outgoing
    };

    if neighbors.is_empty() {
        return None;
    }
    let sum_x: f32 = neighbors.iter().map(|&n| points[n].x).sum();
    Some(sum_x / neighbors.len() as f32)
}

/// Shift every point so the drawing is centered around x = 0
fn recenter_horizontally(points: &mut [Point]) {
    let (min_x, max_x) = points
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), p| {
            (min.min(p.x), max.max(p.x))
        });
    if !min_x.is_finite() || !max_x.is_finite() {
        return;
    }

    let offset = (min_x + max_x) / 2.0;
    for point in points {
        point.x -= offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn rows_are_centered_with_cumulative_widths() {
        let widths = [10.0, 30.0, 20.0];
        let params = LayoutParameters::default()
            .with_node_spacing(5.0)
            .with_layer_spacing(50.0);
        let mut points = vec![Point::origin(); 3];

        assign_rows(&[vec![0, 1], vec![2]], &widths, &params, &mut points);

        // Row 0 spans 10 + 5 + 30 = 45, from -22.5 to 22.5
        assert_eq!(points[0], Point::new(-17.5, 0.0));
        assert_eq!(points[1], Point::new(7.5, 0.0));
        assert_eq!(points[2], Point::new(0.0, 50.0));
    }

    #[test]
    fn recentering_balances_extremes() {
        let mut points = vec![Point::new(10.0, 0.0), Point::new(30.0, 5.0)];
        recenter_horizontally(&mut points);
        assert_eq!(points[0].x, -10.0);
        assert_eq!(points[1].x, 10.0);
        assert_eq!(points[1].y, 5.0);
    }
}
