//! Text rendering of patterns on the grid layout

use crate::grid::{GridGraph, NodeId};
use crate::pattern::Pattern;

const ON: char = '●';
const OFF: char = '○';
const EMPTY_STEP: &str = "·";

/// Render `pattern` as side-by-side dot and step-number grids
///
/// Returns one line per grid row, or a single arrow-joined line for graphs
/// without a square layout.
pub fn render_pattern(graph: &GridGraph, pattern: &Pattern) -> Vec<String> {
    let Some(side) = graph.side() else {
        return vec![pattern.labels(graph).join(" -> ")];
    };
    let side = side as usize;

    let mut steps: Vec<Option<usize>> = vec![None; graph.node_count()];
    for (step, &id) in pattern.nodes().iter().enumerate() {
        steps[id as usize] = Some(step + 1);
    }
    let width = pattern.len().to_string().len();

    (0..side)
        .map(|row| {
            let ids = (row * side..(row + 1) * side).map(|i| i as NodeId);
            let dots: String = ids
                .clone()
                .map(|id| if steps[id as usize].is_some() { ON } else { OFF })
                .collect();
            let numbers: Vec<String> = ids
                .map(|id| match steps[id as usize] {
                    Some(step) => format!("{:>width$}", step, width = width),
                    None => format!("{:>width$}", EMPTY_STEP, width = width),
                })
                .collect();
            format!("{}    {}", dots, numbers.join(" "))
        })
        .collect()
}
