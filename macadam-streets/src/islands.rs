//! Per-mode island pruning.
//!
//! Routing must not depend on unreachable fragments, so for each mode we
//! compute strongly connected components over the mode's permitted edges
//! and strip the permission from every edge touching a component smaller
//! than [`MIN_COMPONENT_SIZE`]. Vertices are never removed.
//!
//! Components are found with Tarjan's algorithm driven by an explicit
//! work stack, so memory stays bounded on long chains where recursion
//! would not.

use bit_set::BitSet;
use tracing::debug;

use crate::layer::StreetLayer;
use crate::{EdgeId, Mode, StoreError, VertexId};

/// Components below this vertex count lose the mode's permission.
pub const MIN_COMPONENT_SIZE: usize = 40;

const UNDISCOVERED: i32 = -1;

/// Prunes islands for every mode.
///
/// Pedestrian pruning runs before bicycle pruning: cyclists may push
/// their bike across pedestrian-only edges, so the bicycle graph's
/// connectivity depends on which pedestrian permissions survive.
///
/// # Errors
///
/// Fails only when invoked on an overlay whose baseline edges would need
/// stripping; pruning is a baseline build step.
pub fn prune_all(layer: &mut StreetLayer) -> Result<(), StoreError> {
    for mode in [Mode::Walk, Mode::Bicycle, Mode::Car] {
        prune_mode(layer, mode)?;
    }
    Ok(())
}

/// Prunes small components for one mode and returns the number of
/// directed edges that lost the permission.
///
/// # Errors
///
/// See [`prune_all`].
pub fn prune_mode(layer: &mut StreetLayer, mode: Mode) -> Result<u32, StoreError> {
    let components = strong_components(layer, mode);

    let mut stripped = 0u32;
    let mut islands = 0u32;
    for component in components {
        if component.len() >= MIN_COMPONENT_SIZE {
            continue;
        }
        islands += 1;
        for &vertex in &component {
            let incident: Vec<EdgeId> = layer.incident_edges(vertex).collect();
            for edge in incident {
                let flag = mode.permission_flag();
                if layer.edge_store().has_flag(edge, flag) {
                    layer.edge_store_mut().remove_flag(edge, flag)?;
                    stripped += 1;
                }
            }
        }
    }
    debug!(?mode, islands, stripped, "pruned small components");
    Ok(stripped)
}

/// Edges a traveler of `mode` can leave a vertex through. Bicycles may
/// also push through pedestrian-permitted edges.
fn traversable(layer: &StreetLayer, edge: EdgeId, mode: Mode) -> bool {
    let cursor = layer.edge_cursor(edge);
    cursor.allows(mode) || (mode == Mode::Bicycle && cursor.allows(Mode::Walk))
}

fn successors(layer: &StreetLayer, vertex: VertexId, mode: Mode) -> Vec<VertexId> {
    layer
        .outgoing_edges(vertex)
        .filter(|&edge| traversable(layer, edge, mode))
        .map(|edge| layer.edge_cursor(edge).to_vertex())
        .collect()
}

/// Tarjan's strongly connected components with an explicit work stack.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn strong_components(layer: &StreetLayer, mode: Mode) -> Vec<Vec<VertexId>> {
    let n = layer.n_vertices() as usize;
    let mut discovery = vec![UNDISCOVERED; n];
    let mut low_link = vec![UNDISCOVERED; n];
    let mut next_index = 0i32;

    let mut tarjan_stack: Vec<VertexId> = Vec::new();
    let mut on_tarjan_stack = BitSet::with_capacity(n);
    let mut work: Vec<VertexId> = Vec::new();
    let mut components = Vec::new();

    for root in 0..layer.n_vertices() {
        if discovery[root as usize] != UNDISCOVERED {
            continue;
        }
        work.push(root);

        while let Some(vertex) = work.pop() {
            let v = vertex as usize;
            if discovery[v] == UNDISCOVERED {
                discovery[v] = next_index;
                low_link[v] = next_index;
                next_index += 1;
                tarjan_stack.push(vertex);
                on_tarjan_stack.insert(v);
                // Revisit after the successors are done.
                work.push(vertex);

                for w in successors(layer, vertex, mode) {
                    if discovery[w as usize] == UNDISCOVERED {
                        work.push(vertex);
                        work.push(w);
                    } else if on_tarjan_stack.contains(w as usize) {
                        low_link[v] = low_link[v].min(discovery[w as usize]);
                    }
                }
            } else if on_tarjan_stack.contains(v) {
                // Post-processing: fold in the low links of the subtree.
                // Only safe once every successor has been discovered;
                // earlier revisits (one is queued per successor) skip.
                let children = successors(layer, vertex, mode);
                if children
                    .iter()
                    .any(|&w| discovery[w as usize] == UNDISCOVERED)
                {
                    continue;
                }
                for w in children {
                    let w = w as usize;
                    if discovery[w] > discovery[v] {
                        low_link[v] = low_link[v].min(low_link[w]);
                    }
                }
                if low_link[v] == discovery[v] {
                    let mut component = Vec::new();
                    while let Some(member) = tarjan_stack.pop() {
                        on_tarjan_stack.remove(member as usize);
                        component.push(member);
                        if member == vertex {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
    }
    components
}
