//! Connected components of the free space of a grid.

use std::collections::{BTreeMap, HashSet, VecDeque};

use glam::UVec2;
use log::debug;

use super::{Grid2d, Neighborhood, Traversable};

/// Component label; `0` marks blocked cells.
pub type ComponentUid = u32;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Component {
    pub uid: ComponentUid,
    pub cells: HashSet<UVec2>,
}

/// Labelling of free cells into connected components.
///
/// [`ConnectedComponents::update`] relabels incrementally: only components
/// touching a cell whose blocked state changed are dissolved and flooded
/// again. Untouched components keep their uid.
#[derive(Debug, Clone)]
pub struct ConnectedComponents {
    labels: Grid2d<ComponentUid>,
    components: BTreeMap<ComponentUid, Component>,
    neighborhood: Neighborhood,
    next_uid: ComponentUid,
}

impl ConnectedComponents {
    pub fn label<G: Traversable + ?Sized>(grid: &G, neighborhood: Neighborhood) -> Self {
        let mut components = Self {
            labels: Grid2d::filled(grid.info().clone(), 0),
            components: BTreeMap::new(),
            neighborhood,
            next_uid: 1,
        };
        components.flood_unlabelled(grid);
        components
    }

    /// Bring the labelling in line with `grid`.
    pub fn update<G: Traversable + ?Sized>(&mut self, grid: &G) {
        if grid.info() != self.labels.info() {
            *self = Self::label(grid, self.neighborhood);
            return;
        }

        let changed: Vec<UVec2> = self
            .labels
            .iter_cells()
            .filter(|(cell, label)| (**label != 0) == grid.is_blocked(*cell))
            .map(|(cell, _)| cell)
            .collect();
        if changed.is_empty() {
            return;
        }

        let mut dirty: HashSet<ComponentUid> = HashSet::new();
        for cell in &changed {
            dirty.insert(self.label_of(*cell));
            for neighbor in Neighborhood::Chessboard.all_neighbors(&self.labels, *cell) {
                dirty.insert(self.label_of(neighbor));
            }
        }
        dirty.remove(&0);

        for uid in &dirty {
            if let Some(component) = self.components.remove(uid) {
                for cell in component.cells {
                    let _ = self.labels.set(cell, 0);
                }
            }
        }
        for cell in changed {
            let _ = self.labels.set(cell, 0);
        }

        debug!(
            "[Components] relabelling after {} dissolved components",
            dirty.len()
        );
        self.flood_unlabelled(grid);
    }

    fn flood_unlabelled<G: Traversable + ?Sized>(&mut self, grid: &G) {
        let seeds: Vec<UVec2> = self
            .labels
            .iter_cells()
            .filter(|(cell, label)| **label == 0 && !grid.is_blocked(*cell))
            .map(|(cell, _)| cell)
            .collect();

        for seed in seeds {
            if self.label_of(seed) != 0 {
                continue;
            }
            let uid = self.next_uid;
            self.next_uid += 1;

            let mut cells = HashSet::new();
            let mut queue = VecDeque::from([seed]);
            let _ = self.labels.set(seed, uid);
            while let Some(cell) = queue.pop_front() {
                cells.insert(cell);
                for neighbor in self.neighborhood.free_neighbors(grid, cell) {
                    if self.label_of(neighbor.cell) == 0 {
                        let _ = self.labels.set(neighbor.cell, uid);
                        queue.push_back(neighbor.cell);
                    }
                }
            }
            self.components.insert(uid, Component { uid, cells });
        }
    }

    /// Component of a cell, `0` if blocked or outside the map.
    pub fn label_of(&self, cell: UVec2) -> ComponentUid {
        self.labels.get(cell).copied().unwrap_or(0)
    }

    pub fn component(&self, uid: ComponentUid) -> Option<&Component> {
        self.components.get(&uid)
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn labels(&self) -> &Grid2d<ComponentUid> {
        &self.labels
    }

    pub fn neighborhood(&self) -> Neighborhood {
        self.neighborhood
    }
}

impl Traversable for Grid2d<ComponentUid> {
    fn info(&self) -> &crate::types::MapInfo {
        self.info()
    }

    fn is_blocked(&self, cell: UVec2) -> bool {
        self.get(cell).is_none_or(|label| *label == 0)
    }
}
