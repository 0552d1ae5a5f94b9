//! Assessment scenarios built from presence cells and a criteria literal.

use crate::{grid, presence, table};
use hra_core::{Feature, GridSpec, Raster, RasterStore, VectorLayer};
use hra_criteria::{Inventory, Table};
use indexmap::IndexMap;

/// Criteria for one habitat (`seagrass`) and one stressor (`shipping`):
/// exposure rating 2, consequence rating 3, resilience rating 3, all with
/// unit data quality and weight.
pub const SINGLE_PAIR_CRITERIA: &str = "\
HABITAT NAME,seagrass,,,CRITERIA TYPE
HABITAT RESILIENCE ATTRIBUTES,Rating,DQ,Weight,E/C
recruitment,3,1,1,C
,,,,
HABITAT STRESSOR OVERLAP PROPERTIES,,,,
shipping,Rating,DQ,Weight,E/C
intensity,2,1,1,E
damage,3,1,1,C";

/// Criteria for habitats `seagrass` and `kelp` against stressors
/// `shipping` and `dredging`.
pub const TWO_BY_TWO_CRITERIA: &str = "\
HABITAT NAME,seagrass,,,kelp,,,CRITERIA TYPE
HABITAT RESILIENCE ATTRIBUTES,Rating,DQ,Weight,Rating,DQ,Weight,E/C
recruitment,3,1,1,2,1,1,C
natural mortality,2,2,1,1,1,1,C
,,,,,,,
HABITAT STRESSOR OVERLAP PROPERTIES,,,,,,,
shipping,Rating,DQ,Weight,Rating,DQ,Weight,E/C
intensity,2,1,1,3,1,1,E
damage,3,1,1,2,2,1,C
dredging,Rating,DQ,Weight,Rating,DQ,Weight,E/C
frequency,1,1,1,3,1,2,E
damage,2,1,1,3,1,1,C";

/// Layers, inventory and criteria for one end-to-end assessment.
///
/// Each layer's source name is `<name>.tif`. Layers start as presence
/// rasters to seed into a store; [`as_vectors`](Scenario::as_vectors)
/// turns them into vector sources instead.
#[derive(Clone, Debug)]
pub struct Scenario {
    pub grid: GridSpec,
    pub inventory: Inventory,
    pub criteria: Table,
    pub rasters: IndexMap<String, Raster<u8>>,
    pub vectors: IndexMap<String, VectorLayer>,
}

impl Scenario {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            grid: grid(rows, cols),
            inventory: Inventory::new(),
            criteria: Table::default(),
            rasters: IndexMap::new(),
            vectors: IndexMap::new(),
        }
    }

    /// 3x3 grid, seagrass everywhere, shipping on the centre cell with a
    /// zero buffer, criteria from [`SINGLE_PAIR_CRITERIA`].
    pub fn single_pair() -> Self {
        let all: Vec<_> = (0..3).flat_map(|r| (0..3).map(move |c| (r, c))).collect();
        Self::new(3, 3)
            .habitat("seagrass", &all)
            .stressor("shipping", &[(1, 1)], 0.0)
            .criteria(SINGLE_PAIR_CRITERIA)
    }

    /// [`single_pair`](Scenario::single_pair) with a `buffer_m` buffer
    /// around the shipping cell.
    pub fn buffered_pair(buffer_m: f64) -> Self {
        let all: Vec<_> = (0..3).flat_map(|r| (0..3).map(move |c| (r, c))).collect();
        Self::new(3, 3)
            .habitat("seagrass", &all)
            .stressor("shipping", &[(1, 1)], buffer_m)
            .criteria(SINGLE_PAIR_CRITERIA)
    }

    /// 6x6 grid with two overlapping habitats and two stressors, criteria
    /// from [`TWO_BY_TWO_CRITERIA`].
    pub fn two_by_two() -> Self {
        let left: Vec<_> = (0..6).flat_map(|r| (0..4).map(move |c| (r, c))).collect();
        let right: Vec<_> = (0..6).flat_map(|r| (2..6).map(move |c| (r, c))).collect();
        Self::new(6, 6)
            .habitat("seagrass", &left)
            .habitat("kelp", &right)
            .stressor("shipping", &[(0, 0), (0, 1)], 2.0)
            .stressor("dredging", &[(5, 5)], 3.0)
            .criteria(TWO_BY_TWO_CRITERIA)
    }

    pub fn habitat(mut self, name: &str, cells: &[(usize, usize)]) -> Self {
        let source = format!("{name}.tif");
        self.inventory = self.inventory.with_habitat(name, source.clone());
        self.rasters
            .insert(source, presence(self.grid.rows(), self.grid.cols(), cells));
        self
    }

    pub fn stressor(mut self, name: &str, cells: &[(usize, usize)], buffer_m: f64) -> Self {
        let source = format!("{name}.tif");
        self.inventory = self.inventory.with_stressor(name, source.clone(), buffer_m);
        self.rasters
            .insert(source, presence(self.grid.rows(), self.grid.cols(), cells));
        self
    }

    pub fn criteria(mut self, csv: &str) -> Self {
        self.criteria = table(csv);
        self
    }

    /// Replace every raster source with a one-feature vector layer
    /// covering the same cells.
    pub fn as_vectors(mut self) -> Self {
        for (source, raster) in self.rasters.drain(..) {
            let cells = (0..raster.data().len())
                .filter(|&i| raster.is_present(i))
                .map(|i| self.grid.coords(i))
                .collect();
            self.vectors.insert(
                source,
                VectorLayer::new(self.grid, vec![Feature::new(0, cells)]),
            );
        }
        self
    }

    /// Write the raster sources into `store`.
    pub fn seed(&self, store: &dyn RasterStore) {
        for (source, raster) in &self.rasters {
            store
                .put(source.as_str().into(), raster.clone().into())
                .expect("scenario sources are written once");
        }
    }
}
