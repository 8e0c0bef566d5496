//! Writing point and cell located field arrays as scalar solution fields.

use crate::array::FieldArray;
use crate::backend::{GridBackend, GridLocation, WriteContext};
use crate::section::CellToElementMap;
use crate::Error;

/// name of the vertex located solution
pub(crate) const POINT_SOLUTION: &str = "PointData";
/// name of the cell center located solution
pub(crate) const CELL_SOLUTION: &str = "CellData";

const SUFFIXES: [&str; 4] = ["X", "Y", "Z", "W"];

/// Name of one component of a field array once it is split into scalar fields.
///
/// ```
/// use gridwrite::component_field_name;
///
/// assert_eq!(component_field_name("Pressure", 0, 1), "Pressure");
/// assert_eq!(component_field_name("Velocity", 1, 3), "Velocity_Y");
/// assert_eq!(component_field_name("Stress", 5, 6), "Stress_C5");
/// ```
pub fn component_field_name(base: &str, component: usize, components: usize) -> String {
    if components == 1 {
        return base.to_string();
    }

    match SUFFIXES.get(component) {
        Some(suffix) => format!("{base}_{suffix}"),
        None => format!("{base}_C{component}"),
    }
}

fn array_name(array: &FieldArray, fallback: &str, index: usize) -> String {
    match array.name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{fallback}_{index}"),
    }
}

/// A zone that solutions are written into
#[derive(Debug, Clone, Copy)]
pub(crate) struct SolutionTarget {
    pub(crate) base: usize,
    pub(crate) zone: usize,
}

impl SolutionTarget {
    fn open(
        &self,
        backend: &mut dyn GridBackend,
        name: &str,
        location: GridLocation,
    ) -> Result<usize, Error> {
        backend
            .write_solution(self.base, self.zone, name, location)
            .context(|| format!("write_solution({name})"))
    }

    fn field(
        &self,
        backend: &mut dyn GridBackend,
        solution: usize,
        name: &str,
        values: &[f64],
    ) -> Result<(), Error> {
        backend
            .write_field(self.base, self.zone, solution, name, values)
            .context(|| format!("write_field({name})"))
    }
}

/// Write every point array, one scalar field per component, in original point order.
///
/// Returns the number of scalar fields written.
pub(crate) fn write_point_solution(
    backend: &mut dyn GridBackend,
    target: SolutionTarget,
    arrays: &[FieldArray],
) -> Result<usize, Error> {
    let solution = target.open(backend, POINT_SOLUTION, GridLocation::Vertex)?;

    let mut written = 0;
    for (index, array) in arrays.iter().enumerate() {
        let name = array_name(array, "PointArray", index);

        for component in 0..array.components {
            let values: Vec<f64> = array.component_iter(component).collect();
            let field = component_field_name(&name, component, array.components);
            target.field(backend, solution, &field, &values)?;
            written += 1;
        }
    }

    Ok(written)
}

/// Write every cell array in element order.
///
/// Each component is scattered into a zeroed buffer of `element_count` values, with
/// the value of input cell `c` stored at `cell_to_element[c] - 1`. Dropped cells leave
/// their position untouched.
pub(crate) fn write_cell_solution(
    backend: &mut dyn GridBackend,
    target: SolutionTarget,
    arrays: &[FieldArray],
    cell_to_element: &CellToElementMap,
    element_count: usize,
) -> Result<usize, Error> {
    let solution = target.open(backend, CELL_SOLUTION, GridLocation::CellCenter)?;

    let mut written = 0;
    for (index, array) in arrays.iter().enumerate() {
        let name = array_name(array, "CellArray", index);

        for component in 0..array.components {
            let values = scatter(array, component, cell_to_element, element_count);
            let field = component_field_name(&name, component, array.components);
            target.field(backend, solution, &field, &values)?;
            written += 1;
        }
    }

    Ok(written)
}

fn scatter(
    array: &FieldArray,
    component: usize,
    cell_to_element: &CellToElementMap,
    element_count: usize,
) -> Vec<f64> {
    let mut buffer = vec![0.0; element_count];

    for (cell, value) in array.component_iter(component).enumerate() {
        let position = match cell_to_element.get(cell) {
            Some(element) => (element - 1) as usize,
            None => continue,
        };
        if let Some(slot) = buffer.get_mut(position) {
            *slot = value;
        }
    }

    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, ZoneSize};

    fn zone(backend: &mut MemoryBackend, size: ZoneSize) -> SolutionTarget {
        let base = backend.write_base("Base", 3, 3).unwrap();
        let zone = backend.write_zone(base, "Zone0", &size).unwrap();
        SolutionTarget { base, zone }
    }

    #[test]
    fn suffixes() {
        let names: Vec<_> = (0..6).map(|c| component_field_name("V", c, 6)).collect();
        assert_eq!(names, vec!["V_X", "V_Y", "V_Z", "V_W", "V_C4", "V_C5"]);
        assert_eq!(component_field_name("T", 0, 1), "T");
    }

    #[test]
    fn point_arrays_split_by_component() {
        let mut backend = MemoryBackend::new();
        let target = zone(&mut backend, ZoneSize::Unstructured { vertices: 2, cells: 0 });

        let arrays = vec![
            FieldArray::vector("Velocity", 3, vec![1., 2., 3., 4., 5., 6.]),
            FieldArray::unnamed(1, vec![7., 8.]),
        ];
        let written = write_point_solution(&mut backend, target, &arrays).unwrap();
        assert_eq!(written, 4);

        let tree = backend.into_tree();
        let solution = tree.bases[0].zones[0].solution(POINT_SOLUTION).unwrap();
        assert_eq!(solution.location, GridLocation::Vertex);
        assert_eq!(solution.field("Velocity_X").unwrap().values, vec![1., 4.]);
        assert_eq!(solution.field("Velocity_Z").unwrap().values, vec![3., 6.]);
        assert_eq!(solution.field("PointArray_1").unwrap().values, vec![7., 8.]);
    }

    #[test]
    fn cell_values_follow_element_order() {
        let mut backend = MemoryBackend::new();
        let target = zone(&mut backend, ZoneSize::Unstructured { vertices: 6, cells: 3 });

        // triangles are numbered first, the ghost quad is dropped
        let mesh = crate::UnstructuredMesh::new(crate::Points::from_xyz(&[[0.; 3]; 6]))
            .with_cell(crate::CellShape::Tri3, &[0, 1, 2])
            .with_cell(crate::CellShape::Quad4, &[0, 1, 2, 3])
            .with_cell(crate::CellShape::Quad4, &[2, 3, 4, 5])
            .with_cell(crate::CellShape::Tri3, &[3, 4, 5])
            .with_ghost(vec![0, 1, 0, 0]);
        let topology =
            crate::validate_topology(&mesh, &crate::ValidationPolicy::default()).unwrap();
        let layout = crate::build_sections(&topology);

        let arrays = vec![FieldArray::scalar("id", vec![10., 20., 30., 40.])];
        write_cell_solution(
            &mut backend,
            target,
            &arrays,
            &layout.cell_to_element,
            layout.element_count(),
        )
        .unwrap();

        let tree = backend.into_tree();
        let solution = tree.bases[0].zones[0].solution(CELL_SOLUTION).unwrap();
        assert_eq!(solution.field("id").unwrap().values, vec![10., 40., 30.]);
    }

    #[test]
    fn empty_solution_is_still_written() {
        let mut backend = MemoryBackend::new();
        let target = zone(&mut backend, ZoneSize::structured([2, 2, 1]));

        let written = write_cell_solution(
            &mut backend,
            target,
            &[],
            &CellToElementMap::identity(1),
            1,
        )
        .unwrap();
        assert_eq!(written, 0);

        let tree = backend.into_tree();
        assert!(tree.bases[0].zones[0].solution(CELL_SOLUTION).unwrap().fields.is_empty());
    }
}
