//! The conversion driver: flatten, validate, then write every zone in order.

use crate::backend::{GridBackend, WriteContext, ZoneSize};
use crate::flatten::{flatten_zones, ZoneInput};
use crate::mesh::{DataObject, Dataset, UnstructuredMesh};
use crate::options::WriteOptions;
use crate::section::{build_sections, CellToElementMap, SectionLayout};
use crate::solution::{write_cell_solution, write_point_solution, SolutionTarget};
use crate::transaction::FileTransaction;
use crate::validate::{validate_dataset, ValidatedTopology};
use crate::zone::{cell_dimension, classify, extract_coordinates, physical_dimension, ZoneKind};
use crate::{record_outcome, Error};

use std::path::Path;

/// What was written for a single zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSummary {
    pub name: String,
    pub kind: ZoneKind,
    /// number of elements (unstructured) or cells (structured) in the zone
    pub element_count: usize,
    /// input cells that were not written, ghosts or tolerated unsupported shapes
    pub dropped_cells: usize,
    pub sections: usize,
    pub point_fields: usize,
    pub cell_fields: usize,
}

/// What a conversion wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub base_name: String,
    pub cell_dimension: u32,
    pub physical_dimension: u32,
    pub zones: Vec<ZoneSummary>,
}

impl WriteSummary {
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// elements over every zone
    pub fn element_count(&self) -> usize {
        self.zones.iter().map(|zone| zone.element_count).sum()
    }
}

/// a zone that passed validation
struct PlannedZone<'a> {
    input: ZoneInput<'a>,
    kind: ZoneKind,
    topology: Option<ValidatedTopology<'a>>,
}

/// Convert a dataset or composite into a grid file at `path`.
///
/// Every zone is validated before the file is created, so invalid input never leaves
/// a file behind. If writing fails part way, the partial file is removed. The
/// outcome is also recorded for [`last_error`](crate::last_error).
///
/// ```no_run
/// use gridwrite::{write_grid, CellShape, DataObject, Points, UnstructuredMesh, WriteOptions};
///
/// let points = Points::from_xyz(&[[0., 0., 0.], [1., 0., 0.], [0., 1., 0.], [0., 0., 1.]]);
/// let mesh = UnstructuredMesh::new(points).with_cell(CellShape::Tet4, &[0, 1, 2, 3]);
///
/// let summary = write_grid(&DataObject::from(mesh), "tet.grid", &WriteOptions::default())?;
/// assert_eq!(summary.element_count(), 1);
/// # Ok::<(), gridwrite::Error>(())
/// ```
pub fn write_grid<P: AsRef<Path>>(
    input: &DataObject,
    path: P,
    options: &WriteOptions,
) -> Result<WriteSummary, Error> {
    let result = write_file(input, path.as_ref(), options);
    record_outcome(&result);
    result
}

/// Convert a dataset or composite into an already opened backend, then close it.
pub fn write_to_backend(
    input: &DataObject,
    backend: &mut dyn GridBackend,
    options: &WriteOptions,
) -> Result<WriteSummary, Error> {
    let result = plan(input, options).and_then(|zones| {
        let summary = write_zones(&zones, backend, options)?;
        backend.close().context(|| "close".to_string())?;
        Ok(summary)
    });

    record_outcome(&result);
    result
}

/// Convert a single unstructured mesh.
///
/// Unlike [`write_grid`], a mesh without points or without cells is rejected instead
/// of producing a file with no zones.
pub fn write_unstructured<P: AsRef<Path>>(
    mesh: UnstructuredMesh,
    path: P,
    options: &WriteOptions,
) -> Result<WriteSummary, Error> {
    let result = check_single_mesh(&mesh)
        .and_then(|_| write_file(&DataObject::from(mesh), path.as_ref(), options));
    record_outcome(&result);
    result
}

/// like [`write_unstructured`], with an explicit zone name
pub(crate) fn write_named_unstructured(
    mesh: UnstructuredMesh,
    zone_name: &str,
    path: &Path,
    options: &WriteOptions,
) -> Result<WriteSummary, Error> {
    let result = check_single_mesh(&mesh).and_then(|_| {
        let dataset = Dataset::from(mesh);
        let zone = plan_zone(
            ZoneInput {
                dataset: &dataset,
                name: zone_name.to_string(),
            },
            options,
        )?;

        let mut transaction = FileTransaction::open(path, options)?;
        let summary = write_zones(&[zone], transaction.backend(), options)?;
        transaction.commit()?;
        Ok(summary)
    });

    record_outcome(&result);
    result
}

fn check_single_mesh(mesh: &UnstructuredMesh) -> Result<(), Error> {
    if mesh.point_count() == 0 {
        return Err(Error::InvalidInput("the mesh has no points".into()));
    }
    if mesh.cell_count() == 0 {
        return Err(Error::InvalidInput("the mesh has no cells".into()));
    }
    Ok(())
}

fn write_file(input: &DataObject, path: &Path, options: &WriteOptions) -> Result<WriteSummary, Error> {
    let zones = plan(input, options)?;

    let mut transaction = FileTransaction::open(path, options)?;
    let summary = write_zones(&zones, transaction.backend(), options)?;
    transaction.commit()?;

    tracing::info!(
        "wrote {} zones with {} elements to {}",
        summary.zone_count(),
        summary.element_count(),
        path.display()
    );

    Ok(summary)
}

/// flatten the input and validate every zone
fn plan<'a>(input: &'a DataObject, options: &WriteOptions) -> Result<Vec<PlannedZone<'a>>, Error> {
    let zones = flatten_zones(input, options.zone_prefix());
    if zones.is_empty() {
        return Err(Error::InvalidInput("no datasets found in input".into()));
    }

    zones
        .into_iter()
        .map(|zone| plan_zone(zone, options))
        .collect()
}

fn plan_zone<'a>(input: ZoneInput<'a>, options: &WriteOptions) -> Result<PlannedZone<'a>, Error> {
    let topology = validate_dataset(input.dataset, &options.validation_policy()).inspect_err(|_| {
        tracing::debug!("zone {} ({}) failed validation", input.name, input.dataset.kind());
    })?;

    Ok(PlannedZone {
        kind: classify(input.dataset),
        input,
        topology,
    })
}

fn write_zones(
    zones: &[PlannedZone<'_>],
    backend: &mut dyn GridBackend,
    options: &WriteOptions,
) -> Result<WriteSummary, Error> {
    let first = zones
        .first()
        .ok_or_else(|| Error::InvalidInput("no datasets found in input".into()))?;

    let cell_dim = cell_dimension(first.input.dataset);
    let phys_dim = physical_dimension(first.input.dataset);
    let base_name = options.base_name();

    let base = backend
        .write_base(base_name, cell_dim, phys_dim)
        .context(|| "write_base".to_string())?;

    let zones = zones
        .iter()
        .map(|zone| write_zone(backend, base, zone, options))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WriteSummary {
        base_name: base_name.to_string(),
        cell_dimension: cell_dim,
        physical_dimension: phys_dim,
        zones,
    })
}

fn write_zone(
    backend: &mut dyn GridBackend,
    base: usize,
    zone: &PlannedZone<'_>,
    options: &WriteOptions,
) -> Result<ZoneSummary, Error> {
    let span = tracing::debug_span!("zone", name = %zone.input.name);
    let _enter = span.enter();

    let dataset = zone.input.dataset;
    let layout: Option<SectionLayout> = zone.topology.as_ref().map(build_sections);

    let size = match zone.kind {
        ZoneKind::Structured { dims } => ZoneSize::structured(dims),
        ZoneKind::Unstructured { vertex_count, .. } => ZoneSize::Unstructured {
            vertices: vertex_count,
            cells: layout.as_ref().map(SectionLayout::element_count).unwrap_or(0),
        },
    };

    let zone_id = backend
        .write_zone(base, &zone.input.name, &size)
        .context(|| format!("write_zone({})", zone.kind.label()))?;

    // each zone keeps its own dimensionality, the base only records the first zone's
    let coordinates = extract_coordinates(dataset, physical_dimension(dataset));
    for (name, values) in coordinates.named() {
        backend
            .write_coordinate(base, zone_id, name, values)
            .context(|| format!("write_coordinate({name})"))?;
    }

    let sections = layout.as_ref().map(|l| l.sections.as_slice()).unwrap_or(&[]);
    for section in sections {
        backend
            .write_section(base, zone_id, section)
            .context(|| format!("write_section({})", section.name))?;
    }

    let target = SolutionTarget {
        base,
        zone: zone_id,
    };
    let attributes = dataset.attributes();

    let point_fields = if options.write_point_data {
        write_point_solution(backend, target, &attributes.point_data)?
    } else {
        0
    };

    let identity;
    let cell_to_element = match &layout {
        Some(layout) => &layout.cell_to_element,
        None => {
            identity = CellToElementMap::identity(dataset.cell_count());
            &identity
        }
    };

    let cell_fields = if options.write_cell_data {
        write_cell_solution(
            backend,
            target,
            &attributes.cell_data,
            cell_to_element,
            size.cell_count(),
        )?
    } else {
        0
    };

    let element_count = size.cell_count();
    let dropped_cells = dataset.cell_count() - cell_to_element.kept();

    tracing::debug!(
        "{} zone with {} vertices, {} elements in {} sections, {} dropped cells",
        zone.kind.label(),
        size.vertex_count(),
        element_count,
        sections.len(),
        dropped_cells
    );

    Ok(ZoneSummary {
        name: zone.input.name.clone(),
        kind: zone.kind,
        element_count,
        dropped_cells,
        sections: sections.len(),
        point_fields,
        cell_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GridLocation, MemoryBackend};
    use crate::mesh::{ImageData, Points, RectilinearGrid};
    use crate::shape::{CellShape, ElementType};
    use crate::{Attributes, FieldArray};

    fn tet() -> UnstructuredMesh {
        let points = Points::from_xyz(&[[0., 0., 0.], [1., 0., 0.], [0., 1., 0.], [0., 0., 1.]]);
        UnstructuredMesh::new(points).with_cell(CellShape::Tet4, &[0, 1, 2, 3])
    }

    #[test]
    fn single_tet_tree() {
        let mut backend = MemoryBackend::new();
        let summary =
            write_to_backend(&tet().into(), &mut backend, &WriteOptions::default()).unwrap();
        assert_eq!(summary.zone_count(), 1);
        assert_eq!(summary.cell_dimension, 3);

        let tree = backend.into_tree();
        let base = &tree.bases[0];
        assert_eq!((base.cell_dimension, base.physical_dimension), (3, 3));

        let zone = base.zone("Zone0").unwrap();
        assert_eq!(zone.size, ZoneSize::Unstructured { vertices: 4, cells: 1 });
        assert_eq!(zone.sections[0].element_type, ElementType::Tetra4);
        assert_eq!(zone.sections[0].connectivity, vec![1, 2, 3, 4]);
        assert_eq!(zone.coordinate("CoordinateZ").unwrap().values, vec![0., 0., 0., 1.]);

        // both solutions exist, even without arrays
        assert_eq!(zone.solutions.len(), 2);
        assert_eq!(zone.solutions[1].location, GridLocation::CellCenter);
    }

    #[test]
    fn solutions_can_be_disabled() {
        let mesh = tet().with_attributes(
            Attributes::new().with_point_fields(&FieldArray::scalar("T", vec![1., 2., 3., 4.])),
        );
        let options = WriteOptions::default()
            .with_point_data(false)
            .with_cell_data(false);

        let mut backend = MemoryBackend::new();
        let summary = write_to_backend(&mesh.into(), &mut backend, &options).unwrap();
        assert_eq!(summary.zones[0].point_fields, 0);
        assert!(backend.tree().bases[0].zones[0].solutions.is_empty());
    }

    #[test]
    fn composite_base_dimensions_follow_the_first_zone() {
        let plane = ImageData::new([3, 3, 1], [0.; 3], [1.; 3]);
        let line = RectilinearGrid::new(vec![0., 1., 2.], vec![0.], vec![0.]);
        let input = DataObject::composite([Dataset::from(plane), Dataset::from(line)]);

        let mut backend = MemoryBackend::new();
        let summary = write_to_backend(&input, &mut backend, &WriteOptions::default()).unwrap();
        assert_eq!(summary.cell_dimension, 2);
        assert_eq!(summary.physical_dimension, 3);

        let names: Vec<_> = summary.zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(names, vec!["Zone0", "Zone1"]);
        assert_eq!(summary.zones[0].element_count, 4);
        assert_eq!(summary.zones[1].element_count, 2);
    }

    #[test]
    fn empty_input_is_rejected() {
        let mut backend = MemoryBackend::new();
        let result = write_to_backend(
            &DataObject::Composite(vec![None]),
            &mut backend,
            &WriteOptions::default(),
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(backend.tree().bases.is_empty());
    }

    #[test]
    fn single_mesh_needs_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.grid");

        let mesh = UnstructuredMesh::new(Points::from_xyz(&[[0.; 3]; 3]));
        let result = write_unstructured(mesh, &path, &WriteOptions::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(!path.exists());
    }
}
