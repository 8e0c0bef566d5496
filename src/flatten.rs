//! Reduce a single dataset or a composite tree to the ordered list of zones to write.

use crate::mesh::{DataObject, Dataset};

/// A leaf dataset paired with the zone name it is written under
#[derive(Debug, Clone)]
pub struct ZoneInput<'a> {
    pub dataset: &'a Dataset,
    pub name: String,
}

/// Walk `input` depth first, visiting composite children in order, and name every
/// non-empty leaf `<prefix><n>` with `n` counting from 0.
///
/// Empty blocks and datasets without points are skipped and do not consume a number.
pub fn flatten_zones<'a>(input: &'a DataObject, prefix: &str) -> Vec<ZoneInput<'a>> {
    let mut leaves = Vec::new();
    collect_leaves(input, &mut leaves);

    leaves
        .into_iter()
        .enumerate()
        .map(|(index, dataset)| ZoneInput {
            dataset,
            name: format!("{prefix}{index}"),
        })
        .collect()
}

fn collect_leaves<'a>(object: &'a DataObject, leaves: &mut Vec<&'a Dataset>) {
    match object {
        DataObject::Dataset(dataset) => {
            if dataset.point_count() > 0 {
                leaves.push(dataset);
            }
        }
        DataObject::Composite(children) => {
            for child in children.iter().flatten() {
                collect_leaves(child, leaves);
            }
        }
    }
}
