//! container types for field data attached to points and cells

use crate::Error;

/// A named, multi-component array of values.
///
/// Values are stored tuple-major: the components of the first tuple come first,
/// followed by the components of the second tuple, and so on. This is the layout
/// every mesh source in practice hands over.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldArray {
    pub name: Option<String>,
    pub components: usize,
    pub values: Vec<f64>,
}

impl FieldArray {
    /// a named single-component array
    pub fn scalar<T: Into<String>>(name: T, values: Vec<f64>) -> Self {
        Self {
            name: Some(name.into()),
            components: 1,
            values,
        }
    }

    /// a named array with `components` values per tuple
    pub fn vector<T: Into<String>>(name: T, components: usize, values: Vec<f64>) -> Self {
        Self {
            name: Some(name.into()),
            components,
            values,
        }
    }

    /// an array without a name, a generated name is used when it is written
    pub fn unnamed(components: usize, values: Vec<f64>) -> Self {
        Self {
            name: None,
            components,
            values,
        }
    }

    /// number of tuples in the array
    pub fn tuples(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.values.len() / self.components
        }
    }

    /// get a single component of a single tuple
    pub fn component(&self, tuple: usize, component: usize) -> f64 {
        self.values[tuple * self.components + component]
    }

    /// iterate over a single component for every tuple in order
    pub fn component_iter(&self, component: usize) -> impl Iterator<Item = f64> + '_ {
        self.values
            .iter()
            .skip(component)
            .step_by(self.components.max(1))
            .copied()
    }

    /// check that the array holds exactly `tuples` complete tuples
    pub(crate) fn check_tuples(&self, tuples: usize, what: &str) -> Result<(), Error> {
        let name = self.name.as_deref().unwrap_or("<unnamed>");

        if self.components == 0 {
            return Err(Error::InvalidInput(format!(
                "{what} array `{name}` has zero components"
            )));
        }

        if self.values.len() != tuples * self.components {
            return Err(Error::InvalidInput(format!(
                "{what} array `{name}` holds {} values, expected {} ({} tuples x {} components)",
                self.values.len(),
                tuples * self.components,
                tuples,
                self.components
            )));
        }

        Ok(())
    }
}

/// Types that can be flattened into a list of field arrays.
///
/// This is most easily implemented with the derive macro, which turns every named
/// `Vec<f64>` field into one array:
///
/// ```ignore
/// #[derive(gridwrite::FieldData)]
/// struct Flow {
///     pressure: Vec<f64>,
///     #[field(components = 3, rename = "Velocity")]
///     velocity: Vec<f64>,
/// }
/// ```
pub trait FieldData {
    fn field_arrays(&self) -> Vec<FieldArray>;
}

impl FieldData for Vec<FieldArray> {
    fn field_arrays(&self) -> Vec<FieldArray> {
        self.clone()
    }
}

impl FieldData for FieldArray {
    fn field_arrays(&self) -> Vec<FieldArray> {
        vec![self.clone()]
    }
}

/// The point-located and cell-located arrays of a dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub point_data: Vec<FieldArray>,
    pub cell_data: Vec<FieldArray>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// append all the arrays of `data` to the point-located arrays
    pub fn with_point_fields<D: FieldData>(mut self, data: &D) -> Self {
        self.point_data.extend(data.field_arrays());
        self
    }

    /// append all the arrays of `data` to the cell-located arrays
    pub fn with_cell_fields<D: FieldData>(mut self, data: &D) -> Self {
        self.cell_data.extend(data.field_arrays());
        self
    }

    pub fn push_point(&mut self, array: FieldArray) {
        self.point_data.push(array);
    }

    pub fn push_cell(&mut self, array: FieldArray) {
        self.cell_data.push(array);
    }

    /// validate every array against the point and cell counts of its dataset
    pub(crate) fn check(&self, points: usize, cells: usize) -> Result<(), Error> {
        for array in &self.point_data {
            array.check_tuples(points, "point")?;
        }
        for array in &self.cell_data {
            array.check_tuples(cells, "cell")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_iteration() {
        let velocity = FieldArray::vector("Velocity", 3, vec![1., 2., 3., 4., 5., 6.]);
        assert_eq!(velocity.tuples(), 2);
        assert_eq!(velocity.component_iter(0).collect::<Vec<_>>(), vec![1., 4.]);
        assert_eq!(velocity.component_iter(2).collect::<Vec<_>>(), vec![3., 6.]);
        assert_eq!(velocity.component(1, 1), 5.);
    }

    #[test]
    fn tuple_check() {
        let pressure = FieldArray::scalar("p", vec![0.; 4]);
        assert!(pressure.check_tuples(4, "point").is_ok());
        assert!(pressure.check_tuples(3, "point").is_err());

        let empty = FieldArray::unnamed(0, vec![]);
        assert!(empty.check_tuples(0, "cell").is_err());
    }

    #[test]
    fn attributes_from_field_data() {
        let arrays = vec![FieldArray::scalar("a", vec![1.]), FieldArray::scalar("b", vec![2.])];
        let attributes = Attributes::new()
            .with_point_fields(&arrays)
            .with_cell_fields(&FieldArray::scalar("c", vec![3.]));

        assert_eq!(attributes.point_data.len(), 2);
        assert_eq!(attributes.cell_data.len(), 1);
        assert!(attributes.check(1, 1).is_ok());
        assert!(attributes.check(2, 1).is_err());
    }
}
