use std::collections::BTreeMap;

use crate::error::MappingError;

/// Values of one named attribute, `dimension` floats per vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttribute {
    dimension: usize,
    values: Vec<f64>,
    assigned: Vec<bool>,
}

impl VertexAttribute {
    fn new(dimension: usize, nb_vertices: usize) -> Self {
        Self {
            dimension,
            values: vec![0.0; dimension * nb_vertices],
            assigned: vec![false; nb_vertices],
        }
    }

    pub(crate) fn from_parts(
        dimension: usize,
        values: Vec<f64>,
        assigned: Vec<bool>,
    ) -> Option<Self> {
        (values.len() == dimension * assigned.len()).then_some(Self {
            dimension,
            values,
            assigned,
        })
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Value at `vertex`, `None` when never assigned.
    #[must_use]
    pub fn value(&self, vertex: usize) -> Option<&[f64]> {
        if !*self.assigned.get(vertex)? {
            return None;
        }
        let start = vertex * self.dimension;
        self.values.get(start..start + self.dimension)
    }

    pub(crate) fn raw_values(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn assigned_flags(&self) -> &[bool] {
        &self.assigned
    }

    fn resize(&mut self, nb_vertices: usize) {
        self.values.resize(nb_vertices * self.dimension, 0.0);
        self.assigned.resize(nb_vertices, false);
    }
}

/// Named per-vertex attributes of a mesh.
///
/// Every attribute holds exactly one slot per mesh vertex; slots start
/// unassigned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexAttributes {
    nb_vertices: usize,
    attributes: BTreeMap<String, VertexAttribute>,
}

impl VertexAttributes {
    #[must_use]
    pub fn new(nb_vertices: usize) -> Self {
        Self {
            nb_vertices,
            attributes: BTreeMap::new(),
        }
    }

    /// Declares `name` with `dimension` values per vertex. Declaring an
    /// existing attribute with the same dimension is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::AttributeDimension`] if `name` exists with
    /// another dimension.
    pub fn declare(&mut self, name: &str, dimension: usize) -> Result<(), MappingError> {
        if let Some(existing) = self.attributes.get(name) {
            if existing.dimension != dimension {
                return Err(MappingError::AttributeDimension {
                    attribute: name.to_owned(),
                    expected: existing.dimension,
                    found: dimension,
                });
            }
            return Ok(());
        }
        self.attributes
            .insert(name.to_owned(), VertexAttribute::new(dimension, self.nb_vertices));
        Ok(())
    }

    /// Assigns `value` to `vertex`, declaring the attribute if needed.
    ///
    /// # Errors
    ///
    /// Returns an error on a dimension mismatch or an out-of-range vertex.
    pub fn set_value(&mut self, name: &str, vertex: usize, value: &[f64]) -> Result<(), MappingError> {
        if vertex >= self.nb_vertices {
            return Err(MappingError::InvalidTopology(format!(
                "vertex {vertex} out of range ({} vertices)",
                self.nb_vertices
            )));
        }
        self.declare(name, value.len())?;
        if let Some(attribute) = self.attributes.get_mut(name) {
            let start = vertex * attribute.dimension;
            attribute.values[start..start + attribute.dimension].copy_from_slice(value);
            attribute.assigned[vertex] = true;
        }
        Ok(())
    }

    /// Marks `vertex` as unassigned.
    pub fn unset_value(&mut self, name: &str, vertex: usize) {
        if let Some(flag) = self
            .attributes
            .get_mut(name)
            .and_then(|attribute| attribute.assigned.get_mut(vertex))
        {
            *flag = false;
        }
    }

    #[must_use]
    pub fn value(&self, name: &str, vertex: usize) -> Option<&[f64]> {
        self.attributes.get(name)?.value(vertex)
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.get(name)
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.attributes.keys().map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.attributes.remove(name).is_some()
    }

    pub(crate) fn insert_attribute(&mut self, name: String, attribute: VertexAttribute) -> bool {
        if attribute.assigned.len() != self.nb_vertices {
            return false;
        }
        self.attributes.insert(name, attribute);
        true
    }

    /// Follows a change of the mesh vertex count.
    pub(crate) fn resize(&mut self, nb_vertices: usize) {
        self.nb_vertices = nb_vertices;
        for attribute in self.attributes.values_mut() {
            attribute.resize(nb_vertices);
        }
    }

    /// Applies `f` to every assigned value of `name`.
    pub(crate) fn update_values<F>(&mut self, name: &str, mut f: F)
    where
        F: FnMut(&mut [f64]),
    {
        let Some(attribute) = self.attributes.get_mut(name) else {
            return;
        };
        let dimension = attribute.dimension;
        for (vertex, assigned) in attribute.assigned.iter().enumerate() {
            if *assigned {
                f(&mut attribute.values[vertex * dimension..(vertex + 1) * dimension]);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn values_start_unassigned() {
        let mut attributes = VertexAttributes::new(3);
        attributes.declare("thickness", 1).unwrap();
        assert!(attributes.has_attribute("thickness"));
        assert!(attributes.value("thickness", 0).is_none());
    }

    #[test]
    fn set_then_read_back() {
        let mut attributes = VertexAttributes::new(2);
        attributes.set_value("uv", 1, &[0.25, 0.75]).unwrap();
        assert_eq!(attributes.value("uv", 1), Some(&[0.25, 0.75][..]));
        assert!(attributes.value("uv", 0).is_none());
        attributes.unset_value("uv", 1);
        assert!(attributes.value("uv", 1).is_none());
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut attributes = VertexAttributes::new(2);
        attributes.set_value("uv", 0, &[0.0, 1.0]).unwrap();
        assert!(matches!(
            attributes.set_value("uv", 1, &[1.0]),
            Err(MappingError::AttributeDimension { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn out_of_range_vertex_is_rejected() {
        let mut attributes = VertexAttributes::new(1);
        assert!(attributes.set_value("t", 4, &[1.0]).is_err());
    }

    #[test]
    fn resize_keeps_existing_values() {
        let mut attributes = VertexAttributes::new(1);
        attributes.set_value("t", 0, &[3.0]).unwrap();
        attributes.resize(3);
        assert_eq!(attributes.value("t", 0), Some(&[3.0][..]));
        assert!(attributes.value("t", 2).is_none());
    }
}
