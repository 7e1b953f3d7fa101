//! Serializable mirrors of the in-memory models.
//!
//! Points are stored as flat coordinate vectors and relation graphs as
//! ordered adjacency lists, so reloading restores every iteration order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crs::CrsInfo;
use crate::error::{PersistenceError, Result};
use crate::math::Point;
use crate::mesh::{ItemMesh, SimplexMesh, SimplicialMesh, VertexAttribute, VertexAttributes};
use crate::model::{GeologicalModel, ModelBuilder, Stratigraphic, StratigraphicBuilder};
use crate::stack::{HorizonsStack, HorizonsStackBuilder, StackState};
use crate::topology::{Component, RelationGraph};

#[derive(Debug, Serialize, Deserialize)]
struct AttributeSnapshot {
    name: String,
    dimension: usize,
    values: Vec<f64>,
    assigned: Vec<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MeshSnapshot {
    id: Uuid,
    simplex_size: usize,
    coordinates: Vec<f64>,
    elements: Vec<usize>,
    attributes: Vec<AttributeSnapshot>,
}

impl MeshSnapshot {
    fn capture<const D: usize>(id: Uuid, mesh: &dyn SimplicialMesh<D>) -> Self {
        let attributes = mesh.vertex_attributes();
        Self {
            id,
            simplex_size: mesh.simplex_size(),
            coordinates: mesh
                .points()
                .iter()
                .flat_map(|p| p.coords.iter().copied())
                .collect(),
            elements: (0..mesh.nb_elements())
                .filter_map(|e| mesh.element_vertices(e))
                .flatten()
                .copied()
                .collect(),
            attributes: attributes
                .names()
                .filter_map(|name| {
                    attributes.attribute(name).map(|attribute| AttributeSnapshot {
                        name: name.to_owned(),
                        dimension: attribute.dimension(),
                        values: attribute.raw_values().to_vec(),
                        assigned: attribute.assigned_flags().to_vec(),
                    })
                })
                .collect(),
        }
    }

    fn restore<const D: usize>(self) -> Result<ItemMesh<D>> {
        if self.coordinates.len() % D != 0 {
            return Err(PersistenceError::UnexpectedFormat.into());
        }
        let points: Vec<Point<D>> = self
            .coordinates
            .chunks_exact(D)
            .map(Point::<D>::from_slice)
            .collect();
        let mut attributes = VertexAttributes::new(points.len());
        for snapshot in self.attributes {
            let attribute =
                VertexAttribute::from_parts(snapshot.dimension, snapshot.values, snapshot.assigned)
                    .ok_or(PersistenceError::UnexpectedFormat)?;
            if !attributes.insert_attribute(snapshot.name, attribute) {
                return Err(PersistenceError::UnexpectedFormat.into());
            }
        }
        Ok(match self.simplex_size {
            2 => ItemMesh::Curve(simplex_mesh(points, &self.elements, attributes)?),
            3 => ItemMesh::Triangulated(simplex_mesh(points, &self.elements, attributes)?),
            4 => ItemMesh::Tetrahedral(simplex_mesh(points, &self.elements, attributes)?),
            _ => return Err(PersistenceError::UnexpectedFormat.into()),
        })
    }
}

fn simplex_mesh<const D: usize, const K: usize>(
    points: Vec<Point<D>>,
    elements: &[usize],
    attributes: VertexAttributes,
) -> Result<SimplexMesh<D, K>> {
    if elements.len() % K != 0 {
        return Err(PersistenceError::UnexpectedFormat.into());
    }
    let elements = elements
        .chunks_exact(K)
        .map(|chunk| <[usize; K]>::try_from(chunk).map_err(|_| PersistenceError::UnexpectedFormat))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let mut mesh = SimplexMesh::new(points, elements)?;
    mesh.set_attributes(attributes);
    Ok(mesh)
}

#[derive(Debug, Serialize, Deserialize)]
struct GraphSnapshot {
    children: Vec<(Uuid, Vec<Uuid>)>,
    parents: Vec<(Uuid, Vec<Uuid>)>,
}

impl GraphSnapshot {
    fn capture(graph: &RelationGraph) -> Self {
        Self {
            children: graph.children_lists(),
            parents: graph.parents_lists(),
        }
    }

    fn restore(self) -> Result<RelationGraph> {
        Ok(RelationGraph::from_lists(self.children, self.parents)
            .ok_or(PersistenceError::UnexpectedFormat)?)
    }
}

/// Payload of cross-section and structural-model files.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct ModelSnapshot {
    components: Vec<Component>,
    membership: GraphSnapshot,
    boundaries: GraphSnapshot,
    internals: GraphSnapshot,
    meshes: Vec<MeshSnapshot>,
    crs: Option<CrsInfo>,
}

impl ModelSnapshot {
    pub(super) fn capture<const D: usize>(model: &GeologicalModel<D>) -> Self {
        Self {
            components: model.catalog().iter().cloned().collect(),
            membership: GraphSnapshot::capture(model.membership()),
            boundaries: GraphSnapshot::capture(model.boundary_graph()),
            internals: GraphSnapshot::capture(model.internal_graph()),
            meshes: model
                .meshes()
                .map(|(id, mesh)| MeshSnapshot::capture(id, mesh.as_simplicial()))
                .collect(),
            crs: model.coordinate_reference_system().cloned(),
        }
    }

    pub(super) fn nb_components(&self) -> usize {
        self.components.len()
    }

    pub(super) fn restore<const D: usize>(self) -> Result<GeologicalModel<D>> {
        let mut model = GeologicalModel::new();
        let mut builder = ModelBuilder::new(&mut model);
        for component in self.components {
            builder.insert_component(component)?;
        }
        for mesh in self.meshes {
            let id = mesh.id;
            builder.insert_mesh(id, mesh.restore()?);
        }
        builder.restore_relations(
            self.membership.restore()?,
            self.boundaries.restore()?,
            self.internals.restore()?,
        );
        if let Some(crs) = self.crs {
            builder.set_coordinate_reference_system(crs);
        }
        Ok(model)
    }
}

/// Payload of horizons-stack files.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct StackSnapshot {
    components: Vec<Component>,
    above_pairs: Vec<(Uuid, Uuid)>,
    erosions: Vec<(Uuid, Vec<Uuid>)>,
    baselaps: Vec<(Uuid, Vec<Uuid>)>,
    built: bool,
}

impl StackSnapshot {
    pub(super) fn capture<const D: usize>(stack: &HorizonsStack<D>) -> Self {
        Self {
            components: stack.catalog().iter().cloned().collect(),
            above_pairs: stack.above_pairs(),
            erosions: stack.erosion_pairs(),
            baselaps: stack.baselap_pairs(),
            built: stack.state() == StackState::Built,
        }
    }

    pub(super) fn nb_components(&self) -> usize {
        self.components.len()
    }

    pub(super) fn restore<const D: usize>(self) -> Result<HorizonsStack<D>> {
        let mut stack = HorizonsStack::new();
        let mut builder = HorizonsStackBuilder::new(&mut stack);
        for component in self.components {
            builder.insert_component(component)?;
        }
        builder.restore_relations(
            self.above_pairs,
            graph_from_children(self.erosions),
            graph_from_children(self.baselaps),
        )?;
        if self.built {
            builder.compute_top_and_bottom_horizons()?;
        }
        Ok(stack)
    }
}

fn graph_from_children(lists: Vec<(Uuid, Vec<Uuid>)>) -> RelationGraph {
    let mut graph = RelationGraph::new();
    for (parent, children) in lists {
        for child in children {
            graph.add_edge(parent, child);
        }
    }
    graph
}

/// Payload of stratigraphic section and model files.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct StratigraphicSnapshot {
    model: ModelSnapshot,
    stack: StackSnapshot,
    isovalues: Vec<(Uuid, f64)>,
}

impl StratigraphicSnapshot {
    pub(super) fn capture<const D: usize>(model: &Stratigraphic<D>) -> Self {
        Self {
            model: ModelSnapshot::capture(model.model()),
            stack: StackSnapshot::capture(model.horizons_stack()),
            isovalues: model.horizon_isovalues(),
        }
    }

    pub(super) fn nb_components(&self) -> usize {
        self.model.nb_components()
    }

    pub(super) fn restore<const D: usize>(self) -> Result<Stratigraphic<D>> {
        let mut target = Stratigraphic::new();
        let mut builder = StratigraphicBuilder::new(&mut target);
        builder.restore_model(self.model.restore()?);
        builder.restore_stack(self.stack.restore()?);
        builder.restore_isovalues(self.isovalues);
        Ok(target)
    }
}
