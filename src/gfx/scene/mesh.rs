//! Text mesh loading and geometry post-processing
//!
//! Meshes come from a line-oriented text format (`v`, `vt`, `vn` and
//! triangular `f` records). Loading deduplicates face corners by their
//! `(position, texcoord, normal)` reference triple; post-processing recenters
//! and rescales the mesh and derives a per-vertex tangent frame.

use std::{collections::HashMap, path::Path};

use cgmath::{InnerSpace, Vector2, Vector3, Zero};

use crate::error::{Error, Result};

use super::vertex::Vertex;

/// UV triangles whose determinant magnitude falls below this are skipped.
const DEGENERATE_UV_EPSILON: f32 = 1e-12;
const NEAR_ZERO_LENGTH: f32 = 1e-8;

/// How face records are turned into vertices and indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Corners sharing a reference triple share one output vertex.
    #[default]
    Indexed,
    /// Every face corner becomes its own vertex.
    Expanded,
    /// Positions, normals and UVs are paired by source order; faces are ignored.
    Points,
}

/// Reference triple of a face corner, 1-based, 0 meaning unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceKey {
    pub position: usize,
    pub texcoord: usize,
    pub normal: usize,
}

impl FaceKey {
    /// Parses `pos`, `pos/tex`, `pos//norm` or `pos/tex/norm`.
    fn parse(token: &str, line: usize) -> Result<Self> {
        let mut parts = token.split('/');
        let mut next_index = |what: &str| -> Result<usize> {
            match parts.next() {
                None | Some("") => Ok(0),
                Some(text) => text.parse::<usize>().map_err(|_| {
                    Error::malformed(line, format!("invalid {} index '{}'", what, text))
                }),
            }
        };

        let key = FaceKey {
            position: next_index("position")?,
            texcoord: next_index("texcoord")?,
            normal: next_index("normal")?,
        };

        if key.position == 0 {
            return Err(Error::malformed(
                line,
                format!("face reference '{}' has no position index", token),
            ));
        }
        Ok(key)
    }
}

/// Indexed triangle mesh ready for upload
///
/// Every index is smaller than the vertex count and the index count is a
/// multiple of three. Meshes loaded in [`LoadMode::Points`] carry no indices.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Mesh {
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Recenters the mesh on its centroid and scales it so the largest
    /// absolute coordinate on any axis is exactly 1.
    ///
    /// The extent is measured per axis, not as a Euclidean distance. A mesh
    /// that collapses to a single point is only recentered.
    pub fn center_and_unit(&mut self) {
        if self.vertices.is_empty() {
            return;
        }

        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zero(), |acc, v| acc + Vector3::from(v.position));
        let centroid = sum / self.vertices.len() as f32;

        let mut max_extent = 0.0f32;
        for vertex in &mut self.vertices {
            let centered = Vector3::from(vertex.position) - centroid;
            max_extent = max_extent
                .max(centered.x.abs())
                .max(centered.y.abs())
                .max(centered.z.abs());
            vertex.position = centered.into();
        }
        if max_extent == 0.0 {
            max_extent = 1.0;
        }

        for vertex in &mut self.vertices {
            vertex.position = (Vector3::from(vertex.position) / max_extent).into();
        }
    }

    /// Derives per-vertex tangents and bitangents from positions and UVs.
    ///
    /// Face contributions are accumulated unnormalized, so larger triangles
    /// weigh more. Triangles with a zero or non-finite UV determinant are
    /// skipped; the number skipped is returned. Afterwards each tangent is
    /// orthogonal to its normal and `cross(normal, tangent)` points to the
    /// same side as the bitangent.
    pub fn compute_tangent_frame(&mut self) -> usize {
        if self.indices.is_empty() || self.vertices.is_empty() {
            return 0;
        }

        let mut tangents = vec![Vector3::<f32>::zero(); self.vertices.len()];
        let mut bitangents = vec![Vector3::<f32>::zero(); self.vertices.len()];
        let mut skipped = 0;

        for triangle in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [
                triangle[0] as usize,
                triangle[1] as usize,
                triangle[2] as usize,
            ];
            let (v0, v1, v2) = (&self.vertices[i0], &self.vertices[i1], &self.vertices[i2]);

            let delta_pos1 = Vector3::from(v1.position) - Vector3::from(v0.position);
            let delta_pos2 = Vector3::from(v2.position) - Vector3::from(v0.position);
            let delta_uv1 = Vector2::from(v1.uv) - Vector2::from(v0.uv);
            let delta_uv2 = Vector2::from(v2.uv) - Vector2::from(v0.uv);

            let denominator = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if !denominator.is_finite() || denominator.abs() < DEGENERATE_UV_EPSILON {
                skipped += 1;
                continue;
            }
            let det = 1.0 / denominator;

            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * det;
            let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * det;
            if !is_finite(tangent) || !is_finite(bitangent) {
                skipped += 1;
                continue;
            }

            for index in [i0, i1, i2] {
                tangents[index] += tangent;
                bitangents[index] += bitangent;
            }
        }

        for ((vertex, tangent), bitangent) in self
            .vertices
            .iter_mut()
            .zip(tangents)
            .zip(bitangents)
        {
            let normal = Vector3::from(vertex.normal);
            let unit_normal = if normal.magnitude2() > NEAR_ZERO_LENGTH {
                normal.normalize()
            } else {
                Vector3::zero()
            };

            // Gram-Schmidt against the normal.
            let mut t = tangent - unit_normal * unit_normal.dot(tangent);
            t = if t.magnitude2() > NEAR_ZERO_LENGTH {
                t.normalize()
            } else {
                any_perpendicular(unit_normal)
            };

            if unit_normal.cross(t).dot(bitangent) < 0.0 {
                t = -t;
            }

            let b = if bitangent.magnitude2() > NEAR_ZERO_LENGTH {
                bitangent.normalize()
            } else {
                let fallback = unit_normal.cross(t);
                if fallback.magnitude2() > NEAR_ZERO_LENGTH {
                    fallback.normalize()
                } else {
                    any_perpendicular(t)
                }
            };

            vertex.tangent = t.into();
            vertex.bitangent = b.into();
        }

        if skipped > 0 {
            log::warn!(
                "Skipped {} of {} triangles with degenerate texture coordinates",
                skipped,
                self.triangle_count()
            );
        }
        skipped
    }
}

fn is_finite(v: Vector3<f32>) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

/// A unit vector perpendicular to `v`, or +X when `v` is zero.
fn any_perpendicular(v: Vector3<f32>) -> Vector3<f32> {
    if v.magnitude2() <= NEAR_ZERO_LENGTH {
        return Vector3::unit_x();
    }
    let v = v.normalize();
    let axis = if v.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    (axis - v * v.dot(axis)).normalize()
}

/// Raw records collected from mesh source text
#[derive(Default)]
struct MeshSource {
    positions: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    corners: Vec<FaceKey>,
}

/// A face corner as read, before its references are resolved
struct RawCorner {
    key: FaceKey,
    line: usize,
}

impl MeshSource {
    fn parse(text: &str) -> Result<Self> {
        let mut source = MeshSource::default();
        let mut raw_corners = Vec::new();

        for (line_index, line) in text.lines().enumerate() {
            let line_number = line_index + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let Some((&kind, values)) = tokens.split_first() else {
                continue;
            };

            match kind {
                "v" if values.len() >= 3 => {
                    source.positions.push(parse_floats(values, line_number)?);
                }
                "vn" if values.len() >= 3 => {
                    source.normals.push(parse_floats(values, line_number)?);
                }
                "vt" if values.len() >= 2 => {
                    source.texcoords.push(parse_floats(values, line_number)?);
                }
                "f" if values.len() >= 3 => {
                    // Triangles only; extra corners of a polygon are dropped.
                    for token in &values[..3] {
                        raw_corners.push(RawCorner {
                            key: FaceKey::parse(token, line_number)?,
                            line: line_number,
                        });
                    }
                }
                _ => {}
            }
        }

        // Faces may precede the records they reference.
        source.corners.reserve(raw_corners.len());
        for RawCorner { key, line } in raw_corners {
            source.check_range(key, line)?;
            source.corners.push(key);
        }

        Ok(source)
    }

    fn check_range(&self, key: FaceKey, line: usize) -> Result<()> {
        let checks = [
            ("position", key.position, self.positions.len()),
            ("texcoord", key.texcoord, self.texcoords.len()),
            ("normal", key.normal, self.normals.len()),
        ];
        for (what, index, count) in checks {
            if index > count {
                return Err(Error::malformed(
                    line,
                    format!("face references {} {} but only {} exist", what, index, count),
                ));
            }
        }
        Ok(())
    }

    fn vertex_for(&self, key: FaceKey) -> Vertex {
        Vertex {
            position: self.positions[key.position - 1],
            normal: key
                .normal
                .checked_sub(1)
                .map_or([0.0; 3], |i| self.normals[i]),
            uv: key
                .texcoord
                .checked_sub(1)
                .map_or([0.0; 2], |i| self.texcoords[i]),
            ..Default::default()
        }
    }
}

fn parse_floats<const N: usize>(values: &[&str], line: usize) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    for (slot, text) in out.iter_mut().zip(values) {
        *slot = text
            .parse::<f32>()
            .map_err(|_| Error::malformed(line, format!("invalid number '{}'", text)))?;
    }
    Ok(out)
}

/// Builds [`Mesh`] values from mesh source text
pub struct MeshLoader;

impl MeshLoader {
    /// Parses mesh source text.
    ///
    /// # Errors
    /// [`Error::MalformedMesh`] when a number or index cannot be parsed, a face
    /// references a record that does not exist, or the text holds no positions
    /// (or, outside [`LoadMode::Points`], no faces).
    pub fn parse(text: &str, mode: LoadMode) -> Result<Mesh> {
        let source = MeshSource::parse(text)?;

        if source.positions.is_empty() {
            return Err(Error::malformed(0, "no vertex positions"));
        }
        if source.corners.is_empty() && mode != LoadMode::Points {
            return Err(Error::malformed(0, "no faces"));
        }

        let mesh = match mode {
            LoadMode::Indexed => {
                let mut vertices = Vec::new();
                let mut indices = Vec::with_capacity(source.corners.len());
                let mut seen: HashMap<FaceKey, u32> = HashMap::new();

                for &key in &source.corners {
                    let index = *seen.entry(key).or_insert_with(|| {
                        vertices.push(source.vertex_for(key));
                        (vertices.len() - 1) as u32
                    });
                    indices.push(index);
                }
                Mesh { vertices, indices }
            }
            LoadMode::Expanded => Mesh {
                vertices: source
                    .corners
                    .iter()
                    .map(|&key| source.vertex_for(key))
                    .collect(),
                indices: (0..source.corners.len() as u32).collect(),
            },
            LoadMode::Points => Mesh {
                vertices: source
                    .positions
                    .iter()
                    .enumerate()
                    .map(|(i, &position)| Vertex {
                        position,
                        normal: source.normals.get(i).copied().unwrap_or_default(),
                        uv: source.texcoords.get(i).copied().unwrap_or_default(),
                        ..Default::default()
                    })
                    .collect(),
                indices: Vec::new(),
            },
        };

        Ok(mesh)
    }

    /// Reads and parses a mesh file.
    pub fn load(path: impl AsRef<Path>, mode: LoadMode) -> Result<Mesh> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mesh = Self::parse(&text, mode)?;

        log::info!(
            "Loaded mesh {}: {} faces, {} vertices",
            path.display(),
            mesh.triangle_count(),
            mesh.vertices.len()
        );
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const CUBE: &str = "\
# unit cube
v -1 -1 -1
v  1 -1 -1
v  1  1 -1
v -1  1 -1
v -1 -1  1
v  1 -1  1
v  1  1  1
v -1  1  1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 -1
vn 0 0 1
vn -1 0 0
vn 1 0 0
vn 0 -1 0
vn 0 1 0
f 2/1/1 1/2/1 4/3/1
f 2/1/1 4/3/1 3/4/1
f 5/1/2 6/2/2 7/3/2
f 5/1/2 7/3/2 8/4/2
f 1/1/3 5/2/3 8/3/3
f 1/1/3 8/3/3 4/4/3
f 6/1/4 2/2/4 3/3/4
f 6/1/4 3/3/4 7/4/4
f 1/1/5 2/2/5 6/3/5
f 1/1/5 6/3/5 5/4/5
f 8/1/6 7/2/6 3/3/6
f 8/1/6 3/3/6 4/4/6
";

    fn assert_index_invariants(mesh: &Mesh) {
        assert_eq!(mesh.indices().len() % 3, 0);
        for &index in mesh.indices() {
            assert!((index as usize) < mesh.vertices().len());
        }
    }

    fn assert_no_nan(mesh: &Mesh) {
        for v in mesh.vertices() {
            for c in v.tangent.iter().chain(v.bitangent.iter()) {
                assert!(c.is_finite(), "non-finite tangent frame in {:?}", v);
            }
        }
    }

    fn max_abs_coordinate(mesh: &Mesh) -> f32 {
        mesh.vertices()
            .iter()
            .flat_map(|v| v.position)
            .fold(0.0f32, |m, c| m.max(c.abs()))
    }

    #[test]
    fn test_parse_single_triangle() {
        let mesh = MeshLoader::parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1\n",
            LoadMode::Indexed,
        )
        .unwrap();

        assert_eq!(mesh.vertices().len(), 3);
        assert_eq!(mesh.indices(), &[0, 1, 2]);
        assert_eq!(mesh.vertices()[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices()[2].uv, [0.0, 1.0]);
        assert_eq!(mesh.vertices()[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_identical_references_share_a_vertex() {
        let mesh = MeshLoader::parse(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3\nf 1 3 4\n",
            LoadMode::Indexed,
        )
        .unwrap();

        assert_eq!(mesh.vertices().len(), 4);
        assert_eq!(mesh.indices(), &[0, 1, 2, 0, 2, 3]);
        assert_index_invariants(&mesh);
    }

    #[test]
    fn test_differing_normal_makes_distinct_vertex() {
        let mesh = MeshLoader::parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nvn 0 0 -1\nf 1//1 2//1 3//1\nf 1//2 3//2 2//2\n",
            LoadMode::Indexed,
        )
        .unwrap();

        assert_eq!(mesh.vertices().len(), 6);
        assert_eq!(mesh.vertices()[0].position, mesh.vertices()[3].position);
        assert_ne!(mesh.indices()[0], mesh.indices()[3]);
    }

    #[test]
    fn test_unset_references_use_defaults() {
        let mesh = MeshLoader::parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.5\nf 1/1 2 3\n",
            LoadMode::Indexed,
        )
        .unwrap();

        assert_eq!(mesh.vertices()[0].uv, [0.5, 0.5]);
        assert_eq!(mesh.vertices()[1].uv, [0.0, 0.0]);
        assert_eq!(mesh.vertices()[1].normal, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_ignores_comments_short_lines_and_extra_polygon_corners() {
        let mesh = MeshLoader::parse(
            "# header\n\ns 1\ng body\nv 0 0\nv 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2\nf 1 2 3 4\n",
            LoadMode::Indexed,
        )
        .unwrap();

        assert_eq!(mesh.vertices().len(), 3);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_malformed_inputs_are_rejected() {
        let cases = [
            ("f 1 2 3\n", "no positions"),
            ("v 0 0 0\nv 1 0 0\nv 0 1 0\n", "no faces"),
            ("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n", "zero position"),
            ("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n", "out of range"),
            ("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/1 2 3\n", "missing texcoord"),
            ("v 0 0 zero\n", "bad number"),
            ("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 x 3\n", "bad index"),
        ];

        for (text, case) in cases {
            match MeshLoader::parse(text, LoadMode::Indexed) {
                Err(Error::MalformedMesh { .. }) => {}
                other => panic!("{}: expected MalformedMesh, got {:?}", case, other),
            }
        }
    }

    #[test]
    fn test_error_reports_offending_line() {
        let err = MeshLoader::parse("v 0 0 0\nv 1 0 0\n\nf 1 2 9\n", LoadMode::Indexed)
            .unwrap_err();
        match err {
            Error::MalformedMesh { line, .. } => assert_eq!(line, 4),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_faces_may_precede_their_records() {
        let mesh = MeshLoader::parse(
            "f 1/1/1 2/2/1 3/3/1\nv 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nvn 0 0 1\n",
            LoadMode::Indexed,
        )
        .unwrap();

        assert_eq!(mesh.vertices().len(), 3);
        assert_eq!(mesh.indices(), &[0, 1, 2]);
        assert_eq!(mesh.vertices()[2].uv, [0.0, 1.0]);
        assert_eq!(mesh.vertices()[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_late_range_error_keeps_face_line() {
        let err = MeshLoader::parse(
            "f 1 2 3\nf 1 2 5\nv 0 0 0\nv 1 0 0\nv 0 1 0\n",
            LoadMode::Indexed,
        )
        .unwrap_err();
        match err {
            Error::MalformedMesh { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_random_mesh_text_keeps_index_invariants() {
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..50 {
            let positions = rng.random_range(3..40usize);
            let texcoords = rng.random_range(0..10usize);
            let normals = rng.random_range(0..10usize);
            let faces = rng.random_range(1..60usize);

            let mut records = Vec::new();
            for _ in 0..positions {
                records.push(format!(
                    "v {} {} {}",
                    rng.random_range(-10.0..10.0f32),
                    rng.random_range(-10.0..10.0f32),
                    rng.random_range(-10.0..10.0f32)
                ));
            }
            for _ in 0..texcoords {
                records.push(format!(
                    "vt {} {}",
                    rng.random_range(0.0..1.0f32),
                    rng.random_range(0.0..1.0f32)
                ));
            }
            for _ in 0..normals {
                records.push(format!("vn 0 {} 1", rng.random_range(-1.0..1.0f32)));
            }
            for _ in 0..faces {
                let corners: Vec<String> = (0..3)
                    .map(|_| {
                        let p = rng.random_range(1..=positions);
                        let t = if texcoords > 0 { rng.random_range(0..=texcoords) } else { 0 };
                        let n = if normals > 0 { rng.random_range(0..=normals) } else { 0 };
                        match (t, n) {
                            (0, 0) => format!("{}", p),
                            (t, 0) => format!("{}/{}", p, t),
                            (0, n) => format!("{}//{}", p, n),
                            (t, n) => format!("{}/{}/{}", p, t, n),
                        }
                    })
                    .collect();
                records.push(format!("f {}", corners.join(" ")));
            }
            // Record order does not matter to the loader.
            for i in (1..records.len()).rev() {
                records.swap(i, rng.random_range(0..=i));
            }
            let text = records.join("\n");

            for mode in [LoadMode::Indexed, LoadMode::Expanded] {
                let mesh = MeshLoader::parse(&text, mode).unwrap();
                assert_eq!(mesh.triangle_count(), faces);
                assert!(mesh.vertices().len() <= faces * 3);
                assert_index_invariants(&mesh);
            }
        }
    }

    #[test]
    fn test_expanded_mode_duplicates_every_corner() {
        let mesh = MeshLoader::parse(CUBE, LoadMode::Expanded).unwrap();
        assert_eq!(mesh.vertices().len(), 36);
        assert_eq!(mesh.indices(), (0..36).collect::<Vec<u32>>().as_slice());
    }

    #[test]
    fn test_points_mode_pairs_records_by_order() {
        let mesh = MeshLoader::parse(
            "v 0 0 0\nv 1 2 3\nvn 0 1 0\nvt 0.25 0.75\nvt 1 1\n",
            LoadMode::Points,
        )
        .unwrap();

        assert_eq!(mesh.vertices().len(), 2);
        assert!(mesh.indices().is_empty());
        assert_eq!(mesh.vertices()[0].normal, [0.0, 1.0, 0.0]);
        assert_eq!(mesh.vertices()[1].normal, [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices()[1].uv, [1.0, 1.0]);
    }

    #[test]
    fn test_center_and_unit_recenters_and_scales() {
        let mut mesh = MeshLoader::parse(
            "v 100 10 10\nv 104 10 10\nv 100 12 10\nf 1 2 3\n",
            LoadMode::Indexed,
        )
        .unwrap();
        mesh.center_and_unit();

        assert!((max_abs_coordinate(&mesh) - 1.0).abs() < 1e-6);
        let centroid = mesh
            .vertices()
            .iter()
            .fold(Vector3::zero(), |acc, v| acc + Vector3::from(v.position))
            / 3.0;
        assert!(centroid.magnitude() < 1e-5);
    }

    #[test]
    fn test_center_and_unit_leaves_single_point_unscaled() {
        let mut mesh = MeshLoader::parse("v 3 3 3\nv 3 3 3\nv 3 3 3\nf 1 2 3\n", LoadMode::Indexed)
            .unwrap();
        mesh.center_and_unit();
        for v in mesh.vertices() {
            assert_eq!(v.position, [0.0, 0.0, 0.0]);
        }

        let mut empty = Mesh::default();
        empty.center_and_unit();
        assert!(empty.vertices().is_empty());
    }

    #[test]
    fn test_tangent_frame_of_flat_quad() {
        let mut mesh = MeshLoader::parse(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nvn 0 0 1\n\
             f 1/1/1 2/2/1 3/3/1\nf 1/1/1 3/3/1 4/4/1\n",
            LoadMode::Indexed,
        )
        .unwrap();

        assert_eq!(mesh.compute_tangent_frame(), 0);
        for v in mesh.vertices() {
            assert!((Vector3::from(v.tangent) - Vector3::unit_x()).magnitude() < 1e-5);
            assert!((Vector3::from(v.bitangent) - Vector3::unit_y()).magnitude() < 1e-5);
        }
    }

    #[test]
    fn test_mirrored_uvs_flip_tangent() {
        // U runs against +X, so the basis must flip to stay consistent with the bitangent.
        let mut mesh = MeshLoader::parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 1 0\nvt 0 0\nvt 1 1\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1\n",
            LoadMode::Indexed,
        )
        .unwrap();
        mesh.compute_tangent_frame();

        for v in mesh.vertices() {
            let n = Vector3::from(v.normal);
            let t = Vector3::from(v.tangent);
            let b = Vector3::from(v.bitangent);
            assert!(n.cross(t).dot(b) >= 0.0);
            assert!((t - Vector3::new(1.0, 0.0, 0.0)).magnitude() < 1e-5);
        }
    }

    #[test]
    fn test_degenerate_uvs_are_skipped_without_nan() {
        let mut mesh = MeshLoader::parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nvt 0.5 0.5\nvn 0 0 1\n\
             f 1/1/1 2/1/1 3/1/1\nf 2/1/1 4/1/1 3/1/1\n",
            LoadMode::Indexed,
        )
        .unwrap();

        assert_eq!(mesh.compute_tangent_frame(), 2);
        assert_no_nan(&mesh);
        for v in mesh.vertices() {
            let t = Vector3::from(v.tangent);
            assert!((t.magnitude() - 1.0).abs() < 1e-5);
            assert!(t.dot(Vector3::unit_z()).abs() < 1e-5);
        }
    }

    #[test]
    fn test_tangent_frame_is_orthogonal_and_consistently_handed() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let mut vertices = Vec::new();
            let mut indices = Vec::new();
            for _ in 0..30 {
                let base = vertices.len() as u32;
                for _ in 0..3 {
                    let normal = Vector3::new(
                        rng.random_range(-1.0..1.0f32),
                        rng.random_range(-1.0..1.0f32),
                        rng.random_range(0.1..1.0f32),
                    )
                    .normalize();
                    vertices.push(Vertex {
                        position: [
                            rng.random_range(-5.0..5.0),
                            rng.random_range(-5.0..5.0),
                            rng.random_range(-5.0..5.0),
                        ],
                        normal: normal.into(),
                        uv: [rng.random_range(0.0..1.0), rng.random_range(0.0..1.0)],
                        ..Default::default()
                    });
                }
                // Share some vertices between triangles.
                let a = if base >= 3 { rng.random_range(0..base) } else { base };
                indices.extend_from_slice(&[a, base + 1, base + 2]);
            }

            let mut mesh = Mesh { vertices, indices };
            mesh.compute_tangent_frame();
            assert_no_nan(&mesh);

            for v in mesh.vertices() {
                let n = Vector3::from(v.normal);
                let t = Vector3::from(v.tangent);
                let b = Vector3::from(v.bitangent);
                assert!(n.dot(t).abs() < 1e-4, "tangent not orthogonal: {:?}", v);
                assert!(n.cross(t).dot(b) >= -1e-6, "basis flipped: {:?}", v);
            }
        }
    }

    #[test]
    fn test_cube_scenario() {
        let mut mesh = MeshLoader::parse(CUBE, LoadMode::Indexed).unwrap();
        mesh.center_and_unit();
        let skipped = mesh.compute_tangent_frame();

        assert_eq!(skipped, 0);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.vertices().len() <= 24);
        assert_index_invariants(&mesh);
        for v in mesh.vertices() {
            assert!(v.position.iter().all(|c| (-1.0..=1.0).contains(c)));
        }
        assert!((max_abs_coordinate(&mesh) - 1.0).abs() < 1e-6);
        assert_no_nan(&mesh);
    }
}
