//! Reconstructed meshes and their OBJ export.
//!
//! OBJ records carry N coordinates: `v` and `vn` lines for vertices and
//! normals, `f v//vn ...` lines with N vertices per facet, and `l` lines for
//! polylines. In 2D the facets themselves are segments and are written as
//! `l` records. Files ending in `.gz` are gzip compressed.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Facet with vertex and normal indices into the mesh arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshFacet<const N: usize> {
    pub vertices: [usize; N],
    pub normals: [usize; N],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh<const N: usize> {
    pub vertices: Vec<[f32; N]>,
    pub normals: Vec<[f32; N]>,
    pub facets: Vec<MeshFacet<N>>,
    pub lines: Vec<[usize; 2]>,
}

/// Compacts `used` point indices: returns the mapping and the kept indices.
fn compact(point_count: usize, used: impl Iterator<Item = usize>) -> (Vec<usize>, Vec<usize>) {
    const UNUSED: usize = usize::MAX;
    let mut map = vec![UNUSED; point_count];
    let mut kept = Vec::new();
    for p in used {
        if map[p] == UNUSED {
            map[p] = kept.len();
            kept.push(p);
        }
    }
    (map, kept)
}

impl<const N: usize> Mesh<N> {
    /// Mesh of a reconstruction, keeping only points referenced by facets.
    /// Normals are indexed like the vertices.
    pub fn from_facets(points: &[[f32; N]], normals: &[[f64; N]], facets: &[[usize; N]]) -> Self {
        let (map, kept) = compact(points.len(), facets.iter().flatten().copied());

        let facets = facets
            .iter()
            .map(|f| {
                let vertices = f.map(|v| map[v]);
                MeshFacet {
                    vertices,
                    normals: vertices,
                }
            })
            .collect();

        Self {
            vertices: kept.iter().map(|&p| points[p]).collect(),
            normals: kept.iter().map(|&p| normals[p].map(|x| x as f32)).collect(),
            facets,
            lines: Vec::new(),
        }
    }

    /// Polyline mesh, e.g. a spanning tree.
    pub fn from_lines(points: &[[f32; N]], lines: &[[usize; 2]]) -> Self {
        let (map, kept) = compact(points.len(), lines.iter().flatten().copied());
        Self {
            vertices: kept.iter().map(|&p| points[p]).collect(),
            normals: Vec::new(),
            facets: Vec::new(),
            lines: lines.iter().map(|l| l.map(|v| map[v])).collect(),
        }
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|ext| ext == "gz").unwrap_or(false)
}

fn write_coordinates<W: Write>(w: &mut W, tag: &str, v: &[f32]) -> io::Result<()> {
    write!(w, "{}", tag)?;
    for x in v {
        write!(w, " {}", x)?;
    }
    writeln!(w)
}

fn write_records<const N: usize, W: Write>(mesh: &Mesh<N>, comment: &str, w: &mut W) -> io::Result<()> {
    for line in comment.lines() {
        writeln!(w, "# {}", line)?;
    }
    for v in &mesh.vertices {
        write_coordinates(w, "v", v)?;
    }
    for n in &mesh.normals {
        write_coordinates(w, "vn", n)?;
    }
    for f in &mesh.facets {
        if N == 2 {
            writeln!(w, "l {} {}", f.vertices[0] + 1, f.vertices[1] + 1)?;
            continue;
        }
        write!(w, "f")?;
        for i in 0..N {
            if mesh.normals.is_empty() {
                write!(w, " {}", f.vertices[i] + 1)?;
            } else {
                write!(w, " {}//{}", f.vertices[i] + 1, f.normals[i] + 1)?;
            }
        }
        writeln!(w)?;
    }
    for l in &mesh.lines {
        writeln!(w, "l {} {}", l[0] + 1, l[1] + 1)?;
    }
    Ok(())
}

/// Write `mesh` as OBJ, gzip compressed if the name ends in `.gz`.
pub fn write_obj<const N: usize>(mesh: &Mesh<N>, path: &Path, comment: &str) -> io::Result<()> {
    let file = File::create(path)?;
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        write_records(mesh, comment, &mut encoder)?;
        encoder.finish()?.flush()
    } else {
        let mut writer = BufWriter::new(file);
        write_records(mesh, comment, &mut writer)?;
        writer.flush()
    }
}

fn invalid(line_number: usize, message: impl std::fmt::Display) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("line {}: {}", line_number, message),
    )
}

fn parse_coordinates<const N: usize>(line_number: usize, fields: &[&str]) -> io::Result<[f32; N]> {
    if fields.len() != N {
        return Err(invalid(line_number, format!("expected {} coordinates", N)));
    }
    let mut v = [0.0f32; N];
    for (x, s) in v.iter_mut().zip(fields) {
        *x = s.parse().map_err(|e| invalid(line_number, e))?;
    }
    Ok(v)
}

/// 1-based OBJ index to a checked 0-based index.
fn parse_index(line_number: usize, s: &str, count: usize) -> io::Result<usize> {
    let i: usize = s.parse().map_err(|e| invalid(line_number, e))?;
    if i == 0 || i > count {
        return Err(invalid(line_number, format!("index {} out of range", i)));
    }
    Ok(i - 1)
}

fn read_records<const N: usize, R: BufRead>(reader: R) -> io::Result<Mesh<N>> {
    let mut mesh = Mesh::<N>::default();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = n + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some((&tag, rest)) = fields.split_first() else {
            continue;
        };
        match tag {
            "v" => mesh.vertices.push(parse_coordinates(line_number, rest)?),
            "vn" => mesh.normals.push(parse_coordinates(line_number, rest)?),
            "f" => {
                if rest.len() != N {
                    return Err(invalid(line_number, format!("expected {} facet vertices", N)));
                }
                let mut facet = MeshFacet {
                    vertices: [0; N],
                    normals: [0; N],
                };
                for (i, field) in rest.iter().enumerate() {
                    let mut parts = field.split('/');
                    let v = parts.next().unwrap_or_default();
                    facet.vertices[i] = parse_index(line_number, v, mesh.vertices.len())?;
                    facet.normals[i] = match parts.nth(1) {
                        Some(vn) if !vn.is_empty() => {
                            parse_index(line_number, vn, mesh.normals.len())?
                        }
                        _ => facet.vertices[i],
                    };
                }
                mesh.facets.push(facet);
            }
            "l" => {
                if rest.len() != 2 {
                    return Err(invalid(line_number, "expected 2 line vertices"));
                }
                let a = parse_index(line_number, rest[0], mesh.vertices.len())?;
                let b = parse_index(line_number, rest[1], mesh.vertices.len())?;
                if N == 2 {
                    let vertices: [usize; N] = std::array::from_fn(|i| if i == 0 { a } else { b });
                    mesh.facets.push(MeshFacet {
                        vertices,
                        normals: vertices,
                    });
                } else {
                    mesh.lines.push([a, b]);
                }
            }
            _ => {}
        }
    }
    Ok(mesh)
}

/// Read an OBJ file written by [`write_obj`].
pub fn read_obj<const N: usize>(path: &Path) -> io::Result<Mesh<N>> {
    let file = File::open(path)?;
    if is_gzip(path) {
        read_records(BufReader::new(GzDecoder::new(file)))
    } else {
        read_records(BufReader::new(file))
    }
}

/// Vertex positions of an OBJ file, ignoring everything else.
pub fn read_points<const N: usize>(path: &Path) -> io::Result<Vec<[f32; N]>> {
    let mut text = String::new();
    let file = File::open(path)?;
    if is_gzip(path) {
        GzDecoder::new(file).read_to_string(&mut text)?;
    } else {
        BufReader::new(file).read_to_string(&mut text)?;
    }
    text.lines()
        .enumerate()
        .filter_map(|(n, line)| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.split_first() {
                Some((&"v", rest)) => Some(parse_coordinates(n + 1, rest)),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("cocone_mesh_{}_{}", std::process::id(), name))
    }

    fn tetrahedron() -> Mesh<3> {
        let points = [
            [0.0f32, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [5.0, 5.0, 5.0],
        ];
        let normals = [[-1.0f64, -1.0, -1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0; 3]];
        let facets = [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
        Mesh::from_facets(&points, &normals, &facets)
    }

    #[test]
    fn test_unused_points_dropped() {
        let mesh = tetrahedron();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.normals.len(), 4);
        assert_eq!(mesh.facets.len(), 4);
    }

    #[test]
    fn test_obj_round_trip() {
        let mesh = tetrahedron();
        for name in ["t.obj", "t.obj.gz"] {
            let path = temp_path(name);
            write_obj(&mesh, &path, "tetrahedron\nfacets = 4").unwrap();
            let read = read_obj::<3>(&path).unwrap();
            std::fs::remove_file(&path).ok();
            assert_eq!(read, mesh);
        }
    }

    #[test]
    fn test_2d_segments_as_lines() {
        let points = [[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let normals = [[0.0f64, -1.0], [1.0, 0.0], [-1.0, 0.0]];
        let mesh = Mesh::from_facets(&points, &normals, &[[0, 1], [1, 2], [2, 0]]);
        let path = temp_path("polygon.obj");
        write_obj(&mesh, &path, "").unwrap();
        let read = read_obj::<2>(&path).unwrap();
        let positions = read_points::<2>(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(read.facets.len(), 3);
        assert_eq!(read.normals.len(), 3);
        assert_eq!(positions, points.to_vec());
    }

    #[test]
    fn test_bad_index_rejected() {
        let path = temp_path("bad.obj");
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n").unwrap();
        let err = read_obj::<3>(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
