use std::io::{BufReader, Cursor, Write};
use std::path::Path;

use carryover_core::{ElementKind, LayerStorage, LayerType, PolyMesh};

pub(crate) const UV_LAYER: &str = "uv";
pub(crate) const COLOR_LAYER: &str = "col";

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: false,
        single_index: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

pub(crate) fn load_obj_mesh(path: &Path) -> Result<PolyMesh, String> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()));
    }
    let (models, _) = tobj::load_obj(path, &load_options())
        .map_err(|err| format!("OBJ load failed: {err}"))?;
    build_mesh_from_models(models)
}

pub(crate) fn load_obj_mesh_bytes(data: &[u8]) -> Result<PolyMesh, String> {
    let mut reader = BufReader::new(Cursor::new(data));
    let (models, _) = tobj::load_obj_buf(&mut reader, &load_options(), |_path| {
        Ok((Vec::new(), Default::default()))
    })
    .map_err(|err| format!("OBJ load failed: {err}"))?;
    build_mesh_from_models(models)
}

fn build_mesh_from_models(models: Vec<tobj::Model>) -> Result<PolyMesh, String> {
    if models.is_empty() {
        return Err("OBJ has no geometry".to_string());
    }

    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut faces: Vec<Vec<u32>> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut colors: Vec<[f32; 4]> = Vec::new();
    let mut include_uvs = true;
    let mut include_colors = true;
    let mut vertex_offset = 0u32;

    for model in models {
        let mesh = &model.mesh;
        if mesh.positions.len() % 3 != 0 {
            return Err("OBJ has malformed positions".to_string());
        }
        let vertex_count = mesh.positions.len() / 3;
        positions.extend(mesh.positions.chunks_exact(3).map(|v| [v[0], v[1], v[2]]));

        // all-triangle meshes may come without arities
        let arities: Vec<usize> = if mesh.face_arities.is_empty() {
            if mesh.indices.len() % 3 != 0 {
                return Err(format!("OBJ object {:?} has malformed faces", model.name));
            }
            vec![3; mesh.indices.len() / 3]
        } else {
            mesh.face_arities.iter().map(|&arity| arity as usize).collect()
        };
        let mut start = 0usize;
        for arity in arities {
            let Some(face) = mesh.indices.get(start..start + arity) else {
                return Err(format!("OBJ object {:?} has malformed faces", model.name));
            };
            faces.push(face.iter().map(|&index| index + vertex_offset).collect());
            start += arity;
        }

        if !mesh.texcoord_indices.is_empty() && mesh.texcoord_indices.len() == mesh.indices.len() {
            for &index in &mesh.texcoord_indices {
                let index = index as usize * 2;
                let uv = mesh
                    .texcoords
                    .get(index..index + 2)
                    .ok_or_else(|| "OBJ has malformed texture coordinates".to_string())?;
                uvs.push([uv[0], uv[1]]);
            }
        } else {
            include_uvs = false;
        }

        if !mesh.vertex_color.is_empty() && mesh.vertex_color.len() == mesh.positions.len() {
            for &index in &mesh.indices {
                let index = index as usize * 3;
                let c = &mesh.vertex_color[index..index + 3];
                colors.push([c[0], c[1], c[2], 1.0]);
            }
        } else {
            include_colors = false;
        }

        vertex_offset += vertex_count as u32;
    }

    if positions.is_empty() || faces.is_empty() {
        return Err("OBJ has no geometry".to_string());
    }
    let mut mesh = PolyMesh::from_polygons(positions, faces).map_err(|err| err.to_string())?;
    if include_uvs && !uvs.is_empty() {
        mesh.add_layer(ElementKind::Corner, UV_LAYER, LayerStorage::TexCoord(uvs))
            .map_err(|err| err.to_string())?;
    }
    if include_colors && !colors.is_empty() {
        mesh.add_layer(ElementKind::Corner, COLOR_LAYER, LayerStorage::Color(colors))
            .map_err(|err| err.to_string())?;
    }
    Ok(mesh)
}

pub(crate) fn write_obj(path: &Path, mesh: &PolyMesh) -> Result<(), String> {
    let file = std::fs::File::create(path).map_err(|err| err.to_string())?;
    let mut writer = std::io::BufWriter::new(file);
    write_obj_to(&mut writer, mesh).map_err(|err| err.to_string())?;
    writer.flush().map_err(|err| err.to_string())
}

/// Positions, one `vt` per corner from the first texture coordinate layer, and polygon faces.
pub(crate) fn write_obj_to(out: &mut impl Write, mesh: &PolyMesh) -> std::io::Result<()> {
    for p in &mesh.positions {
        writeln!(out, "v {} {} {}", p[0], p[1], p[2])?;
    }

    let uvs = match mesh.layer(LayerType::TexCoord, 0).map(|layer| &layer.storage) {
        Some(LayerStorage::TexCoord(values)) if values.len() == mesh.corner_count() => {
            Some(values)
        }
        _ => None,
    };
    if let Some(uvs) = uvs {
        for uv in uvs {
            writeln!(out, "vt {} {}", uv[0], uv[1])?;
        }
    }

    for face in 0..mesh.face_count() {
        write!(out, "f")?;
        for corner in mesh.face_corners(face) {
            let v = mesh.corner_vertex(corner) + 1;
            if uvs.is_some() {
                write!(out, " {v}/{}", corner + 1)?;
            } else {
                write!(out, " {v}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_OBJ: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 2 0 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
f 2/2 5/1 3/3
";

    #[test]
    fn loads_polygons_untriangulated() {
        let mesh = load_obj_mesh_bytes(QUAD_OBJ.as_bytes()).expect("obj");
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.face_vertices(0), &[0, 1, 2, 3]);
        assert_eq!(mesh.face_vertices(1), &[1, 4, 2]);

        let layer = mesh.layer(LayerType::TexCoord, 0).expect("uv layer");
        assert_eq!(layer.name, UV_LAYER);
        let LayerStorage::TexCoord(uvs) = &layer.storage else {
            panic!("expected texture coordinates");
        };
        assert_eq!(uvs.len(), 7);
        assert_eq!(uvs[2], [1.0, 1.0]);
        assert_eq!(uvs[5], [0.0, 0.0]);
    }

    #[test]
    fn loads_vertex_colors_per_corner() {
        let obj = "\
v 0 0 0 1 0 0
v 1 0 0 0 1 0
v 0 1 0 0 0 1
f 1 2 3
";
        let mesh = load_obj_mesh_bytes(obj.as_bytes()).expect("obj");
        let layer = mesh.layer(LayerType::Color, 0).expect("color layer");
        assert_eq!(layer.name, COLOR_LAYER);
        assert_eq!(
            layer.storage,
            LayerStorage::Color(vec![
                [1.0, 0.0, 0.0, 1.0],
                [0.0, 1.0, 0.0, 1.0],
                [0.0, 0.0, 1.0, 1.0],
            ])
        );
        assert!(mesh.layer(LayerType::TexCoord, 0).is_none());
    }

    #[test]
    fn writes_corner_uvs_and_polygons() {
        let mesh = load_obj_mesh_bytes(QUAD_OBJ.as_bytes()).expect("obj");
        let mut out = Vec::new();
        write_obj_to(&mut out, &mesh).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.iter().filter(|line| line.starts_with("v ")).count(), 5);
        assert_eq!(lines.iter().filter(|line| line.starts_with("vt ")).count(), 7);
        assert!(lines.contains(&"f 1/1 2/2 3/3 4/4"));
        assert!(lines.contains(&"f 2/5 5/6 3/7"));

        let reloaded = load_obj_mesh_bytes(text.as_bytes()).expect("reload");
        assert_eq!(reloaded.face_count(), 2);
        assert_eq!(
            reloaded.layer(LayerType::TexCoord, 0).map(|layer| &layer.storage),
            mesh.layer(LayerType::TexCoord, 0).map(|layer| &layer.storage)
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(load_obj_mesh_bytes(b"").unwrap_err(), "OBJ has no geometry");
        assert!(load_obj_mesh_bytes(b"# nothing here\nvt 0 0\n").is_err());
    }

    #[test]
    fn rejects_faces_with_repeated_vertices() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 2 4\n";
        assert!(load_obj_mesh_bytes(obj.as_bytes()).is_err());
    }
}
