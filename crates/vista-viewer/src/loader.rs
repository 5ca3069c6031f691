use std::path::Path;

use anyhow::{Result, bail};
use vista_engine::render::{LoadedModel, ModelLoader, TextureImage, Vertex};

/// Built-in loader: any path named `cube` (or with a `.cube` extension)
/// yields a unit cube with a checker texture.
#[derive(Debug)]
pub struct CubeLoader {
    pub checker_size: u32,
    pub checker_cells: u32,
}

impl Default for CubeLoader {
    fn default() -> Self {
        Self {
            checker_size: 64,
            checker_cells: 8,
        }
    }
}

impl ModelLoader for CubeLoader {
    fn load(&mut self, path: &Path) -> Result<Vec<LoadedModel>> {
        if !is_cube_path(path) {
            bail!("unsupported model format: {}", path.display());
        }
        let (vertices, indices) = unit_cube();
        Ok(vec![LoadedModel {
            name: "cube".to_string(),
            vertices,
            indices,
            color: [0.8, 0.8, 0.8],
            offset: [0.0, 0.0, 0.5],
            texture: Some(checker(self.checker_size, self.checker_cells)),
        }])
    }
}

fn is_cube_path(path: &Path) -> bool {
    let matches = |s: Option<&std::ffi::OsStr>| {
        s.and_then(|s| s.to_str())
            .is_some_and(|s| s.eq_ignore_ascii_case("cube"))
    };
    matches(path.file_name()) || matches(path.extension())
}

/// Unit cube centred on the origin, four vertices per face.
fn unit_cube() -> (Vec<Vertex>, Vec<u32>) {
    // (normal, u axis, v axis); u × v = normal keeps faces counter-clockwise.
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    ];
    const CORNERS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (n, u, v) in FACES {
        let base = vertices.len() as u32;
        for [cu, cv] in CORNERS {
            let (su, sv) = (cu - 0.5, cv - 0.5);
            let position = [0, 1, 2].map(|i| 0.5 * n[i] + su * u[i] + sv * v[i]);
            vertices.push(Vertex::new(position, n, [cu, 1.0 - cv]));
        }
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

/// `size`×`size` RGBA checkerboard with `cells` squares per side.
fn checker(size: u32, cells: u32) -> TextureImage {
    let cell = (size / cells.max(1)).max(1);
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let light = ((x / cell) + (y / cell)) % 2 == 0;
            let c = if light { 230 } else { 60 };
            rgba.extend([c, c, c, 255]);
        }
    }
    TextureImage {
        width: size,
        height: size,
        rgba,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_paths_are_recognised() {
        assert!(is_cube_path(Path::new("cube")));
        assert!(is_cube_path(Path::new("/tmp/models/CUBE")));
        assert!(is_cube_path(Path::new("thing.cube")));
        assert!(!is_cube_path(Path::new("model.obj")));
        assert!(!is_cube_path(Path::new("cubes")));
    }

    #[test]
    fn other_formats_are_rejected() {
        let err = CubeLoader::default()
            .load(Path::new("model.obj"))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported model format"));
    }

    #[test]
    fn cube_has_closed_quads_with_outward_winding() {
        let models = CubeLoader::default().load(Path::new("cube")).unwrap();
        assert_eq!(models.len(), 1);
        let cube = &models[0];
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert!(cube.indices.iter().all(|&i| (i as usize) < cube.vertices.len()));

        for tri in cube.indices.chunks(3) {
            let p: Vec<_> = tri
                .iter()
                .map(|&i| glam_vec(cube.vertices[i as usize].position))
                .collect();
            let face_normal = (p[1] - p[0]).cross(p[2] - p[0]).normalize();
            let n = glam_vec(cube.vertices[tri[0] as usize].normal);
            assert!(face_normal.dot(n) > 0.99, "triangle {tri:?} winds inward");
        }
    }

    #[test]
    fn checker_alternates_cells() {
        let img = checker(4, 2);
        assert_eq!(img.rgba.len(), 4 * 4 * 4);
        let px = |x: u32, y: u32| img.rgba[((y * 4 + x) * 4) as usize];
        assert_eq!(px(0, 0), px(1, 1));
        assert_ne!(px(0, 0), px(2, 0));
        assert_ne!(px(0, 0), px(0, 2));
    }

    fn glam_vec(v: [f32; 3]) -> glam::Vec3 {
        glam::Vec3::from_array(v)
    }
}
