use std::path::Path;

use cgmath::Vector3;

use crate::{
    config::Config,
    error::Result,
    gfx::{
        camera::OrbitCamera,
        resources::{global_bindings::FrameUniforms, texture_resource::TextureProvider},
    },
};

use super::{
    light::DirectionalLight,
    mesh::{LoadMode, Mesh, MeshLoader},
    object::{Motion, ObjectKind, ObjectLayouts, Placement, SceneObject},
};

/// The demo scene: camera, light and a flat list of objects
///
/// Owned by the application and passed by reference to the renderer.
pub struct Scene {
    pub camera: OrbitCamera,
    pub light: DirectionalLight,
    objects: Vec<SceneObject>,
    time: f64,
}

impl Scene {
    pub fn new(camera: OrbitCamera, light: DirectionalLight) -> Self {
        Self {
            camera,
            light,
            objects: Vec::new(),
            time: 0.0,
        }
    }

    /// Loads every configured object and the skybox from the asset directory.
    ///
    /// Meshes are read from `<assets>/<name>.obj`, recentered, unit-scaled and
    /// given a tangent frame.
    pub fn from_config(config: &Config, width: u32, height: u32) -> Result<Self> {
        let camera = OrbitCamera::new(config.camera, width, height);
        let mut scene = Scene::new(camera, DirectionalLight::default());

        for object in &config.objects {
            let mesh = load_prepared_mesh(&config.assets.join(format!("{}.obj", object.name)))?;
            let motion = if object.spin_speed != 0.0 {
                Motion::Spin {
                    axis: Vector3::unit_y(),
                    speed: object.spin_speed,
                }
            } else {
                Motion::Static
            };
            scene.add_object(
                SceneObject::new(
                    &object.name,
                    ObjectKind::Standard,
                    mesh,
                    Placement::new(object.scale, Vector3::from(object.translation)),
                )
                .with_shininess(object.shininess)
                .with_motion(motion)
                .with_shadow_casting(object.casts_shadow),
            );
        }

        let skybox = &config.skybox;
        let mesh = load_prepared_mesh(&config.assets.join(format!("{}.obj", skybox.name)))?;
        scene.add_object(SceneObject::new(
            &skybox.name,
            ObjectKind::Skybox,
            mesh,
            Placement::new(skybox.scale, Vector3::new(0.0, 0.0, 0.0)),
        ));

        Ok(scene)
    }

    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn shadow_casters(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|object| object.casts_shadow)
    }

    /// Seconds of scene time elapsed
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Advances time by `dt` seconds and refreshes the camera and every
    /// object's model and derived transforms.
    pub fn update(&mut self, dt: f32) {
        self.time += f64::from(dt);
        self.camera.update();

        let view = self.camera.view();
        let projection = self.camera.projection();
        let light_view_projection = self.light.view_projection();
        for object in &mut self.objects {
            object.update_model(self.time);
            object.update_transforms(view, projection, light_view_projection);
        }
    }

    pub fn frame_uniforms(&self) -> FrameUniforms {
        FrameUniforms::new(self.light.view_space_direction(self.camera.view()))
    }

    pub fn init_gpu_resources(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &ObjectLayouts,
        provider: &impl TextureProvider,
    ) -> Result<()> {
        for object in &mut self.objects {
            object.init_gpu_resources(device, queue, layouts, provider)?;
        }
        Ok(())
    }

    pub fn write_uniforms(&mut self, queue: &wgpu::Queue) {
        for object in &mut self.objects {
            object.write_uniforms(queue);
        }
    }
}

fn load_prepared_mesh(path: &Path) -> Result<Mesh> {
    let mut mesh = MeshLoader::load(path, LoadMode::Indexed)?;
    mesh.center_and_unit();
    mesh.compute_tangent_frame();
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, gfx::camera::CameraSettings};
    use cgmath::{InnerSpace, Vector4};

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nvn 0 0 1\n\
                            f 1/1/1 2/2/1 3/3/1\n";

    fn mesh() -> Mesh {
        MeshLoader::parse(TRIANGLE, LoadMode::Indexed).unwrap()
    }

    fn scene() -> Scene {
        let camera = OrbitCamera::new(CameraSettings::default(), 800, 600);
        let mut scene = Scene::new(camera, DirectionalLight::default());
        scene.add_object(
            SceneObject::new(
                "dragon",
                ObjectKind::Standard,
                mesh(),
                Placement::new(1.2, Vector3::new(-0.5, 0.0, -0.5)),
            )
            .with_shadow_casting(true),
        );
        scene.add_object(
            SceneObject::new(
                "suzanne",
                ObjectKind::Standard,
                mesh(),
                Placement::new(0.65, Vector3::new(0.5, 0.0, 0.5)),
            )
            .with_motion(Motion::Spin {
                axis: Vector3::unit_y(),
                speed: 1.0,
            })
            .with_shadow_casting(true),
        );
        scene.add_object(SceneObject::new(
            "cubemap",
            ObjectKind::Skybox,
            mesh(),
            Placement::new(15.0, Vector3::new(0.0, 0.0, 0.0)),
        ));
        scene
    }

    #[test]
    fn test_update_accumulates_time_and_spins() {
        let mut scene = scene();
        scene.update(0.5);
        scene.update(0.25);
        assert!((scene.time() - 0.75).abs() < 1e-6);

        let spun = &scene.objects()[1];
        let expected = crate::gfx::math::model_rotated(
            0.65,
            Vector3::new(0.5, 0.0, 0.5),
            0.75,
            Vector3::unit_y(),
        );
        assert_eq!(spun.model(), expected);
    }

    #[test]
    fn test_spin_keeps_advancing_after_long_uptime() {
        let mut scene = scene();
        scene.time = 600_000.0;
        scene.update(0.0);
        let before = scene.objects()[1].model();

        for _ in 0..60 {
            scene.update(1.0 / 60.0);
        }
        assert!((scene.time() - 600_001.0).abs() < 1e-6);
        assert_ne!(scene.objects()[1].model(), before);
    }

    #[test]
    fn test_update_uses_current_camera() {
        let mut scene = scene();
        scene.camera.handle_input(crate::gfx::camera::InputEvent::Scroll(100.0));
        scene.update(0.0);

        let dragon = &scene.objects()[0];
        assert_eq!(dragon.transforms().mv, scene.camera.view() * dragon.model());
        assert_eq!(
            dragon.transforms().mvp_light,
            scene.light.view_projection() * dragon.model()
        );
        assert!((scene.camera.eye().magnitude() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_only_flagged_objects_cast_shadows() {
        let scene = scene();
        let names: Vec<&str> = scene.shadow_casters().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["dragon", "suzanne"]);
    }

    #[test]
    fn test_frame_uniforms_hold_view_space_light_direction() {
        let mut scene = scene();
        scene.update(0.0);
        let uniforms = scene.frame_uniforms();
        let dir = Vector4::from(uniforms.light_direction);
        assert!((dir.magnitude() - 1.0).abs() < 1e-5);
        assert_eq!(dir.w, 0.0);
    }

    #[test]
    fn test_from_config_loads_meshes_from_assets() {
        let dir = std::env::temp_dir().join(format!("penumbra-scene-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["dragon", "suzanne", "plane", "cubemap"] {
            std::fs::write(dir.join(format!("{}.obj", name)), TRIANGLE).unwrap();
        }

        let config = Config {
            assets: dir.clone(),
            ..Default::default()
        };
        let scene = Scene::from_config(&config, 1280, 800).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        let kinds: Vec<(&str, ObjectKind, bool)> = scene
            .objects()
            .iter()
            .map(|o| (o.name.as_str(), o.kind, o.casts_shadow))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("dragon", ObjectKind::Standard, true),
                ("suzanne", ObjectKind::Standard, true),
                ("plane", ObjectKind::Standard, false),
                ("cubemap", ObjectKind::Skybox, false),
            ]
        );
        assert_eq!(scene.objects()[1].motion, Motion::Spin {
            axis: Vector3::unit_y(),
            speed: 1.0,
        });
        assert_eq!(scene.objects()[0].material.shininess, 64.0);
    }

    #[test]
    fn test_from_config_reports_missing_mesh() {
        let config = Config {
            assets: "definitely/not/here".into(),
            ..Default::default()
        };
        assert!(matches!(
            Scene::from_config(&config, 1280, 800),
            Err(Error::Io { .. })
        ));
    }
}
