//! Project persistence
//!
//! JSON round-trip of everything the engine needs to restore a setup:
//! screens with their surfaces, and compositions with their layers. Media
//! sources themselves are external; only their ids are persisted.
//!
//! Loading goes through serde, so a screen persisted with zero surfaces
//! comes back with zero surfaces. The auto-created default surface of
//! [`crate::screen::Screen::new`] only exists for screens created fresh.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::composition::{CompositionLayer, MediaComposition};
use crate::media::{MediaId, MediaRegistry, MediaSource};
use crate::screen::ScreenManager;

/// Serialized form of a [`MediaComposition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionData {
    pub id: MediaId,
    pub name: String,
    pub resolution: (u32, u32),
    pub layers: Vec<CompositionLayer>,
}

impl CompositionData {
    pub fn from_composition(composition: &MediaComposition) -> Self {
        Self {
            id: composition.id(),
            name: composition.name.clone(),
            resolution: composition.resolution(),
            layers: composition.layers(),
        }
    }

    /// Rebuild the live composition. The off-screen target is allocated
    /// lazily on first render.
    pub fn into_composition(self) -> Arc<MediaComposition> {
        let composition = MediaComposition::with_id(self.id, self.name);
        {
            let mut state = composition.lock_state();
            state.resolution = (self.resolution.0.max(1), self.resolution.1.max(1));
            state.layers = self.layers;
        }
        composition
    }
}

/// Everything a project file stores.
#[derive(Default, Serialize, Deserialize)]
pub struct ProjectData {
    pub screens: ScreenManager,
    pub compositions: Vec<CompositionData>,
}

impl ProjectData {
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("writing project file {}", path.display()))?;
        log::info!("Saved project to {}", path.display());
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading project file {}", path.display()))?;
        let mut project: ProjectData =
            serde_json::from_str(&json).with_context(|| "parsing project file")?;
        // Deserialized surfaces carry empty meshes; build them once now.
        let registry = MediaRegistry::new();
        project.screens.maintain(&registry);
        log::info!(
            "Loaded project from {} ({} screens, {} compositions)",
            path.display(),
            project.screens.screens.len(),
            project.compositions.len()
        );
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaSource;
    use crate::screen::{EdgeValues, HandleId};
    use glam::Vec2;

    #[test]
    fn test_round_trip_preserves_parameters() {
        let mut project = ProjectData::default();
        let index = project.screens.add_screen();
        {
            let screen = &mut project.screens.screens[index];
            screen.set_snap_distance(0.1);
            let surface = &mut screen.surfaces[0];
            surface.set_bezier_enabled(true);
            surface.set_handle_position(HandleId::TopRight, Vec2::new(1.2, 0.9));
            surface.set_soft_edge(EdgeValues::splat(0.25));
            surface.set_crop(EdgeValues {
                top: 0.1,
                ..Default::default()
            });
        }

        let comp = MediaComposition::new("Comp");
        comp.add_layer(CompositionLayer {
            rotation: 12.5,
            alpha: 0.7,
            ..Default::default()
        });
        project.compositions.push(CompositionData::from_composition(&comp));

        let json = serde_json::to_string(&project).unwrap();
        let restored: ProjectData = serde_json::from_str(&json).unwrap();

        let screen = &restored.screens.screens[index];
        assert_eq!(screen.snap_distance(), 0.1);
        let surface = &screen.surfaces[0];
        assert!(surface.bezier_enabled());
        assert_eq!(
            surface.handle_position(HandleId::TopRight),
            Vec2::new(1.2, 0.9)
        );
        assert_eq!(surface.soft_edge().top, 0.25);
        assert_eq!(surface.crop().top, 0.1);

        let comp_data = &restored.compositions[0];
        assert_eq!(comp_data.id, comp.id());
        assert_eq!(comp_data.layers[0].rotation, 12.5);
        assert_eq!(comp_data.layers[0].alpha, 0.7);

        let rebuilt = comp_data.clone().into_composition();
        assert_eq!(rebuilt.id(), comp.id());
        assert_eq!(rebuilt.layers()[0].alpha, 0.7);
    }

    #[test]
    fn test_loading_does_not_add_default_surface() {
        let mut project = ProjectData::default();
        let index = project.screens.add_screen();
        project.screens.screens[index].remove_surface(0);

        let json = serde_json::to_string(&project).unwrap();
        let restored: ProjectData = serde_json::from_str(&json).unwrap();
        assert!(restored.screens.screens[index].surfaces.is_empty());
    }

    #[test]
    fn test_file_round_trip_rebuilds_meshes() {
        let mut project = ProjectData::default();
        project.screens.add_screen();

        let dir = std::env::temp_dir().join("projmap-engine-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("project.json");
        project.save_to_file(&path).unwrap();

        let restored = ProjectData::load_from_file(&path).unwrap();
        let surface = &restored.screens.screens[0].surfaces[0];
        assert!(!surface.lock_mesh().vertices.is_empty());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let result = ProjectData::load_from_file(Path::new("/nonexistent/project.json"));
        assert!(result.is_err());
    }
}
