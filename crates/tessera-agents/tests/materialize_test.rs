// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Result;
use serde_json::json;
use tessera_agents::TileMaterializer;
use tessera_core::geometry::{
    BufferAttribute, DecodedTile, Geometry, GeometryType, Group, PathGeometry, TextPathGeometry,
};
use tessera_core::lane::TechniqueFilter;
use tessera_core::math::Vec3;
use tessera_core::technique::{GeometryKindSet, Technique};
use tessera_core::tile::{ObjectRole, Tile, TileKey};
use tessera_core::{MaterializerConfig, ViewState};

fn technique(value: serde_json::Value) -> Technique {
    serde_json::from_value(value).expect("technique json")
}

fn square(technique_index: usize) -> Geometry {
    Geometry::new(GeometryType::Polygon)
        .with_attribute(BufferAttribute::from_f32(
            "position",
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            3,
        ))
        .with_index(vec![0, 1, 2, 0, 2, 3])
        .with_edge_index(vec![0, 1, 1, 2, 2, 3, 3, 0])
        .with_group(Group::new(0, 6, technique_index))
}

fn street_label(technique_index: usize) -> TextPathGeometry {
    TextPathGeometry {
        technique_index,
        path: vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(50.0, 0.0, 0.0)],
        text: "High Street".into(),
        feature_id: Some(7),
        obj_info: None,
    }
}

/// A water fill and a street label.
fn water_and_street() -> DecodedTile {
    let mut decoded = DecodedTile::new(
        vec![
            technique(json!({ "name": "fill", "kind": "water", "color": "#0000ff" })),
            technique(json!({ "name": "text", "kind": "road" })),
        ],
        vec![square(0)],
    );
    decoded.text_path_geometries = Some(vec![street_label(1)]);
    decoded
}

fn new_tile() -> Tile {
    Tile::new(TileKey::new(14, 100, 200), 0)
        .with_data_source("base")
        .with_extent(1.0)
}

#[test]
fn decoded_tile_becomes_objects_and_labels() -> Result<()> {
    // ARRANGE
    let materializer = TileMaterializer::new(MaterializerConfig::default());
    let mut decoded = water_and_street();
    let mut tile = new_tile();

    // ACT
    materializer.init_decoded_tile(&mut decoded, None, None)?;
    let report =
        materializer.create_all_geometries(&mut tile, &mut decoded, &ViewState::at_zoom(14.0))?;

    // ASSERT
    assert_eq!(tile.objects_with_role(ObjectRole::Primary).count(), 1);
    assert_eq!(tile.text_elements.len(), 1);
    assert_eq!(tile.text_elements[0].text, "High Street");
    assert_eq!(report.objects.objects, tile.objects.len());
    assert_eq!(report.text.elements, 1);
    assert!(!report.ground_plane);
    Ok(())
}

#[test]
fn second_pass_adds_nothing() -> Result<()> {
    let materializer = TileMaterializer::new(MaterializerConfig::default());
    let mut decoded = water_and_street();
    let mut tile = new_tile();
    let view = ViewState::at_zoom(14.0);
    materializer.init_decoded_tile(&mut decoded, None, None)?;

    materializer.create_all_geometries(&mut tile, &mut decoded, &view)?;
    let (objects, labels) = (tile.objects.len(), tile.text_elements.len());
    let again = materializer.create_all_geometries(&mut tile, &mut decoded, &view)?;

    assert_eq!(again.objects.objects, 0);
    assert_eq!(again.text.elements, 0);
    assert_eq!(tile.objects.len(), objects);
    assert_eq!(tile.text_elements.len(), labels);
    Ok(())
}

#[test]
fn denied_kinds_are_skipped_and_other_kinds_survive() -> Result<()> {
    let materializer = TileMaterializer::new(MaterializerConfig::default());
    let mut decoded = water_and_street();
    let mut tile = new_tile();
    let deny = GeometryKindSet::new(["water"]);

    materializer.init_decoded_tile(&mut decoded, None, Some(&deny))?;
    materializer.create_all_geometries(&mut tile, &mut decoded, &ViewState::at_zoom(14.0))?;

    assert!(tile.objects.is_empty());
    assert_eq!(tile.text_elements.len(), 1);
    Ok(())
}

#[test]
fn allow_list_overrides_deny_list() -> Result<()> {
    let materializer = TileMaterializer::new(MaterializerConfig::default());
    let mut decoded = water_and_street();
    let mut tile = new_tile();
    let allow = GeometryKindSet::new(["water"]);
    let deny = GeometryKindSet::new(["water", "road"]);

    materializer.init_decoded_tile(&mut decoded, Some(&allow), Some(&deny))?;
    materializer.create_all_geometries(&mut tile, &mut decoded, &ViewState::at_zoom(14.0))?;

    assert_eq!(tile.objects_with_role(ObjectRole::Primary).count(), 1);
    assert!(tile.text_elements.is_empty());
    Ok(())
}

#[test]
fn technique_filter_applies_to_every_lane() -> Result<()> {
    let materializer = TileMaterializer::new(MaterializerConfig::default())
        .with_technique_filter(TechniqueFilter::new(|t| t.name() != "text"));
    let mut decoded = water_and_street();
    let mut tile = new_tile();

    materializer.init_decoded_tile(&mut decoded, None, None)?;
    materializer.create_all_geometries(&mut tile, &mut decoded, &ViewState::at_zoom(14.0))?;

    assert!(!tile.objects.is_empty());
    assert!(tile.text_elements.is_empty());
    Ok(())
}

#[test]
fn ground_plane_sits_under_everything() -> Result<()> {
    let config = MaterializerConfig::from_ron_str(
        r##"(add_ground_plane: true, ground_plane_color: "#102030")"##,
    )?;
    let materializer = TileMaterializer::new(config);
    let mut decoded = water_and_street();
    let mut tile = new_tile();

    materializer.init_decoded_tile(&mut decoded, None, None)?;
    let report =
        materializer.create_all_geometries(&mut tile, &mut decoded, &ViewState::at_zoom(14.0))?;

    assert!(report.ground_plane);
    let ground = &tile.objects[0];
    assert_eq!(ground.role, ObjectRole::GroundPlane);
    assert!(tile.objects[1..].iter().all(|o| o.render_order > ground.render_order));
    let material = tile.materials.get(ground.material).expect("ground material");
    assert_eq!(material.color, materializer.config().ground_plane_color());
    Ok(())
}

#[test]
fn tile_paths_are_preserved_on_request() -> Result<()> {
    let config = MaterializerConfig {
        preserve_tile_paths: true,
        ..Default::default()
    };
    let materializer = TileMaterializer::new(config);
    let mut decoded = water_and_street();
    decoded.path_geometries = Some(vec![PathGeometry {
        path: vec![Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0)],
        feature_id: Some(3),
    }]);
    let mut tile = new_tile();

    materializer.init_decoded_tile(&mut decoded, None, None)?;
    materializer.create_all_geometries(&mut tile, &mut decoded, &ViewState::at_zoom(14.0))?;

    assert_eq!(tile.paths.len(), 1);
    assert_eq!(tile.paths[0].feature_id, Some(3));
    Ok(())
}

#[test]
fn refresh_follows_the_zoom_level() -> Result<()> {
    let materializer = TileMaterializer::new(MaterializerConfig::default());
    let mut decoded = DecodedTile::new(
        vec![technique(json!({
            "name": "line",
            "lineWidth": ["interpolate", ["linear"], ["zoom"], 10, 1, 20, 11]
        }))],
        vec![Geometry::new(GeometryType::Line)
            .with_attribute(BufferAttribute::from_f32(
                "position",
                vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0],
                3,
            ))
            .with_group(Group::new(0, 3, 0))],
    );
    let mut tile = new_tile();
    materializer.init_decoded_tile(&mut decoded, None, None)?;
    materializer.create_all_geometries(&mut tile, &mut decoded, &ViewState::at_zoom(10.0))?;

    let unchanged =
        materializer.refresh_materials(&mut tile, &mut decoded, &ViewState::at_zoom(10.0))?;
    let changed =
        materializer.refresh_materials(&mut tile, &mut decoded, &ViewState::at_zoom(15.0))?;

    assert_eq!(unchanged.changed, 0);
    assert_eq!(changed.changed, 1);
    let object = &tile.objects[0];
    let line = tile.materials.get(object.material).and_then(|m| m.line);
    assert_eq!(line.map(|l| l.width), Some(6.0));
    Ok(())
}

#[test]
fn disposing_a_tile_stops_its_animations() -> Result<()> {
    let materializer = TileMaterializer::new(MaterializerConfig::default());
    let mut decoded = DecodedTile::new(
        vec![technique(json!({
            "name": "extruded-polygon", "animateExtrusion": true, "animateExtrusionDuration": 300
        }))],
        vec![square(0)],
    );
    let mut tile = new_tile();
    materializer.init_decoded_tile(&mut decoded, None, None)?;
    materializer.create_all_geometries(&mut tile, &mut decoded, &ViewState::at_zoom(16.0))?;
    assert_eq!(materializer.extrusion_handler().group_count(), 1);

    let released = materializer.dispose_tile(&mut tile);

    assert_eq!(released, 1);
    assert_eq!(materializer.extrusion_handler().group_count(), 0);
    assert!(tile.objects.is_empty());
    assert!(tile.materials.is_empty());
    Ok(())
}
