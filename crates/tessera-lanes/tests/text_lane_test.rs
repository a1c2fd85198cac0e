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

use serde_json::json;
use std::sync::Arc;
use tessera_core::expr::{Properties, Value};
use tessera_core::geometry::{DecodedTile, PoiGeometry, TextGeometry, TextPathGeometry};
use tessera_core::math::Vec3;
use tessera_core::technique::Technique;
use tessera_core::tile::{LabelAnchor, Tile, TileKey};
use tessera_core::{MaterializerConfig, ViewState};
use tessera_lanes::{KindFilterLane, TextLane};

fn technique(value: serde_json::Value) -> Technique {
    serde_json::from_value(value).expect("technique json")
}

fn path_label(path: Vec<Vec3>, text: &str) -> TextPathGeometry {
    TextPathGeometry {
        technique_index: 0,
        path,
        text: text.into(),
        feature_id: None,
        obj_info: None,
    }
}

fn extract(decoded: &mut DecodedTile) -> Tile {
    KindFilterLane::new().run(decoded, None, None);
    let mut tile = Tile::new(TileKey::new(12, 3, 4), 0).with_data_source("osm");
    TextLane::new().run(
        &mut tile,
        decoded,
        &ViewState::at_zoom(12.5),
        &MaterializerConfig::default(),
        None,
    );
    tile
}

#[test]
fn sharp_turn_yields_two_labels() {
    // 120 degree turn at the middle vertex.
    let path = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(10.0, 0.0, 0.0),
        Vec3::new(5.0, 8.66, 0.0),
    ];
    let mut decoded = DecodedTile::new(vec![technique(json!({ "name": "text" }))], vec![]);
    decoded.text_path_geometries = Some(vec![path_label(path, "Main Street")]);

    let tile = extract(&mut decoded);

    assert_eq!(tile.text_elements.len(), 2);
    let anchors: Vec<_> = tile
        .text_elements
        .iter()
        .map(|e| match &e.anchor {
            LabelAnchor::Path(p) => p.clone(),
            LabelAnchor::Point(_) => panic!("expected a path label"),
        })
        .collect();
    assert!(anchors.iter().all(|p| p.len() == 2));
    assert!(anchors.iter().any(|p| p.contains(&Vec3::new(10.0, 0.0, 0.0))));
}

#[test]
fn longer_paths_get_higher_priority() {
    let straight = |len: f32| vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(len, 0.0, 0.0)];
    let mut decoded = DecodedTile::new(
        vec![technique(json!({ "name": "text", "priority": 5 }))],
        vec![],
    );
    decoded.text_path_geometries = Some(vec![
        path_label(straight(10.0), "short"),
        path_label(straight(100.0), "long"),
    ]);

    let tile = extract(&mut decoded);

    assert_eq!(tile.text_elements[0].text, "long");
    approx::assert_relative_eq!(tile.text_elements[0].priority, 5.01, epsilon = 1e-5);
    assert!(tile.text_elements[1].priority > 5.0);
}

#[test]
fn equal_priorities_keep_extraction_order() {
    let mut decoded = DecodedTile::new(vec![technique(json!({ "name": "text" }))], vec![]);
    decoded.text_geometries = Some(vec![TextGeometry {
        technique_index: 0,
        positions: vec![Vec3::ZERO, Vec3::Z, Vec3::new(1.0, 1.0, 0.0)],
        texts: vec!["a".into(), "b".into(), "c".into()],
        feature_ids: Some(vec![7, 8, 9]),
        obj_infos: None,
    }]);

    let tile = extract(&mut decoded);

    let texts: Vec<_> = tile.text_elements.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, ["a", "b", "c"]);
    assert_eq!(tile.text_elements[1].feature_id, Some(8));
}

#[test]
fn labels_share_styles_and_inherit_view_zoom_bounds() {
    let mut decoded = DecodedTile::new(
        vec![technique(json!({ "name": "text", "maxZoomLevel": 16 }))],
        vec![],
    );
    decoded.text_geometries = Some(vec![TextGeometry {
        technique_index: 0,
        positions: vec![Vec3::ZERO, Vec3::Z],
        texts: vec!["a".into(), "b".into()],
        feature_ids: None,
        obj_infos: None,
    }]);

    let tile = extract(&mut decoded);
    let (a, b) = (&tile.text_elements[0], &tile.text_elements[1]);

    assert!(Arc::ptr_eq(&a.render_style, &b.render_style));
    assert_eq!(a.min_zoom_level, 0.0);
    assert_eq!(a.max_zoom_level, 16.0);
}

#[test]
fn text_can_come_from_feature_properties() {
    let mut props = Properties::new();
    props.insert("name".into(), Value::String("Harbour".into()));
    let mut decoded = DecodedTile::new(
        vec![technique(json!({ "name": "text", "text": ["get", "name"] }))],
        vec![],
    );
    decoded.text_geometries = Some(vec![TextGeometry {
        technique_index: 0,
        positions: vec![Vec3::ZERO],
        texts: vec![String::new()],
        feature_ids: None,
        obj_infos: Some(vec![props]),
    }]);

    let tile = extract(&mut decoded);
    assert_eq!(tile.text_elements[0].text, "Harbour");
    assert!(tile.text_elements[0].user_data.is_some());
}

#[test]
fn icons_and_line_markers() {
    let mut decoded = DecodedTile::new(
        vec![
            technique(json!({ "name": "labeled-icon", "imageTexture": "pin" })),
            technique(json!({ "name": "line-marker", "imageTexture": "shield" })),
        ],
        vec![],
    );
    decoded.poi_geometries = Some(vec![
        PoiGeometry {
            technique_index: 0,
            positions: vec![Vec3::ZERO, Vec3::Z],
            texts: vec![String::new(), "Cafe".into()],
            image_textures: Some(vec!["cup".into()]),
            feature_ids: None,
            obj_infos: None,
        },
        PoiGeometry {
            technique_index: 1,
            positions: vec![Vec3::ZERO, Vec3::new(50.0, 0.0, 0.0)],
            texts: vec!["A7".into()],
            image_textures: None,
            feature_ids: None,
            obj_infos: None,
        },
    ]);

    let tile = extract(&mut decoded);
    assert_eq!(tile.text_elements.len(), 3);

    let images: Vec<_> = tile
        .text_elements
        .iter()
        .map(|e| e.poi_info.as_ref().unwrap().image_name.clone().unwrap())
        .collect();
    assert_eq!(images, ["cup", "pin", "shield"]);
    let marker = &tile.text_elements[2];
    assert!(marker.poi_info.as_ref().unwrap().is_line_marker);
    assert!(matches!(marker.anchor, LabelAnchor::Path(_)));
}

#[test]
fn extraction_runs_once_per_offset() {
    let mut decoded = DecodedTile::new(vec![technique(json!({ "name": "text" }))], vec![]);
    decoded.text_geometries = Some(vec![TextGeometry {
        technique_index: 0,
        positions: vec![Vec3::ZERO],
        texts: vec!["once".into()],
        feature_ids: None,
        obj_infos: None,
    }]);
    let lane = TextLane::new();
    let view = ViewState::default();
    let config = MaterializerConfig::default();
    let mut tile = Tile::default();

    let first = lane.run(&mut tile, &mut decoded, &view, &config, None);
    let second = lane.run(&mut tile, &mut decoded, &view, &config, None);
    let mut wrapped = Tile::new(TileKey::default(), 1);
    let other_offset = lane.run(&mut wrapped, &mut decoded, &view, &config, None);

    assert_eq!((first.elements, second.elements, other_offset.elements), (1, 0, 1));
    assert_eq!(tile.text_elements.len(), 1);
}

#[test]
fn empty_text_without_icon_is_dropped() {
    let mut decoded = DecodedTile::new(vec![technique(json!({ "name": "text" }))], vec![]);
    decoded.text_geometries = Some(vec![TextGeometry {
        technique_index: 0,
        positions: vec![Vec3::ZERO],
        texts: vec![String::new()],
        feature_ids: None,
        obj_infos: None,
    }]);
    assert!(extract(&mut decoded).text_elements.is_empty());
}

fn point_label_tile(style: serde_json::Value) -> DecodedTile {
    let mut decoded = DecodedTile::new(vec![technique(style)], vec![]);
    decoded.text_geometries = Some(vec![TextGeometry {
        technique_index: 0,
        positions: vec![Vec3::ZERO],
        texts: vec!["label".into()],
        feature_ids: None,
        obj_infos: None,
    }]);
    KindFilterLane::new().run(&mut decoded, None, None);
    decoded
}

#[test]
fn tiles_with_different_catalogs_keep_their_own_styles() {
    // ARRANGE
    let lane = TextLane::new();
    let view = ViewState::at_zoom(12.0);
    let config = MaterializerConfig::default();
    let mut small = point_label_tile(json!({ "name": "text", "size": 10 }));
    let mut large = point_label_tile(json!({ "name": "text", "size": 30 }));
    let mut tile_a = Tile::new(TileKey::new(12, 1, 1), 0).with_data_source("osm");
    let mut tile_b = Tile::new(TileKey::new(12, 1, 2), 0).with_data_source("osm");

    // ACT
    lane.run(&mut tile_a, &mut small, &view, &config, None);
    lane.run(&mut tile_b, &mut large, &view, &config, None);

    // ASSERT
    assert_eq!(tile_a.text_elements[0].render_style.size, 10.0);
    assert_eq!(tile_b.text_elements[0].render_style.size, 30.0);
}

#[test]
fn same_style_rule_is_shared_across_tiles() {
    let lane = TextLane::new();
    let view = ViewState::at_zoom(12.0);
    let config = MaterializerConfig::default();
    let rule = json!({ "name": "text", "size": 14, "_styleSetIndex": 3 });
    let mut first = point_label_tile(rule.clone());
    let mut second = point_label_tile(rule);
    let mut tile_a = Tile::new(TileKey::new(12, 1, 1), 0).with_data_source("osm");
    let mut tile_b = Tile::new(TileKey::new(12, 1, 2), 0).with_data_source("osm");

    lane.run(&mut tile_a, &mut first, &view, &config, None);
    lane.run(&mut tile_b, &mut second, &view, &config, None);

    assert!(Arc::ptr_eq(
        &tile_a.text_elements[0].render_style,
        &tile_b.text_elements[0].render_style
    ));
    assert_eq!(lane.styles().len(), 1);
}
