use gltf::accessor::DataType;
use studio_room::resources::{
    draco::{self, DecodedPrimitives},
    gltf::{decode_with, validate},
};

use crate::common::test_utils::init_logger;

mod common;

const QUAD: &[u8] = include_bytes!("data/draco_quad.gltf");

fn quad_document() -> gltf::Document {
    let gltf = gltf::Gltf::from_slice_without_validation(QUAD).unwrap();
    validate(gltf.document).unwrap()
}

/// Decoder output for the quad: u16 indices, then POSITION (id 0),
/// TEXCOORD_0 (id 1) and NORMAL (id 2).
fn decoded_quad() -> Vec<u8> {
    let mut bytes = Vec::new();
    for i in [0u16, 1, 2, 0, 2, 3] {
        bytes.extend(i.to_le_bytes());
    }
    for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]] {
        for c in p {
            bytes.extend(c.to_le_bytes());
        }
    }
    for uv in [[0u16, 0], [u16::MAX, 0], [u16::MAX, u16::MAX], [0, u16::MAX]] {
        for c in uv {
            bytes.extend(c.to_le_bytes());
        }
    }
    for _ in 0..4 {
        for c in [0.0f32, 0.0, 1.0] {
            bytes.extend(c.to_le_bytes());
        }
    }
    bytes
}

#[test]
fn draco_documents_pass_validation() {
    let document = quad_document();
    assert_eq!(document.meshes().count(), 1);
}

#[test]
fn unknown_required_extensions_still_fail_validation() {
    let text = std::str::from_utf8(QUAD)
        .unwrap()
        .replace(draco::EXTENSION, "EXT_not_supported");
    let gltf = gltf::Gltf::from_slice_without_validation(text.as_bytes()).unwrap();
    assert!(validate(gltf.document).is_err());
}

#[test]
fn compressed_primitives_are_found_with_attributes_in_id_order() {
    let document = quad_document();
    let found = draco::compressed_primitives(&document).unwrap();
    assert_eq!(found.len(), 1);

    let quad = &found[0];
    assert_eq!((quad.mesh, quad.primitive, quad.buffer_view), (0, 0, 0));
    assert_eq!((quad.vertex_count, quad.index_count), (4, 6));
    let order = quad.attributes.iter().map(|a| a.semantic.as_str()).collect::<Vec<_>>();
    assert_eq!(order, vec!["POSITION", "TEXCOORD_0", "NORMAL"]);
    assert_eq!(quad.attributes[1].components, 2);
    assert_eq!(quad.attributes[1].data_type, DataType::U16);
}

#[test]
fn compressed_bytes_come_from_the_buffer_view() {
    let document = quad_document();
    let quad = &draco::compressed_primitives(&document).unwrap()[0];
    let buffers = vec![(0u8..16).collect::<Vec<_>>()];
    assert_eq!(quad.compressed(&document, &buffers).unwrap(), &[4, 5, 6, 7, 8, 9, 10, 11]);
}

#[test]
fn decoded_buffer_is_split_into_attributes() {
    let document = quad_document();
    let quad = &draco::compressed_primitives(&document).unwrap()[0];
    let decoded = quad.unpack(&decoded_quad()).unwrap();

    assert_eq!(decoded.indices, vec![0, 1, 2, 0, 2, 3]);
    assert_eq!(decoded.positions[2], [1.0, 1.0, 0.0]);
    assert_eq!(decoded.normals.as_ref().unwrap()[3], [0.0, 0.0, 1.0]);
    // normalised u16 texture coordinates
    assert_eq!(decoded.tex_coords.as_ref().unwrap()[1], [1.0, 0.0]);
    assert_eq!(decoded.tex_coords.as_ref().unwrap()[3], [0.0, 1.0]);
}

#[test]
fn short_decoded_buffer_is_an_error() {
    let document = quad_document();
    let quad = &draco::compressed_primitives(&document).unwrap()[0];
    let mut bytes = decoded_quad();
    bytes.truncate(bytes.len() - 4);
    assert!(quad.unpack(&bytes).is_err());
}

#[test]
fn decoded_primitives_become_model_geometry() {
    init_logger();
    let document = quad_document();
    let quad = &draco::compressed_primitives(&document).unwrap()[0];
    let mut compressed = DecodedPrimitives::new();
    compressed.insert((0, 0), quad.unpack(&decoded_quad()).unwrap());

    let model = decode_with("quad.glb", &document, &[vec![0; 16]], &[], &compressed).unwrap();
    let parts = model.parts();
    assert_eq!(parts.len(), 1);
    let geometry = &parts[0].geometry;
    assert_eq!(geometry.vertices.len(), 4);
    assert_eq!(geometry.indices.len(), 6);
    assert_eq!(geometry.vertices[2].tex_coords, [1.0, 1.0]);

    let bounds = model.bounds().unwrap();
    assert!((bounds.max.x - 1.0).abs() < 1e-5);
    assert!((bounds.max.y - 1.0).abs() < 1e-5);
}
